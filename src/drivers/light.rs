// EnvStation — BH1750 Ambient Light Sensor Driver

use crate::config::*;
use crate::drivers::bus::{BusError, I2cBus};

const CMD_POWER_ON: u8 = 0x01;
const CMD_CONTINUOUS_HIGH_RES: u8 = 0x10; // 1 lx resolution, ~120 ms per measurement

pub struct Bh1750 {
    addr: u8,
}

impl Default for Bh1750 {
    fn default() -> Self {
        Self::new(I2C_ADDR_BH1750)
    }
}

impl Bh1750 {
    pub fn new(addr: u8) -> Self {
        Self { addr }
    }

    /// Power on and start continuous high-resolution measurements.
    pub fn init<B: I2cBus>(&self, bus: &mut B) -> Result<(), BusError> {
        bus.write_all(self.addr, &[CMD_POWER_ON], I2C_WAKE_TIMEOUT)?;
        bus.write_all(self.addr, &[CMD_CONTINUOUS_HIGH_RES], I2C_WAKE_TIMEOUT)?;
        log::info!("BH1750 measuring (continuous, high resolution)");
        Ok(())
    }

    /// Latest measurement in lux.
    pub fn read_lux<B: I2cBus>(&self, bus: &mut B) -> Result<f32, BusError> {
        let mut raw = [0u8; 2];
        bus.read_exact(self.addr, &mut raw, I2C_READ_TIMEOUT)?;
        Ok(raw_to_lux(u16::from_be_bytes(raw)))
    }
}

pub fn raw_to_lux(raw: u16) -> f32 {
    raw as f32 / BH1750_LUX_DIVISOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::bus::mock::MockBus;

    #[test]
    fn conversion_uses_fixed_divisor() {
        assert_eq!(raw_to_lux(0), 0.0);
        assert!((raw_to_lux(1200) - 1000.0).abs() < 0.001);
        assert!((raw_to_lux(u16::MAX) - 54612.5).abs() < 0.01);
    }

    #[test]
    fn reads_big_endian_count() {
        let mut bus = MockBus::new();
        bus.queue_read(I2C_ADDR_BH1750, &[0x04, 0xB0]);
        let lux = Bh1750::default().read_lux(&mut bus).unwrap();
        assert!((lux - 1000.0).abs() < 0.001);
    }

    #[test]
    fn one_byte_answer_is_rejected() {
        let mut bus = MockBus::new();
        bus.queue_read(I2C_ADDR_BH1750, &[0x04]);
        assert!(Bh1750::default().read_lux(&mut bus).is_err());
    }

    #[test]
    fn init_selects_continuous_high_res_mode() {
        let mut bus = MockBus::new();
        Bh1750::default().init(&mut bus).unwrap();
        assert_eq!(bus.writes_to(I2C_ADDR_BH1750), vec![vec![0x01], vec![0x10]]);
    }
}
