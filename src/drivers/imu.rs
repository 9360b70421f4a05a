// EnvStation — MPU6050 Motion Sensor Driver
//
// Register-level driver over the shared I2C bus.  Only the accelerometer
// block is sampled; values stay in raw counts.

use crate::config::*;
use crate::drivers::bus::{BusError, I2cBus};
use crate::events::Acceleration;

// MPU6050 register addresses
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of the 6-byte accelerometer burst
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x68;

pub struct Mpu6050 {
    addr: u8,
}

impl Default for Mpu6050 {
    fn default() -> Self {
        Self::new(I2C_ADDR_MPU6050)
    }
}

impl Mpu6050 {
    pub fn new(addr: u8) -> Self {
        Self { addr }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected<B: I2cBus>(&self, bus: &mut B) -> bool {
        let mut buf = [0u8; 1];
        match bus.write_read(self.addr, &[REG_WHO_AM_I], &mut buf, I2C_READ_TIMEOUT) {
            Ok(()) => buf[0] == WHO_AM_I_EXPECTED,
            Err(_) => false,
        }
    }

    /// Wake the sensor (clear the SLEEP bit).
    pub fn init<B: I2cBus>(&self, bus: &mut B) -> Result<(), BusError> {
        bus.write_all(self.addr, &[REG_PWR_MGMT_1, 0x00], I2C_WAKE_TIMEOUT)?;
        log::info!("MPU6050 awake");
        Ok(())
    }

    /// Burst-read the three accelerometer axes.
    pub fn read_accel<B: I2cBus>(&self, bus: &mut B) -> Result<Acceleration, BusError> {
        let mut raw = [0u8; 6];
        bus.write_read(self.addr, &[REG_ACCEL_XOUT_H], &mut raw, I2C_READ_TIMEOUT)?;
        Ok(decode_accel(&raw))
    }
}

/// Three big-endian two's-complement pairs, `[hi, lo]` per axis.
pub fn decode_accel(raw: &[u8; 6]) -> Acceleration {
    Acceleration {
        x: i16::from_be_bytes([raw[0], raw[1]]),
        y: i16::from_be_bytes([raw[2], raw[3]]),
        z: i16::from_be_bytes([raw[4], raw[5]]),
    }
}
