// EnvStation — ESP-IDF I2C Adapter
//
// The sensors and the OLED share one controller.  Each driver holds its own
// copy of this handle; the mutex is taken per transaction only.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use esp_idf_hal::delay::TickType;
use esp_idf_hal::i2c::I2cDriver;
use esp_idf_sys::EspError;

use crate::drivers::bus::{BusError, I2cBus};

/// Thread-safe handle to the shared I2C bus.
pub type SharedI2c = &'static Mutex<I2cDriver<'static>>;

#[derive(Clone, Copy)]
pub struct EspI2c {
    bus: SharedI2c,
}

impl EspI2c {
    pub fn new(bus: SharedI2c) -> Self {
        Self { bus }
    }
}

fn ticks(timeout: Duration) -> u32 {
    TickType::from(timeout).ticks()
}

fn map_err(e: EspError) -> BusError {
    match e.code() {
        c if c == esp_idf_sys::ESP_ERR_TIMEOUT as i32 => BusError::Timeout,
        c if c == esp_idf_sys::ESP_FAIL => BusError::Nack,
        _ => BusError::Bus,
    }
}

impl I2cBus for EspI2c {
    fn write(&mut self, addr: u8, bytes: &[u8], timeout: Duration) -> Result<usize, BusError> {
        let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        bus.write(addr, bytes, ticks(timeout)).map_err(map_err)?;
        Ok(bytes.len())
    }

    fn read(&mut self, addr: u8, buf: &mut [u8], timeout: Duration) -> Result<usize, BusError> {
        let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        bus.read(addr, buf, ticks(timeout)).map_err(map_err)?;
        Ok(buf.len())
    }

    // One locked repeated-start transaction, so no other task can slip a
    // transfer between the register pointer write and the read.
    fn write_read(
        &mut self,
        addr: u8,
        bytes: &[u8],
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        bus.write_read(addr, bytes, buf, ticks(timeout)).map_err(map_err)
    }
}
