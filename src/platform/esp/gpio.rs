// EnvStation — GPIO Indicators

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

use crate::drivers::alert::AlertOutput;
use crate::tasks::sensor::Heartbeat;

/// Heartbeat LED toggled by the sensor task.
pub struct LedHeartbeat {
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

impl LedHeartbeat {
    pub fn new(pin: PinDriver<'static, AnyOutputPin, Output>) -> Self {
        Self { pin }
    }
}

impl Heartbeat for LedHeartbeat {
    fn show(&mut self, lit: bool) {
        let _ = if lit { self.pin.set_high() } else { self.pin.set_low() };
    }
}

/// Active buzzer line used for boot chirps and failure patterns.
pub struct AlertPin {
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

impl AlertPin {
    pub fn new(pin: PinDriver<'static, AnyOutputPin, Output>) -> Self {
        Self { pin }
    }
}

impl AlertOutput for AlertPin {
    fn set(&mut self, on: bool) {
        let _ = if on { self.pin.set_high() } else { self.pin.set_low() };
    }
}
