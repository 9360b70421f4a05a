// EnvStation — ESP-IDF Bindings

pub mod adc;
pub mod bus;
pub mod gpio;
pub mod radio;

pub use adc::EspAdcTemperature;
pub use bus::{EspI2c, SharedI2c};
pub use gpio::{AlertPin, LedHeartbeat};
pub use radio::{EspRadio, EspRssi};
