// EnvStation — Analog Temperature Channel
//
// Linear calibration: 0.706 V at 27 °C, falling 1.721 mV per °C.  The value
// is best-effort; a missing or unsupported channel yields NaN.

use crate::config::*;

/// Anything that can produce a raw ADC count for the temperature channel.
pub trait TemperatureSource {
    fn read_raw(&mut self) -> Option<u16>;
}

pub fn adc_to_volts(raw: u16) -> f32 {
    raw as f32 * ADC_REFERENCE_VOLTS / (1u32 << ADC_RESOLUTION_BITS) as f32
}

pub fn volts_to_celsius(volts: f32) -> f32 {
    TEMP_REFERENCE_CELSIUS - (volts - TEMP_REFERENCE_VOLTS) / TEMP_SLOPE_VOLTS_PER_C
}

pub fn read_celsius<T: TemperatureSource + ?Sized>(source: &mut T) -> f32 {
    match source.read_raw() {
        Some(raw) => volts_to_celsius(adc_to_volts(raw)),
        None => f32::NAN,
    }
}
