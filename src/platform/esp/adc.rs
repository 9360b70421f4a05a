// EnvStation — ADC Temperature Channel
//
// One-shot ADC1 reads via the raw ESP-IDF driver, 12-bit, 11 dB attenuation
// (0–3.3 V).  Setup failures are logged and leave the source returning
// nothing, which the sensor task reports as an unknown temperature.

use crate::drivers::chip_temp::TemperatureSource;

pub struct EspAdcTemperature {
    handle: esp_idf_sys::adc_oneshot_unit_handle_t,
    channel: esp_idf_sys::adc_channel_t,
    ready: bool,
}

// SAFETY: the oneshot unit handle is only used from the task that owns this
// value; the driver itself serialises access to the ADC hardware.
unsafe impl Send for EspAdcTemperature {}

impl EspAdcTemperature {
    pub fn new(channel: u32) -> Self {
        let mut handle: esp_idf_sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        let channel = channel as esp_idf_sys::adc_channel_t;

        let ready = unsafe {
            let unit_cfg = esp_idf_sys::adc_oneshot_unit_init_cfg_t {
                unit_id: esp_idf_sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: esp_idf_sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            let ret = esp_idf_sys::adc_oneshot_new_unit(&unit_cfg, &mut handle);
            if ret != esp_idf_sys::ESP_OK {
                log::error!("ADC unit init failed ({})", ret);
                false
            } else {
                let chan_cfg = esp_idf_sys::adc_oneshot_chan_cfg_t {
                    atten: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_11,
                    bitwidth: esp_idf_sys::adc_bitwidth_t_ADC_BITWIDTH_12,
                };
                let ret = esp_idf_sys::adc_oneshot_config_channel(handle, channel, &chan_cfg);
                if ret != esp_idf_sys::ESP_OK {
                    log::error!("ADC channel config failed ({})", ret);
                }
                ret == esp_idf_sys::ESP_OK
            }
        };

        Self {
            handle,
            channel,
            ready,
        }
    }
}

impl TemperatureSource for EspAdcTemperature {
    fn read_raw(&mut self) -> Option<u16> {
        if !self.ready {
            return None;
        }
        let mut raw: i32 = 0;
        let ret = unsafe { esp_idf_sys::adc_oneshot_read(self.handle, self.channel, &mut raw) };
        (ret == esp_idf_sys::ESP_OK).then_some(raw.clamp(0, u16::MAX as i32) as u16)
    }
}
