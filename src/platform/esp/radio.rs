// EnvStation — ESP-IDF Station Radio
//
// `EspWifi` driven without the blocking wrapper so each association attempt
// can be bounded by the supervisor's timeout.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{self, ClientConfiguration, Configuration, EspWifi};

use crate::link::{AuthMethod, Credentials, LinkQuality, Radio, RadioError};

const ASSOCIATION_POLL: Duration = Duration::from_millis(100);

pub struct EspRadio {
    modem: Option<Modem>,
    sysloop: EspSystemEventLoop,
    nvs: Option<EspDefaultNvsPartition>,
    wifi: Option<Box<EspWifi<'static>>>,
}

impl EspRadio {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Self {
        Self {
            modem: Some(modem),
            sysloop,
            nvs,
            wifi: None,
        }
    }

    fn wifi(&mut self) -> Result<&mut EspWifi<'static>, RadioError> {
        self.wifi.as_deref_mut().ok_or(RadioError::Init)
    }
}

impl Radio for EspRadio {
    fn init(&mut self) -> Result<(), RadioError> {
        let modem = self.modem.take().ok_or(RadioError::Init)?;
        let wifi = EspWifi::new(modem, self.sysloop.clone(), self.nvs.take()).map_err(|e| {
            log::error!("EspWifi::new failed: {}", e);
            RadioError::Init
        })?;
        self.wifi = Some(Box::new(wifi));
        Ok(())
    }

    fn enable_station(&mut self) -> Result<(), RadioError> {
        let wifi = self.wifi()?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))
            .and_then(|()| wifi.start())
            .map_err(|e| {
                log::error!("Station start failed: {}", e);
                RadioError::StationMode
            })
    }

    fn associate(&mut self, credentials: &Credentials<'_>, timeout: Duration) -> Result<(), RadioError> {
        let wifi = self.wifi()?;

        let mut ssid = heapless::String::<32>::new();
        let mut password = heapless::String::<64>::new();
        if ssid.push_str(credentials.ssid).is_err() || password.push_str(credentials.password).is_err() {
            log::error!("Credentials exceed the station config limits");
            return Err(RadioError::Association);
        }
        let auth_method = match credentials.auth {
            AuthMethod::Open => wifi::AuthMethod::None,
            AuthMethod::Wpa2Personal => wifi::AuthMethod::WPA2Personal,
        };

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password,
            auth_method,
            ..Default::default()
        }))
        .and_then(|()| wifi.connect())
        .map_err(|e| {
            log::warn!("WiFi connect request failed: {}", e);
            RadioError::Association
        })?;

        // Associated and addressed, or out of time.
        let deadline = Instant::now() + timeout;
        loop {
            if wifi.is_up().unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                let _ = wifi.disconnect();
                return Err(RadioError::Timeout);
            }
            std::thread::sleep(ASSOCIATION_POLL);
        }
    }

    fn set_power_save(&mut self, enabled: bool) -> Result<(), RadioError> {
        let mode = if enabled {
            esp_idf_sys::wifi_ps_type_t_WIFI_PS_MIN_MODEM
        } else {
            esp_idf_sys::wifi_ps_type_t_WIFI_PS_NONE
        };
        let ret = unsafe { esp_idf_sys::esp_wifi_set_ps(mode) };
        if ret == esp_idf_sys::ESP_OK {
            Ok(())
        } else {
            Err(RadioError::PowerManagement)
        }
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        let wifi = self.wifi.as_deref()?;
        let info = wifi.sta_netif().get_ip_info().ok()?;
        info.ip.to_string().parse().ok()
    }
}

/// Reads RSSI of the current AP straight from the driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EspRssi;

impl LinkQuality for EspRssi {
    fn rssi(&self) -> Option<i32> {
        unsafe {
            let mut ap_info: esp_idf_sys::wifi_ap_record_t = core::mem::zeroed();
            (esp_idf_sys::esp_wifi_sta_get_ap_info(&mut ap_info) == esp_idf_sys::ESP_OK)
                .then_some(i32::from(ap_info.rssi))
        }
    }
}
