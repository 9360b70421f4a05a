// EnvStation — Firmware Entry Point
//
// Boot sequence:
//   1. Bring up logging, the panic hook and the shared I2C bus.
//   2. Initialise the OLED and chirp the buzzer.
//   3. Run the link supervisor to Connected or Degraded.
//   4. Create the sample queue and spawn the sensor and telemetry tasks.
//   5. Park the main thread as the fault watcher.
//
// A fatal fault (panic, failed task spawn) stops the pipeline for good; the
// main thread then shows "HALTED" and plays the failure pattern forever.

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("envstation is firmware: build it for an ESP-IDF target (riscv32imc-esp-espidf)");
}

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::gpio::{OutputPin, PinDriver};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_hal::task::thread::ThreadSpawnConfiguration;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use envstation::clock::{ThreadDelay, Uptime};
    use envstation::config::*;
    use envstation::display::SharedDisplay;
    use envstation::drivers::alert::AlertDriver;
    use envstation::drivers::imu::Mpu6050;
    use envstation::drivers::oled::Ssd1306;
    use envstation::fault::{FatalFault, SystemSupervisor};
    use envstation::link::{self, Credentials, LinkState, LinkSupervisor};
    use envstation::platform::esp::{
        AlertPin, EspAdcTemperature, EspI2c, EspRadio, EspRssi, LedHeartbeat, SharedI2c,
    };
    use envstation::queue::sample_queue;
    use envstation::tasks::sensor::{NetworkLabel, SensorIo, SensorTask};
    use envstation::tasks::telemetry::TelemetryTask;
    use envstation::telemetry::{Collector, TcpConnector};

    pub fn run() -> anyhow::Result<()> {
        // Link esp-idf-sys runtime patches and initialise logging.
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("EnvStation firmware starting…");

        let uptime = Uptime::start();
        let system = SystemSupervisor::new();
        system.install_panic_hook();

        // ---- Peripherals --------------------------------------------------
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take().ok();

        // ---- I2C bus (shared between sensors and OLED) ----------------------
        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_HZ.Hz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio6, // PIN_I2C_SDA
            peripherals.pins.gpio7, // PIN_I2C_SCL
            &i2c_config,
        )?;
        // The driver lives for the whole programme; firmware never exits.
        let i2c_bus: SharedI2c = Box::leak(Box::new(Mutex::new(i2c)));

        // ---- Display + indicators -----------------------------------------
        let mut oled = Ssd1306::new(EspI2c::new(i2c_bus));
        if let Err(e) = oled.init() {
            log::error!("OLED init failed: {} (continuing without a panel)", e);
        }
        let display = SharedDisplay::new(oled);

        let mut alert = AlertDriver::new(AlertPin::new(PinDriver::output(
            peripherals.pins.gpio10.downgrade_output(), // PIN_ALERT
        )?));
        let heartbeat = LedHeartbeat::new(PinDriver::output(
            peripherals.pins.gpio8.downgrade_output(), // PIN_HEARTBEAT
        )?);
        alert.play(ALERT_STARTUP);

        let imu_ok = Mpu6050::default().is_connected(&mut EspI2c::new(i2c_bus));
        if !imu_ok {
            log::error!("Boot check: MPU6050 not responding");
        }

        // ---- Link supervisor ------------------------------------------------
        let (link_writer, connectivity) = link::connectivity();
        let mut supervisor = LinkSupervisor::new(
            EspRadio::new(peripherals.modem, sysloop, nvs),
            display.clone(),
            ThreadDelay,
            link_writer,
            Credentials::new(WIFI_SSID, WIFI_PASSWORD),
        );
        let report = supervisor.run();
        match report.state {
            LinkState::Connected => {
                alert.play(ALERT_LINK_UP);
                thread::sleep(LINK_UP_HOLD);
            }
            _ => alert.play(ALERT_LINK_FAILED),
        }
        // The driver must outlive the session even when degraded.
        let _radio = supervisor.into_radio();

        // ---- Pipeline -------------------------------------------------------
        let (sample_tx, sample_rx) = sample_queue(SAMPLE_QUEUE_CAPACITY);

        let sensor = SensorTask::new(
            SensorIo {
                bus: EspI2c::new(i2c_bus),
                temperature: EspAdcTemperature::new(ADC_CHANNEL_TEMP),
                link_quality: EspRssi,
                heartbeat,
            },
            display.clone(),
            sample_tx,
            connectivity.clone(),
            NetworkLabel {
                ssid: WIFI_SSID,
                ip: report.ip,
            },
            uptime,
        );
        spawn_task(&system, b"sensor\0", STACK_SENSOR, PRIORITY_SENSOR, move || {
            sensor.run(SENSOR_PERIOD);
        });

        let telemetry = TelemetryTask::new(
            TcpConnector::default(),
            Collector::from_build_env(),
            connectivity,
            sample_rx,
        );
        spawn_task(&system, b"telemetry\0", STACK_TELEMETRY, PRIORITY_TELEMETRY, move || {
            telemetry.run();
        });
        log::info!("Boot complete — pipeline running");

        // ---- Fault watcher --------------------------------------------------
        let fault = system.wait_for_halt(Duration::from_millis(500));
        log::error!("System halted: {:?}", fault);
        let _ = display.show_lines(&["HALTED"]);
        system.signal_halt_forever(&mut alert)
    }

    /// Spawn a FreeRTOS-backed task.  Failing to get a stack is fatal.
    fn spawn_task<F>(system: &SystemSupervisor, name: &'static [u8], stack: usize, priority: u8, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let label = String::from_utf8_lossy(&name[..name.len() - 1]).into_owned();
        let configured = ThreadSpawnConfiguration {
            name: Some(name),
            stack_size: stack,
            priority,
            ..Default::default()
        }
        .set();
        if let Err(e) = configured {
            log::warn!("Spawn config for {} rejected: {}", label, e);
        }

        let spawned = thread::Builder::new()
            .name(label.clone())
            .stack_size(stack)
            .spawn(body);
        if let Err(e) = spawned {
            system.halt(FatalFault::AllocationExhausted {
                what: format!("{} task ({})", label, e),
            });
        }

        let _ = ThreadSpawnConfiguration::default().set();
    }
}
