// EnvStation — Sensor Task
//
// Periodic producer.  Every period it reads the motion and light sensors over
// the shared bus, samples the temperature channel, stamps link quality and
// uptime, offers the sample to the queue without blocking, redraws the status
// panel under the display lock and toggles the heartbeat LED.  No fault here
// is fatal: a failed read degrades that one field for one cycle.

use std::net::Ipv4Addr;
use std::thread;
use std::time::{Duration, Instant};

use crate::clock::Uptime;
use crate::display::{DisplaySink, SharedDisplay, StatusFrame};
use crate::drivers::bus::I2cBus;
use crate::drivers::chip_temp::{self, TemperatureSource};
use crate::drivers::imu::Mpu6050;
use crate::drivers::light::Bh1750;
use crate::events::{Acceleration, Sample};
use crate::link::{Connectivity, LinkQuality};
use crate::queue::SampleSender;

/// Single-pixel liveness indicator on its own device (not the status panel).
pub trait Heartbeat {
    fn show(&mut self, lit: bool);
}

/// Hardware the task owns outright.
pub struct SensorIo<B, T, L, H> {
    pub bus: B,
    pub temperature: T,
    pub link_quality: L,
    pub heartbeat: H,
}

/// What the status panel says about the network.
#[derive(Debug, Clone, Copy)]
pub struct NetworkLabel<'a> {
    pub ssid: &'a str,
    pub ip: Option<Ipv4Addr>,
}

/// Result of one cycle, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutcome {
    pub sample: Sample,
    pub queued: bool,
}

pub struct SensorTask<'a, B, T, L, H, S> {
    io: SensorIo<B, T, L, H>,
    imu: Mpu6050,
    light: Bh1750,
    display: SharedDisplay<S>,
    queue: SampleSender,
    connectivity: Connectivity,
    network: NetworkLabel<'a>,
    uptime: Uptime,
    beat: bool,
}

impl<'a, B, T, L, H, S> SensorTask<'a, B, T, L, H, S>
where
    B: I2cBus,
    T: TemperatureSource,
    L: LinkQuality,
    H: Heartbeat,
    S: DisplaySink,
{
    pub fn new(
        io: SensorIo<B, T, L, H>,
        display: SharedDisplay<S>,
        queue: SampleSender,
        connectivity: Connectivity,
        network: NetworkLabel<'a>,
        uptime: Uptime,
    ) -> Self {
        Self {
            io,
            imu: Mpu6050::default(),
            light: Bh1750::default(),
            display,
            queue,
            connectivity,
            network,
            uptime,
            beat: false,
        }
    }

    /// Wake both sensors.  Failures are logged; the next reads will show
    /// whether the device is really gone.
    pub fn wake_sensors(&mut self) {
        if let Err(e) = self.imu.init(&mut self.io.bus) {
            log::warn!("MPU6050 wake failed: {}", e);
        }
        if let Err(e) = self.light.init(&mut self.io.bus) {
            log::warn!("BH1750 wake failed: {}", e);
        }
    }

    /// Read every source once.
    pub fn sample(&mut self) -> Sample {
        log::debug!("Reading I2C...");
        let accel = match self.imu.read_accel(&mut self.io.bus) {
            Ok(accel) => accel,
            Err(e) => {
                log::warn!("MPU read failed: {}", e);
                Acceleration::default()
            }
        };

        let lux = match self.light.read_lux(&mut self.io.bus) {
            Ok(lux) => lux,
            Err(e) => {
                log::warn!("BH1750 read failed: {}", e);
                0.0
            }
        };

        let temp_c = chip_temp::read_celsius(&mut self.io.temperature);

        let rssi = if self.connectivity.is_up() {
            self.io.link_quality.rssi().unwrap_or(0)
        } else {
            0
        };

        Sample {
            lux,
            accel,
            temp_c,
            rssi,
            uptime_s: self.uptime.secs(),
        }
    }

    /// One full period's work, minus the wait.
    pub fn cycle(&mut self) -> CycleOutcome {
        let sample = self.sample();
        log::info!(
            "Lux: {:.2} Temp: {:.1}C RSSI: {} Uptime: {}s",
            sample.lux,
            sample.temp_c,
            sample.rssi,
            sample.uptime_s
        );

        let queued = self.queue.try_send(sample);
        if !queued {
            log::debug!("Sample queue full; sample dropped");
        }

        let frame = compose_status(&sample, &self.network, self.connectivity.is_up());
        if let Err(e) = self.display.show(&frame) {
            log::warn!("Display update failed: {:?}", e);
        }

        self.beat = !self.beat;
        self.io.heartbeat.show(self.beat);

        CycleOutcome { sample, queued }
    }

    /// Run forever at a fixed period.
    pub fn run(mut self, period: Duration) -> ! {
        log::info!("Sensor task started");
        self.wake_sensors();

        loop {
            let tick_start = Instant::now();
            self.cycle();

            // Sleep for the remainder of the period so the cadence does not
            // drift with bus or display latency.
            let elapsed = tick_start.elapsed();
            if elapsed < period {
                thread::sleep(period - elapsed);
            }
        }
    }
}

/// The four status lines for one sample.
pub fn compose_status(sample: &Sample, network: &NetworkLabel<'_>, online: bool) -> StatusFrame {
    let mut frame = StatusFrame::new();

    if online {
        frame.push(format_args!("WiFi: {}", network.ssid));
    } else {
        frame.push(format_args!("WiFi: offline"));
    }
    match network.ip.filter(|_| online) {
        Some(ip) => frame.push(format_args!("IP:{}", ip)),
        None => frame.push(format_args!("IP: --")),
    }

    if sample.temp_c.is_finite() {
        frame.push(format_args!("Lux:{:.0} T:{:.1}C", sample.lux, sample.temp_c));
    } else {
        frame.push(format_args!("Lux:{:.0} T:--", sample.lux));
    }

    if online {
        frame.push(format_args!("RSSI:{} Up:{}s", sample.rssi, sample.uptime_s));
    } else {
        frame.push(format_args!("RSSI:-- Up:{}s", sample.uptime_s));
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;
    use crate::display::mock::RecordingSink;
    use crate::drivers::bus::mock::MockBus;
    use crate::drivers::bus::BusError;
    use crate::clock::mock::RecordingDelay;
    use crate::link::mock::ScriptedRadio;
    use crate::link::{connectivity, Credentials, LinkState, LinkSupervisor};
    use crate::queue::{sample_queue, SampleReceiver};

    struct FixedTemp(Option<u16>);

    impl TemperatureSource for FixedTemp {
        fn read_raw(&mut self) -> Option<u16> {
            self.0
        }
    }

    struct FixedRssi(Option<i32>);

    impl LinkQuality for FixedRssi {
        fn rssi(&self) -> Option<i32> {
            self.0
        }
    }

    #[derive(Default)]
    struct Beats(Vec<bool>);

    impl Heartbeat for Beats {
        fn show(&mut self, lit: bool) {
            self.0.push(lit);
        }
    }

    type Task = SensorTask<'static, MockBus, FixedTemp, FixedRssi, Beats, RecordingSink>;

    fn task(bus: MockBus, capacity: usize) -> (Task, SampleReceiver, SharedDisplay<RecordingSink>) {
        let (tx, rx) = sample_queue(capacity);
        let display = SharedDisplay::new(RecordingSink::default());
        let (_writer, flag) = connectivity();
        let task = SensorTask::new(
            SensorIo {
                bus,
                temperature: FixedTemp(Some(876)),
                link_quality: FixedRssi(Some(-58)),
                heartbeat: Beats::default(),
            },
            display.clone(),
            tx,
            flag,
            NetworkLabel {
                ssid: "lab",
                ip: None,
            },
            Uptime::start(),
        );
        (task, rx, display)
    }

    fn healthy_bus(cycles: usize) -> MockBus {
        let mut bus = MockBus::new();
        for _ in 0..cycles {
            bus.queue_read(I2C_ADDR_MPU6050, &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
            bus.queue_read(I2C_ADDR_BH1750, &[0x04, 0xB0]);
        }
        bus
    }

    #[test]
    fn cycle_decodes_enqueues_and_redraws() {
        let (mut task, rx, display) = task(healthy_bus(1), 5);

        let outcome = task.cycle();

        assert!(outcome.queued);
        assert_eq!(outcome.sample.accel, Acceleration { x: 258, y: 772, z: 1286 });
        assert!((outcome.sample.lux - 1000.0).abs() < 0.001);
        assert!((outcome.sample.temp_c - 27.0).abs() < 1.0);
        assert_eq!(rx.try_receive(), Some(outcome.sample));

        let frames = display.with_sink(|s| s.frames());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0], "WiFi: offline");
        assert_eq!(frames[0][1], "IP: --");
        assert!(frames[0][2].starts_with("Lux:1000 T:27."));
        assert_eq!(frames[0][3], "RSSI:-- Up:0s");
    }

    #[test]
    fn online_cycle_reports_signal_and_network() {
        let (writer, flag) = connectivity();
        let mut delay = RecordingDelay::default();
        let mut sup = LinkSupervisor::new(
            ScriptedRadio::default(),
            SharedDisplay::new(RecordingSink::default()),
            &mut delay,
            writer,
            Credentials::new("lab", "pw"),
        );
        assert_eq!(sup.run().state, LinkState::Connected);

        let (tx, rx) = sample_queue(5);
        let display = SharedDisplay::new(RecordingSink::default());
        let mut task = SensorTask::new(
            SensorIo {
                bus: healthy_bus(1),
                temperature: FixedTemp(Some(876)),
                link_quality: FixedRssi(Some(-58)),
                heartbeat: Beats::default(),
            },
            display.clone(),
            tx,
            flag,
            NetworkLabel {
                ssid: "lab",
                ip: Some(Ipv4Addr::new(10, 0, 0, 7)),
            },
            Uptime::start(),
        );

        let outcome = task.cycle();

        assert_eq!(outcome.sample.rssi, -58);
        assert_eq!(rx.try_receive().map(|s| s.rssi), Some(-58));
        let frames = display.with_sink(|s| s.frames());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0], "WiFi: lab");
        assert_eq!(frames[0][1], "IP:10.0.0.7");
        assert!(frames[0][3].starts_with("RSSI:-58 Up:"));
    }

    #[test]
    fn offline_sample_carries_no_link_quality() {
        let (mut task, _rx, _display) = task(healthy_bus(1), 5);
        assert_eq!(task.cycle().sample.rssi, 0);
    }

    #[test]
    fn failed_reads_degrade_fields_but_cycle_completes() {
        let mut bus = MockBus::new();
        bus.queue_read_error(I2C_ADDR_MPU6050, BusError::Timeout);
        bus.queue_read(I2C_ADDR_BH1750, &[0x04]);
        let (mut task, rx, display) = task(bus, 5);

        let outcome = task.cycle();

        assert_eq!(outcome.sample.accel, Acceleration::default());
        assert_eq!(outcome.sample.lux, 0.0);
        assert!(outcome.queued);
        assert!(rx.try_receive().is_some());
        assert_eq!(display.with_sink(|s| s.frames().len()), 1);
    }

    #[test]
    fn full_queue_drops_sample_without_skipping_display() {
        let (mut task, rx, display) = task(healthy_bus(3), 2);

        let queued: Vec<bool> = (0..3).map(|_| task.cycle().queued).collect();

        assert_eq!(queued, [true, true, false]);
        assert_eq!(display.with_sink(|s| s.frames().len()), 3);
        assert!(rx.try_receive().is_some());
        assert!(rx.try_receive().is_some());
        assert!(rx.try_receive().is_none());
    }

    #[test]
    fn heartbeat_alternates_each_cycle() {
        let (mut task, _rx, _display) = task(healthy_bus(4), 5);
        for _ in 0..4 {
            task.cycle();
        }
        assert_eq!(task.io.heartbeat.0, [true, false, true, false]);
    }

    #[test]
    fn wake_sends_both_init_commands() {
        let (mut task, _rx, _display) = task(MockBus::new(), 5);
        task.wake_sensors();
        assert_eq!(task.io.bus.writes_to(I2C_ADDR_MPU6050), vec![vec![0x6B, 0x00]]);
        assert_eq!(task.io.bus.writes_to(I2C_ADDR_BH1750), vec![vec![0x01], vec![0x10]]);
    }

    #[test]
    fn online_status_names_network_and_signal() {
        let sample = Sample {
            lux: 250.4,
            temp_c: f32::NAN,
            rssi: -58,
            uptime_s: 12,
            ..Default::default()
        };
        let network = NetworkLabel {
            ssid: "lab",
            ip: Some(Ipv4Addr::new(10, 0, 0, 7)),
        };

        let frame = compose_status(&sample, &network, true);

        let lines: Vec<&str> = frame.lines().collect();
        assert_eq!(lines, ["WiFi: lab", "IP:10.0.0.7", "Lux:250 T:--", "RSSI:-58 Up:12s"]);
    }
}
