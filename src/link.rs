// EnvStation — Wireless Link Supervisor
//
// Runs once at boot, before the pipeline tasks exist:
//
//   Idle ──init ok──▶ Associating(1) ──ok──▶ Connected
//     │                   │  ▲
//     │ init failed       │  └── failed, attempts left: wait, retry
//     ▼                   ▼
//   Degraded ◀──── attempts exhausted
//
// Connected and Degraded are terminal for the boot session; a later link
// drop is neither detected nor recovered.  The connectivity flag is written
// here and nowhere else.

use core::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Delay;
use crate::config::*;
use crate::display::{DisplaySink, SharedDisplay, StatusFrame};

// ---------------------------------------------------------------------------
// Connectivity flag
// ---------------------------------------------------------------------------

/// Create the flag, initially down.  The writer half goes to the supervisor;
/// the reader half is cloned into each task.
pub fn connectivity() -> (ConnectivityWriter, Connectivity) {
    let up = Arc::new(AtomicBool::new(false));
    (
        ConnectivityWriter {
            up: Arc::clone(&up),
        },
        Connectivity { up },
    )
}

#[derive(Debug, Clone)]
pub struct Connectivity {
    up: Arc<AtomicBool>,
}

impl Connectivity {
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct ConnectivityWriter {
    up: Arc<AtomicBool>,
}

impl ConnectivityWriter {
    fn mark_up(&self) {
        self.up.store(true, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Radio interface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    Init,
    StationMode,
    Association,
    Timeout,
    PowerManagement,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Self::Init => "radio init failed",
            Self::StationMode => "station mode unavailable",
            Self::Association => "association rejected",
            Self::Timeout => "association timed out",
            Self::PowerManagement => "power management refused",
        };
        f.write_str(what)
    }
}

impl std::error::Error for RadioError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Open,
    Wpa2Personal,
}

#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
    pub auth: AuthMethod,
}

impl<'a> Credentials<'a> {
    /// WPA2 when a password is given, open otherwise.
    pub fn new(ssid: &'a str, password: &'a str) -> Self {
        let auth = if password.is_empty() {
            AuthMethod::Open
        } else {
            AuthMethod::Wpa2Personal
        };
        Self {
            ssid,
            password,
            auth,
        }
    }
}

/// Station-mode radio.
pub trait Radio {
    fn init(&mut self) -> Result<(), RadioError>;
    fn enable_station(&mut self) -> Result<(), RadioError>;
    /// Join the network and wait for an address, giving up after `timeout`.
    fn associate(&mut self, credentials: &Credentials<'_>, timeout: Duration) -> Result<(), RadioError>;
    fn set_power_save(&mut self, enabled: bool) -> Result<(), RadioError>;
    fn ip_address(&self) -> Option<Ipv4Addr>;
}

/// Signal strength of the current association, in dBm.
pub trait LinkQuality {
    fn rssi(&self) -> Option<i32>;
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Bounded(u32),
    Unbounded,
}

impl RetryPolicy {
    fn exhausted(&self, attempts: u32) -> bool {
        match self {
            Self::Bounded(max) => attempts >= *max,
            Self::Unbounded => false,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        if cfg!(feature = "unbounded-retry") {
            Self::Unbounded
        } else {
            Self::Bounded(ASSOCIATION_MAX_ATTEMPTS)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedReason {
    RadioInit,
    RetriesExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Associating { attempt: u32 },
    Connected,
    Degraded(DegradedReason),
}

impl LinkState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected | Self::Degraded(_))
    }
}

/// Outcome handed to `main` once the supervisor is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkReport {
    pub state: LinkState,
    pub ip: Option<Ipv4Addr>,
    pub failed_attempts: u32,
}

pub struct LinkSupervisor<'c, R, S, D> {
    radio: R,
    display: SharedDisplay<S>,
    delay: D,
    writer: ConnectivityWriter,
    credentials: Credentials<'c>,
    policy: RetryPolicy,
    retry_delay: Duration,
    timeout: Duration,
    state: LinkState,
    failed_attempts: u32,
}

impl<'c, R: Radio, S: DisplaySink, D: Delay> LinkSupervisor<'c, R, S, D> {
    pub fn new(
        radio: R,
        display: SharedDisplay<S>,
        delay: D,
        writer: ConnectivityWriter,
        credentials: Credentials<'c>,
    ) -> Self {
        Self {
            radio,
            display,
            delay,
            writer,
            credentials,
            policy: RetryPolicy::default(),
            retry_delay: ASSOCIATION_RETRY_DELAY,
            timeout: ASSOCIATION_TIMEOUT,
            state: LinkState::Idle,
            failed_attempts: 0,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Drive the state machine until it reaches Connected or Degraded.
    pub fn run(&mut self) -> LinkReport {
        while !self.state.is_terminal() {
            self.step();
        }
        self.report()
    }

    pub fn report(&self) -> LinkReport {
        LinkReport {
            state: self.state,
            ip: match self.state {
                LinkState::Connected => self.radio.ip_address(),
                _ => None,
            },
            failed_attempts: self.failed_attempts,
        }
    }

    /// Release the radio so the caller can keep it alive for the session.
    pub fn into_radio(self) -> R {
        self.radio
    }

    /// Perform exactly one transition.  Terminal states stay put.
    pub fn step(&mut self) -> LinkState {
        self.state = match self.state {
            LinkState::Idle => self.bring_up(),
            LinkState::Associating { attempt } => self.associate(attempt),
            terminal => terminal,
        };
        self.state
    }

    fn bring_up(&mut self) -> LinkState {
        self.show(&["Init WiFi..."]);
        let ready = self.radio.init().and_then(|()| self.radio.enable_station());
        match ready {
            Ok(()) if self.policy.exhausted(0) => {
                log::error!("Retry bound is zero; not joining '{}'", self.credentials.ssid);
                self.show(&["Net ERR"]);
                LinkState::Degraded(DegradedReason::RetriesExhausted)
            }
            Ok(()) => {
                log::info!("Radio ready, joining '{}'", self.credentials.ssid);
                LinkState::Associating { attempt: 1 }
            }
            Err(e) => {
                log::error!("WiFi init failed: {}", e);
                self.show(&["WiFi Fail"]);
                LinkState::Degraded(DegradedReason::RadioInit)
            }
        }
    }

    fn associate(&mut self, attempt: u32) -> LinkState {
        let mut label = StatusFrame::new();
        match self.policy {
            RetryPolicy::Bounded(max) => {
                log::info!("Connecting... attempt {}/{}", attempt, max);
                label.push(format_args!("Try {}/{}...", attempt, max));
            }
            RetryPolicy::Unbounded => {
                log::info!("Connecting... attempt {}", attempt);
                label.push(format_args!("Try {}...", attempt));
            }
        }
        self.show_frame(&label);

        match self.radio.associate(&self.credentials, self.timeout) {
            Ok(()) => self.connected(),
            Err(e) => {
                self.failed_attempts += 1;
                log::warn!("Attempt {} failed: {}", attempt, e);
                if self.policy.exhausted(attempt) {
                    log::error!("WiFi connect failed (all {} attempts)", attempt);
                    self.show(&["Net ERR"]);
                    LinkState::Degraded(DegradedReason::RetriesExhausted)
                } else {
                    self.delay.delay(self.retry_delay);
                    LinkState::Associating {
                        attempt: attempt + 1,
                    }
                }
            }
        }
    }

    fn connected(&mut self) -> LinkState {
        // Power saving adds hundreds of ms of wake latency to every send.
        if let Err(e) = self.radio.set_power_save(false) {
            log::warn!("Could not disable power save: {}", e);
        }
        self.writer.mark_up();

        let mut frame = StatusFrame::new();
        frame.push(format_args!("Connected!"));
        match self.radio.ip_address() {
            Some(ip) => {
                log::info!("WiFi connected: {}", ip);
                frame.push(format_args!("IP:{}", ip));
            }
            None => log::info!("WiFi connected (no address reported)"),
        }
        self.show_frame(&frame);
        LinkState::Connected
    }

    fn show(&self, lines: &[&str]) {
        self.show_frame(&StatusFrame::from_lines(lines));
    }

    fn show_frame(&self, frame: &StatusFrame) {
        if let Err(e) = self.display.show(frame) {
            log::warn!("Display update failed: {:?}", e);
        }
    }
}
