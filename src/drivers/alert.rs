// EnvStation — Alert Output Driver
//
// GPIO-driven active buzzer / indicator.  Patterns are (on, off) pairs in
// milliseconds; playing one blocks the calling task for its full length.

use std::time::Duration;

use crate::clock::{Delay, ThreadDelay};

/// A single on/off output line.
pub trait AlertOutput {
    fn set(&mut self, on: bool);
}

pub struct AlertDriver<O, D = ThreadDelay> {
    out: O,
    delay: D,
}

impl<O: AlertOutput> AlertDriver<O> {
    pub fn new(out: O) -> Self {
        Self::with_delay(out, ThreadDelay)
    }
}

impl<O: AlertOutput, D: Delay> AlertDriver<O, D> {
    pub fn with_delay(out: O, delay: D) -> Self {
        Self { out, delay }
    }

    /// Drive the output for `duration`, then release it.
    pub fn pulse(&mut self, duration: Duration) {
        self.out.set(true);
        self.delay.delay(duration);
        self.out.set(false);
    }

    pub fn play(&mut self, pattern: &[(u64, u64)]) {
        for &(on_ms, off_ms) in pattern {
            self.pulse(Duration::from_millis(on_ms));
            self.delay.delay(Duration::from_millis(off_ms));
        }
    }
}
