// EnvStation — Time Sources
//
// `Uptime` is the monotonic seconds counter stamped into every sample.
// `Delay` is the suspension point used by the link supervisor and alert
// patterns, so tests can observe the requested waits instead of sleeping.

use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    boot: Instant,
}

impl Uptime {
    /// Start counting from now.  Create this first thing in `main`.
    pub fn start() -> Self {
        Self {
            boot: Instant::now(),
        }
    }

    pub fn secs(&self) -> u32 {
        self.boot.elapsed().as_secs().min(u32::MAX as u64) as u32
    }
}

pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Suspends the calling task; on ESP-IDF this is a FreeRTOS `vTaskDelay`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_starts_at_zero() {
        assert_eq!(Uptime::start().secs(), 0);
    }
}
