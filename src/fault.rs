// EnvStation — Fatal Fault Supervisor
//
// Recoverable faults are absorbed where they happen.  Anything that leaves a
// task stack or the heap in doubt is fatal: the system moves to `Halted` and
// stays there.  The firmware's main thread watches for that state and plays
// the failure pattern forever; it never resumes the pipeline.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::*;
use crate::drivers::alert::{AlertDriver, AlertOutput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalFault {
    /// A task could not be spawned.  Heap exhaustion inside a task aborts
    /// through the allocator and never reaches the panic hook.
    AllocationExhausted { what: String },
    /// An `assert!` failed somewhere.
    AssertionFailed { task: String, message: String },
    /// Any other panic; the task that raised it is gone.
    TaskPanicked { task: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemState {
    Running,
    Halted(FatalFault),
}

#[derive(Debug, Clone)]
pub struct SystemSupervisor {
    state: Arc<Mutex<SystemState>>,
}

impl Default for SystemSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSupervisor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SystemState::Running)),
        }
    }

    pub fn state(&self) -> SystemState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state(), SystemState::Halted(_))
    }

    /// Enter `Halted`.  The first fault wins; later ones are only logged.
    pub fn halt(&self, fault: FatalFault) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            SystemState::Running => {
                log::error!("FATAL: {:?} — halting", fault);
                *state = SystemState::Halted(fault);
            }
            SystemState::Halted(first) => {
                log::error!("Further fault while halted ({:?}); keeping {:?}", fault, first);
            }
        }
    }

    /// Route panics from every task into `halt`.
    pub fn install_panic_hook(&self) {
        let supervisor = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            previous(info);
            let thread = std::thread::current();
            let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
                (*s).to_owned()
            } else if let Some(s) = info.payload().downcast_ref::<String>() {
                s.clone()
            } else {
                String::from("<non-string panic>")
            };
            supervisor.halt(fault_from_panic(thread.name(), &message));
        }));
    }

    /// Block until the system halts.  `poll` bounds how late the failure
    /// pattern may start.
    pub fn wait_for_halt(&self, poll: Duration) -> FatalFault {
        loop {
            if let SystemState::Halted(fault) = self.state() {
                return fault;
            }
            std::thread::sleep(poll);
        }
    }

    /// Terminal behaviour: signal the failure pattern forever.
    pub fn signal_halt_forever<O: AlertOutput>(&self, alert: &mut AlertDriver<O>) -> ! {
        loop {
            alert.play(ALERT_HALTED);
        }
    }
}

/// Classify a panic raised on the thread named `task`.
pub fn fault_from_panic(task: Option<&str>, message: &str) -> FatalFault {
    let task = task.unwrap_or("<unnamed>").to_owned();
    if message.starts_with("assertion") {
        FatalFault::AssertionFailed {
            task,
            message: message.to_owned(),
        }
    } else {
        FatalFault::TaskPanicked {
            task,
            message: message.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running_and_halts_on_first_fault() {
        let sup = SystemSupervisor::new();
        assert_eq!(sup.state(), SystemState::Running);

        let first = FatalFault::AllocationExhausted {
            what: "sensor".into(),
        };
        sup.halt(first.clone());
        sup.halt(fault_from_panic(Some("telemetry"), "boom"));

        assert!(sup.is_halted());
        assert_eq!(sup.state(), SystemState::Halted(first.clone()));
        assert_eq!(sup.wait_for_halt(Duration::from_millis(1)), first);
    }

    #[test]
    fn halt_is_visible_through_clones() {
        let sup = SystemSupervisor::new();
        let watcher = sup.clone();

        std::thread::spawn(move || sup.halt(fault_from_panic(None, "x")))
            .join()
            .unwrap();

        assert!(matches!(
            watcher.wait_for_halt(Duration::from_millis(1)),
            FatalFault::TaskPanicked { .. }
        ));
    }

    #[test]
    fn panics_are_classified() {
        assert!(matches!(
            fault_from_panic(Some("sensor"), "assertion failed: n < 5"),
            FatalFault::AssertionFailed { ref task, .. } if task == "sensor"
        ));
        assert!(matches!(
            fault_from_panic(Some("telemetry"), "memory allocation of 4096 bytes failed"),
            FatalFault::TaskPanicked { ref task, .. } if task == "telemetry"
        ));
        assert_eq!(
            fault_from_panic(None, "index out of bounds"),
            FatalFault::TaskPanicked {
                task: "<unnamed>".into(),
                message: "index out of bounds".into()
            }
        );
    }
}
