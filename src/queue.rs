// EnvStation — Sample Queue
//
// Bounded FIFO hand-off between the sensor task (producer) and the telemetry
// task (consumer).  The producer side never blocks: when the queue is full the
// newest sample is refused and the caller drops it.  The consumer side may
// block for as long as it likes.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::Duration;

use crate::events::Sample;

/// Create a queue holding at most `capacity` samples.
pub fn sample_queue(capacity: usize) -> (SampleSender, SampleReceiver) {
    // A zero-capacity sync_channel is a rendezvous, which would make every
    // try_send fail unless the consumer happens to be parked in recv.
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    (SampleSender { tx }, SampleReceiver { rx })
}

/// Producer half.
#[derive(Clone)]
pub struct SampleSender {
    tx: SyncSender<Sample>,
}

impl SampleSender {
    /// Enqueue without blocking.  Returns `false` when the queue is full or
    /// the consumer is gone; the sample is dropped in both cases.
    pub fn try_send(&self, sample: Sample) -> bool {
        match self.tx.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("Sample queue consumer gone; dropping sample");
                false
            }
        }
    }
}

/// Consumer half.
pub struct SampleReceiver {
    rx: Receiver<Sample>,
}

impl SampleReceiver {
    /// Block until a sample arrives or `timeout` elapses.  `None` waits
    /// forever.  Returns `None` on timeout, or once every producer is gone
    /// and the queue has been drained.
    pub fn receive(&self, timeout: Option<Duration>) -> Option<Sample> {
        match timeout {
            None => self.rx.recv().ok(),
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(sample) => Some(sample),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
            },
        }
    }

    /// Take the oldest sample if one is already queued.
    pub fn try_receive(&self) -> Option<Sample> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn sample(n: u32) -> Sample {
        Sample {
            uptime_s: n,
            ..Default::default()
        }
    }

    #[test]
    fn sixth_send_into_full_queue_is_refused() {
        let (tx, rx) = sample_queue(5);
        let started = Instant::now();

        let accepted: Vec<bool> = (0..6).map(|n| tx.try_send(sample(n))).collect();

        assert_eq!(accepted, [true, true, true, true, true, false]);
        assert!(started.elapsed() < Duration::from_millis(500));

        let held: Vec<u32> = std::iter::from_fn(|| rx.try_receive())
            .map(|s| s.uptime_s)
            .collect();
        assert_eq!(held, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn receive_frees_a_slot_for_the_producer() {
        let (tx, rx) = sample_queue(2);
        assert!(tx.try_send(sample(1)));
        assert!(tx.try_send(sample(2)));
        assert!(!tx.try_send(sample(3)));

        assert_eq!(rx.receive(None).map(|s| s.uptime_s), Some(1));
        assert!(tx.try_send(sample(4)));

        assert_eq!(rx.try_receive().map(|s| s.uptime_s), Some(2));
        assert_eq!(rx.try_receive().map(|s| s.uptime_s), Some(4));
        assert_eq!(rx.try_receive(), None);
    }

    #[test]
    fn receive_times_out_on_empty_queue() {
        let (_tx, rx) = sample_queue(5);
        assert_eq!(rx.receive(Some(Duration::from_millis(20))), None);
    }

    #[test]
    fn receive_returns_none_once_producers_are_gone() {
        let (tx, rx) = sample_queue(5);
        assert!(tx.try_send(sample(7)));
        drop(tx);

        assert_eq!(rx.receive(None).map(|s| s.uptime_s), Some(7));
        assert_eq!(rx.receive(None), None);
    }

    #[test]
    fn consumed_order_matches_accepted_order_under_contention() {
        let (tx, rx) = sample_queue(5);

        let (accepted, consumed) = thread::scope(|s| {
            let producer = s.spawn(move || {
                let mut accepted = Vec::new();
                for n in 0..500 {
                    if tx.try_send(sample(n)) {
                        accepted.push(n);
                    }
                    if n % 7 == 0 {
                        thread::yield_now();
                    }
                }
                accepted
            });
            let consumer = s.spawn(move || {
                let mut consumed = Vec::new();
                while let Some(s) = rx.receive(None) {
                    consumed.push(s.uptime_s);
                    if consumed.len() % 3 == 0 {
                        thread::sleep(Duration::from_micros(50));
                    }
                }
                consumed
            });
            (producer.join().unwrap(), consumer.join().unwrap())
        });

        assert!(!accepted.is_empty());
        assert_eq!(accepted, consumed);
    }
}
