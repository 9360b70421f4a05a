// EnvStation — Telemetry Task
//
// Consumer.  Blocks on the sample queue and posts each sample to the
// collector over a fresh connection.  Delivery is at-most-once: offline
// samples are discarded, and a failed connect or send abandons that sample.
// Nothing is retried, buffered or requeued.

use core::fmt;
use std::io::{self, Read, Write};

use crate::config::*;
use crate::events::Sample;
use crate::link::Connectivity;
use crate::queue::SampleReceiver;
use crate::telemetry::{build_request, encode_payload, Collector, Connector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Link down; the sample was dropped without touching the network.
    Offline,
    /// Request written; `response_bytes` is the size of the first reply chunk.
    Sent { response_bytes: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    Encode,
    Connect(io::ErrorKind),
    Send(io::ErrorKind),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "request does not fit its buffer"),
            Self::Connect(kind) => write!(f, "connect failed ({:?})", kind),
            Self::Send(kind) => write!(f, "send failed ({:?})", kind),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Post one sample over a new connection, then close it.
pub fn deliver<C: Connector>(
    connector: &mut C,
    collector: &Collector<'_>,
    sample: &Sample,
) -> Result<usize, DeliveryError> {
    let payload = encode_payload(sample).map_err(|_| DeliveryError::Encode)?;
    let request = build_request(collector, &payload).map_err(|_| DeliveryError::Encode)?;

    log::debug!("Connecting to {}:{}...", collector.host, collector.port);
    let mut conn = connector
        .connect(collector)
        .map_err(|e| DeliveryError::Connect(e.kind()))?;

    let sent = conn
        .write_all(request.as_bytes())
        .and_then(|()| conn.flush())
        .map_err(|e| DeliveryError::Send(e.kind()));

    // The reply is not validated; it only tells us whether the collector
    // answered at all.
    let response_bytes = match sent {
        Ok(()) => {
            let mut rx_buf = [0u8; RESPONSE_CHUNK];
            conn.read(&mut rx_buf).unwrap_or(0)
        }
        Err(_) => 0,
    };
    drop(conn);

    sent.map(|()| response_bytes)
}

pub struct TelemetryTask<C> {
    connector: C,
    collector: Collector<'static>,
    connectivity: Connectivity,
    queue: SampleReceiver,
}

impl<C: Connector> TelemetryTask<C> {
    pub fn new(
        connector: C,
        collector: Collector<'static>,
        connectivity: Connectivity,
        queue: SampleReceiver,
    ) -> Self {
        Self {
            connector,
            collector,
            connectivity,
            queue,
        }
    }

    pub fn handle(&mut self, sample: &Sample) -> Result<Delivery, DeliveryError> {
        if !self.connectivity.is_up() {
            return Ok(Delivery::Offline);
        }
        let response_bytes = deliver(&mut self.connector, &self.collector, sample)?;
        Ok(Delivery::Sent { response_bytes })
    }

    /// Consume until every producer is gone.  In firmware that never
    /// happens, so this runs for the life of the system.
    pub fn run(mut self) {
        log::info!("Telemetry task started");

        while let Some(sample) = self.queue.receive(None) {
            log::debug!("Got sample from queue (lux {:.1})", sample.lux);
            match self.handle(&sample) {
                Ok(Delivery::Offline) => log::debug!("Link down; sample discarded"),
                Ok(Delivery::Sent { response_bytes }) => {
                    log::info!("Sample sent ({} reply bytes)", response_bytes)
                }
                Err(e) => log::warn!("Telemetry dropped sample: {}", e),
            }
        }

        log::warn!("Sample queue closed — exiting telemetry task");
    }
}
