//! # Telemetry Module
//!
//! Handles telemetry logging to JSONL files with rotation.
//!
//! This module handles:
//! - Building one record per logged control cycle
//! - Formatting as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Retaining only the last N files
//!
//! The control loop never blocks on disk: records go through a bounded
//! channel to a writer running on the blocking pool, and are dropped when
//! the channel is full.

pub mod logger;
pub mod types;

pub use logger::TelemetryLogger;
pub use types::CycleRecord;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Records buffered between the control loop and the writer.
pub const CHANNEL_CAPACITY: usize = 256;

/// Control-loop side of the telemetry channel.
#[derive(Debug)]
pub struct TelemetrySink {
    tx: mpsc::Sender<CycleRecord>,
    dropped: u64,
}

impl TelemetrySink {
    /// Queues a record without waiting.
    pub fn record(&mut self, record: CycleRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                debug!("Telemetry channel full, record dropped ({} total)", self.dropped);
            }
            Err(TrySendError::Closed(_)) => {
                if self.dropped == 0 {
                    warn!("Telemetry writer stopped, records are discarded");
                }
                self.dropped += 1;
            }
        }
    }

    /// Records that could not be queued.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Starts the writer and returns the sink feeding it.
///
/// The writer finishes once every sink has been dropped.
pub fn spawn(logger: TelemetryLogger, capacity: usize) -> (TelemetrySink, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<CycleRecord>(capacity.max(1));

    let handle = tokio::task::spawn_blocking(move || {
        let mut logger = logger;
        let mut written: u64 = 0;

        while let Some(record) = rx.blocking_recv() {
            match logger.write(&record) {
                Ok(()) => written += 1,
                Err(e) => warn!("Telemetry write failed: {}", e),
            }
        }

        if let Err(e) = logger.flush() {
            warn!("Telemetry flush failed: {}", e);
        }
        info!("Telemetry writer stopped after {} records", written);
    });

    (TelemetrySink { tx, dropped: 0 }, handle)
}
