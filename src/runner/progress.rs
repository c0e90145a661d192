use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::{Percentiles, StressState};

pub const DEFAULT_PROGRESS_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    BatchStarted {
        total: usize,
        groups: usize,
    },
    GroupCompleted {
        group: usize,
        groups: usize,
        completed: usize,
        total: usize,
    },
    BatchCompleted {
        total: u64,
        successful: u64,
        failed: u64,
        duration_ms: u64,
    },
    StressState {
        run_id: String,
        state: StressState,
    },
    StressProgress {
        run_id: String,
        elapsed_ms: u64,
        total_requests: u64,
        successful_requests: u64,
        failed_requests: u64,
        throttled_requests: u64,
        in_flight: usize,
        current_rps: f64,
        peak_rps: f64,
        percentiles: Percentiles,
    },
}

/// Publishing side of the progress stream.
///
/// Backed by a bounded broadcast channel: sending never waits, and a receiver
/// that falls behind loses the oldest events.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressSender {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_CAPACITY)
    }
}

impl ProgressSender {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ProgressEvent) {
        // No subscribers is the common case for library callers.
        drop(self.tx.send(event));
    }
}
