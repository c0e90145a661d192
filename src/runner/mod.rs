//! Multi-request drivers: concurrency-bounded batches and sustained-rate
//! stress runs, plus the progress stream they report through.
mod batch;
mod progress;
mod rate;
mod stress;


use tokio_util::sync::CancellationToken;

pub use batch::BatchRunner;
pub use progress::{DEFAULT_PROGRESS_CAPACITY, ProgressEvent, ProgressSender};
pub use rate::WavePlanner;
pub use stress::StressRunner;

/// Tokens a runner watches between suspension points.
///
/// `stop` ends a run gracefully: no new work starts and in-flight requests
/// settle. `abort` is the run's cancellation token; every request dispatched
/// by the run is a child of it.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    pub stop: CancellationToken,
    pub abort: CancellationToken,
}

impl RunControl {
    #[must_use]
    pub const fn new(stop: CancellationToken, abort: CancellationToken) -> Self {
        Self { stop, abort }
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.stop.is_cancelled() || self.abort.is_cancelled()
    }
}
