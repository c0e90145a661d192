//! The public face of the crate: one [`ProbeEngine`] owns the shared stores
//! and hands out runners per call.
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{
    BatchReport, EngineStats, Endpoint, RunConfig, StressConfig, StressReport, TestResult,
};
use crate::error::HttpError;
use crate::http::{ReqwestTransport, RequestExecutor, Transport};
use crate::metrics::TimingStats;
use crate::runner::{
    BatchRunner, DEFAULT_PROGRESS_CAPACITY, ProgressEvent, ProgressSender, RunControl,
    StressRunner,
};
use crate::store::{
    CancellationRegistry, DEFAULT_HISTORY_CAPACITY, HistoryEntry, HistoryFilter,
    InFlightRequest, RequestHistoryStore, ResultCache, fingerprint,
};

pub struct ProbeEngine {
    transport: Arc<dyn Transport>,
    executor: RequestExecutor,
    history: Arc<RequestHistoryStore>,
    registry: Arc<CancellationRegistry>,
    progress: ProgressSender,
    stop: Mutex<CancellationToken>,
    cache: Option<Arc<ResultCache<BatchReport>>>,
}

impl ProbeEngine {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::assemble(
            transport,
            DEFAULT_HISTORY_CAPACITY,
            ProgressSender::new(DEFAULT_PROGRESS_CAPACITY),
            None,
        )
    }

    /// Engine over the production HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn with_reqwest() -> Result<Self, HttpError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?)))
    }

    /// Serve repeated identical batches from `cache` until entries expire.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResultCache<BatchReport>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the progress channel; existing subscribers stop receiving.
    #[must_use]
    pub fn with_progress_capacity(self, capacity: usize) -> Self {
        Self::assemble(
            self.transport,
            self.history.capacity(),
            ProgressSender::new(capacity),
            self.cache,
        )
    }

    /// Replaces the history store with an empty one of `capacity` entries.
    #[must_use]
    pub fn with_history_capacity(self, capacity: usize) -> Self {
        Self::assemble(self.transport, capacity, self.progress, self.cache)
    }

    fn assemble(
        transport: Arc<dyn Transport>,
        history_capacity: usize,
        progress: ProgressSender,
        cache: Option<Arc<ResultCache<BatchReport>>>,
    ) -> Self {
        let history = Arc::new(RequestHistoryStore::new(history_capacity));
        let registry = CancellationRegistry::new();
        let executor = RequestExecutor::new(
            Arc::clone(&transport),
            Arc::clone(&history),
            Arc::clone(&registry),
        );
        Self {
            transport,
            executor,
            history,
            registry,
            progress,
            stop: Mutex::new(CancellationToken::new()),
            cache,
        }
    }

    fn control(&self) -> RunControl {
        let stop = self
            .stop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token();
        RunControl::new(stop, self.registry.run_token())
    }

    /// Checks every endpoint once, `config.concurrency()` at a time.
    pub async fn test_endpoints(&self, endpoints: &[Endpoint], config: &RunConfig) -> BatchReport {
        let key = fingerprint(endpoints, config);
        if let Some(cache) = self.cache.as_ref()
            && let Some(report) = cache.get(key)
        {
            debug!("Serving batch of {} endpoints from cache", endpoints.len());
            return report;
        }

        let control = self.control();
        let runner = BatchRunner::new(self.executor.clone(), self.progress.clone());
        let report = runner
            .run(Arc::from(endpoints), Arc::new(config.clone()), &control)
            .await;

        if let Some(cache) = self.cache.as_ref()
            && !control.is_halted()
        {
            cache.insert(key, report.clone());
        }
        report
    }

    pub async fn stress_test(&self, endpoints: &[Endpoint], config: &StressConfig) -> StressReport {
        let control = self.control();
        let runner = StressRunner::new(self.executor.clone(), self.progress.clone());
        runner
            .run(Arc::from(endpoints), Arc::new(config.clone()), &control)
            .await
    }

    /// GET each URL with no expectations beyond a 2xx status.
    pub async fn test_connectivity(&self, urls: &[String], config: &RunConfig) -> BatchReport {
        let endpoints: Vec<Endpoint> = urls.iter().map(Endpoint::get).collect();
        self.test_endpoints(&endpoints, config).await
    }

    pub async fn health_check(&self, endpoint: &Endpoint, config: &RunConfig) -> TestResult {
        let control = self.control();
        self.executor.execute(endpoint, config, &control.abort).await
    }

    /// Hard-cancels every in-flight request and every running run.
    ///
    /// Each drained request gets one unsuccessful history entry before this
    /// returns; none of them writes history afterwards. Returns how many
    /// requests were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained = self.registry.cancel_all();
        for request in &drained {
            self.history.push(HistoryEntry::cancelled(request));
        }
        info!("Cancelled {} in-flight requests", drained.len());
        drained.len()
    }

    /// Cancels one in-flight request. Returns false when it already settled.
    pub fn cancel(&self, request_id: &str) -> bool {
        let Some(request) = self.registry.cancel(request_id) else {
            return false;
        };
        self.history.push(HistoryEntry::cancelled(&request));
        true
    }

    /// Asks running batches and stress runs to stop starting new work and
    /// drain what is in flight.
    pub fn stop_runs(&self) {
        let mut stop = self.stop.lock().unwrap_or_else(PoisonError::into_inner);
        stop.cancel();
        *stop = CancellationToken::new();
        info!("Graceful stop requested");
    }

    #[must_use]
    pub fn active_request_count(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn in_flight(&self) -> Vec<InFlightRequest> {
        self.registry.in_flight()
    }

    #[must_use]
    pub fn query_history(&self, filter: &HistoryFilter) -> Vec<HistoryEntry> {
        self.history.query(filter)
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let entries = self.history.snapshot();
        let total = u64::try_from(entries.len()).unwrap_or(u64::MAX);
        let successful = u64::try_from(entries.iter().filter(|entry| entry.success).count())
            .unwrap_or(u64::MAX);
        let latencies: Vec<u64> = entries.iter().map(|entry| entry.response_time_ms).collect();
        let timing = TimingStats::from_latencies(&latencies);

        EngineStats {
            total_requests: total,
            successful_requests: successful,
            failed_requests: total.saturating_sub(successful),
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64 * 100.0
            },
            min_response_time_ms: timing.min_ms,
            max_response_time_ms: timing.max_ms,
            average_response_time_ms: timing.average_ms,
            active_requests: self.registry.len(),
            history_size: entries.len(),
        }
    }

    #[must_use]
    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }
}
