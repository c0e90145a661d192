use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use super::RunControl;
use super::progress::{ProgressEvent, ProgressSender};
use super::rate::WavePlanner;
use crate::domain::{Endpoint, StressConfig, StressReport, StressState, TestResult};
use crate::http::RequestExecutor;
use crate::metrics::{ErrorTally, LatencyHistogram, TimingStats, percentiles};

/// Drives waves of requests at a target rate for a fixed duration.
#[derive(Clone)]
pub struct StressRunner {
    executor: RequestExecutor,
    progress: ProgressSender,
}

/// Running totals folded from settled requests.
struct StressTotals {
    total: u64,
    successful: u64,
    failed: u64,
    cancelled: u64,
    throttled: u64,
    bytes: u64,
    peak_rps: f64,
    latencies: Vec<u64>,
    errors: ErrorTally,
    histogram: Option<LatencyHistogram>,
}

impl StressTotals {
    fn new() -> Self {
        let histogram = match LatencyHistogram::new() {
            Ok(histogram) => Some(histogram),
            Err(err) => {
                warn!("Live percentiles disabled: {}", err);
                None
            }
        };
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            cancelled: 0,
            throttled: 0,
            bytes: 0,
            peak_rps: 0.0,
            latencies: Vec::new(),
            errors: ErrorTally::default(),
            histogram,
        }
    }

    fn settle(&mut self, joined: Result<TestResult, JoinError>) {
        let result = match joined {
            Ok(result) => result,
            Err(err) => {
                error!("Stress task failed to join: {}", err);
                return;
            }
        };
        self.total = self.total.saturating_add(1);
        self.bytes = self.bytes.saturating_add(result.size);
        if result.success {
            self.successful = self.successful.saturating_add(1);
        } else {
            self.failed = self.failed.saturating_add(1);
            self.errors.record(&result);
        }
        if result.is_cancelled() {
            self.cancelled = self.cancelled.saturating_add(1);
            return;
        }
        self.latencies.push(result.response_time_ms);
        if let Some(histogram) = self.histogram.as_mut()
            && let Err(err) = histogram.record(result.response_time_ms)
        {
            debug!("{}", err);
        }
    }
}

impl StressRunner {
    #[must_use]
    pub const fn new(executor: RequestExecutor, progress: ProgressSender) -> Self {
        Self { executor, progress }
    }

    pub async fn run(
        &self,
        endpoints: Arc<[Endpoint]>,
        config: Arc<StressConfig>,
        control: &RunControl,
    ) -> StressReport {
        let run_id = format!(
            "stress-{}-{:04x}",
            Utc::now().timestamp_millis(),
            rand::random::<u16>()
        );
        let started_at = Utc::now();
        let start = Instant::now();
        let mut state = StressState::Idle;
        self.emit_state(&run_id, state);

        let mut totals = StressTotals::new();
        if endpoints.is_empty() {
            warn!("Stress run {} has no endpoints", run_id);
            self.emit_state(&run_id, StressState::Completed);
            return build_report(run_id, started_at, start, totals);
        }

        let mut planner = WavePlanner::new(config.target_rps(), config.ramp_up());
        let tick = planner.tick();
        let cadence = tick.saturating_add(config.think_time());
        let tick_secs = tick.as_secs_f64();
        // `None` when the duration overflows the clock; only stop or abort end such a run.
        let deadline = start.checked_add(config.duration());
        let slots = Arc::new(Semaphore::new(
            config.max_concurrent().min(Semaphore::MAX_PERMITS),
        ));
        let run_config = Arc::new(config.run().clone());
        let mut tasks: JoinSet<TestResult> = JoinSet::new();
        let mut next_wave = start;
        let mut cursor: usize = 0;

        info!(
            "Stress run {} started: {} rps for {}ms over {} endpoints (tick {}ms)",
            run_id,
            config.target_rps(),
            config.duration().as_millis(),
            endpoints.len(),
            tick.as_millis()
        );

        loop {
            let wake = deadline.map_or(next_wave, |limit| next_wave.min(limit));
            tokio::select! {
                biased;
                () = control.abort.cancelled() => {
                    warn!("Stress run {} aborted", run_id);
                    break;
                }
                () = control.stop.cancelled() => {
                    info!("Stress run {} stopping", run_id);
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    totals.settle(joined);
                }
                () = sleep_until(wake) => {
                    let now = Instant::now();
                    if deadline.is_some_and(|limit| now >= limit) {
                        break;
                    }
                    let elapsed = now.saturating_duration_since(start);
                    let phase = if planner.is_ramping(elapsed) {
                        StressState::Ramping
                    } else {
                        StressState::Running
                    };
                    if phase != state {
                        state = phase;
                        self.emit_state(&run_id, state);
                    }

                    let tokens = planner.next_tokens(elapsed);
                    let mut dispatched: usize = 0;
                    for _ in 0..tokens {
                        let Ok(permit) = Arc::clone(&slots).try_acquire_owned() else {
                            totals.throttled = totals.throttled.saturating_add(1);
                            continue;
                        };
                        let Some(endpoint) = cursor
                            .checked_rem(endpoints.len())
                            .and_then(|index| endpoints.get(index))
                            .cloned()
                        else {
                            break;
                        };
                        cursor = cursor.wrapping_add(1);
                        let executor = self.executor.clone();
                        let run_config = Arc::clone(&run_config);
                        let token = control.abort.clone();
                        tasks.spawn(async move {
                            let result = executor.execute(&endpoint, &run_config, &token).await;
                            drop(permit);
                            result
                        });
                        dispatched = dispatched.saturating_add(1);
                    }

                    let current_rps = if tick_secs > 0.0 {
                        dispatched as f64 / tick_secs
                    } else {
                        0.0
                    };
                    if current_rps > totals.peak_rps {
                        totals.peak_rps = current_rps;
                    }
                    self.emit_progress(&run_id, start, &totals, tasks.len(), current_rps);
                    let Some(following) = next_wave.checked_add(cadence) else {
                        warn!("Stress run {} reached the end of the clock", run_id);
                        break;
                    };
                    next_wave = following;
                }
            }
        }

        self.emit_state(&run_id, StressState::Draining);
        debug!("Stress run {} draining {} requests", run_id, tasks.len());
        while let Some(joined) = tasks.join_next().await {
            totals.settle(joined);
        }
        self.emit_progress(&run_id, start, &totals, 0, 0.0);
        self.emit_state(&run_id, StressState::Completed);

        let report = build_report(run_id, started_at, start, totals);
        info!(
            "Stress run {} completed: {} requests ({} ok, {} throttled), avg {:.2} rps, peak {:.2} rps",
            report.run_id,
            report.total_requests,
            report.successful_requests,
            report.throttled_requests,
            report.average_rps,
            report.peak_rps
        );
        report
    }

    fn emit_state(&self, run_id: &str, state: StressState) {
        debug!("Stress run {} -> {:?}", run_id, state);
        self.progress.emit(ProgressEvent::StressState {
            run_id: run_id.to_owned(),
            state,
        });
    }

    fn emit_progress(
        &self,
        run_id: &str,
        start: Instant,
        totals: &StressTotals,
        in_flight: usize,
        current_rps: f64,
    ) {
        self.progress.emit(ProgressEvent::StressProgress {
            run_id: run_id.to_owned(),
            elapsed_ms: duration_ms(start.elapsed()),
            total_requests: totals.total,
            successful_requests: totals.successful,
            failed_requests: totals.failed,
            throttled_requests: totals.throttled,
            in_flight,
            current_rps,
            peak_rps: totals.peak_rps,
            percentiles: totals
                .histogram
                .as_ref()
                .map(LatencyHistogram::percentiles)
                .unwrap_or_default(),
        });
    }
}

fn build_report(
    run_id: String,
    started_at: chrono::DateTime<Utc>,
    start: Instant,
    totals: StressTotals,
) -> StressReport {
    let elapsed = start.elapsed();
    let elapsed_secs = elapsed.as_secs_f64();
    let average_rps = if elapsed_secs > 0.0 {
        totals.total as f64 / elapsed_secs
    } else {
        0.0
    };
    let timing = TimingStats::from_latencies(&totals.latencies);

    StressReport {
        run_id,
        started_at,
        duration_ms: duration_ms(elapsed),
        state: StressState::Completed,
        total_requests: totals.total,
        successful_requests: totals.successful,
        failed_requests: totals.failed,
        cancelled_requests: totals.cancelled,
        throttled_requests: totals.throttled,
        average_rps,
        peak_rps: totals.peak_rps,
        average_response_time_ms: timing.average_ms,
        min_response_time_ms: timing.min_ms,
        max_response_time_ms: timing.max_ms,
        total_data_bytes: totals.bytes,
        percentiles: percentiles(&totals.latencies),
        errors: totals.errors.finish(totals.total),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
