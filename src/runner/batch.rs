use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::RunControl;
use super::progress::{ProgressEvent, ProgressSender};
use crate::domain::{BatchReport, Endpoint, RunConfig, TestResult};
use crate::http::RequestExecutor;
use crate::metrics::{aggregate, batch_summary};

/// Runs endpoints in consecutive groups of `concurrency`.
///
/// Every member of a group is spawned at once and the whole group settles
/// before the next one starts.
#[derive(Clone)]
pub struct BatchRunner {
    executor: RequestExecutor,
    progress: ProgressSender,
}

impl BatchRunner {
    #[must_use]
    pub const fn new(executor: RequestExecutor, progress: ProgressSender) -> Self {
        Self { executor, progress }
    }

    /// Endpoints in groups that never started because the run was halted are
    /// left out of the report, as are tasks that failed to join.
    pub async fn run(
        &self,
        endpoints: Arc<[Endpoint]>,
        config: Arc<RunConfig>,
        control: &RunControl,
    ) -> BatchReport {
        let started_at = Utc::now();
        let started = Instant::now();
        let group_size = config.concurrency();
        let total = endpoints.len();
        let groups = total.div_ceil(group_size);
        info!(
            "Running {} endpoint checks in {} groups of up to {}",
            total, groups, group_size
        );
        self.progress.emit(ProgressEvent::BatchStarted { total, groups });

        let mut slots: Vec<Option<TestResult>> = vec![None; total];
        let indices: Vec<usize> = (0..total).collect();
        let mut completed: usize = 0;

        for (group, members) in indices.chunks(group_size).enumerate() {
            if control.is_halted() {
                warn!(
                    "Batch halted before group {}/{}; {} endpoints not dispatched",
                    group.saturating_add(1),
                    groups,
                    total.saturating_sub(completed)
                );
                break;
            }

            let mut tasks = JoinSet::new();
            for &index in members {
                let Some(endpoint) = endpoints.get(index).cloned() else {
                    continue;
                };
                let executor = self.executor.clone();
                let config = Arc::clone(&config);
                let token = control.abort.clone();
                tasks.spawn(async move {
                    let result = executor.execute(&endpoint, &config, &token).await;
                    (index, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, result)) => {
                        if let Some(slot) = slots.get_mut(index) {
                            *slot = Some(result);
                        }
                    }
                    Err(err) => error!("Batch task failed to join: {}", err),
                }
                completed = completed.saturating_add(1);
            }

            debug!("Group {}/{} settled", group.saturating_add(1), groups);
            self.progress.emit(ProgressEvent::GroupCompleted {
                group: group.saturating_add(1),
                groups,
                completed,
                total,
            });
        }

        let results: Vec<TestResult> = slots.into_iter().flatten().collect();
        let aggregate = aggregate(&results);
        let summary = batch_summary(&aggregate);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.progress.emit(ProgressEvent::BatchCompleted {
            total: aggregate.total,
            successful: aggregate.successful,
            failed: aggregate.failed,
            duration_ms,
        });
        info!(
            "Batch finished: {}/{} successful in {}ms",
            aggregate.successful, aggregate.total, duration_ms
        );

        BatchReport {
            started_at,
            duration_ms,
            total_tests: aggregate.total,
            successful_tests: aggregate.successful,
            failed_tests: aggregate.failed,
            average_response_time_ms: aggregate.timing.average_ms,
            min_response_time_ms: aggregate.timing.min_ms,
            max_response_time_ms: aggregate.timing.max_ms,
            total_data_bytes: aggregate.total_bytes,
            results,
            errors: aggregate.errors,
            summary,
        }
    }
}
