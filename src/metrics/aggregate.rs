use std::collections::BTreeMap;

use crate::domain::{
    BatchSummary, ErrorBucket, ErrorCategory, ErrorSample, Percentiles, Severity, SpeedGrade,
    TestResult,
};

/// Evidence samples kept per error category.
pub const MAX_ERROR_SAMPLES: usize = 5;

/// Ordered substring rules; the first match wins.
const CLASSIFIER_RULES: &[(&[&str], ErrorCategory)] = &[
    (&["timeout"], ErrorCategory::Timeout),
    (&["network"], ErrorCategory::Network),
    (&["dns"], ErrorCategory::Dns),
    (&["ssl", "certificate"], ErrorCategory::Ssl),
    (&["404"], ErrorCategory::NotFound),
    (&["500"], ErrorCategory::ServerError),
    (&["401"], ErrorCategory::Unauthorized),
    (&["403"], ErrorCategory::Forbidden),
    (&["400"], ErrorCategory::BadRequest),
    (&["connection"], ErrorCategory::Connection),
];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingStats {
    pub average_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl TimingStats {
    /// Mean and extremes over `latencies`; all zero when empty.
    #[must_use]
    pub fn from_latencies(latencies: &[u64]) -> Self {
        let (Some(min_ms), Some(max_ms)) = (
            latencies.iter().copied().min(),
            latencies.iter().copied().max(),
        ) else {
            return Self::default();
        };
        let sum: u128 = latencies.iter().map(|value| u128::from(*value)).sum();
        Self {
            average_ms: sum as f64 / latencies.len() as f64,
            min_ms,
            max_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub total_bytes: u64,
    /// Covers only outcomes that were not cancelled.
    pub timing: TimingStats,
    pub errors: Vec<ErrorBucket>,
}

#[must_use]
pub fn aggregate(results: &[TestResult]) -> Aggregate {
    let mut tally = ErrorTally::default();
    let mut successful: u64 = 0;
    let mut cancelled: u64 = 0;
    let mut total_bytes: u64 = 0;
    let mut latencies = Vec::with_capacity(results.len());

    for result in results {
        total_bytes = total_bytes.saturating_add(result.size);
        if result.success {
            successful = successful.saturating_add(1);
        } else {
            tally.record(result);
        }
        if result.is_cancelled() {
            cancelled = cancelled.saturating_add(1);
        } else {
            latencies.push(result.response_time_ms);
        }
    }

    let total = u64::try_from(results.len()).unwrap_or(u64::MAX);
    Aggregate {
        total,
        successful,
        failed: total.saturating_sub(successful),
        cancelled,
        total_bytes,
        timing: TimingStats::from_latencies(&latencies),
        errors: tally.finish(total),
    }
}

#[must_use]
pub fn batch_summary(aggregate: &Aggregate) -> BatchSummary {
    let success_rate = if aggregate.total == 0 {
        0.0
    } else {
        aggregate.successful as f64 / aggregate.total as f64 * 100.0
    };
    let total_errors = aggregate.errors.iter().map(|bucket| bucket.count).sum();
    let critical_errors = aggregate
        .errors
        .iter()
        .filter(|bucket| bucket.severity == Severity::Critical)
        .map(|bucket| bucket.count)
        .sum();
    BatchSummary {
        success_rate,
        speed_grade: SpeedGrade::from_average_ms(aggregate.timing.average_ms),
        total_errors,
        critical_errors,
    }
}

/// Nearest-rank percentile of an ascending slice.
///
/// Uses `index = ceil(p/100 * n) - 1`, clamped to the slice. Returns 0 for an
/// empty slice.
#[must_use]
pub fn percentile(sorted: &[u64], p: u32) -> u64 {
    let n = sorted.len();
    if n == 0 {
        return 0;
    }
    let rank = u128::from(p)
        .saturating_mul(u128::try_from(n).unwrap_or(u128::MAX))
        .div_ceil(100);
    let index = usize::try_from(rank)
        .unwrap_or(usize::MAX)
        .saturating_sub(1)
        .min(n.saturating_sub(1));
    sorted.get(index).copied().unwrap_or(0)
}

/// p50/p90/p95/p99 over an unsorted set of latencies.
#[must_use]
pub fn percentiles(latencies: &[u64]) -> Percentiles {
    let mut sorted = latencies.to_vec();
    sorted.sort_unstable();
    Percentiles {
        p50: percentile(&sorted, 50),
        p90: percentile(&sorted, 90),
        p95: percentile(&sorted, 95),
        p99: percentile(&sorted, 99),
    }
}

#[must_use]
pub fn classify_error(message: &str) -> ErrorCategory {
    let lowered = message.to_lowercase();
    CLASSIFIER_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lowered.contains(needle)))
        .map_or(ErrorCategory::Unknown, |(_, category)| *category)
}

#[derive(Debug, Default)]
struct Tally {
    count: u64,
    samples: Vec<ErrorSample>,
}

/// Running error buckets. Percentages are only known once the total is.
#[derive(Debug, Default)]
pub struct ErrorTally {
    buckets: BTreeMap<ErrorCategory, Tally>,
}

impl ErrorTally {
    pub fn record(&mut self, result: &TestResult) {
        let message = result.error.clone().unwrap_or_else(|| result.status_text.clone());
        let tally = self
            .buckets
            .entry(classify_error(&message))
            .or_default();
        tally.count = tally.count.saturating_add(1);
        if tally.samples.len() < MAX_ERROR_SAMPLES {
            tally.samples.push(ErrorSample {
                timestamp: result.timestamp,
                message,
                url: result.endpoint.url.clone(),
            });
        }
    }

    /// Buckets ordered by count, largest first.
    #[must_use]
    pub fn finish(self, total_requests: u64) -> Vec<ErrorBucket> {
        let mut buckets: Vec<ErrorBucket> = self
            .buckets
            .into_iter()
            .map(|(category, tally)| ErrorBucket {
                category,
                count: tally.count,
                severity: category.severity(),
                percentage: if total_requests == 0 {
                    0.0
                } else {
                    tally.count as f64 / total_requests as f64 * 100.0
                },
                samples: tally.samples,
            })
            .collect();
        buckets.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));
        buckets
    }
}
