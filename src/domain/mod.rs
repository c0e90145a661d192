//! Plain data shared by the executor, the runners, and the reports.
mod config;
mod endpoint;
mod outcome;
mod positive;
mod report;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

pub use config::{
    DEFAULT_BACKOFF_BASE, DEFAULT_CONCURRENCY, DEFAULT_MAX_REDIRECTS, DEFAULT_RETRIES,
    DEFAULT_TIMEOUT, RedirectPolicy, RunConfig, RunConfigBuilder, StressConfig,
    StressConfigBuilder,
};
pub use endpoint::{Endpoint, HttpMethod};
pub use outcome::{FailureKind, TestResult, ValidationDetail};
pub use positive::{PositiveU64, PositiveUsize};
pub use report::{
    BatchReport, BatchSummary, EngineStats, ErrorBucket, ErrorCategory, ErrorSample, Percentiles,
    Severity, SpeedGrade, StressReport, StressState,
};
