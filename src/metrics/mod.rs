//! Pure result aggregation plus the live latency histogram used for stress
//! progress.
mod aggregate;
mod histogram;


pub use aggregate::{
    Aggregate, ErrorTally, MAX_ERROR_SAMPLES, TimingStats, aggregate, batch_summary,
    classify_error, percentile, percentiles,
};
pub use histogram::LatencyHistogram;
