use chrono::{DateTime, Utc};
use serde::Serialize;

use super::outcome::TestResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    Network,
    Dns,
    Ssl,
    NotFound,
    ServerError,
    Unauthorized,
    Forbidden,
    BadRequest,
    Connection,
    Unknown,
}

impl ErrorCategory {
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            ErrorCategory::Timeout | ErrorCategory::ServerError | ErrorCategory::Connection => {
                Severity::Critical
            }
            ErrorCategory::Ssl | ErrorCategory::Network | ErrorCategory::Dns => Severity::High,
            ErrorCategory::NotFound | ErrorCategory::Unauthorized | ErrorCategory::Forbidden => {
                Severity::Medium
            }
            ErrorCategory::BadRequest | ErrorCategory::Unknown => Severity::Low,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Network => "network",
            ErrorCategory::Dns => "dns",
            ErrorCategory::Ssl => "ssl",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::Unauthorized => "unauthorized",
            ErrorCategory::Forbidden => "forbidden",
            ErrorCategory::BadRequest => "bad_request",
            ErrorCategory::Connection => "connection",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Symbolic latency bucket for the average response time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedGrade {
    Fastest,
    Fast,
    Moderate,
    Normal,
    Slow,
    VerySlow,
}

impl SpeedGrade {
    #[must_use]
    pub const fn from_average_ms(average_ms: f64) -> Self {
        if average_ms < 100.0 {
            SpeedGrade::Fastest
        } else if average_ms < 500.0 {
            SpeedGrade::Fast
        } else if average_ms < 1000.0 {
            SpeedGrade::Moderate
        } else if average_ms < 2000.0 {
            SpeedGrade::Normal
        } else if average_ms < 5000.0 {
            SpeedGrade::Slow
        } else {
            SpeedGrade::VerySlow
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSample {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBucket {
    pub category: ErrorCategory,
    pub count: u64,
    pub severity: Severity,
    pub percentage: f64,
    pub samples: Vec<ErrorSample>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Percentiles {
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub success_rate: f64,
    pub speed_grade: SpeedGrade,
    pub total_errors: u64,
    pub critical_errors: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_tests: u64,
    pub successful_tests: u64,
    pub failed_tests: u64,
    pub average_response_time_ms: f64,
    pub min_response_time_ms: u64,
    pub max_response_time_ms: u64,
    pub total_data_bytes: u64,
    pub results: Vec<TestResult>,
    pub errors: Vec<ErrorBucket>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StressState {
    Idle,
    Ramping,
    Running,
    Draining,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StressReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub state: StressState,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cancelled_requests: u64,
    pub throttled_requests: u64,
    pub average_rps: f64,
    pub peak_rps: f64,
    pub average_response_time_ms: f64,
    pub min_response_time_ms: u64,
    pub max_response_time_ms: u64,
    pub total_data_bytes: u64,
    pub errors: Vec<ErrorBucket>,
    pub percentiles: Percentiles,
}

/// Engine-wide counters derived from the request history.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub min_response_time_ms: u64,
    pub max_response_time_ms: u64,
    pub average_response_time_ms: f64,
    pub active_requests: usize,
    pub history_size: usize,
}
