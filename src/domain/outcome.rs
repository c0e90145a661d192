use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::endpoint::Endpoint;

/// Per-dimension verdict of the response validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationDetail {
    pub status_valid: bool,
    pub headers_valid: bool,
    pub body_valid: bool,
    pub success: bool,
    pub issues: Vec<String>,
}

impl ValidationDetail {
    /// Detail recorded when no response was received at all.
    #[must_use]
    pub const fn failed() -> Self {
        Self {
            status_valid: false,
            headers_valid: false,
            body_valid: false,
            success: false,
            issues: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Timeout,
    Validation,
    Cancelled,
}

/// Outcome of one attempted request, retries included.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub request_id: String,
    pub endpoint: Endpoint,
    pub success: bool,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub response_time_ms: u64,
    pub size: u64,
    pub retries: u32,
    pub validation: ValidationDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.failure == Some(FailureKind::Cancelled)
    }
}
