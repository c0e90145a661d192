use std::collections::BTreeMap;

use chrono::Utc;

use super::{Endpoint, FailureKind, TestResult, ValidationDetail};

pub(crate) fn success(url: &str, response_time_ms: u64) -> TestResult {
    TestResult {
        request_id: format!("req-test-{}", response_time_ms),
        endpoint: Endpoint::get(url),
        success: true,
        status: 200,
        status_text: "OK".to_owned(),
        headers: BTreeMap::new(),
        body: None,
        response_time_ms,
        size: 10,
        retries: 0,
        validation: ValidationDetail {
            status_valid: true,
            headers_valid: true,
            body_valid: true,
            success: true,
            issues: Vec::new(),
        },
        error: None,
        failure: None,
        timestamp: Utc::now(),
    }
}

pub(crate) fn failure(url: &str, response_time_ms: u64, kind: FailureKind, error: &str) -> TestResult {
    TestResult {
        success: false,
        status: 0,
        status_text: String::new(),
        size: 0,
        validation: ValidationDetail::failed(),
        error: Some(error.to_owned()),
        failure: Some(kind),
        ..success(url, response_time_ms)
    }
}
