use serde_json::Value;

use super::transport::TransportResponse;
use crate::domain::{Endpoint, ValidationDetail};

/// Checks a received response against the endpoint's expectations.
///
/// Status passes on an exact match with `expected_status`, otherwise on any
/// 2xx. Expected headers must be present with equal values. An expected JSON
/// string is compared to the raw body; any other JSON value is compared
/// structurally against the body parsed as JSON.
#[must_use]
pub fn validate_response(response: &TransportResponse, endpoint: &Endpoint) -> ValidationDetail {
    let mut issues = Vec::new();

    let status_valid = match endpoint.expected_status {
        Some(expected) => {
            let matches = response.status == expected;
            if !matches {
                issues.push(format!(
                    "Expected status {}, got {}",
                    expected, response.status
                ));
            }
            matches
        }
        None => {
            let success = (200..300).contains(&response.status);
            if !success {
                issues.push(format!(
                    "Unexpected status {} (expected 2xx)",
                    response.status
                ));
            }
            success
        }
    };

    let mut headers_valid = true;
    for (name, expected) in &endpoint.expected_headers {
        match response.header(name) {
            Some(actual) if actual == expected => {}
            Some(actual) => {
                headers_valid = false;
                issues.push(format!(
                    "Header '{}' expected '{}', got '{}'",
                    name, expected, actual
                ));
            }
            None => {
                headers_valid = false;
                issues.push(format!(
                    "Header '{}' expected '{}', got <missing>",
                    name, expected
                ));
            }
        }
    }

    let body_valid = endpoint.expected_body.as_ref().is_none_or(|expected| {
        let matches = body_matches(expected, response.body.as_deref().unwrap_or_default());
        if !matches {
            issues.push("Response body did not match the expected body".to_owned());
        }
        matches
    });

    ValidationDetail {
        status_valid,
        headers_valid,
        body_valid,
        success: status_valid && headers_valid && body_valid,
        issues,
    }
}

fn body_matches(expected: &Value, body: &str) -> bool {
    match expected {
        Value::String(text) => text == body,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            serde_json::from_str::<Value>(body).is_ok_and(|actual| &actual == expected)
        }
    }
}
