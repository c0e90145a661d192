use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::retry::{RetryPolicy, RetryStep};
use super::transport::{Transport, TransportRequest, TransportResponse};
use super::validator::validate_response;
use crate::domain::{Endpoint, FailureKind, RunConfig, TestResult, ValidationDetail};
use crate::error::TransportError;
use crate::store::{CancellationRegistry, HistoryEntry, InFlightRequest, RequestHistoryStore};

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

/// Runs one request end to end: registration, dispatch with retries,
/// validation, and the history record.
///
/// `execute` never fails; every failure is encoded in the returned
/// [`TestResult`].
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    history: Arc<RequestHistoryStore>,
    registry: Arc<CancellationRegistry>,
}

impl RequestExecutor {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        history: Arc<RequestHistoryStore>,
        registry: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            transport,
            history,
            registry,
        }
    }

    pub async fn execute(
        &self,
        endpoint: &Endpoint,
        config: &RunConfig,
        run_token: &CancellationToken,
    ) -> TestResult {
        let request_id = next_request_id();
        let in_flight = InFlightRequest {
            id: request_id.clone(),
            endpoint: endpoint.label().to_owned(),
            method: endpoint.method,
            url: endpoint.url.clone(),
            started_at: Utc::now(),
        };
        let Some(guard) = self.registry.register(in_flight, run_token) else {
            debug!("Run cancelled before dispatch of {}", endpoint.label());
            return failed_result(request_id, endpoint, &TransportError::Cancelled, 0, 0);
        };

        let request = build_request(endpoint, config);
        let policy = RetryPolicy::new(
            endpoint.retries.unwrap_or_else(|| config.retries()),
            config.backoff_base(),
        );

        let started = Instant::now();
        let mut attempt: u32 = 0;
        let (settled, retries) = loop {
            let sent = self.transport.send(request.clone(), guard.token()).await;
            match policy.step(attempt, sent) {
                RetryStep::Settled { result, retries } => break (result, retries),
                RetryStep::Retry {
                    next_attempt,
                    delay,
                    error,
                } => {
                    warn!(
                        "Request {} to {} failed ({}), retry {}/{} in {}ms",
                        request_id,
                        endpoint.url,
                        error,
                        next_attempt,
                        policy.max_retries(),
                        delay.as_millis()
                    );
                    tokio::select! {
                        biased;
                        () = guard.token().cancelled() => {
                            break (Err(TransportError::Cancelled), attempt);
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt = next_attempt;
                }
            }
        };
        let elapsed_ms = duration_ms(started.elapsed());

        let result = match settled {
            Ok(response) => received_result(request_id, endpoint, response, elapsed_ms, retries),
            Err(error) => failed_result(request_id, endpoint, &error, elapsed_ms, retries),
        };

        let recorded = guard.complete(|| self.history.push(HistoryEntry::from_result(&result)));
        if !recorded {
            debug!("Request {} was drained before settling", result.request_id);
        }
        debug!(
            "{} {} settled: status={} success={} retries={} {}ms",
            endpoint.method, endpoint.url, result.status, result.success, result.retries, elapsed_ms
        );
        result
    }
}

fn next_request_id() -> String {
    let seq = REQUEST_SEQ.fetch_add(1, Ordering::Relaxed);
    format!(
        "req-{}-{}-{:04x}",
        Utc::now().timestamp_millis(),
        seq,
        rand::random::<u16>()
    )
}

fn build_request(endpoint: &Endpoint, config: &RunConfig) -> TransportRequest {
    let mut headers: BTreeMap<String, String> = config.headers().clone();
    for (name, value) in &endpoint.headers {
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        headers.insert(name.clone(), value.clone());
    }
    let body = if endpoint.method.allows_body() {
        endpoint.body.clone()
    } else {
        None
    };

    TransportRequest {
        method: endpoint.method,
        url: endpoint.url.clone(),
        headers,
        body,
        timeout: endpoint.timeout().unwrap_or_else(|| config.timeout()),
        redirect: config.redirect(),
    }
}

fn received_result(
    request_id: String,
    endpoint: &Endpoint,
    response: TransportResponse,
    elapsed_ms: u64,
    retries: u32,
) -> TestResult {
    let validation = validate_response(&response, endpoint);
    let success = validation.success;
    let error = if success {
        None
    } else {
        Some(format!(
            "HTTP {} {}: {}",
            response.status,
            response.status_text,
            validation.issues.join("; ")
        ))
    };
    let size = response.content_length();

    TestResult {
        request_id,
        endpoint: endpoint.clone(),
        success,
        status: response.status,
        status_text: response.status_text,
        headers: response.headers,
        body: response.body,
        response_time_ms: elapsed_ms,
        size,
        retries,
        validation,
        error,
        failure: (!success).then_some(FailureKind::Validation),
        timestamp: Utc::now(),
    }
}

fn failed_result(
    request_id: String,
    endpoint: &Endpoint,
    error: &TransportError,
    elapsed_ms: u64,
    retries: u32,
) -> TestResult {
    let failure = match error {
        TransportError::Cancelled => FailureKind::Cancelled,
        TransportError::Timeout { .. } => FailureKind::Timeout,
        TransportError::Dns { .. }
        | TransportError::Tls { .. }
        | TransportError::Connect { .. }
        | TransportError::Network { .. }
        | TransportError::InvalidRequest { .. } => FailureKind::Transport,
    };

    TestResult {
        request_id,
        endpoint: endpoint.clone(),
        success: false,
        status: 0,
        status_text: error.status_text().to_owned(),
        headers: BTreeMap::new(),
        body: None,
        response_time_ms: elapsed_ms,
        size: 0,
        retries,
        validation: ValidationDetail::failed(),
        error: Some(error.to_string()),
        failure: Some(failure),
        timestamp: Utc::now(),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
