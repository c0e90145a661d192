use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::client::build_client;
use crate::domain::{HttpMethod, RedirectPolicy};
use crate::error::{HttpError, TransportError};

/// Response bodies beyond this many bytes are truncated before validation.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Duration,
    pub redirect: RedirectPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl TransportResponse {
    /// Size announced by `content-length`, or 0 when absent or unparseable.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.headers
            .get("content-length")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// The HTTP collaborator the executor sends requests through.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request.
    ///
    /// Implementations must return [`TransportError::Cancelled`] promptly once
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns the transport failure class when no response was received.
    async fn send(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
///
/// Redirect handling is a client-level setting in `reqwest`, so one client is
/// kept per redirect policy.
pub struct ReqwestTransport {
    clients: Mutex<HashMap<RedirectPolicy, Client>>,
}

impl ReqwestTransport {
    /// Builds the transport and its default client.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, HttpError> {
        let policy = RedirectPolicy::default();
        let client = build_client(policy)?;
        Ok(Self {
            clients: Mutex::new(HashMap::from([(policy, client)])),
        })
    }

    fn client_for(&self, policy: RedirectPolicy) -> Result<Client, HttpError> {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(client) = clients.get(&policy) {
            return Ok(client.clone());
        }
        let client = build_client(policy)?;
        clients.insert(policy, client.clone());
        Ok(client)
    }

    async fn dispatch(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let timeout = request.timeout;
        let client =
            self.client_for(request.redirect)
                .map_err(|err| TransportError::InvalidRequest {
                    message: err.to_string(),
                })?;

        let mut builder = client
            .request(request.method.to_method(), &request.url)
            .timeout(timeout);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| classify_reqwest_error(&err, timeout))?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_owned();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = if request.method == HttpMethod::Head {
            None
        } else {
            Some(read_body(response, timeout).await?)
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.dispatch(request) => result,
        }
    }
}

async fn read_body(response: reqwest::Response, timeout: Duration) -> Result<String, TransportError> {
    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|err| classify_reqwest_error(&err, timeout))?;
        let room = MAX_BODY_BYTES.saturating_sub(buffer.len());
        if room == 0 {
            continue;
        }
        let take = room.min(bytes.len());
        if let Some(head) = bytes.get(..take) {
            buffer.extend_from_slice(head);
        }
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub(crate) fn classify_reqwest_error(err: &reqwest::Error, timeout: Duration) -> TransportError {
    let message = error_chain(err);
    debug!("Transport error: {}", message);
    if err.is_timeout() {
        return TransportError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };
    }
    if err.is_builder() {
        return TransportError::InvalidRequest { message };
    }
    if err.is_connect() {
        return classify_connect_failure(message);
    }
    TransportError::Network { message }
}

pub(crate) fn classify_connect_failure(message: String) -> TransportError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("dns")
        || lowered.contains("failed to lookup")
        || lowered.contains("name or service not known")
        || lowered.contains("no such host")
    {
        return TransportError::Dns { message };
    }
    if lowered.contains("certificate")
        || lowered.contains("tls")
        || lowered.contains("ssl")
        || lowered.contains("handshake")
    {
        return TransportError::Tls { message };
    }
    TransportError::Connect { message }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}
