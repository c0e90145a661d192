use thiserror::Error;

/// Failure of a single transport attempt.
///
/// The display text is what ends up in outcome error messages, so every
/// variant keeps the keyword the error classifier looks for.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("dns lookup failed: {message}")]
    Dns { message: String },
    #[error("ssl handshake failed: {message}")]
    Tls { message: String },
    #[error("connection failed: {message}")]
    Connect { message: String },
    #[error("network error: {message}")]
    Network { message: String },
    #[error("request cancelled")]
    Cancelled,
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl TransportError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout { .. }
            | TransportError::Dns { .. }
            | TransportError::Tls { .. }
            | TransportError::Connect { .. }
            | TransportError::Network { .. } => true,
            TransportError::Cancelled | TransportError::InvalidRequest { .. } => false,
        }
    }

    #[must_use]
    pub const fn status_text(&self) -> &'static str {
        match self {
            TransportError::Timeout { .. } => "Timeout",
            TransportError::Dns { .. } => "DNS Error",
            TransportError::Tls { .. } => "SSL Error",
            TransportError::Connect { .. } => "Connection Error",
            TransportError::Network { .. } => "Network Error",
            TransportError::Cancelled => "Cancelled",
            TransportError::InvalidRequest { .. } => "Invalid Request",
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}
