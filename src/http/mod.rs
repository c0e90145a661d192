//! Single-request execution: the transport boundary, response validation,
//! the retry state machine, and the executor that ties them together.
mod client;
mod executor;
mod retry;
mod transport;
mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::DEFAULT_USER_AGENT;
pub use executor::RequestExecutor;
pub use retry::{RetryPolicy, RetryStep};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use validator::validate_response;
