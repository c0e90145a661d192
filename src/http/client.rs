use std::time::Duration;

use reqwest::{Client, redirect};
use tracing::error;

use crate::domain::RedirectPolicy;
use crate::error::HttpError;

pub const DEFAULT_USER_AGENT: &str = concat!("webprobe/", env!("CARGO_PKG_VERSION"));
/// Connect phase bound; the per-request timeout still caps the whole exchange.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client(policy: RedirectPolicy) -> Result<Client, HttpError> {
    let mut client_builder = Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(Some(POOL_IDLE_TIMEOUT));

    if !policy.follow || policy.max_redirects == 0 {
        client_builder = client_builder.redirect(redirect::Policy::none());
    } else {
        client_builder = client_builder.redirect(redirect::Policy::limited(policy.max_redirects));
    }

    match client_builder.build() {
        Ok(client) => Ok(client),
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            Err(HttpError::BuildClientFailed { source: e })
        }
    }
}
