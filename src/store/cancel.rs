use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::HttpMethod;

/// What the registry knows about one in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InFlightRequest {
    pub id: String,
    pub endpoint: String,
    pub method: HttpMethod,
    pub url: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Handle {
    request: InFlightRequest,
    token: CancellationToken,
}

#[derive(Debug)]
struct RegistryState {
    root: CancellationToken,
    handles: HashMap<String, Handle>,
}

/// Maps in-flight request ids to their cancellation tokens.
///
/// The registry also owns the root token of the current generation. Run
/// tokens are children of the root, so [`CancellationRegistry::cancel_all`]
/// reaches runs as well as individual requests. A fresh root is installed on
/// every `cancel_all`, so later runs start uncancelled.
#[derive(Debug)]
pub struct CancellationRegistry {
    state: Mutex<RegistryState>,
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                root: CancellationToken::new(),
                handles: HashMap::new(),
            }),
        }
    }
}

impl CancellationRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Token for a new run in the current generation.
    #[must_use]
    pub fn run_token(&self) -> CancellationToken {
        self.lock().root.child_token()
    }

    /// Registers a request under `parent`.
    ///
    /// Returns `None` when `parent` is already cancelled. The check happens
    /// under the registry lock, so nothing registers from a generation that
    /// `cancel_all` has already swept.
    #[must_use]
    pub fn register(
        self: &Arc<Self>,
        request: InFlightRequest,
        parent: &CancellationToken,
    ) -> Option<InFlightGuard> {
        let mut state = self.lock();
        if parent.is_cancelled() {
            return None;
        }
        let token = parent.child_token();
        let id = request.id.clone();
        state.handles.insert(
            id.clone(),
            Handle {
                request,
                token: token.clone(),
            },
        );
        Some(InFlightGuard {
            registry: Arc::clone(self),
            id,
            token,
        })
    }

    /// Cancels one request. Returns its metadata when it was still in flight.
    pub fn cancel(&self, id: &str) -> Option<InFlightRequest> {
        let handle = self.lock().handles.remove(id)?;
        handle.token.cancel();
        debug!("Cancelled request {}", id);
        Some(handle.request)
    }

    /// Cancels the current generation and every registered request.
    ///
    /// Returns the requests that were drained, in no particular order.
    pub fn cancel_all(&self) -> Vec<InFlightRequest> {
        let mut state = self.lock();
        state.root.cancel();
        state.root = CancellationToken::new();
        let drained: Vec<InFlightRequest> = state
            .handles
            .drain()
            .map(|(_, handle)| {
                handle.token.cancel();
                handle.request
            })
            .collect();
        debug!("Cancelled {} in-flight requests", drained.len());
        drained
    }

    /// Runs `record` under the registry lock if `id` is still registered.
    ///
    /// Returns whether `record` ran. A request drained by `cancel_all` or
    /// `cancel` never runs it.
    pub fn complete<F>(&self, id: &str, record: F) -> bool
    where
        F: FnOnce(),
    {
        let state = self.lock();
        if !state.handles.contains_key(id) {
            return false;
        }
        record();
        drop(state);
        true
    }

    pub fn deregister(&self, id: &str) {
        self.lock().handles.remove(id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn in_flight(&self) -> Vec<InFlightRequest> {
        self.lock()
            .handles
            .values()
            .map(|handle| handle.request.clone())
            .collect()
    }
}

/// Keeps a request registered; deregisters it when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<CancellationRegistry>,
    id: String,
    token: CancellationToken,
}

impl InFlightGuard {
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// See [`CancellationRegistry::complete`].
    pub fn complete<F>(&self, record: F) -> bool
    where
        F: FnOnce(),
    {
        self.registry.complete(&self.id, record)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.deregister(&self.id);
    }
}
