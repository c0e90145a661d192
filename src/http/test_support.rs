use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::executor::RequestExecutor;
use super::transport::{Transport, TransportRequest, TransportResponse};
use crate::error::TransportError;
use crate::store::{CancellationRegistry, RequestHistoryStore};

type Responder =
    dyn Fn(&TransportRequest, usize) -> Result<TransportResponse, TransportError> + Send + Sync;

#[derive(Debug, Clone)]
pub(crate) struct CallRecord {
    pub request: TransportRequest,
    pub started: Instant,
    pub finished: Instant,
}

/// In-memory transport that answers from a closure after a fixed delay.
pub(crate) struct ScriptedTransport {
    responder: Box<Responder>,
    delay: Duration,
    calls: Mutex<Vec<CallRecord>>,
}

impl ScriptedTransport {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&TransportRequest, usize) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Self::new(move |_, _| Ok(response(status)))
    }

    pub(crate) fn failing(error: TransportError) -> Self {
        Self::new(move |_, _| Err(error.clone()))
    }

    pub(crate) const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<CallRecord> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let started = Instant::now();
        let index = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(CallRecord {
                request: request.clone(),
                started,
                finished: started,
            });
            calls.len().saturating_sub(1)
        };

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TransportError::Cancelled),
            () = tokio::time::sleep(self.delay) => (self.responder)(&request, index),
        };

        if let Some(call) = self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(index)
        {
            call.finished = Instant::now();
        }
        outcome
    }
}

pub(crate) fn response(status: u16) -> TransportResponse {
    TransportResponse {
        status,
        status_text: http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_owned(),
        headers: std::collections::BTreeMap::from([(
            "content-length".to_owned(),
            "2".to_owned(),
        )]),
        body: Some("ok".to_owned()),
    }
}

pub(crate) struct ExecutorHarness {
    pub transport: Arc<ScriptedTransport>,
    pub history: Arc<RequestHistoryStore>,
    pub registry: Arc<CancellationRegistry>,
    pub executor: RequestExecutor,
}

pub(crate) fn harness(transport: ScriptedTransport) -> ExecutorHarness {
    let transport = Arc::new(transport);
    let history = Arc::new(RequestHistoryStore::default());
    let registry = CancellationRegistry::new();
    let executor = RequestExecutor::new(transport.clone(), history.clone(), registry.clone());
    ExecutorHarness {
        transport,
        history,
        registry,
        executor,
    }
}

pub(crate) fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}
