use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::cancel::InFlightRequest;
use crate::domain::{HttpMethod, TestResult};
use crate::error::TransportError;

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub endpoint: String,
    pub method: HttpMethod,
    pub url: String,
    pub status: u16,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryEntry {
    #[must_use]
    pub fn from_result(result: &TestResult) -> Self {
        Self {
            id: result.request_id.clone(),
            endpoint: result.endpoint.label().to_owned(),
            method: result.endpoint.method,
            url: result.endpoint.url.clone(),
            status: result.status,
            response_time_ms: result.response_time_ms,
            timestamp: result.timestamp,
            size: result.size,
            success: result.success,
            error: result.error.clone(),
        }
    }

    /// Entry for a request that was cancelled while still in flight.
    #[must_use]
    pub fn cancelled(request: &InFlightRequest) -> Self {
        let now = Utc::now();
        let elapsed = now
            .signed_duration_since(request.started_at)
            .num_milliseconds();
        Self {
            id: request.id.clone(),
            endpoint: request.endpoint.clone(),
            method: request.method,
            url: request.url.clone(),
            status: 0,
            response_time_ms: u64::try_from(elapsed).unwrap_or(0),
            timestamp: now,
            size: 0,
            success: false,
            error: Some(TransportError::Cancelled.to_string()),
        }
    }
}

/// Query over the history. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Substring of the endpoint label or URL.
    pub endpoint: Option<String>,
    pub method: Option<HttpMethod>,
    pub status: Option<u16>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl HistoryFilter {
    fn matches(&self, entry: &HistoryEntry) -> bool {
        if let Some(needle) = self.endpoint.as_deref()
            && !entry.endpoint.contains(needle)
            && !entry.url.contains(needle)
        {
            return false;
        }
        if self.method.is_some_and(|method| method != entry.method) {
            return false;
        }
        if self.status.is_some_and(|status| status != entry.status) {
            return false;
        }
        if self.since.is_some_and(|since| entry.timestamp < since) {
            return false;
        }
        true
    }
}

/// Bounded ring of settled requests, oldest evicted first.
#[derive(Debug)]
pub struct RequestHistoryStore {
    entries: Mutex<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl Default for RequestHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl RequestHistoryStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Matching entries ordered by timestamp, newest first.
    ///
    /// Entries settle out of order under concurrency, so the ring's insertion
    /// order is only the tie-break between equal timestamps.
    #[must_use]
    pub fn query(&self, filter: &HistoryFilter) -> Vec<HistoryEntry> {
        let mut matched: Vec<HistoryEntry> = {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .rev()
                .filter(|entry| filter.matches(entry))
                .cloned()
                .collect()
        };
        matched.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        matched
    }

    /// Every entry in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
