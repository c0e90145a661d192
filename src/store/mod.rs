//! Shared mutable state of the engine: request history, in-flight
//! cancellation handles, and the injected result cache.
mod cache;
mod cancel;
mod history;

#[cfg(test)]
mod tests;

pub use cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, ResultCache, fingerprint};
pub use cancel::{CancellationRegistry, InFlightGuard, InFlightRequest};
pub use history::{DEFAULT_HISTORY_CAPACITY, HistoryEntry, HistoryFilter, RequestHistoryStore};
