use super::*;
use crate::domain::{Endpoint, HttpMethod, RunConfig};
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn entry(id: usize, endpoint: &str, status: u16) -> HistoryEntry {
    HistoryEntry {
        id: format!("req-{}", id),
        endpoint: endpoint.to_owned(),
        method: HttpMethod::Get,
        url: format!("http://localhost/{}", endpoint),
        status,
        response_time_ms: 5,
        timestamp: Utc::now(),
        size: 0,
        success: status == 200,
        error: None,
    }
}

fn in_flight(id: &str) -> InFlightRequest {
    InFlightRequest {
        id: id.to_owned(),
        endpoint: "api".to_owned(),
        method: HttpMethod::Get,
        url: "http://localhost/api".to_owned(),
        started_at: Utc::now(),
    }
}

#[test]
fn history_evicts_oldest_beyond_capacity() -> Result<(), String> {
    let store = RequestHistoryStore::default();
    for id in 0..1005 {
        store.push(entry(id, "api", 200));
    }
    if store.len() != DEFAULT_HISTORY_CAPACITY {
        return Err(format!("Unexpected history length {}", store.len()));
    }
    let snapshot = store.snapshot();
    let first = snapshot.first().ok_or("Missing first entry")?;
    if first.id != "req-5" {
        return Err(format!("Expected req-5 to be oldest, got {}", first.id));
    }
    let last = snapshot.last().ok_or("Missing last entry")?;
    if last.id != "req-1004" {
        return Err(format!("Expected req-1004 to be newest, got {}", last.id));
    }
    Ok(())
}

#[test]
fn history_query_filters_newest_first_with_limit() -> Result<(), String> {
    let store = RequestHistoryStore::new(10);
    store.push(entry(1, "users", 200));
    store.push(entry(2, "orders", 404));
    store.push(entry(3, "users", 404));
    store.push(entry(4, "users", 200));

    let users = store.query(&HistoryFilter {
        endpoint: Some("users".to_owned()),
        ..HistoryFilter::default()
    });
    let ids: Vec<&str> = users.iter().map(|entry| entry.id.as_str()).collect();
    if ids != ["req-4", "req-3", "req-1"] {
        return Err(format!("Unexpected order {:?}", ids));
    }

    let not_found = store.query(&HistoryFilter {
        status: Some(404),
        limit: Some(1),
        ..HistoryFilter::default()
    });
    if not_found.len() != 1 || not_found.first().map(|entry| entry.id.as_str()) != Some("req-3") {
        return Err(format!("Unexpected 404 query {:?}", not_found));
    }

    let future = store.query(&HistoryFilter {
        since: Utc::now().checked_add_signed(ChronoDuration::hours(1)),
        ..HistoryFilter::default()
    });
    if !future.is_empty() {
        return Err("Expected no entries after a future timestamp".to_owned());
    }

    let posts = store.query(&HistoryFilter {
        method: Some(HttpMethod::Post),
        ..HistoryFilter::default()
    });
    if !posts.is_empty() {
        return Err("Expected no POST entries".to_owned());
    }

    store.clear();
    if !store.is_empty() {
        return Err("Expected empty history after clear".to_owned());
    }
    Ok(())
}

#[test]
fn history_query_orders_by_timestamp_not_arrival() -> Result<(), String> {
    let store = RequestHistoryStore::new(10);
    let base = Utc::now();
    let at = |id: usize, offset_ms: i64| {
        let mut settled = entry(id, "api", 200);
        settled.timestamp = base
            .checked_add_signed(ChronoDuration::milliseconds(offset_ms))
            .unwrap_or(base);
        settled
    };
    // A slow request that started first settles after two faster ones.
    store.push(at(2, 20));
    store.push(at(3, 30));
    store.push(at(1, 10));

    let ids: Vec<String> = store
        .query(&HistoryFilter::default())
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    if ids != ["req-3", "req-2", "req-1"] {
        return Err(format!("Expected newest timestamp first, got {:?}", ids));
    }

    let latest = store.query(&HistoryFilter {
        limit: Some(1),
        ..HistoryFilter::default()
    });
    if latest.first().map(|entry| entry.id.as_str()) != Some("req-3") || latest.len() != 1 {
        return Err(format!("Limit should keep the newest timestamp, got {:?}", latest));
    }
    Ok(())
}

#[test]
fn guard_drop_deregisters() -> Result<(), String> {
    let registry = CancellationRegistry::new();
    let parent = registry.run_token();
    let guard = registry
        .register(in_flight("a"), &parent)
        .ok_or("Registration refused")?;
    if registry.len() != 1 {
        return Err(format!("Expected one registration, got {}", registry.len()));
    }
    drop(guard);
    if !registry.is_empty() {
        return Err("Guard drop should deregister".to_owned());
    }
    Ok(())
}

#[test]
fn cancel_all_drains_and_refuses_stale_generation() -> Result<(), String> {
    let registry = CancellationRegistry::new();
    let parent = registry.run_token();
    let first = registry
        .register(in_flight("a"), &parent)
        .ok_or("Registration refused")?;
    let second = registry
        .register(in_flight("b"), &parent)
        .ok_or("Registration refused")?;

    let drained = registry.cancel_all();
    if drained.len() != 2 || !registry.is_empty() {
        return Err(format!("Unexpected drain {:?}", drained));
    }
    if !first.token().is_cancelled() || !second.token().is_cancelled() {
        return Err("Expected request tokens to be cancelled".to_owned());
    }
    if !parent.is_cancelled() {
        return Err("Expected run token to follow the root".to_owned());
    }
    if registry.register(in_flight("c"), &parent).is_some() {
        return Err("Stale generation must not register".to_owned());
    }
    if first.complete(|| {}) {
        return Err("Drained request must not complete".to_owned());
    }

    let fresh = registry.run_token();
    if fresh.is_cancelled() {
        return Err("New generation should start uncancelled".to_owned());
    }
    Ok(())
}

#[test]
fn cancel_single_request() -> Result<(), String> {
    let registry = CancellationRegistry::new();
    let parent = CancellationToken::new();
    let guard = registry
        .register(in_flight("only"), &parent)
        .ok_or("Registration refused")?;
    let mut recorded = false;
    if !guard.complete(|| recorded = true) || !recorded {
        return Err("Registered request should complete".to_owned());
    }
    let cancelled = registry.cancel("only").ok_or("Expected metadata")?;
    if cancelled.id != "only" || !guard.token().is_cancelled() || parent.is_cancelled() {
        return Err("Cancel should only affect the single request".to_owned());
    }
    if registry.cancel("only").is_some() {
        return Err("Second cancel should be a no-op".to_owned());
    }
    Ok(())
}

#[test]
fn cache_expires_and_evicts_oldest() -> Result<(), String> {
    let expired: ResultCache<u32> = ResultCache::new(Duration::ZERO, 4);
    expired.insert(1, 10);
    if expired.get(1).is_some() {
        return Err("Zero TTL entries should expire immediately".to_owned());
    }

    let cache: ResultCache<u32> = ResultCache::new(Duration::from_secs(60), 2);
    cache.insert(1, 10);
    std::thread::sleep(Duration::from_millis(2));
    cache.insert(2, 20);
    std::thread::sleep(Duration::from_millis(2));
    cache.insert(3, 30);
    if cache.len() != 2 || cache.get(1).is_some() {
        return Err("Expected the oldest entry to be evicted".to_owned());
    }
    if cache.get(3) != Some(30) || cache.get(2) != Some(20) {
        return Err("Expected newer entries to survive".to_owned());
    }
    cache.invalidate(2);
    if cache.get(2).is_some() {
        return Err("Invalidated entry should be gone".to_owned());
    }
    Ok(())
}

#[test]
fn fingerprint_tracks_endpoints_and_config() -> Result<(), String> {
    let endpoints = [Endpoint::get("http://localhost/a")];
    let config = RunConfig::default();
    let same = fingerprint(&endpoints, &config);
    if same != fingerprint(&endpoints, &RunConfig::default()) {
        return Err("Fingerprint should be stable".to_owned());
    }
    let other_config = RunConfig::builder()
        .concurrency(3)
        .build()
        .map_err(|err| err.to_string())?;
    if same == fingerprint(&endpoints, &other_config) {
        return Err("Config change should alter the fingerprint".to_owned());
    }
    if same == fingerprint(&[Endpoint::get("http://localhost/b")], &config) {
        return Err("Endpoint change should alter the fingerprint".to_owned());
    }
    Ok(())
}
