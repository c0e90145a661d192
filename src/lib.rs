//! Core library for the `webprobe` CLI.
//!
//! [`ProbeEngine`] is the entry point: it checks endpoints once in
//! concurrency-bounded batches, drives them at a target request rate for
//! stress tests, and keeps a bounded history of every request it made. The
//! remaining modules are the pieces the engine and the binary are built from;
//! their APIs may evolve as the CLI grows.
pub mod args;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod http;
pub mod metrics;
pub mod output;
pub mod runner;
pub mod store;
pub mod system;

pub use engine::ProbeEngine;
