//! Turnstile - Per-Client Fixed-Window Rate Limiting
//!
//! This crate guards a single read endpoint with a per-client request-rate
//! limiter. Each caller is identified by its network address and may make a
//! fixed number of requests per rolling window; the counters live in an
//! injected expiring key-value store.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
