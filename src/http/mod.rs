//! HTTP transport for the rate limited forecast endpoint.

pub mod forecast;
mod server;
mod service;

pub use server::HttpServer;
pub use service::{router, AppState};
