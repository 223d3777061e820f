//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::service::{router, AppState};
use crate::config::AdmissionMode;
use crate::error::{Result, TurnstileError};
use crate::ratelimit::{CounterStore, FixedWindowLimiter};

/// HTTP server for the rate limited forecast endpoint.
pub struct HttpServer<S: CounterStore + 'static> {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limiter instance
    limiter: Arc<FixedWindowLimiter<S>>,
    /// Admission protocol used by the handler
    mode: AdmissionMode,
    /// Interval between expired-counter sweeps
    purge_interval: Duration,
}

impl<S: CounterStore + 'static> HttpServer<S> {
    /// Create a new HTTP server.
    pub fn new(
        addr: SocketAddr,
        limiter: Arc<FixedWindowLimiter<S>>,
        mode: AdmissionMode,
        purge_interval: Duration,
    ) -> Self {
        Self {
            addr,
            limiter,
            mode,
            purge_interval,
        }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        info!(
            addr = %local_addr,
            mode = ?self.mode,
            "Starting HTTP server for forecast endpoint"
        );

        let purger = spawn_purger(Arc::clone(&self.limiter), self.purge_interval);
        let app = router(AppState::new(self.limiter, self.mode));

        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            TurnstileError::Io(e)
        });

        purger.abort();
        result
    }
}

/// Periodically drop expired counters from the store.
fn spawn_purger<S: CounterStore + 'static>(
    limiter: Arc<FixedWindowLimiter<S>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiter.store().purge_expired();
            if removed > 0 {
                debug!(removed = removed, "Swept expired rate limit counters");
            }
        }
    })
}
