use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use turnstile::config::{LogFormat, LoggingConfig, TurnstileConfig};
use turnstile::http::HttpServer;
use turnstile::ratelimit::{FixedWindowLimiter, MemoryStore};

/// Command line arguments. Flags override the configuration file and
/// environment.
#[derive(Parser, Debug)]
#[command(name = "turnstile")]
#[command(about = "Per-client fixed-window rate limited forecast service")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Requests admitted per client per window
    #[arg(long)]
    max_requests: Option<u64>,

    /// Window length in seconds
    #[arg(long)]
    window_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = TurnstileConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if let Some(max) = args.max_requests {
        config.rate_limiting.max_requests_per_window = max;
    }
    if let Some(secs) = args.window_secs {
        config.rate_limiting.window_secs = secs;
    }
    config.validate()?;

    init_tracing(&config.logging);

    info!("Starting Turnstile Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(listen_addr = %config.server.listen_addr, "Configuration loaded");

    let limiter_config = config.rate_limiting.limiter_config()?;
    let limiter = Arc::new(FixedWindowLimiter::new(MemoryStore::new(), limiter_config));
    info!(
        max_requests_per_window = limiter_config.max_requests_per_window(),
        window_secs = limiter_config.window().as_secs(),
        "Rate limiter initialized"
    );

    let server = HttpServer::new(
        config.server.listen_addr,
        limiter,
        config.rate_limiting.admission_mode,
        config.rate_limiting.purge_interval(),
    );

    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Turnstile Rate Limiting Service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Plain => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
