//! Forecast endpoint guarded by the rate limiter.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use super::forecast;
use crate::config::AdmissionMode;
use crate::error::{Result, TurnstileError};
use crate::ratelimit::{
    Admission, CounterStore, FixedWindowLimiter, IdentityResolver, RequestContext,
};

/// Shared state for the forecast handler.
pub struct AppState<S> {
    limiter: Arc<FixedWindowLimiter<S>>,
    resolver: IdentityResolver,
    mode: AdmissionMode,
}

impl<S> AppState<S> {
    pub fn new(limiter: Arc<FixedWindowLimiter<S>>, mode: AdmissionMode) -> Self {
        Self {
            limiter,
            resolver: IdentityResolver,
            mode,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            resolver: self.resolver,
            mode: self.mode,
        }
    }
}

/// Build the router serving the forecast endpoint.
pub fn router<S: CounterStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/weatherforecast", get(get_forecast::<S>))
        .route("/WeatherForecast", get(get_forecast::<S>))
        .with_state(state)
}

/// Serve a forecast if the caller is within its rate limit.
#[instrument(skip_all)]
async fn get_forecast<S: CounterStore + 'static>(
    State(state): State<AppState<S>>,
    request: Request,
) -> Result<Response> {
    let ctx = RequestContext::new(
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
    );
    let key = state.resolver.resolve(&ctx)?;
    debug!(key = %key, mode = ?state.mode, "Handling forecast request");
    let limiter = &state.limiter;

    let forecasts = match state.mode {
        AdmissionMode::Atomic => match limiter.try_admit(&key)? {
            Admission::Admitted { .. } => forecast::generate(),
            Admission::Rejected => return Ok(StatusCode::TOO_MANY_REQUESTS.into_response()),
        },
        AdmissionMode::Relaxed => {
            if limiter.is_limited(&key)? {
                debug!(key = %key, "Rate limit exceeded");
                return Ok(StatusCode::TOO_MANY_REQUESTS.into_response());
            }
            let forecasts = forecast::generate();
            limiter.record_request(&key)?;
            forecasts
        }
    };

    Ok(Json(forecasts).into_response())
}

impl IntoResponse for TurnstileError {
    fn into_response(self) -> Response {
        let status = match &self {
            TurnstileError::IdentityUnavailable => {
                warn!(error = %self, "Rejecting request without client identity");
                StatusCode::BAD_REQUEST
            }
            TurnstileError::StoreUnavailable(_) => {
                error!(error = %self, "Rate limit store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            TurnstileError::Config(_) | TurnstileError::Io(_) => {
                error!(error = %self, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
