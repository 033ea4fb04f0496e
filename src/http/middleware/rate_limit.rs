//! Rate limiting middleware.
//! Admits or rejects each guestbook request before the handler runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::ApiError;
use crate::http::request::ClientId;
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    client: ClientId,
    request: Request,
    next: Next,
) -> Response {
    match state.rate_limiter.admit(client.as_str()) {
        Ok(()) => next.run(request).await,
        Err(exceeded) => {
            tracing::warn!(client = %client, window = exceeded.window(), "Rate limit exceeded");
            metrics::record_rate_limited(exceeded.window());
            ApiError::RateLimited(exceeded).into_response()
        }
    }
}
