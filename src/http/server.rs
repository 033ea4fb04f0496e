//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS, timeout, body limit, rate limit)
//! - Turn handler panics and timeouts into JSON error responses
//! - Bind server to listener and serve until shutdown
//! - Run the rate limit sweeper in the background

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{CorsConfig, ServiceConfig};
use crate::http::error::ApiError;
use crate::http::handlers;
use crate::http::middleware::rate_limit_middleware;
use crate::http::X_REQUEST_ID;
use crate::security::rate_limit::run_sweeper;
use crate::security::{RateLimiter, Sanitizer};
use crate::store::MessageLog;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
    pub messages: Arc<MessageLog>,
    pub sanitizer: Sanitizer,
}

/// HTTP server for the guestbook API.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        let state = AppState {
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            messages: Arc::new(MessageLog::new(config.messages.capacity)),
            sanitizer: Sanitizer::default(),
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let guestbook = get(handlers::list_messages)
            .post(handlers::add_message)
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            ))
            .fallback(handlers::method_not_allowed);

        let routes = Router::new()
            .route("/", get(handlers::health).fallback(handlers::method_not_allowed))
            .route("/api/guestbook", guestbook)
            .fallback(handlers::not_found)
            .with_state(state);

        apply_layers(routes, config)
    }

    /// Run the server until `shutdown` fires, accepting connections on `listener`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let sweep_secs = self.config.rate_limit.sweep_interval_secs;
        if self.state.rate_limiter.is_enabled() && sweep_secs > 0 {
            tokio::spawn(run_sweeper(
                self.state.rate_limiter.clone(),
                Duration::from_secs(sweep_secs),
                shutdown.resubscribe(),
            ));
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// A clone of the fully layered router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Shared state behind the handlers.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Wrap `routes` in the service-wide middleware stack.
#[allow(deprecated)]
fn apply_layers(routes: Router, config: &ServiceConfig) -> Router {
    routes
        .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(&config.cors))
                .layer(CatchPanicLayer::custom(panic_to_json))
                .layer(middleware::map_response(timeout_to_json))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.limits.request_timeout_secs,
                ))),
        )
}

/// Give the bare 408 produced by the timeout layer a JSON error body.
async fn timeout_to_json(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT
        && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        tracing::warn!("Request timed out");
        return ApiError::Timeout.into_response();
    }
    response
}

fn panic_to_json(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(detail).into_response()
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
