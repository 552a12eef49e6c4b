use axum::{
    Router,
    error_handling::HandleErrorLayer,
    middleware,
    routing::{delete, get, post},
};
use tower::{BoxError, ServiceBuilder, timeout::TimeoutLayer, timeout::error::Elapsed};
use tower_http::trace::TraceLayer;
use tumiki_api::ApiError;

use crate::{config::AppConfig, handlers, middleware as app_middleware, state::AppState};

pub struct TumikiServer {
    addr: String,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let request_timeout = state.config.server.request_timeout();

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/data", get(handlers::data::get_data))
        .route("/api/records", post(handlers::records::create_record))
        .route(
            "/api/records/{user_id}/{date}",
            get(handlers::records::get_records),
        )
        .route("/api/attendance", post(handlers::attendance::create_punch))
        .route(
            "/api/attendance/{user_id}/{date}",
            get(handlers::attendance::list_punches),
        )
        .route(
            "/api/cache",
            get(handlers::cache::stats).delete(handlers::cache::clear_all),
        )
        .route("/api/cache/{key}", delete(handlers::cache::clear_one))
        .fallback(handlers::unknown_endpoint)
        .method_not_allowed_fallback(handlers::unknown_endpoint)
        .with_state(state)
        // Outer to inner: request id -> cors -> trace -> timeout (JSON on expiry) -> body limit
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(app_middleware::cors_layer())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                            use tracing::field::Empty;
                            let req_id = req
                                .extensions()
                                .get::<axum::http::HeaderValue>()
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri().path(),
                                http.status_code = Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<axum::body::Body>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
}

/// Renders failures of the timeout layer in the usual JSON error shape.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::internal("Request timed out")
    } else {
        ApiError::internal_with_details("Unhandled middleware error", err.to_string())
    }
}

pub struct ServerBuilder {
    config: AppConfig,
    state: Option<AppState>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            state: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Uses a prebuilt state (and its document store) instead of building one from the config.
    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> anyhow::Result<TumikiServer> {
        let state = match self.state {
            Some(state) => state,
            None => AppState::from_config(self.config)?,
        };
        let addr = state.config.addr();
        tracing::info!(backend = state.storage.backend_name(), "application state ready");

        Ok(TumikiServer {
            addr,
            app: build_app(state),
        })
    }
}

impl TumikiServer {
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
