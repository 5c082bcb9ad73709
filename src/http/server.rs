//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (trace, request ID, timeout, metrics, CORS, authorization)
//! - Bind server to listener, plain or TLS
//! - Run the rate-window sweeper for the server's lifetime
//!
//! # Layer order (outermost first)
//! ```text
//! SetRequestId → Trace → PropagateRequestId → Timeout → metrics → CORS → authorize → handler
//! ```
//! CORS sits outside `authorize`, so preflight requests are answered
//! without credentials, as browsers expect.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderValue, Method, Request},
    middleware, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::{api_router, AppState};
use crate::config::schema::TlsConfig;
use crate::config::validation::ValidationError;
use crate::config::{ApiConfig, CorsConfig};
use crate::http::middleware::{authorize, track_metrics, AuthState};
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::response::ApiError;
use crate::security::rate_limit::spawn_sweeper;
use crate::security::{AuthorizationPipeline, RateLimiter};

/// Grace period for in-flight TLS connections on shutdown.
const TLS_DRAIN_SECS: u64 = 10;

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("failed to load TLS material: {0}")]
    Tls(std::io::Error),
}

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    config: ApiConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Build the pipeline, state and router from validated configuration.
    pub fn new(config: ApiConfig) -> Result<Self, StartupError> {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.rate_limit)));

        let pipeline = Arc::new(AuthorizationPipeline::from_config(&config, limiter.clone())?);
        tracing::info!(stages = ?pipeline.stage_names(), "Authorization pipeline assembled");

        let auth = AuthState {
            pipeline,
            key_source: config.rate_limit.key_source,
        };
        let state = AppState::from_config(&config);
        let router = Self::build_router(&config, state, auth);

        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ApiConfig, state: AppState, auth: AuthState) -> Router {
        api_router(state)
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(auth, authorize))
            .layer(cors_layer(&config.cors))
            .layer(middleware::from_fn(track_metrics))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    fn start_sweeper(&self, shutdown: &broadcast::Receiver<()>) {
        if let Some(limiter) = &self.limiter {
            let interval = Duration::from_secs(self.config.rate_limit.sweep_interval_secs);
            spawn_sweeper(limiter.clone(), interval, shutdown.resubscribe());
        }
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.start_sweeper(&shutdown);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await
            .map_err(StartupError::Tls)?;

        tracing::info!(address = %addr, "HTTPS server starting");
        self.start_sweeper(&shutdown);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            drain.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(StartupError::Tls)?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("resource".to_string())
}
