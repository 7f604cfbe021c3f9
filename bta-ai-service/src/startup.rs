//! Application startup and lifecycle management.

use crate::config::BtaConfig;
use crate::handlers::{
    analysis::analyze,
    health::{health_check, readiness_check},
    metrics::metrics,
};
use crate::services::providers::openai::{OpenAiConfig, OpenAiTextProvider};
use crate::services::providers::TextProvider;
use crate::services::OriginPolicy;
use axum::{
    middleware::from_fn,
    routing::{any, get},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Route of the analysis endpoint.
pub const ANALYSIS_PATH: &str = "/api/bta-ai";

/// Path the browser client used when the endpoint was a Netlify function.
pub const LEGACY_ANALYSIS_PATH: &str = "/.netlify/functions/bta_ai";

/// Shared application state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BtaConfig>,
    pub origin_policy: Arc<OriginPolicy>,
    /// `None` when no credential is configured.
    pub text_provider: Option<Arc<dyn TextProvider>>,
}

impl AppState {
    /// Build state from configuration, constructing the OpenAI provider when
    /// an API key is present.
    pub fn from_config(config: BtaConfig) -> Result<Self, AppError> {
        let text_provider: Option<Arc<dyn TextProvider>> = match &config.openai.api_key {
            Some(api_key) => {
                let provider = OpenAiTextProvider::new(OpenAiConfig {
                    api_key: api_key.clone(),
                    base_url: config.openai.base_url.clone(),
                    model: config.openai.model.clone(),
                    max_output_tokens: config.openai.max_output_tokens,
                    force_tool_use: config.openai.force_tool_use,
                })
                .map_err(|e| AppError::InternalError(e.into()))?;

                tracing::info!(
                    model = %config.openai.model,
                    force_tool_use = config.openai.force_tool_use,
                    "Initialized OpenAI text provider"
                );
                let provider: Arc<dyn TextProvider> = Arc::new(provider);
                Some(provider)
            }
            None => {
                tracing::warn!(
                    "OPENAI_API_KEY is not set; analysis requests will fail with a configuration error"
                );
                None
            }
        };

        Ok(Self::new(config, text_provider))
    }

    /// Assemble state around an existing provider.
    pub fn new(config: BtaConfig, text_provider: Option<Arc<dyn TextProvider>>) -> Self {
        let origin_policy = OriginPolicy::new(config.cors.allowed_origins.iter().cloned());
        if origin_policy.is_empty() {
            tracing::warn!("Origin allow-list is empty; every analysis request will be refused");
        }

        Self {
            config: Arc::new(config),
            origin_policy: Arc::new(origin_policy),
            text_provider,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(ANALYSIS_PATH, any(analyze))
        .route(LEGACY_ANALYSIS_PATH, any(analyze))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .with_state(state)
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Add security headers middleware
        .layer(from_fn(security_headers_middleware))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: BtaConfig) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let state = AppState::from_config(config)?;

        tracing::info!(
            allowed_origins = state.origin_policy.len(),
            timeout_secs = state.config.generation_timeout.as_secs(),
            "Analysis endpoint configured"
        );

        // Port 0 = random port for testing
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("BTA AI service: HTTP on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
