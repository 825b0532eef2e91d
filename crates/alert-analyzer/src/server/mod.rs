//! HTTP server for webhook intake

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::processing::ShutdownOutcome;
use state::AppState;

/// Webhook HTTP server plus its background worker
pub struct AnalyzerServer {
    config: AnalyzerConfig,
    state: AppState,
}

impl AnalyzerServer {
    /// Create a new server, replaying any pending items from the mirror
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Whether the configured LLM answers its health probe
    pub async fn check_llm(&self) -> bool {
        match self.state.llm() {
            Some(llm) => match llm.health_check().await {
                Ok(healthy) => healthy,
                Err(e) => {
                    tracing::warn!("{} health check failed: {}", llm.name(), e);
                    false
                }
            },
            None => false,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Start the server and run until Ctrl-C
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(shutdown_signal()).await
    }

    /// Start the server and run until `signal` resolves
    ///
    /// The worker is started before the listener and stopped after it closes,
    /// so nothing accepted over HTTP is left without a consumer.
    pub async fn start_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let worker = self.state.worker().spawn();
        tracing::info!("Background worker task created");

        let router = self.build_router();

        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                worker.shutdown(self.config.queue.shutdown_timeout()).await;
                return Err(Error::Config(format!("Failed to bind: {}", e)));
            }
        };

        tracing::info!("Starting webhook server on http://{}", addr);
        tracing::info!("Webhook endpoint: http://{}/api/v1/webhook", addr);

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await;

        tracing::info!("Application shutdown: stopping worker...");
        self.state.set_ready(false);
        match worker.shutdown(self.config.queue.shutdown_timeout()).await {
            ShutdownOutcome::Clean => {}
            ShutdownOutcome::TimedOut => tracing::warn!(
                "Worker abandoned after {:?}; unfinished items stay in the mirror",
                self.config.queue.shutdown_timeout()
            ),
            ShutdownOutcome::Failed => tracing::error!("Worker ended abnormally during shutdown"),
        }
        tracing::info!("Application shutdown complete");

        served.map_err(|e| Error::Internal(format!("Server error: {}", e)))
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Build the router for `state`
pub fn build_router(state: AppState) -> Router {
    let config = state.config().server.clone();

    let router = Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness))
        .nest("/api/v1", routes::api_routes(config.max_body_size))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "Webhook Processor is running"
    }))
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
