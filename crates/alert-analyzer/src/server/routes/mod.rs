//! API routes for the webhook server

pub mod queue;
pub mod webhook;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all `/api/v1` routes
pub fn api_routes(max_body_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/webhook",
            post(webhook::receive_webhook).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/queue", get(queue::queue_status))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let model = state.llm().map(|llm| format!("{}/{}", llm.name(), llm.model()));
    axum::Json(serde_json::json!({
        "name": "alert-analyzer",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Durable webhook intake with LLM-backed alert analysis",
        "model": model,
        "endpoints": {
            "POST /api/v1/webhook": "Queue one alert or a batch for analysis",
            "GET /api/v1/queue": "Queue statistics and pending items",
            "GET /": "Health check"
        }
    }))
}
