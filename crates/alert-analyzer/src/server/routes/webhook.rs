//! Webhook intake endpoint

use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{parse_alert_batch, WebhookResponse};

/// POST /api/v1/webhook - Accept one alert or a batch and queue it
pub async fn receive_webhook(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<WebhookResponse>)> {
    tracing::info!("Webhook received");

    let alerts = parse_alert_batch(body).map_err(|e| {
        tracing::error!("Error processing webhook request: {}", e);
        e
    })?;

    // Mirror writes hit the disk
    let queue = Arc::clone(state.queue());
    let accepted = tokio::task::spawn_blocking(move || queue.submit(alerts))
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

    Ok((StatusCode::ACCEPTED, Json(WebhookResponse::accepted(accepted))))
}
