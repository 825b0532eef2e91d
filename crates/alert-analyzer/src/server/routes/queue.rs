//! Queue inspection endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::QueueStatusResponse;

/// GET /api/v1/queue - Queue counters and pending items
pub async fn queue_status(State(state): State<AppState>) -> Json<QueueStatusResponse> {
    let queue = state.queue();
    Json(QueueStatusResponse {
        stats: queue.stats(),
        pending: queue.pending_items(),
    })
}
