use axum::{Json, extract::State};
use serde_json::json;

use crate::incoming::http_axum::dto::responses::ApiResponse;
use crate::shared::app_state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    let worker_count = state.registry.connected_ids().await.len();
    Json(ApiResponse::success_with_data(json!({
        "environment": state.config.environment.env,
        "connectedWorkers": worker_count,
    })))
}
