use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use domain::worker::WorkerId;
use orchestrator_application::ports::outgoing::registry::RegistryPort;

use crate::incoming::http_axum::dto::requests::PaintRequest;
use crate::incoming::http_axum::dto::responses::{ApiResponse, WorkerResponse};
use crate::incoming::http_axum::error_mapper::HttpError;
use crate::incoming::ws_axum::handler::push_favorite_state;
use crate::incoming::ws_axum::protocol;
use crate::shared::app_state::AppState;

pub async fn list_slaves(State(state): State<AppState>) -> Json<ApiResponse<Vec<WorkerResponse>>> {
    let workers = state.slaves.list().await.into_iter().map(WorkerResponse::from).collect();
    Json(ApiResponse::success_with_data(workers))
}

pub async fn set_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, HttpError> {
    let worker_id = WorkerId::new(id);
    let outcome = state.slaves.set_favorite(&worker_id).await.map_err(HttpError)?;

    if let Some(previous_id) = &outcome.previous_favorite {
        state
            .registry
            .send_to_slave(previous_id, protocol::set_favorite(false))
            .await
            .map_err(HttpError)?;
    }

    state
        .registry
        .send_to_slave(&worker_id, protocol::set_favorite(true))
        .await
        .map_err(HttpError)?;
    push_favorite_state(&state, &worker_id).await;

    if !outcome.unchanged {
        state
            .registry
            .broadcast_to_ui(json!({ "type": "favorite_set", "slave_id": worker_id }))
            .await
            .map_err(HttpError)?;
    }

    Ok(Json(ApiResponse::success_with_data(
        json!({ "unchanged": outcome.unchanged }),
    )))
}

pub async fn paint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PaintRequest>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    let worker_id = WorkerId::new(id);
    state
        .slaves
        .paint(&worker_id, request.coords, request.colors)
        .await
        .map_err(HttpError)?;
    Ok(Json(ApiResponse::success()))
}
