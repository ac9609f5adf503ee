use axum::Json;
use axum::extract::State;
use serde_json::json;

use domain::guard_config::GuardConfig;
use orchestrator_application::ports::incoming::guard::GuardConfigUseCase;
use orchestrator_application::ports::outgoing::registry::RegistryPort;

use crate::incoming::http_axum::dto::requests::GuardUploadRequest;
use crate::incoming::http_axum::dto::responses::{ApiResponse, PreviewResponse};
use crate::incoming::http_axum::error_mapper::HttpError;
use crate::incoming::ws_axum::protocol;
use crate::shared::app_state::AppState;

pub async fn get_config(State(state): State<AppState>) -> Json<ApiResponse<GuardConfig>> {
    Json(ApiResponse::success_with_data(state.guard_config.get().await))
}

pub async fn update_config(
    State(state): State<AppState>,
    Json(partial): Json<GuardConfig>,
) -> Result<Json<ApiResponse<GuardConfig>>, HttpError> {
    let (merged, _changed) = state.guard_config.update(partial).await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success_with_data(merged)))
}

pub async fn clear(State(state): State<AppState>) -> Result<Json<ApiResponse<()>>, HttpError> {
    state.guard_config.clear().await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success()))
}

pub async fn check(State(state): State<AppState>) -> Result<Json<ApiResponse<()>>, HttpError> {
    state.guard_config.check().await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success()))
}

pub async fn repair(State(state): State<AppState>) -> Result<Json<ApiResponse<()>>, HttpError> {
    state.guard_config.repair().await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success()))
}

pub async fn preview(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Option<PreviewResponse>>>, HttpError> {
    let preview = state.guard_config.preview().await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success_with_data(preview.map(PreviewResponse::from))))
}

/// Pushes a new guard data file to the current favorite and broadcasts its
/// arrival to UI clients. Not part of `GuardConfigUseCase`: it touches the
/// registry's favorite-targeted send directly, same as the `/slaves` paint
/// endpoint does.
pub async fn upload(
    State(state): State<AppState>,
    Json(request): Json<GuardUploadRequest>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    state
        .registry
        .set_guard_data(request.filename.clone(), request.data.clone())
        .await;

    if let Some(favorite_id) = state.registry.favorite_id().await {
        state
            .registry
            .send_to_slave(&favorite_id, protocol::guard_data(&request.filename, &request.data))
            .await
            .map_err(HttpError)?;
    }

    state
        .registry
        .broadcast_to_ui(json!({ "type": "guard_upload_sent", "filename": request.filename }))
        .await
        .map_err(HttpError)?;

    Ok(Json(ApiResponse::success()))
}
