use axum::Json;
use axum::extract::State;

use orchestrator_application::ports::incoming::repair::{RepairDistributionOutcome, RepairUseCase};

use crate::incoming::http_axum::dto::requests::RepairSubmitRequest;
use crate::incoming::http_axum::dto::responses::ApiResponse;
use crate::incoming::http_axum::error_mapper::HttpError;
use crate::shared::app_state::AppState;

pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<RepairSubmitRequest>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    state
        .repair
        .submit(request.pixels, &request.source)
        .await
        .map_err(HttpError)?;
    Ok(Json(ApiResponse::success()))
}

pub async fn distribute(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RepairDistributionOutcome>>, HttpError> {
    let outcome = state.repair.distribute_from_favorite().await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success_with_data(outcome)))
}
