use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use uuid::Uuid;

use domain::session::SessionId;
use orchestrator_application::error::AppError;
use orchestrator_application::ports::incoming::session::{RoundOutcome, SessionUseCase};

use crate::incoming::http_axum::dto::responses::ApiResponse;
use crate::incoming::http_axum::error_mapper::HttpError;
use crate::shared::app_state::AppState;

fn parse_session_id(raw: &str) -> Result<SessionId, HttpError> {
    Uuid::parse_str(raw)
        .map(SessionId)
        .map_err(|_| HttpError(AppError::ValidationError { message: "invalid session id".to_string() }))
}

pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    let session_id = parse_session_id(&id)?;
    state.orchestrator.start(session_id).await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success()))
}

pub async fn pause(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    let session_id = parse_session_id(&id)?;
    state.orchestrator.pause(session_id).await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success()))
}

pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    let session_id = parse_session_id(&id)?;
    state.orchestrator.stop(session_id).await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success()))
}

#[derive(Debug, Serialize)]
struct RoundOutcomeResponse {
    request_id: String,
    plan: Vec<(String, u32)>,
    dispatched: u32,
}

impl From<RoundOutcome> for RoundOutcomeResponse {
    fn from(outcome: RoundOutcome) -> Self {
        Self {
            request_id: outcome.request_id.to_string(),
            plan: outcome.plan.into_iter().map(|(id, count)| (id.to_string(), count)).collect(),
            dispatched: outcome.dispatched,
        }
    }
}

pub async fn one_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RoundOutcomeResponse>>, HttpError> {
    let session_id = parse_session_id(&id)?;
    let outcome = state.orchestrator.one_batch(session_id).await.map_err(HttpError)?;
    Ok(Json(ApiResponse::success_with_data(outcome.into())))
}
