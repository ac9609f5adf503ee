use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error};

use orchestrator_application::error::AppError;

pub struct HttpError(pub AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let (status_code, message) = match app_error {
            AppError::Domain(_)
            | AppError::InvalidCoordinates { .. }
            | AppError::InvalidColorFormat { .. }
            | AppError::WebSocketError { .. } => {
                debug!("client error response: {}", app_error);
                (StatusCode::BAD_REQUEST, app_error.to_string())
            }

            AppError::ValidationError { .. } => {
                debug!("client error response: {}", app_error);
                (StatusCode::UNPROCESSABLE_ENTITY, app_error.to_string())
            }

            AppError::JsonError(_) => {
                debug!("client error response: {}", app_error);
                (StatusCode::BAD_REQUEST, "invalid JSON format".to_string())
            }

            AppError::SessionNotFound { .. } | AppError::ProjectNotFound { .. } | AppError::WorkerNotFound { .. } => {
                debug!("client error response: {}", app_error);
                (StatusCode::NOT_FOUND, app_error.to_string())
            }

            AppError::ServiceUnavailable => {
                error!("server error response: {}", app_error);
                (StatusCode::SERVICE_UNAVAILABLE, "service unavailable".to_string())
            }

            AppError::ConfigError { .. }
            | AppError::IoError(_)
            | AppError::DatabaseError { .. }
            | AppError::InternalServerError => {
                error!("server error response: {}", app_error);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        let error_response = json!({
            "ok": false,
            "error": message,
            "status": status_code.as_u16(),
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl From<AppError> for HttpError {
    fn from(app_error: AppError) -> Self {
        HttpError(app_error)
    }
}
