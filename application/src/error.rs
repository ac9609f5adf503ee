use std::io;
use thiserror::Error;

use domain::error::DomainError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Invalid coordinates: {message}")]
    InvalidCoordinates { message: String },

    #[error("Invalid color format: {message}")]
    InvalidColorFormat { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("Worker not found: {id}")]
    WorkerNotFound { id: String },

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("WebSocket error: {message}")]
    WebSocketError { message: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },

    #[error("Internal server error")]
    InternalServerError,

    #[error("Service unavailable")]
    ServiceUnavailable,
}

pub type AppResult<T> = Result<T, AppError>;
