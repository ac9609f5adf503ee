use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("invalid color id: {0}")]
    InvalidColorFormat(String),

    #[error("invalid pattern name: {0}")]
    InvalidPattern(String),

    #[error("invalid guard configuration: {message}")]
    ConfigError { message: String },

    #[error("empty payload: {0}")]
    EmptyPayload(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
