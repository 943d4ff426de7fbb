use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Estudiante not found: {id}")]
    NotFound { id: u64 },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Confirmation required: add ?confirmacion=true")]
    ConfirmationRequired,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        ApiError::ConfigError(msg.into())
    }

    pub fn validation_error(msg: impl Into<String>) -> Self {
        ApiError::ValidationError {
            message: msg.into(),
        }
    }

    pub fn not_found(id: u64) -> Self {
        ApiError::NotFound { id }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }
}
