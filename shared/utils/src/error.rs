use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum VtrackError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Document processing error: {message}")]
    DocumentProcessing { message: String },

    #[error("Mail delivery error: {message}")]
    Mail { message: String },

    #[error("Scheduler error: {message}")]
    Scheduler { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl VtrackError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn document_processing(message: impl Into<String>) -> Self {
        Self::DocumentProcessing {
            message: message.into(),
        }
    }

    pub fn mail(message: impl Into<String>) -> Self {
        Self::Mail {
            message: message.into(),
        }
    }

    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::DocumentProcessing { .. } => "DOCUMENT_PROCESSING_ERROR",
            Self::Mail { .. } => "MAIL_DELIVERY_ERROR",
            Self::Scheduler { .. } => "SCHEDULER_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Database { .. } => 500,
            Self::Validation { .. } => 400,
            Self::DocumentProcessing { .. } => 422,
            Self::Mail { .. } => 502,
            Self::Scheduler { .. } => 500,
            Self::Configuration { .. } => 500,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Internal { .. } => 500,
        }
    }
}

pub type VtrackResult<T> = Result<T, VtrackError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<VtrackError> for ErrorResponse {
    fn from(error: VtrackError) -> Self {
        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

impl From<sqlx::Error> for VtrackError {
    fn from(error: sqlx::Error) -> Self {
        Self::database(error.to_string())
    }
}

impl From<serde_json::Error> for VtrackError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<vtrack_models::UnknownVariant> for VtrackError {
    fn from(error: vtrack_models::UnknownVariant) -> Self {
        Self::validation(error.kind, error.to_string())
    }
}
