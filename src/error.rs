//! Error taxonomy shared by every handler.
//!
//! Each variant maps to one HTTP status and a stable `error` code in the JSON
//! body, so clients can branch on the code and never parse messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

pub type AppResult<T> = std::result::Result<T, AppError>;

/// JSON body written for every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authorized")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("AI service is not configured")]
    AiNotConfigured,

    #[error("External service error: {service} - {message}")]
    Upstream { service: String, message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::AiNotConfigured | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::BadRequest { .. } => "BAD_REQUEST",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::AiNotConfigured => "AI_NOT_CONFIGURED",
            AppError::Upstream { .. } => "AI_SERVICE_ERROR",
            AppError::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Message safe to show to the caller. Server-side failures stay generic.
    fn public_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Not authorized, token failed".to_string(),
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::NotFound { resource } => format!("{} not found", resource),
            AppError::Validation { message, .. }
            | AppError::BadRequest { message }
            | AppError::Conflict { message } => message.clone(),
            AppError::Database(_) => "Database operation failed".to_string(),
            AppError::AiNotConfigured => "AI service is not configured".to_string(),
            AppError::Upstream { .. } => "The AI service could not complete the request".to_string(),
            AppError::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "invalid value".to_string());
                format!("{}: {}", field, reason)
            })
            .collect::<Vec<_>>()
            .join(", ");

        AppError::Validation {
            message: if message.is_empty() {
                "Invalid request body".to_string()
            } else {
                message
            },
            details: serde_json::to_value(&errors).ok(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => error!(error = %e, "❌ Database error"),
            AppError::Upstream { service, message } => {
                error!(service = %service, error = %message, "❌ Upstream service error")
            }
            AppError::Internal { message } => error!(error = %message, "❌ Internal error"),
            _ => {}
        }

        let details = match &self {
            AppError::Validation { details, .. } => details.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.public_message(),
            details,
        };

        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::not_found("Invoice").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::validation("bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::conflict("dup").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::upstream("openrouter", "timeout").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_database_details_not_leaked() {
        let err = AppError::Database(sqlx::Error::Protocol("secret host detail".into()));
        assert_eq!(err.public_message(), "Database operation failed");
        assert_eq!(err.code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_not_found_response() {
        let response = AppError::not_found("Invoice").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
