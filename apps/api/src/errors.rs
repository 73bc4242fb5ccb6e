use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::relay::RelayError;
use crate::upload::UploadError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Validation messages go to the user verbatim; everything else is logged
/// here and replaced by a generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                msg.clone(),
            ),
            AppError::Configuration(detail) => {
                tracing::error!("Configuration error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    "API key no configurada".to_string(),
                )
            }
            AppError::Upstream(detail) => {
                tracing::error!("Upstream error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_ERROR",
                    "Error interno del servidor".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Error interno del servidor".to_string(),
                )
            }
        };

        let body = Json(json!({
            "message": message,
            "code": code
        }));

        (status, body).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Configuration => AppError::Configuration(e.to_string()),
            RelayError::PayloadTooLarge { .. } => {
                tracing::warn!("{e}");
                AppError::PayloadTooLarge("Archivo muy grande para procesar".to_string())
            }
            RelayError::Upstream { .. } | RelayError::Transport(_) => {
                AppError::Upstream(e.to_string())
            }
        }
    }
}
