use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::collage::archive::PersistError;
use crate::collage::code::ParseError;
use crate::collage::render::RenderError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid code: {0}")]
    InvalidCode(#[from] ParseError),

    #[error("Invalid form body: {0}")]
    InvalidForm(#[from] FormRejection),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] JsonRejection),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidCode(e) => {
                tracing::info!(position = e.position(), "Rejected malformed code: {e}");
                (StatusCode::BAD_REQUEST, "INVALID_CODE", e.to_string())
            }
            AppError::InvalidForm(e) => {
                tracing::info!("Rejected form body: {e}");
                (e.status(), "INVALID_REQUEST", e.body_text())
            }
            AppError::InvalidJson(e) => {
                tracing::info!("Rejected JSON body: {e}");
                (e.status(), "INVALID_REQUEST", e.body_text())
            }
            AppError::Render(e) => {
                tracing::error!("Render error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RENDER_ERROR",
                    "The collage could not be rendered".to_string(),
                )
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    "The collage could not be stored".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
