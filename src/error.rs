use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::llm::LlmError;
use crate::recipe::RecipeError;
use crate::submission::AlreadyPending;

#[derive(Debug)]
pub enum AppError {
    /// Return a status code with a plain-text message body.
    Msg(StatusCode, String),
    /// The model call failed -> 502 with JSON body; logged.
    Upstream(LlmError),
    /// Internal error -> 500 with JSON body; logged.
    Anyhow(anyhow::Error),
}

/* ---- Narrow, explicit conversions so `?` works everywhere ---- */

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        Self::Upstream(e)
    }
}

impl From<RecipeError> for AppError {
    fn from(e: RecipeError) -> Self {
        match e {
            RecipeError::Model(e) => Self::Upstream(e),
            RecipeError::Read { .. } => Self::Anyhow(e.into()),
        }
    }
}

impl From<AlreadyPending> for AppError {
    fn from(e: AlreadyPending) -> Self {
        Self::Msg(StatusCode::CONFLICT, e.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        Self::Msg(e.status(), format!("multipart error: {}", e.body_text()))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Anyhow(e.into())
    }
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Msg(code, msg) => (code, msg).into_response(),
            Self::Upstream(err) => {
                tracing::error!(error = %err, "recipe generation failed");
                let body = Json(ErrBody {
                    error: err.to_string(),
                });
                (StatusCode::BAD_GATEWAY, body).into_response()
            }
            Self::Anyhow(err) => {
                tracing::error!("{:#}", err);
                let body = Json(ErrBody {
                    error: err.to_string(),
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
