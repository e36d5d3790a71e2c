use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};

use crate::models::ExtractionResult;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Navigation to {url} failed after {attempts} attempt(s): {reason}")]
    NavigationError {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Browser error: {0}")]
    BrowserError(String),

    #[error("LLM processing error: {0}")]
    LlmError(String),

    #[error("Error parsing content: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NavigationError { .. } | AppError::BrowserError(_) => StatusCode::BAD_GATEWAY,
            AppError::LlmError(_) => StatusCode::BAD_GATEWAY,
            AppError::ParseError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ExtractionResult::failure(self.to_string()));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::LlmError(err.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::BrowserError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
