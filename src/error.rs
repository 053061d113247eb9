use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tab not found: {0}")]
    TabNotFound(String),

    #[error("Tab '{0}' has no header row")]
    MissingHeader(String),

    #[error("Store rejected request ({status}): {body}")]
    StoreRejected { status: u16, body: String },

    #[error("Marketplace error: {0}")]
    Marketplace(String),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::TabNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Http(_) | AppError::StoreRejected { .. } | AppError::Marketplace(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
