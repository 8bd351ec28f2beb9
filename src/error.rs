// HTTP error type for the web server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch-one found no row; the only deliberately handled error
    #[error("Expense not found")]
    NotFound,

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Expense not found" })),
            )
                .into_response(),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
