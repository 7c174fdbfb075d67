//! Application-wide error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use waqf_ledger::LedgerError;

#[derive(Debug, Error)]
pub enum SatelliteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, SatelliteError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

impl SatelliteError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(err) => match err {
                LedgerError::NotFound(_) | LedgerError::TrancheNotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::InvalidWaqfType(_) | LedgerError::InvalidRolloverPeriod(_) => {
                    StatusCode::BAD_REQUEST
                }
                LedgerError::AlreadyReturned(_) | LedgerError::NotMatured { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                LedgerError::ConcurrentModification(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Migrate(_) => "migrate",
            Self::Config(_) => "config",
            Self::Ledger(err) => err.kind(),
        }
    }
}

impl IntoResponse for SatelliteError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            kind: self.kind(),
        };
        (self.status(), Json(body)).into_response()
    }
}
