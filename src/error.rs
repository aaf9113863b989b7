use crate::engine::AccountingViolation;
use crate::orchestration::accountant::AccountingError;
use crate::orchestration::ledger::LedgerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidName => AppError::BadRequest(err.to_string()),
            LedgerError::VaultNotFound(_) => AppError::NotFound(err.to_string()),
            LedgerError::VaultClosed(_) => AppError::Conflict(err.to_string()),
            LedgerError::Db(e) => e.into(),
        }
    }
}

impl From<AccountingError> for AppError {
    fn from(err: AccountingError) -> Self {
        match err {
            AccountingError::NotFound(_) => AppError::NotFound(err.to_string()),
            AccountingError::Violation(AccountingViolation::PositionClosed(_)) => {
                AppError::Conflict(err.to_string())
            }
            AccountingError::Violation(_) => AppError::BadRequest(err.to_string()),
            AccountingError::Conflict(_) => AppError::Conflict(err.to_string()),
            AccountingError::Ledger(e) => e.into(),
            AccountingError::Db(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
