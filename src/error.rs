use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::time::Duration;
use thiserror::Error as ThisError;

use crate::channels::ChannelKind;

#[derive(Debug, ThisError)]
pub enum MedminderError {
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Ledger write failed: {0}")]
    LedgerWrite(#[source] SqlxError),

    #[error("Email already registered: {0}")]
    EmailAlreadyRegistered(String),

    #[error("Medication {0} not found")]
    MedicationNotFound(i64),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("SMS gateway rejected message with status {status}: {body}")]
    Sms {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Email delivery error: {0}")]
    Email(String),

    #[error("{channel} send timed out after {after:?}")]
    ChannelTimeout { channel: ChannelKind, after: Duration },

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),
}

impl From<figment::Error> for MedminderError {
    fn from(e: figment::Error) -> Self {
        MedminderError::Config(Box::new(e))
    }
}

impl MedminderError {
    /// True when SQLite rejected a write on a UNIQUE index.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            MedminderError::Database(SqlxError::Database(db))
            | MedminderError::LedgerWrite(SqlxError::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

impl IntoResponse for MedminderError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            MedminderError::EmailAlreadyRegistered(_) => (
                StatusCode::CONFLICT,
                "ALREADY_REGISTERED",
                "Email is already registered.".to_string(),
            ),
            MedminderError::MedicationNotFound(_) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                self.to_string(),
            ),
            MedminderError::Database(_)
            | MedminderError::LedgerWrite(_)
            | MedminderError::Io(_)
            | MedminderError::Config(_)
            | MedminderError::UrlParse(_)
            | MedminderError::RactorError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
            MedminderError::Reqwest(_)
            | MedminderError::Sms { .. }
            | MedminderError::Email(_)
            | MedminderError::ChannelTimeout { .. } => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Delivery channel is unavailable.".to_string(),
            ),
        };
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
