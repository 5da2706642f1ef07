/*
 * Responsibility
 * - App-wide AppError definition and IntoResponse (HTTP status / JSON body)
 * - Fold repo / remote-validation errors into one taxonomy
 * - Classify failures for logging: auth & not-found -> info, payload
 *   validation -> warn, everything else -> error (with source chain);
 *   public messages never leak the underlying cause
 */
use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::Level;

use crate::repos::error::RepoError;
use crate::services::user_client::UserClientError;

const INVALID_CREDS_MESSAGE: &str = "Invalid credentials";
const INVALIDATION_MESSAGE: &str = "Invalid request parameters or payload";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// The wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorDto {
    pub message: String,
    pub path: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorDto {
    pub fn new(message: String, path: String, status: StatusCode) -> Self {
        Self {
            message,
            path,
            status: status_name(status),
            timestamp: Utc::now(),
            details: None,
        }
    }
}

/// `StatusCode` as its constant name: 422 -> "UNPROCESSABLE_ENTITY".
fn status_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("UNKNOWN")
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("invalid request parameters or payload")]
    UnprocessableEntity { details: Vec<String> },
    #[error("not authorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error("token validation failed")]
    TokenValidation(#[from] UserClientError),
    #[error("db error")]
    Repo(#[from] RepoError),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn unprocessable(details: Vec<String>) -> Self {
        Self::UnprocessableEntity { details }
    }
}

/// Everything the outermost responder needs to shape and log a failure
/// once the request path is known. Rides on response extensions.
#[derive(Debug, Clone)]
pub(crate) struct ErrorMeta {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Vec<String>>,
    pub level: Level,
    pub log_detail: String,
}

impl ErrorMeta {
    pub(crate) fn write_log(&self, method: &Method, path: &str) {
        if self.level == Level::ERROR {
            tracing::error!("{method} {path} failed: {}", self.log_detail);
        } else if self.level == Level::WARN {
            tracing::warn!("{method} {path} failed: {}", self.log_detail);
        } else {
            tracing::info!("{method} {path} failed: {}", self.log_detail);
        }
    }
}

impl From<&AppError> for ErrorMeta {
    fn from(err: &AppError) -> Self {
        let (status, message, level) = match err {
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, message.clone(), Level::WARN)
            }
            AppError::UnprocessableEntity { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                INVALIDATION_MESSAGE.to_string(),
                Level::WARN,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                INVALID_CREDS_MESSAGE.to_string(),
                Level::INFO,
            ),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message.clone(), Level::INFO),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                format!("{resource} not found"),
                Level::INFO,
            ),
            AppError::TokenValidation(_) => (
                StatusCode::UNAUTHORIZED,
                INVALID_CREDS_MESSAGE.to_string(),
                Level::ERROR,
            ),
            AppError::Repo(_) | AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
                Level::ERROR,
            ),
        };

        let details = match err {
            AppError::UnprocessableEntity { details } => Some(details.clone()),
            _ => None,
        };

        // Auth failures are routine; keep their logs to one line. Error-level
        // failures carry the full source chain for forensics.
        let log_detail = if level == Level::ERROR {
            source_chain(err)
        } else {
            err.to_string()
        };

        Self {
            status,
            message,
            details,
            level,
            log_detail,
        }
    }
}

fn source_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        out.push_str(": ");
        out.push_str(&source.to_string());
        current = source.source();
    }
    out
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let meta = ErrorMeta::from(&self);

        // Path is unknown at this depth; the error_responder middleware
        // rewrites the body with the request path and writes the log line.
        let mut dto = ErrorDto::new(meta.message.clone(), String::new(), meta.status);
        dto.details = meta.details.clone();

        let mut response = (meta.status, Json(dto)).into_response();
        response.extensions_mut().insert(meta);
        response
    }
}
