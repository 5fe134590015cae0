//! Error taxonomy shared by every layer of the service.
//!
//! Every failure that reaches a handler boundary is one of the [`AppError`]
//! variants, and every variant renders the same wire shape:
//!
//! ```json
//! { "success": false, "message": "Email is required", "field": "email" }
//! ```
//!
//! Internal failures keep their detail in the logs; the client only sees a
//! generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Message returned for every 500-class failure.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Missing or malformed input (400). `field` names the offending input when known.
    Validation {
        field: Option<&'static str>,
        message: String,
    },
    /// Bad credentials or a missing/invalid token (401). Messages stay generic.
    Authentication(String),
    /// Authenticated but not allowed, e.g. a student on an admin route (403).
    Forbidden(String),
    /// Referenced account, event or enrollment is absent (404).
    NotFound(String),
    /// Duplicate email or duplicate enrollment (400, distinct kind from `Validation`).
    Conflict(String),
    /// Store unavailable or anything unexpected (500). The detail is logged, never sent.
    Internal(String),
}

impl AppError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn internal(detail: impl fmt::Display) -> Self {
        Self::Internal(detail.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message a client is allowed to see.
    pub fn public_message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::Authentication(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message) => message,
            Self::Internal(_) => INTERNAL_MESSAGE,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(detail) => write!(f, "internal error: {}", detail),
            other => write!(f, "{}", other.public_message()),
        }
    }
}

impl std::error::Error for AppError {}

/// ErrorBody
///
/// Wire shape of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub success: bool,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed with internal error");
        }

        let field = match &self {
            Self::Validation { field, .. } => *field,
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            message: self.public_message(),
            field,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(format!("store error: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("path rejected: {}", rejection.body_text());
        Self::validation("Invalid identifier in path")
    }
}

/// Whether a store error is a violation of a uniqueness constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
