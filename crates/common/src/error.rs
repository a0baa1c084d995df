use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Common error types used across the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// One failed branch of a concurrent fan-out.
#[derive(Debug)]
pub struct BranchFailure {
    pub label: String,
    pub error: AppError,
}

/// Every failure collected from a concurrent fan-out.
///
/// Nested aggregates are flattened so that callers see the leaf failures,
/// each labelled with the path of branches that produced it.
#[derive(Debug)]
pub struct AggregateError {
    pub total: usize,
    pub failures: Vec<BranchFailure>,
}

impl AggregateError {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            failures: Vec::new(),
        }
    }

    /// Record a failed branch, flattening nested aggregates.
    pub fn push(&mut self, label: impl Into<String>, error: AppError) {
        let label = label.into();
        match error {
            AppError::Aggregate(nested) => {
                for failure in nested.failures {
                    self.failures.push(BranchFailure {
                        label: format!("{label}/{}", failure.label),
                        error: failure.error,
                    });
                }
            }
            other => self.failures.push(BranchFailure {
                label,
                error: other,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(())` when nothing failed, the aggregate otherwise.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Aggregate(self))
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} executions failed: ",
            self.failures.len(),
            self.total
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "[{}] {}", failure.label, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Redis(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Http(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Channel(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Cancelled(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::DeadlineExceeded(msg) => (StatusCode::GATEWAY_TIMEOUT, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Aggregate(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
