//! Application error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid stock symbol")]
    InvalidSymbol,

    #[error("API rate limit exceeded")]
    RateLimited,

    #[error("No data available")]
    NoData,

    #[error("No chart data available")]
    NoChartData,

    #[error("Upstream service unavailable")]
    UpstreamUnavailable,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("User already exists")]
    DuplicateIdentity,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for each error kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidSymbol => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NoData => StatusCode::NOT_FOUND,
            ApiError::NoChartData => StatusCode::NOT_FOUND,
            ApiError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::DuplicateIdentity => StatusCode::CONFLICT,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Serialization(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal errors are not echoed back.
    fn detail(&self) -> String {
        match self {
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Serialization(_)
            | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// JSON error body returned to the client
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
        }

        let body = ErrorBody {
            detail: self.detail(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            tracing::warn!("Upstream request failed: {}", err);
            ApiError::UpstreamUnavailable
        } else {
            ApiError::Upstream(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
