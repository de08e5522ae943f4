//! Error bodies and status mapping.
//!
//! Every rejection maps to a stable status so clients can tell "try later"
//! (429, 403 + Cache-Control) from "malformed" (422) from "broken" (500).

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::{ClaimError, StoreError};

/// JSON body for every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub details: String,
}

impl ErrorBody {
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
        }
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `Cache-Control: public, max-age=<secs>`.
pub fn cache_rule(duration: Duration) -> HeaderValue {
    HeaderValue::from_str(&format!("public, max-age={}", duration.as_secs()))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}

/// Errors surfaced by route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("pixel ({x}, {y}) does not exist")]
    UnknownCell { x: i64, y: i64 },

    /// Carries the advisory cool-down sent back as Cache-Control.
    #[error("already painted maximum of pixels")]
    QuotaExceeded { cooldown: Duration },

    #[error("field already initialized")]
    AlreadyInitialized,

    #[error("field is not initialized")]
    NotInitialized,

    #[error("cannot determine your soul")]
    MissingSoul,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// A body that could not be read or decoded. Over-limit bodies are 413,
    /// everything else is a validation failure.
    pub fn from_json_rejection(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::validation("invalid form")
        }
    }

    /// Translate a claim rejection, attaching the configured cool-down.
    pub fn from_claim(err: ClaimError, cooldown: Duration) -> Self {
        match err {
            ClaimError::QuotaExceeded { .. } => ApiError::QuotaExceeded { cooldown },
            ClaimError::UnknownCell { x, y } => ApiError::UnknownCell { x, y },
            ClaimError::NotInitialized => ApiError::NotInitialized,
            ClaimError::Store(e) => ApiError::Storage(e),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnknownCell { .. } => StatusCode::NOT_FOUND,
            ApiError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            ApiError::AlreadyInitialized | ApiError::NotInitialized => StatusCode::CONFLICT,
            ApiError::MissingSoul | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "Storage error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, ErrorBody::new(details)).into_response();
        if let ApiError::QuotaExceeded { cooldown } = self {
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, cache_rule(cooldown));
        }
        response
    }
}
