//! Service error model.
//!
//! # Data Flow
//! ```text
//! validation failures ─┐
//! guard rejections  ───┼──▶ ServiceError ──▶ IntoResponse ──▶ error envelope
//! UpstreamError     ───┘        (stable code + HTTP status)
//! ```
//!
//! # Design Decisions
//! - `ServiceError` is the only error shape the response layer ever sees
//! - Internal detail is logged, never rendered on the wire
//! - Every error is logged exactly once, when it is turned into a response

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::http::response::ErrorEnvelope;

/// Stable error codes exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    ProductNotFound,
    OmieApiError,
    InternalError,
    UnsupportedMediaType,
    RequestTooLarge,
    RateLimitError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::ProductNotFound => "PRODUCT_NOT_FOUND",
            ErrorCode::OmieApiError => "OMIE_API_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ErrorCode::RequestTooLarge => "REQUEST_TOO_LARGE",
            ErrorCode::RateLimitError => "RATE_LIMIT_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    /// The (sanitized) value that was rejected.
    #[serde(rename = "value")]
    pub rejected_value: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        rejected_value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rejected_value: rejected_value.into(),
        }
    }
}

/// Error returned by every fallible request-path operation.
#[derive(Debug, Clone, Error)]
#[error("{code} ({status}): {message}")]
pub struct ServiceError {
    status: StatusCode,
    code: ErrorCode,
    message: String,
    details: Vec<ValidationError>,
    retry_after_secs: Option<u64>,
    internal_detail: Option<String>,
}

impl ServiceError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Vec::new(),
            retry_after_secs: None,
            internal_detail: None,
        }
    }

    /// Aggregated validation failure (400).
    pub fn validation(details: Vec<ValidationError>) -> Self {
        let message = match details.len() {
            1 => details[0].message.clone(),
            n => format!("Request validation failed with {} errors", n),
        };
        Self {
            details,
            ..Self::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
        }
    }

    pub fn product_not_found(code: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorCode::ProductNotFound,
            format!("Product '{}' not found", code),
        )
    }

    /// Upstream failure; `status` is 502, 503 or 504 depending on the failure class.
    pub fn upstream(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, ErrorCode::OmieApiError, message)
    }

    /// Unclassified failure. The detail is logged but never sent to the client.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            "Internal server error",
        )
        .with_internal_detail(detail)
    }

    pub fn unsupported_media_type(content_type: Option<&str>) -> Self {
        let message = match content_type {
            Some(ct) => format!("Unsupported content type '{}'", ct),
            None => "Missing Content-Type header".to_string(),
        };
        Self::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCode::UnsupportedMediaType,
            message,
        )
    }

    /// `declared` is the `Content-Length`, when the client sent one.
    pub fn request_too_large(declared: Option<u64>, max: u64) -> Self {
        let message = match declared {
            Some(len) => format!("Request body of {} bytes exceeds the {} byte limit", len, max),
            None => format!("Request body exceeds the {} byte limit", max),
        };
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, ErrorCode::RequestTooLarge, message)
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            retry_after_secs: Some(retry_after_secs),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                ErrorCode::RateLimitError,
                format!("Too many requests, retry after {} seconds", retry_after_secs),
            )
        }
    }

    pub fn with_internal_detail(mut self, detail: impl Into<String>) -> Self {
        self.internal_detail = Some(detail.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &[ValidationError] {
        &self.details
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after_secs
    }

    pub fn internal_detail(&self) -> Option<&str> {
        self.internal_detail.as_deref()
    }

    /// Wire representation of this error.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(
            self.message.clone(),
            self.code,
            (!self.details.is_empty()).then(|| self.details.clone()),
        )
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                code = %self.code,
                status = self.status.as_u16(),
                message = %self.message,
                detail = self.internal_detail.as_deref().unwrap_or(""),
                "Request failed"
            );
        } else {
            tracing::warn!(
                code = %self.code,
                status = self.status.as_u16(),
                message = %self.message,
                details = ?self.details,
                "Request rejected"
            );
        }

        let mut response = (self.status, Json(self.envelope())).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Result type for request-path operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
