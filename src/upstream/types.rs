//! Upstream types and error taxonomy.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ServiceError;

/// Normalized product stock data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub id: i64,
    pub code: String,
    pub description: String,
    pub average_cost: f64,
    pub total_physical_stock: f64,
}

/// Every way an upstream lookup can fail.
///
/// Never leaves the upstream module; converted into a [`ServiceError`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UpstreamError {
    /// No response within the configured timeout.
    #[error("upstream timed out")]
    Timeout,

    /// Error status with no usable fault text.
    #[error("upstream returned HTTP {status}")]
    HttpStatus { status: u16, body: String },

    /// Request sent but no response received.
    #[error("transport error: {0}")]
    Transport(String),

    /// Empty, non-JSON or wrongly shaped body.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Fault reported inside the payload.
    #[error("upstream fault: {0}")]
    DomainFault(String),

    /// The upstream says the product does not exist.
    #[error("product {0} not found")]
    NotFound(String),

    /// Anything the classification above does not cover.
    #[error("unclassified upstream failure: {0}")]
    Unclassified(String),
}

impl UpstreamError {
    /// Label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            UpstreamError::Timeout => "timeout",
            UpstreamError::HttpStatus { .. } => "http_status",
            UpstreamError::Transport(_) => "transport",
            UpstreamError::MalformedPayload(_) => "malformed",
            UpstreamError::DomainFault(_) => "fault",
            UpstreamError::NotFound(_) => "not_found",
            UpstreamError::Unclassified(_) => "unclassified",
        }
    }
}

/// Whether a body looks like something other than JSON (HTML error pages, plain text).
pub(crate) fn looks_non_json(body: &str) -> bool {
    let trimmed = body.trim_start();
    !(trimmed.starts_with('{') || trimmed.starts_with('['))
}

impl From<UpstreamError> for ServiceError {
    fn from(err: UpstreamError) -> Self {
        let detail = err.to_string();
        match err {
            UpstreamError::Timeout => ServiceError::upstream(
                StatusCode::GATEWAY_TIMEOUT,
                "Inventory API did not respond in time",
            ),
            UpstreamError::HttpStatus { status, body } => {
                let message = if !body.trim().is_empty() && looks_non_json(&body) {
                    format!("Inventory API returned a non-JSON error response (HTTP {})", status)
                } else {
                    format!("Inventory API returned HTTP {}", status)
                };
                ServiceError::upstream(StatusCode::BAD_GATEWAY, message)
                    .with_internal_detail(truncate_for_log(&body))
            }
            UpstreamError::Transport(message) => ServiceError::upstream(
                StatusCode::SERVICE_UNAVAILABLE,
                "Inventory API is unreachable",
            )
            .with_internal_detail(message),
            UpstreamError::MalformedPayload(reason) => ServiceError::upstream(
                StatusCode::BAD_GATEWAY,
                format!("Inventory API returned an invalid response: {}", reason),
            ),
            UpstreamError::DomainFault(fault) => ServiceError::upstream(
                StatusCode::BAD_GATEWAY,
                format!("Inventory API error: {}", fault),
            ),
            UpstreamError::NotFound(code) => ServiceError::product_not_found(&code),
            UpstreamError::Unclassified(_) => ServiceError::internal(detail),
        }
    }
}

fn truncate_for_log(body: &str) -> String {
    const MAX: usize = 512;
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX).collect();
        format!("{}...", head)
    }
}
