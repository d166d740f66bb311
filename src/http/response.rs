//! Response envelopes.
//!
//! Every body the gateway writes is one of these shapes:
//! `{success: true, ...}` on success, [`ErrorEnvelope`] otherwise.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ValidationError};
use crate::upstream::ProductData;

/// Current time as an RFC 3339 UTC timestamp with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Uniform error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationError>>,
    pub timestamp: String,
}

impl ErrorEnvelope {
    pub fn new(error: String, code: ErrorCode, details: Option<Vec<ValidationError>>) -> Self {
        Self {
            success: false,
            error,
            code,
            details,
            timestamp: timestamp(),
        }
    }
}

/// Body of a successful product search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEnvelope {
    pub success: bool,
    pub data: ProductData,
    pub message: String,
}

impl SearchEnvelope {
    pub fn found(data: ProductData) -> Self {
        Self {
            message: format!("Product '{}' found", data.code),
            success: true,
            data,
        }
    }
}

/// Body of the connectivity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEnvelope {
    pub success: bool,
    pub connected: bool,
    pub message: String,
    pub timestamp: String,
}

impl ConnectionEnvelope {
    pub fn new(connected: bool) -> Self {
        let message = if connected {
            "Connection to the inventory API is healthy"
        } else {
            "Unable to reach the inventory API"
        };
        Self {
            success: true,
            connected,
            message: message.to_string(),
            timestamp: timestamp(),
        }
    }
}

/// Search statistics. Values are static until real aggregation exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub total_searches: u64,
    pub successful_searches: u64,
    pub failed_searches: u64,
    pub average_response_time: f64,
    pub last_search: Option<String>,
    pub popular_products: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsEnvelope {
    pub success: bool,
    pub data: SearchStats,
}

/// Liveness body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_use_camel_case() {
        let body = serde_json::to_value(StatsEnvelope {
            success: true,
            data: SearchStats::default(),
        })
        .unwrap();
        assert_eq!(body["data"]["totalSearches"], 0);
        assert_eq!(body["data"]["averageResponseTime"], 0.0);
        assert!(body["data"]["lastSearch"].is_null());
        assert!(body["data"]["popularProducts"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_timestamp_is_rfc3339_utc() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
