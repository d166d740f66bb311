//! Inventory API client.
//!
//! # Responsibilities
//! - Build the stock lookup envelope and POST it with a bounded timeout
//! - Classify every failure mode into an [`UpstreamError`]
//! - Normalize successful payloads into [`ProductData`]
//! - Provide a connectivity check

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ConfigError, UpstreamConfig};
use crate::error::{ErrorCode, ServiceResult};
use crate::observability::metrics;
use crate::upstream::normalize::normalize;
use crate::upstream::types::{ProductData, UpstreamError};

/// Remote procedure invoked for stock lookups.
pub const STOCK_CALL: &str = "ObterEstoqueProduto";

/// Date format the inventory API expects.
pub const UPSTREAM_DATE_FORMAT: &str = "%d/%m/%Y";

static NOT_FOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(não encontrad|nao encontrad|not found)").unwrap()
});

#[derive(Debug, Serialize)]
struct StockRequest<'a> {
    call: &'static str,
    app_key: &'a str,
    app_secret: &'a str,
    param: [StockParam<'a>; 1],
}

#[derive(Debug, Serialize)]
struct StockParam<'a> {
    #[serde(rename = "cCodigo")]
    code: &'a str,
    #[serde(rename = "nIdProduto")]
    product_id: i64,
    #[serde(rename = "cEAN")]
    ean: &'static str,
    #[serde(rename = "cCodInt")]
    internal_code: &'static str,
    #[serde(rename = "dDia")]
    day: &'a str,
}

/// Client for the inventory stock API.
///
/// Cheap to share behind an `Arc`; the inner `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct OmieClient {
    http: reqwest::Client,
    base_url: url::Url,
    app_key: String,
    app_secret: String,
    timeout: Duration,
}

impl std::fmt::Debug for OmieClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmieClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OmieClient {
    /// Create a client, failing fast on missing credentials or a bad URL.
    pub fn new(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let raw_url = config.base_url.trim();
        if raw_url.is_empty() {
            return Err(ConfigError::Missing("OMIE_API_URL"));
        }
        if config.app_key.trim().is_empty() {
            return Err(ConfigError::Missing("OMIE_APP_KEY"));
        }
        if config.app_secret.trim().is_empty() {
            return Err(ConfigError::Missing("OMIE_APP_SECRET"));
        }

        let base_url = url::Url::parse(raw_url).map_err(|e| ConfigError::Invalid {
            key: "upstream.base_url",
            message: format!("'{}' is not a valid URL: {}", raw_url, e),
        })?;

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "upstream",
                message: format!("failed to build HTTP client: {}", e),
            })?;

        tracing::info!(
            base_url = %base_url,
            timeout_secs = timeout.as_secs(),
            "Inventory client initialized"
        );

        Ok(Self {
            http,
            base_url,
            app_key: config.app_key.trim().to_string(),
            app_secret: config.app_secret.trim().to_string(),
            timeout,
        })
    }

    /// Look up stock for `code`, on `date` (`DD/MM/YYYY`) or today.
    pub async fn search(&self, code: &str, date: Option<&str>) -> ServiceResult<ProductData> {
        let start = Instant::now();
        let result = self.fetch(code, date).await;

        match &result {
            Ok(_) => metrics::record_upstream_call("success", start),
            Err(e) => {
                metrics::record_upstream_call(e.outcome(), start);
                tracing::debug!(code, error = %e, "Inventory lookup failed");
            }
        }

        result.map_err(Into::into)
    }

    /// Check connectivity with a code that cannot exist.
    ///
    /// A not-found answer proves the API is reachable and the credentials work.
    pub async fn test_connection(&self) -> bool {
        let code = sentinel_code();
        match self.search(&code, None).await {
            Err(e) if e.code() == ErrorCode::ProductNotFound => true,
            Ok(_) => {
                tracing::warn!(code = %code, "Connection check unexpectedly found a product");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Connection check failed");
                false
            }
        }
    }

    async fn fetch(&self, code: &str, date: Option<&str>) -> Result<ProductData, UpstreamError> {
        let today;
        let day = match date {
            Some(d) => d,
            None => {
                today = chrono::Local::now().format(UPSTREAM_DATE_FORMAT).to_string();
                &today
            }
        };

        let envelope = StockRequest {
            call: STOCK_CALL,
            app_key: &self.app_key,
            app_secret: &self.app_secret,
            param: [StockParam {
                code,
                product_id: 0,
                ean: "",
                internal_code: "",
                day,
            }],
        };

        tracing::debug!(code, day, "Calling inventory API");

        let response = self
            .http
            .post(self.base_url.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::MalformedPayload(format!("failed to read response body: {}", e))
            }
        })?;

        classify_response(status, &body, code)
    }
}

/// Map a `reqwest` error raised before any response arrived.
fn classify_transport(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else if err.is_connect() || err.is_request() {
        UpstreamError::Transport(err.to_string())
    } else if err.is_body() || err.is_decode() {
        UpstreamError::MalformedPayload(err.to_string())
    } else {
        UpstreamError::Unclassified(err.to_string())
    }
}

/// Classify a received response.
///
/// Priority: empty body, unparseable body, fault text, error status, success.
pub fn classify_response(
    status: StatusCode,
    body: &str,
    code: &str,
) -> Result<ProductData, UpstreamError> {
    if body.trim().is_empty() {
        return Err(if status.is_success() {
            UpstreamError::MalformedPayload("empty response".to_string())
        } else {
            UpstreamError::HttpStatus {
                status: status.as_u16(),
                body: String::new(),
            }
        });
    }

    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(UpstreamError::HttpStatus {
                status: status.as_u16(),
                body: body.to_string(),
            })
        }
        Err(_) => return Err(UpstreamError::MalformedPayload("non-JSON response".to_string())),
    };

    let Value::Object(payload) = parsed else {
        return Err(if status.is_success() {
            UpstreamError::MalformedPayload("response is not a JSON object".to_string())
        } else {
            UpstreamError::HttpStatus {
                status: status.as_u16(),
                body: body.to_string(),
            }
        });
    };

    if let Some(fault) = fault_text(&payload, status) {
        return Err(if NOT_FOUND.is_match(&fault) {
            UpstreamError::NotFound(code.to_string())
        } else {
            UpstreamError::DomainFault(fault)
        });
    }

    if !status.is_success() {
        return Err(UpstreamError::HttpStatus {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    Ok(normalize(code, &payload))
}

fn fault_text(payload: &serde_json::Map<String, Value>, status: StatusCode) -> Option<String> {
    let text = |key: &str| match payload.get(key) {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    };

    // `message` also appears on successful payloads, so it only counts on error statuses.
    text("faultstring")
        .or_else(|| text("error"))
        .or_else(|| (!status.is_success()).then(|| text("message")).flatten())
}

fn sentinel_code() -> String {
    format!(
        "TEST_CONNECTION_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, key: &str, secret: &str) -> UpstreamConfig {
        UpstreamConfig {
            base_url: url.to_string(),
            app_key: key.to_string(),
            app_secret: secret.to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_new_requires_credentials() {
        let err = OmieClient::new(&config("", "k", "s")).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OMIE_API_URL")));

        let err = OmieClient::new(&config("http://omie.test/api", " ", "s")).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OMIE_APP_KEY")));

        let err = OmieClient::new(&config("http://omie.test/api", "k", "")).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OMIE_APP_SECRET")));

        let err = OmieClient::new(&config("not a url", "k", "s")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "upstream.base_url", .. }));

        assert!(OmieClient::new(&config("http://omie.test/api", "k", "s")).is_ok());
    }

    #[test]
    fn test_request_envelope_shape() {
        let envelope = StockRequest {
            call: STOCK_CALL,
            app_key: "key",
            app_secret: "secret",
            param: [StockParam {
                code: "PRD00003",
                product_id: 0,
                ean: "",
                internal_code: "",
                day: "01/02/2025",
            }],
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["call"], "ObterEstoqueProduto");
        assert_eq!(json["app_key"], "key");
        assert_eq!(json["param"][0]["cCodigo"], "PRD00003");
        assert_eq!(json["param"][0]["nIdProduto"], 0);
        assert_eq!(json["param"][0]["cEAN"], "");
        assert_eq!(json["param"][0]["dDia"], "01/02/2025");
    }

    #[test]
    fn test_success_is_normalized() {
        let body = r#"{"nIdProduto": 5, "cCodigo": "PRD1", "cDescricao": "Item", "nCMC": 2.5, "fIsico": 4}"#;
        let data = classify_response(StatusCode::OK, body, "PRD1").unwrap();
        assert_eq!(data.id, 5);
        assert_eq!(data.total_physical_stock, 4.0);
    }

    #[test]
    fn test_not_found_fault() {
        for fault in [
            "ERROR: Produto não encontrado!",
            "Produto NAO ENCONTRADO",
            "Product not found",
        ] {
            let body = serde_json::json!({ "faultstring": fault, "faultcode": "SOAP-ENV:Client-103" });
            let err = classify_response(StatusCode::INTERNAL_SERVER_ERROR, &body.to_string(), "PRD9")
                .unwrap_err();
            assert_eq!(err, UpstreamError::NotFound("PRD9".to_string()), "fault: {}", fault);
        }
    }

    #[test]
    fn test_other_fault_is_domain_fault() {
        let body = r#"{"faultstring": "Chave de acesso inválida"}"#;
        let err = classify_response(StatusCode::OK, body, "PRD1").unwrap_err();
        assert_eq!(err, UpstreamError::DomainFault("Chave de acesso inválida".to_string()));
    }

    #[test]
    fn test_message_field_only_counts_on_error_status() {
        let body = r#"{"message": "Bad request", "fIsico": 1}"#;
        let err = classify_response(StatusCode::BAD_REQUEST, body, "PRD1").unwrap_err();
        assert_eq!(err, UpstreamError::DomainFault("Bad request".to_string()));

        assert!(classify_response(StatusCode::OK, body, "PRD1").is_ok());
    }

    #[test]
    fn test_error_field_is_fault_on_success_status() {
        let err = classify_response(StatusCode::OK, r#"{"error": "Produto não encontrado"}"#, "PRD1")
            .unwrap_err();
        assert_eq!(err, UpstreamError::NotFound("PRD1".to_string()));

        let err = classify_response(StatusCode::OK, r#"{"error": "Limite de consumo excedido"}"#, "PRD1")
            .unwrap_err();
        assert_eq!(err, UpstreamError::DomainFault("Limite de consumo excedido".to_string()));

        let data = classify_response(StatusCode::OK, r#"{"error": "  ", "fIsico": 2}"#, "PRD1").unwrap();
        assert_eq!(data.total_physical_stock, 2.0);
    }

    #[test]
    fn test_empty_and_non_json_bodies() {
        let err = classify_response(StatusCode::OK, "   ", "PRD1").unwrap_err();
        assert!(matches!(err, UpstreamError::MalformedPayload(_)));

        let err = classify_response(StatusCode::OK, "<html>ok</html>", "PRD1").unwrap_err();
        assert_eq!(err, UpstreamError::MalformedPayload("non-JSON response".to_string()));

        let err = classify_response(StatusCode::OK, "[1, 2]", "PRD1").unwrap_err();
        assert!(matches!(err, UpstreamError::MalformedPayload(_)));

        let err = classify_response(StatusCode::BAD_GATEWAY, "<html>down</html>", "PRD1")
            .unwrap_err();
        assert!(matches!(err, UpstreamError::HttpStatus { status: 502, .. }));
    }

    #[test]
    fn test_error_status_without_fault() {
        let err = classify_response(StatusCode::INTERNAL_SERVER_ERROR, "{}", "PRD1").unwrap_err();
        assert_eq!(
            err,
            UpstreamError::HttpStatus {
                status: 500,
                body: "{}".to_string()
            }
        );
    }

    #[test]
    fn test_sentinel_code_is_unique() {
        let a = sentinel_code();
        let b = sentinel_code();
        assert!(a.starts_with("TEST_CONNECTION_"));
        assert_ne!(a, b);
    }
}
