//! Product endpoint handlers.
//!
//! # Data Flow
//! ```text
//! POST /product/search
//!     → [rate limit → content type → declared size] (layers in server.rs)
//!     → body read with the byte ceiling
//!     → JSON / form decode
//!     → shallow sanitization
//!     → ValidationPipeline
//!     → OmieClient::search
//!     → SearchEnvelope or ServiceError
//! ```

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Map, Value};

use crate::error::{ServiceError, ServiceResult, ValidationError};
use crate::http::request::RequestIdExt;
use crate::http::response::{
    timestamp, ConnectionEnvelope, HealthStatus, SearchEnvelope, SearchStats, StatsEnvelope,
};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::sanitize_body;
use crate::validation::rules::{DATE_FIELD, PRODUCT_CODE_FIELD};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// `POST /product/search`
pub async fn search_product(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().to_string();

    let response = match search(&state, request).await {
        Ok(envelope) => {
            tracing::info!(
                request_id = %request_id,
                code = %envelope.data.code,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Product found"
            );
            (StatusCode::OK, Json(envelope)).into_response()
        }
        Err(err) => err.into_response(),
    };

    metrics::record_request("search", response.status().as_u16(), start);
    response
}

async fn search(state: &AppState, request: Request<Body>) -> ServiceResult<SearchEnvelope> {
    let max = state.guards.max_body_bytes();
    let (parts, body) = request.into_parts();

    let bytes = read_body(body, max).await?;

    let mut body = decode_body(&parts.headers, &bytes)?;
    sanitize_body(&mut body);

    let fields = state.pipeline.validate_value(&body)?;
    let code = fields
        .text(PRODUCT_CODE_FIELD)
        .ok_or_else(|| ServiceError::internal("validated product code missing"))?;
    let date = fields.text(DATE_FIELD);

    tracing::debug!(code, date, "Searching product");

    let data = state.client.search(code, date).await?;
    Ok(SearchEnvelope::found(data))
}

/// Read the whole body, failing with 413 once it grows past `max` bytes.
async fn read_body(body: Body, max: u64) -> ServiceResult<Bytes> {
    let limit = usize::try_from(max).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ServiceError::request_too_large(None, max)),
        Err(e) => Err(ServiceError::internal(format!("failed to read request body: {}", e))),
    }
}

/// Decode a JSON or form body into a JSON value.
///
/// An empty body decodes to an empty object so validation reports the missing fields.
fn decode_body(headers: &HeaderMap, bytes: &Bytes) -> ServiceResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false);

    if is_form {
        let fields = url::form_urlencoded::parse(bytes)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect::<Map<_, _>>();
        return Ok(Value::Object(fields));
    }

    serde_json::from_slice(bytes).map_err(|e| {
        ServiceError::validation(vec![ValidationError::new(
            "body",
            format!("Request body is not valid JSON: {}", e),
            "",
        )])
    })
}

/// `GET /product/test-connection`
pub async fn test_connection(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let connected = state.client.test_connection().await;

    tracing::info!(connected, "Connection check finished");

    let response = Json(ConnectionEnvelope::new(connected)).into_response();
    metrics::record_request("test_connection", response.status().as_u16(), start);
    response
}

/// `GET /product/stats`
pub async fn stats() -> Response {
    let start = Instant::now();
    let response = Json(StatsEnvelope {
        success: true,
        data: SearchStats::default(),
    })
    .into_response();
    metrics::record_request("stats", response.status().as_u16(), start);
    response
}

/// `GET /health`
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_decode_json_body() {
        let body = decode_body(
            &headers("application/json"),
            &Bytes::from_static(br#"{"productCode": "prd1"}"#),
        )
        .unwrap();
        assert_eq!(body["productCode"], "prd1");
    }

    #[test]
    fn test_decode_empty_body_is_empty_object() {
        let body = decode_body(&headers("application/json"), &Bytes::from_static(b"  ")).unwrap();
        assert_eq!(body, Value::Object(Map::new()));
    }

    #[test]
    fn test_decode_form_body() {
        let body = decode_body(
            &headers("application/x-www-form-urlencoded; charset=utf-8"),
            &Bytes::from_static(b"productCode=prd%2D1&date=01%2F02%2F2025"),
        )
        .unwrap();
        assert_eq!(body["productCode"], "prd-1");
        assert_eq!(body["date"], "01/02/2025");
    }

    #[tokio::test]
    async fn test_read_body_over_limit_is_too_large() {
        let err = read_body(Body::from(vec![b'x'; 2048]), 1024).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code(), ErrorCode::RequestTooLarge);

        let bytes = read_body(Body::from("{}"), 1024).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"{}"));
    }

    #[tokio::test]
    async fn test_read_body_stream_failure_is_internal() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"productCode\":")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset")),
        ];
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        let err = read_body(body, 1024).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(err.internal_detail().unwrap().contains("failed to read request body"));
    }

    #[test]
    fn test_malformed_json_is_validation_error() {
        let err = decode_body(&headers("application/json"), &Bytes::from_static(b"{\"productCode\":"))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.details()[0].field, "body");
    }
}
