//! Request guards applied before any handler work.
//!
//! # Responsibilities
//! - Reject body-carrying requests without an allowed content type (415)
//! - Reject requests whose declared body length exceeds the ceiling (413)
//!
//! # Design Decisions
//! - Declared length is checked before the body is read (early rejection)
//! - Bodies without a declared length are capped when the handler reads them
//! - Rejections use the same error envelope as every other failure

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::LimitsConfig;
use crate::error::{ServiceError, ServiceResult};

/// Content-type and size limits shared by the guard middlewares.
#[derive(Debug, Clone)]
pub struct RequestGuards {
    max_body_bytes: u64,
    allowed_content_types: Vec<String>,
}

impl RequestGuards {
    pub fn new(max_body_bytes: u64, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_body_bytes,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &LimitsConfig) -> Self {
        Self::new(config.max_body_bytes, config.allowed_content_types.clone())
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    /// GET and DELETE pass; every other method needs an allowed type.
    pub fn check_content_type(&self, method: &Method, headers: &HeaderMap) -> ServiceResult<()> {
        if matches!(*method, Method::GET | Method::DELETE) {
            return Ok(());
        }

        let Some(value) = headers.get(header::CONTENT_TYPE) else {
            return Err(ServiceError::unsupported_media_type(None));
        };
        let Ok(raw) = value.to_str() else {
            return Err(ServiceError::unsupported_media_type(Some("<non-ascii>")));
        };

        let media_type = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if self.allowed_content_types.iter().any(|ct| *ct == media_type) {
            Ok(())
        } else {
            Err(ServiceError::unsupported_media_type(Some(raw)))
        }
    }

    /// Reject a declared `Content-Length` above the ceiling.
    pub fn check_declared_length(&self, headers: &HeaderMap) -> ServiceResult<()> {
        let declared = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        match declared {
            Some(len) if len > self.max_body_bytes => Err(ServiceError::request_too_large(
                Some(len),
                self.max_body_bytes,
            )),
            _ => Ok(()),
        }
    }
}

/// Middleware enforcing the content-type guard.
pub async fn content_type_guard(
    State(guards): State<Arc<RequestGuards>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Err(err) = guards.check_content_type(request.method(), request.headers()) {
        return err.into_response();
    }
    next.run(request).await
}

/// Middleware enforcing the declared body size ceiling.
pub async fn body_size_guard(
    State(guards): State<Arc<RequestGuards>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Err(err) = guards.check_declared_length(request.headers()) {
        return err.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::http::{HeaderValue, StatusCode};

    fn guards() -> RequestGuards {
        RequestGuards::new(1024, vec!["application/json".into(), "Application/X-WWW-Form-Urlencoded".into()])
    }

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_get_and_delete_skip_content_type() {
        let g = guards();
        for method in [Method::GET, Method::DELETE] {
            assert!(g.check_content_type(&method, &HeaderMap::new()).is_ok());
        }
        for method in [Method::HEAD, Method::OPTIONS, Method::PATCH] {
            let err = g.check_content_type(&method, &HeaderMap::new()).unwrap_err();
            assert_eq!(err.code(), ErrorCode::UnsupportedMediaType, "method: {}", method);
        }
    }

    #[test]
    fn test_content_type_matching() {
        let g = guards();
        let ok = headers(&[(header::CONTENT_TYPE, "application/json; charset=utf-8")]);
        assert!(g.check_content_type(&Method::POST, &ok).is_ok());

        let ok = headers(&[(header::CONTENT_TYPE, "APPLICATION/JSON")]);
        assert!(g.check_content_type(&Method::PUT, &ok).is_ok());

        let ok = headers(&[(header::CONTENT_TYPE, "application/x-www-form-urlencoded")]);
        assert!(g.check_content_type(&Method::POST, &ok).is_ok());

        let err = g
            .check_content_type(&Method::POST, &headers(&[(header::CONTENT_TYPE, "text/plain")]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.code(), ErrorCode::UnsupportedMediaType);

        let err = g.check_content_type(&Method::POST, &HeaderMap::new()).unwrap_err();
        assert_eq!(err.message(), "Missing Content-Type header");
    }

    #[test]
    fn test_declared_length() {
        let g = guards();
        assert!(g.check_declared_length(&HeaderMap::new()).is_ok());
        assert!(g
            .check_declared_length(&headers(&[(header::CONTENT_LENGTH, "1024")]))
            .is_ok());

        let err = g
            .check_declared_length(&headers(&[(header::CONTENT_LENGTH, "1025")]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code(), ErrorCode::RequestTooLarge);
    }
}
