//! Configuration validation.
//!
//! Semantic checks on a deserialized [`GatewayConfig`] (serde handles the
//! syntactic side). Returns every problem found, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path of the offending key (e.g. `rate_limit.window_ms`).
    pub key: &'static str,
    pub message: String,
}

impl ConfigIssue {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Validate the whole configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ConfigIssue::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let upstream = &config.upstream;
    if upstream.base_url.trim().is_empty() {
        issues.push(ConfigIssue::new("upstream.base_url", "must be set (OMIE_API_URL)"));
    } else if let Err(e) = url::Url::parse(upstream.base_url.trim()) {
        issues.push(ConfigIssue::new(
            "upstream.base_url",
            format!("'{}' is not a valid URL: {}", upstream.base_url, e),
        ));
    }
    if upstream.app_key.trim().is_empty() {
        issues.push(ConfigIssue::new("upstream.app_key", "must be set (OMIE_APP_KEY)"));
    }
    if upstream.app_secret.trim().is_empty() {
        issues.push(ConfigIssue::new("upstream.app_secret", "must be set (OMIE_APP_SECRET)"));
    }
    if upstream.timeout_secs == 0 {
        issues.push(ConfigIssue::new("upstream.timeout_secs", "must be greater than 0"));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.window_ms == 0 {
        issues.push(ConfigIssue::new("rate_limit.window_ms", "must be greater than 0"));
    }
    if rate_limit.max_requests == 0 {
        issues.push(ConfigIssue::new("rate_limit.max_requests", "must be greater than 0"));
    }
    if rate_limit.max_clients == 0 {
        issues.push(ConfigIssue::new("rate_limit.max_clients", "must be greater than 0"));
    }
    if rate_limit.sweep_interval_secs == 0 {
        issues.push(ConfigIssue::new(
            "rate_limit.sweep_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.limits.max_body_bytes == 0 {
        issues.push(ConfigIssue::new("limits.max_body_bytes", "must be greater than 0"));
    }
    if config.limits.allowed_content_types.is_empty() {
        issues.push(ConfigIssue::new(
            "limits.allowed_content_types",
            "must list at least one content type",
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        issues.push(ConfigIssue::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.upstream.base_url = "https://app.omie.com.br/api/v1/estoque/resumo/".into();
        config.upstream.app_key = "key".into();
        config.upstream.app_secret = "secret".into();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_default_config_lacks_credentials() {
        let issues = validate_config(&GatewayConfig::default()).unwrap_err();
        let keys: Vec<_> = issues.iter().map(|i| i.key).collect();
        assert_eq!(
            keys,
            vec!["upstream.base_url", "upstream.app_key", "upstream.app_secret"]
        );
    }

    #[test]
    fn test_reports_every_issue() {
        let mut config = valid_config();
        config.upstream.base_url = "not a url".into();
        config.rate_limit.window_ms = 0;
        config.rate_limit.max_requests = 0;
        config.limits.allowed_content_types.clear();
        config.listener.bind_address = "localhost".into();

        let issues = validate_config(&config).unwrap_err();
        assert_eq!(issues.len(), 5);
        assert!(issues[0].to_string().starts_with("listener.bind_address"));
    }
}
