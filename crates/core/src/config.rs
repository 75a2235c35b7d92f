use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8900";
pub const DEFAULT_NAMESPACE: &str = "default";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1_000),
            max_backoff: Duration::from_millis(10_000),
        }
    }
}

/// Connection settings for the extraction service. `from_env` layers the
/// `DOCFLOW_*` variables over the defaults; blank values are ignored.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub namespace: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(endpoint) = non_blank(std::env::var("DOCFLOW_ENDPOINT").ok()) {
            config.endpoint = endpoint;
        }
        if let Some(namespace) = non_blank(std::env::var("DOCFLOW_NAMESPACE").ok()) {
            config.namespace = namespace;
        }
        config.api_key = non_blank(std::env::var("DOCFLOW_API_KEY").ok());
        config
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_service() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn blank_values_are_ignored() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(
            non_blank(Some(" http://svc:8900 ".to_string())),
            Some("http://svc:8900".to_string())
        );
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = ClientConfig::default()
            .with_endpoint("http://indexer:8900")
            .with_namespace("research")
            .with_api_key(Some("secret".to_string()));

        assert_eq!(config.endpoint, "http://indexer:8900");
        assert_eq!(config.namespace, "research");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }
}
