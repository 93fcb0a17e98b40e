use serde::{Deserialize, Serialize};
use std::{env, fmt};

const DEFAULT_STORE_SCHEMA: &str = "public";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const MIN_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Local,
    Dev,
    Test,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_env(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "local" => Self::Local,
            "dev" | "development" => Self::Dev,
            "test" | "testing" => Self::Test,
            "staging" => Self::Staging,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub environment: Environment,
    pub bind_addr: String,
    pub metrics_addr: Option<String>,
    pub log_level: String,
}

impl ServiceConfig {
    pub fn from_env(default_service_name: &str) -> Self {
        Self::from_lookup(default_service_name, |key| env::var(key).ok())
    }

    pub fn from_lookup(
        default_service_name: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            service_name: lookup("DISPATCH_SERVICE_NAME")
                .unwrap_or_else(|| default_service_name.to_string()),
            environment: Environment::from_env(
                &lookup("DISPATCH_ENV").unwrap_or_else(|| "local".to_string()),
            ),
            bind_addr: lookup("DISPATCH_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            metrics_addr: lookup("DISPATCH_METRICS_ADDR").filter(|value| !value.trim().is_empty()),
            log_level: lookup("DISPATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Connection settings for the backend store. Endpoint and access key have no defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub endpoint: String,
    pub access_key: String,
    pub schema: String,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = required(&lookup, "DISPATCH_STORE_URL")?;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "DISPATCH_STORE_URL",
                value: endpoint,
            });
        }
        let access_key = required(&lookup, "DISPATCH_STORE_KEY")?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_key,
            schema: lookup("DISPATCH_STORE_SCHEMA")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STORE_SCHEMA.to_string()),
            request_timeout_ms: parse_u64(
                &lookup,
                "DISPATCH_STORE_TIMEOUT_MS",
                DEFAULT_STORE_TIMEOUT_MS,
            )?,
            poll_interval_ms: parse_u64(
                &lookup,
                "DISPATCH_STORE_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?
            .max(MIN_POLL_INTERVAL_MS),
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn store_config_requires_url_and_key() {
        let env = vars(&[("DISPATCH_STORE_KEY", "k")]);
        let missing_url = StoreConfig::from_lookup(|key| env.get(key).cloned());
        assert_eq!(
            missing_url.unwrap_err(),
            ConfigError::Missing("DISPATCH_STORE_URL")
        );

        let env = vars(&[
            ("DISPATCH_STORE_URL", "https://store.example.org"),
            ("DISPATCH_STORE_KEY", "   "),
        ]);
        let blank_key = StoreConfig::from_lookup(|key| env.get(key).cloned());
        assert_eq!(blank_key.unwrap_err(), ConfigError::Missing("DISPATCH_STORE_KEY"));
    }

    #[test]
    fn store_config_applies_defaults_and_floor() {
        let env = vars(&[
            ("DISPATCH_STORE_URL", "https://store.example.org/"),
            ("DISPATCH_STORE_KEY", "anon-key"),
            ("DISPATCH_STORE_POLL_INTERVAL_MS", "10"),
        ]);
        let config = StoreConfig::from_lookup(|key| env.get(key).cloned()).unwrap();
        assert_eq!(config.endpoint, "https://store.example.org");
        assert_eq!(config.schema, "public");
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.poll_interval_ms, 250);
    }

    #[test]
    fn store_config_rejects_non_http_endpoint() {
        let env = vars(&[
            ("DISPATCH_STORE_URL", "ftp://store"),
            ("DISPATCH_STORE_KEY", "anon-key"),
        ]);
        let result = StoreConfig::from_lookup(|key| env.get(key).cloned());
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn service_config_defaults() {
        let env = vars(&[("DISPATCH_ENV", "production")]);
        let config = ServiceConfig::from_lookup("dispatch-api", |key| env.get(key).cloned());
        assert_eq!(config.service_name, "dispatch-api");
        assert_eq!(config.environment, Environment::Prod);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.metrics_addr.is_none());
    }
}
