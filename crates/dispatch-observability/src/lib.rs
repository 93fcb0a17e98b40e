//! Tracing subscriber and Prometheus exporter setup, plus the counter names the
//! registries record under.

use dispatch_config::ServiceConfig;
use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

pub const REFETCH_TOTAL: &str = "dispatch_registry_refetch_total";
pub const STALE_FETCH_DISCARDED_TOTAL: &str = "dispatch_registry_stale_fetch_discarded_total";
pub const MUTATION_ERRORS_TOTAL: &str = "dispatch_registry_mutation_errors_total";
pub const ASSIGNMENTS_TOTAL: &str = "dispatch_assignments_total";

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
    pub metrics_addr: Option<String>,
}

impl From<&ServiceConfig> for ObservabilityConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            environment: config.environment.to_string(),
            log_level: config.log_level.clone(),
            metrics_addr: config.metrics_addr.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObservabilityHandle {
    pub service_name: String,
    pub metrics_enabled: bool,
}

pub fn init(config: &ObservabilityConfig) -> ObservabilityHandle {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);

    let metrics_enabled = match metrics_listener(config) {
        Some(addr) => install_exporter(config, addr),
        None => false,
    };

    ObservabilityHandle {
        service_name: config.service_name.clone(),
        metrics_enabled,
    }
}

pub fn log_startup(handle: &ObservabilityHandle, environment: &str) {
    tracing::info!(
        service = %handle.service_name,
        environment = %environment,
        metrics_enabled = handle.metrics_enabled,
        "dispatch service starting"
    );
}

fn describe_metrics() {
    describe_counter!(
        REFETCH_TOTAL,
        Unit::Count,
        "Full registry refetches, by table"
    );
    describe_counter!(
        STALE_FETCH_DISCARDED_TOTAL,
        Unit::Count,
        "Fetch results dropped because a newer fetch was issued or the registry was torn down"
    );
    describe_counter!(
        MUTATION_ERRORS_TOTAL,
        Unit::Count,
        "Failed registry writes, by table and operation"
    );
    describe_counter!(
        ASSIGNMENTS_TOTAL,
        Unit::Count,
        "Assignment attempts, by outcome"
    );
}

/// Listener address for the exporter. Unset or unparsable means metrics stay off.
fn metrics_listener(config: &ObservabilityConfig) -> Option<SocketAddr> {
    let raw = config.metrics_addr.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(addr) => Some(addr),
        Err(err) => {
            tracing::warn!(
                service = %config.service_name,
                value = raw,
                error = %err,
                "invalid DISPATCH_METRICS_ADDR, metrics disabled"
            );
            None
        }
    }
}

fn install_exporter(config: &ObservabilityConfig, addr: SocketAddr) -> bool {
    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", config.service_name.clone())
        .add_global_label("environment", config.environment.clone());

    match builder.install() {
        Ok(()) => {
            describe_metrics();
            true
        }
        Err(err) => {
            tracing::warn!(
                service = %config.service_name,
                error = %err,
                "Failed to initialize Prometheus exporter"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(metrics_addr: Option<&str>) -> ObservabilityConfig {
        let service = ServiceConfig::from_lookup("dispatch-api", |key| match key {
            "DISPATCH_METRICS_ADDR" => metrics_addr.map(str::to_string),
            "DISPATCH_ENV" => Some("staging".to_string()),
            _ => None,
        });
        ObservabilityConfig::from(&service)
    }

    #[test]
    fn carries_service_labels() {
        let config = config(Some("127.0.0.1:9464"));
        assert_eq!(config.service_name, "dispatch-api");
        assert_eq!(config.environment, "staging");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn listener_requires_a_socket_address() {
        assert_eq!(
            metrics_listener(&config(Some("127.0.0.1:9464"))),
            Some("127.0.0.1:9464".parse().unwrap())
        );
        assert_eq!(metrics_listener(&config(Some("localhost"))), None);
        assert_eq!(metrics_listener(&config(Some("  "))), None);
        assert_eq!(metrics_listener(&config(None)), None);
    }
}
