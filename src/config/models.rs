// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Backend addresses in rotation order.
    #[serde(default = "default_backends")]
    pub backends: Vec<String>,

    #[serde(default)]
    pub health_check: HealthCheckConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Probe every backend once before the listener binds.
    #[serde(default = "default_true")]
    pub initial_probe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,

    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            bail!("at least one backend must be configured");
        }
        self.health_check.validate()?;

        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            bail!("metrics path must start with '/': {}", self.metrics.path);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backends: default_backends(),
            health_check: HealthCheckConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            bail!("health_check.interval_ms must be greater than zero");
        }
        if self.timeout_ms == 0 {
            bail!("health_check.timeout_ms must be greater than zero");
        }
        if self.timeout_ms >= self.interval_ms {
            bail!(
                "health_check.timeout_ms ({}) must be shorter than interval_ms ({})",
                self.timeout_ms,
                self.interval_ms
            );
        }
        Ok(())
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            initial_probe: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_backends() -> Vec<String> {
    (8081..=8083)
        .map(|port| format!("http://localhost:{port}"))
        .collect()
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_timeout_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backends.len(), 3);
        assert_eq!(config.health_check.interval(), Duration::from_secs(10));
        assert_eq!(config.health_check.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_timeout_not_shorter_than_interval() {
        let mut config = Config::default();
        config.health_check.timeout_ms = config.health_check.interval_ms;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_backend_list() {
        let config = Config {
            backends: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = "backends:\n  - http://10.0.0.1:9000\nhealth_check:\n  interval_ms: 500\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.backends, vec!["http://10.0.0.1:9000".to_string()]);
        assert_eq!(config.health_check.interval_ms, 500);
        assert_eq!(config.health_check.timeout_ms, 2_000);
        assert!(config.health_check.initial_probe);
        assert_eq!(config.listen.port(), 8080);
        assert!(!config.metrics.enabled);
    }
}
