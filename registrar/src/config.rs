use register_client::config::Config as ClientConfig;
use register_common::kubernetes::Credentials;
use serde::Deserialize;
use std::fs::File;

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
pub struct KubernetesConfig {
    #[serde(default)]
    pub credentials: Credentials,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 9095,
        }
    }
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
pub struct Config {
    pub logging: Option<LoggingConfig>,
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub admin_listener: Listener,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_listener.port == 0 {
            return Err(ConfigError::InvalidValue("admin_listener.port must not be 0"));
        }
        if let Some(metrics) = &self.metrics {
            if metrics.statsd_port == 0 {
                return Err(ConfigError::InvalidValue("metrics.statsd_port must not be 0"));
            }
            if metrics.statsd_host.is_empty() {
                return Err(ConfigError::InvalidValue("metrics.statsd_host must not be empty"));
            }
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidValue(&'static str),
}
