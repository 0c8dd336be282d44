//! Configuration loading and validation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Main configuration for the burrow client.
///
/// Every field has a default, so running without a config file works.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root DNS server queried when no cached delegation applies.
    #[serde(default = "default_root_server")]
    pub root_server: IpAddr,

    /// Port DNS servers are queried on.
    #[serde(default = "default_dns_port")]
    pub dns_port: u16,

    /// Seconds to wait for a reply before the single retry.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_seconds: u64,

    /// Metrics exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Expose a `/metrics` endpoint for scraping.
    #[serde(default)]
    pub enabled: bool,

    /// Address the exporter listens on.
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_server: default_root_server(),
            dns_port: default_dns_port(),
            query_timeout_seconds: default_query_timeout(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

const fn default_root_server() -> IpAddr {
    // a.root-servers.net
    IpAddr::V4(Ipv4Addr::new(198, 41, 0, 4))
}

const fn default_dns_port() -> u16 {
    53
}

const fn default_query_timeout() -> u64 {
    5
}

const fn default_metrics_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9100)
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// How long each query attempt waits for a reply.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.query_timeout_seconds == 0 {
            return Err(ConfigError::ZeroQueryTimeout.into());
        }
        Ok(())
    }
}
