//! Process configuration read from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use api::JobQueueConfig;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub job_queue: JobQueueConfig,
    /// How long open connections get to finish once shutdown starts.
    pub http_grace: Duration,
    /// How long in-flight jobs get to finish after the HTTP layer stopped.
    pub worker_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            job_queue: JobQueueConfig::default(),
            http_grace: Duration::from_secs(10),
            worker_grace: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Build a config from environment variables.
    ///
    /// - `PORT` (default: `8080`)
    /// - `HOST` (default: `0.0.0.0`)
    ///
    /// Worker count (5) and queue capacity (100) are fixed at startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            config.port = parse("PORT", port)?;
        }
        if let Some(host) = lookup("HOST").filter(|v| !v.is_empty()) {
            config.host = parse("HOST", host)?;
        }
        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
