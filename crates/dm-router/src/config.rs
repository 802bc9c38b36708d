//! Router configuration

use std::time::Duration;

use dm_protocol::SlotOffsetConfig;
use serde::{Deserialize, Serialize};

use crate::pool::PoolOptions;

/// Telnet console port
pub const DEFAULT_PORT: u16 = 23;

/// Connection and calibration settings for one switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Switch host name or address
    #[serde(default)]
    pub host: String,
    /// Console port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Idle time before the pooled connection is redialed (ms)
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Minimum spacing between commands (ms); the settle delay is twice this
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// TCP connect timeout (ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Deadline for one operation when the caller supplies none (ms)
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Slot calibration; without it the router only lists routes
    #[serde(default)]
    pub calibration: Option<SlotOffsetConfig>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_ttl_ms() -> u64 {
    60_000
}

fn default_delay_ms() -> u64 {
    500
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_command_timeout_ms() -> u64 {
    10_000
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            ttl_ms: default_ttl_ms(),
            delay_ms: default_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            calibration: None,
        }
    }
}

impl RouterConfig {
    /// Config for `host` with every other field at its default
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// `host:port` string for dialing
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool timing derived from this config
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            ttl: Duration::from_millis(self.ttl_ms),
            delay: Duration::from_millis(self.delay_ms),
        }
    }

    /// TCP connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Default per-operation deadline
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RouterConfig::for_host("10.0.0.5");
        assert_eq!(cfg.address(), "10.0.0.5:23");
        assert_eq!(cfg.pool_options().delay, Duration::from_millis(500));
        assert_eq!(cfg.pool_options().ttl, Duration::from_secs(60));
        assert_eq!(cfg.command_timeout(), Duration::from_secs(10));
        assert!(cfg.calibration.is_none());
    }

    #[test]
    fn test_host_optional_in_serialized_form() {
        let cfg: RouterConfig = serde_json::from_str(r#"{"port": 2323}"#).unwrap();
        assert!(cfg.host.is_empty());
        assert_eq!(cfg.port, 2323);
        assert_eq!(cfg.ttl_ms, 60_000);
    }
}
