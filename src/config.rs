//! Application configuration.
//!
//! Loaded from a TOML file (default `~/.config/ocpp-gateway/config.toml`,
//! overridable via the `OCPP_CONFIG` environment variable). Missing
//! sections and keys fall back to defaults, so an empty file is valid.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::shared::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ocpp: OcppConfig,
    pub logging: LoggingConfig,
    pub provisioning: ProvisioningConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcppConfig {
    /// Heartbeat interval returned in BootNotification responses.
    pub heartbeat_interval_secs: u16,
    /// How long an outbound command waits for the station's response.
    pub command_timeout_secs: u64,
    /// How often overdue reservations are swept.
    pub reservation_sweep_secs: u64,
    /// Bounded capacity of the in-memory message log.
    pub message_log_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

/// Stations and credentials known to the directory at startup.
///
/// The administrative surface that normally manages these lives outside
/// this gateway; with the in-memory store they are seeded from here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    pub charge_points: Vec<String>,
    pub connectors_per_station: Option<u32>,
    pub id_tags: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
        }
    }
}

impl Default for OcppConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 60,
            command_timeout_secs: 30,
            reservation_sweep_secs: 60,
            message_log_capacity: 10_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> DomainResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DomainError::Validation(format!("read {}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| DomainError::Validation(format!("parse {}: {}", path.display(), e)))
    }

    /// Listener address in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Platform config path: `<config dir>/ocpp-gateway/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ocpp-gateway")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.ocpp.heartbeat_interval_secs, 60);
        assert_eq!(cfg.ocpp.command_timeout_secs, 30);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.provisioning.charge_points.is_empty());
    }

    #[test]
    fn partial_config_overrides_some_keys() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8880

            [ocpp]
            heartbeat_interval_secs = 120

            [provisioning]
            charge_points = ["CP_001", "CP_002"]
            id_tags = ["TAG1"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8880);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.ocpp.heartbeat_interval_secs, 120);
        assert_eq!(cfg.provisioning.charge_points.len(), 2);
        assert_eq!(cfg.provisioning.id_tags, vec!["TAG1".to_string()]);
    }

    #[test]
    fn address_joins_host_and_port() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.address(), "0.0.0.0:9000");
    }
}
