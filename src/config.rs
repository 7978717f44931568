//! Service configuration.
//!
//! Loaded from an optional `iscc-web` config file, overridden by
//! `ISCC_WEB__*` environment variables. `ALLOWED_ORIGINS` is additionally
//! honored under its bare, unprefixed name: a space-separated origin list,
//! `*` meaning any origin.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins, space separated; `*` allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    /// Directory holding task records, downloaded artifacts, and upload
    /// sessions
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Number of compute pool workers
    #[serde(default = "default_compute_workers")]
    pub compute_workers: usize,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,

    /// Request timeout in seconds (the synchronous HTTP surface only;
    /// background tasks are never timed out)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            data_dir: default_data_dir(),
            compute_workers: default_compute_workers(),
            max_body_mb: default_max_body_mb(),
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from config file and environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("iscc-web").required(false))
            .add_source(config::Environment::with_prefix("ISCC_WEB").separator("__"));

        let mut config: ServiceConfig = builder.build()?.try_deserialize()?;

        // The bare variable wins over both file and prefixed forms.
        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            config.allowed_origins = origins;
        }

        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Whether any origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.split_whitespace().any(|o| o == "*")
    }

    /// The explicit origin list (empty when any origin is allowed)
    pub fn origins(&self) -> Vec<String> {
        if self.allows_any_origin() {
            return Vec::new();
        }
        self.allowed_origins
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Get max body size in bytes
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb * 1024 * 1024
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> String {
    "*".to_string()
}

fn default_data_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_compute_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

fn default_max_body_mb() -> usize {
    1024
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.allowed_origins, "*");
        assert!(cfg.allows_any_origin());
        assert!(cfg.compute_workers >= 1);
        assert_eq!(cfg.max_body_bytes(), 1024 * 1024 * 1024);
    }

    #[test]
    fn socket_addr_parses() {
        let cfg = ServiceConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn explicit_origin_list() {
        let cfg = ServiceConfig {
            allowed_origins: "https://a.example https://b.example".to_string(),
            ..Default::default()
        };
        assert!(!cfg.allows_any_origin());
        assert_eq!(
            cfg.origins(),
            vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ]
        );
    }

    #[test]
    fn wildcard_among_origins_allows_any() {
        let cfg = ServiceConfig {
            allowed_origins: "https://a.example *".to_string(),
            ..Default::default()
        };
        assert!(cfg.allows_any_origin());
        assert!(cfg.origins().is_empty());
    }
}
