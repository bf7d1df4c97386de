// src/settings.rs
//! Service configuration.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. Optional `ssi-registry.{toml,yaml,json}` in the working directory
//! 3. `SSI_*` environment variables, nested with `__`
//!    (e.g. `SSI_SERVER__PORT=8080`, `SSI_STORAGE__BACKEND=file`)
//!
//! `main` loads a `.env` file before reading settings, so the variables can
//! also live there.

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};

const DEFAULT_FILE: &str = "ssi-registry";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub events: EventSettings,
    /// Default `env_logger` filter; `RUST_LOG` takes precedence.
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Directory holding the table files when `backend = "file"`.
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    /// Number of recent events kept for the `/events` endpoint.
    pub capacity: usize,
}

impl Settings {
    /// Loads settings from defaults, the optional settings file and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::with_name(DEFAULT_FILE).required(false))
            .add_source(Environment::with_prefix("SSI").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Loads settings from defaults overlaid with one explicit file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000_i64)?
            .set_default("storage.backend", "memory")?
            .set_default("storage.data_dir", "data")?
            .set_default("events.capacity", 500_i64)?
            .set_default("log_level", "info")
    }

    pub fn bind_address(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings: Settings = Settings::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert_eq!(settings.events.capacity, 500);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.bind_address().unwrap(), "127.0.0.1:3000".parse().unwrap());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\n\n[server]\nport = 8080\n\n[storage]\nbackend = \"file\"\ndata_dir = \"/var/lib/ssi\"\n",
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.storage.backend, StorageBackend::File);
        assert_eq!(settings.storage.data_dir, PathBuf::from("/var/lib/ssi"));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[storage]\nbackend = \"etcd\"\n").unwrap();

        assert!(Settings::from_file(&path).is_err());
    }
}
