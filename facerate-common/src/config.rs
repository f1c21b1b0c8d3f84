//! Configuration resolution
//!
//! Each setting is resolved independently, in priority order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! The first two arrive together as [`Overrides`] (the binary's argument
//! parser reads both). The shared password has no compiled default.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::{Error, Result};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5730";
pub const DEFAULT_IMAGE_FOLDER: &str = "faces_to_rate";
pub const DEFAULT_STORE_URL: &str = "sqlite://ratings.db";
pub const DEFAULT_SESSION_IDLE_MINUTES: u64 = 60;

/// Contents of `config.toml`; every key optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub image_folder: Option<PathBuf>,
    pub store_url: Option<String>,
    pub shared_password: Option<String>,
    pub session_idle_minutes: Option<u64>,
    pub allow_memory_fallback: Option<bool>,
}

impl TomlConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Load an explicitly named file (which must exist), or the platform
    /// default file if present
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            info!("Loading config file {}", path.display());
            return Self::load(path).map(Some);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config file {}", path.display());
                Self::load(&path).map(Some)
            }
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// `<config_dir>/facerate/config.toml` (e.g. `~/.config/facerate/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("facerate").join("config.toml"))
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind_addr: Option<String>,
    pub image_folder: Option<PathBuf>,
    pub store_url: Option<String>,
    pub shared_password: Option<String>,
    pub session_idle_minutes: Option<u64>,
    pub allow_memory_fallback: Option<bool>,
}

/// Fully resolved process configuration
#[derive(Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub image_folder: PathBuf,
    /// `sqlite://…` connection string, or `memory`
    pub store_url: String,
    pub shared_password: String,
    pub session_idle_timeout: Duration,
    /// Serve from memory when the store cannot be reached instead of halting
    pub allow_memory_fallback: bool,
}

impl Settings {
    pub fn resolve(overrides: Overrides, file: Option<TomlConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let bind_addr = overrides
            .bind_addr
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address {:?}: {}", bind_addr, e)))?;

        let shared_password = overrides
            .shared_password
            .or(file.shared_password)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "No shared password configured (set FACERATE_PASSWORD or shared_password in config.toml)"
                        .to_string(),
                )
            })?;

        let idle_minutes = overrides
            .session_idle_minutes
            .or(file.session_idle_minutes)
            .unwrap_or(DEFAULT_SESSION_IDLE_MINUTES);
        if idle_minutes == 0 {
            return Err(Error::Config("session_idle_minutes must be at least 1".to_string()));
        }

        Ok(Self {
            bind_addr,
            image_folder: overrides
                .image_folder
                .or(file.image_folder)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_FOLDER)),
            store_url: overrides
                .store_url
                .or(file.store_url)
                .unwrap_or_else(|| DEFAULT_STORE_URL.to_string()),
            shared_password,
            session_idle_timeout: Duration::from_secs(idle_minutes * 60),
            allow_memory_fallback: overrides
                .allow_memory_fallback
                .or(file.allow_memory_fallback)
                .unwrap_or(true),
        })
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("bind_addr", &self.bind_addr)
            .field("image_folder", &self.image_folder)
            .field("store_url", &self.store_url)
            .field("shared_password", &"<redacted>")
            .field("session_idle_timeout", &self.session_idle_timeout)
            .field("allow_memory_fallback", &self.allow_memory_fallback)
            .finish()
    }
}
