//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend endpoint, request timeout, where the session
//! is kept and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/solarwatch/config.json`.
//! `SOLARWATCH_BACKEND_URL` and `SOLARWATCH_SESSION_STORE` override the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::transport::DEFAULT_TIMEOUT_SECS;
use crate::auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "solarwatch";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Keychain service name for the keyring session store
const KEYRING_SERVICE: &str = "solarwatch";

pub const BACKEND_URL_ENV: &str = "SOLARWATCH_BACKEND_URL";
pub const SESSION_STORE_ENV: &str = "SOLARWATCH_SESSION_STORE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStoreKind {
    #[default]
    File,
    Keyring,
    Memory,
}

impl SessionStoreKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "keyring" => Some(Self::Keyring),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Per-run values from the environment or command line. Never saved.
#[derive(Debug, Clone, Default)]
struct Overrides {
    backend_url: Option<String>,
    session_store: Option<SessionStoreKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub request_timeout_secs: u64,
    pub session_store: SessionStoreKind,
    pub last_email: Option<String>,
    #[serde(skip)]
    overrides: Overrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_store: SessionStoreKind::default(),
            last_email: None,
            overrides: Overrides::default(),
        }
    }
}

impl Config {
    /// Load the config file (or defaults), then apply environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?, |key| std::env::var(key).ok())
    }

    /// Persist the file values. Environment and command-line overrides stay out.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &Path, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env(var);
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(BACKEND_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.overrides.backend_url = Some(url);
        }
        if let Some(kind) = var(SESSION_STORE_ENV).as_deref().and_then(SessionStoreKind::parse) {
            self.overrides.session_store = Some(kind);
        }
    }

    /// Use `url` for this run only
    pub fn override_backend_url(&mut self, url: impl Into<String>) {
        self.overrides.backend_url = Some(url.into());
    }

    /// Use `kind` for this run only
    pub fn override_session_store(&mut self, kind: SessionStoreKind) {
        self.overrides.session_store = Some(kind);
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn backend_url(&self) -> Result<&str> {
        self.overrides
            .backend_url
            .as_deref()
            .or(self.backend_url.as_deref())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No backend URL configured. Set {} or backend_url in the config file.",
                    BACKEND_URL_ENV
                )
            })
    }

    pub fn session_store(&self) -> SessionStoreKind {
        self.overrides.session_store.unwrap_or(self.session_store)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Build the configured session store
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.session_store() {
            SessionStoreKind::File => Arc::new(FileTokenStore::new(self.data_dir()?)),
            SessionStoreKind::Keyring => Arc::new(KeyringTokenStore::new(KEYRING_SERVICE)),
            SessionStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
        })
    }
}
