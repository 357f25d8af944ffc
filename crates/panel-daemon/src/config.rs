//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Token economy settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Token economy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Balance granted by `open_account` when the caller names none.
    #[serde(default = "default_signup_tokens")]
    pub signup_tokens: u64,
    /// Page size for "recently read" and transaction listings.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_signup_tokens() -> u64 {
    panel_types::DEFAULT_SIGNUP_TOKENS
}

fn default_recent_limit() -> u32 {
    panel_types::DEFAULT_RECENT_LIMIT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            signup_tokens: default_signup_tokens(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl PanelConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// `$PANEL_DATA_DIR`, else a per-platform directory under `$HOME`.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("PANEL_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Panel")
        }
        #[cfg(target_os = "windows")]
        {
            dirs_fallback("Panel")
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            dirs_fallback(".panel")
        }
    }
}

fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/panel"))
}
