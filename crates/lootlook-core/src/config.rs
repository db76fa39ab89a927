//! Configuration management for LootLook.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/lootlook/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Scan allowance and entitlement storage settings
    pub entitlements: EntitlementConfig,
    /// Store product identifiers
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Load configuration from the XDG config path, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if not found.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config: Self = if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            tracing::debug!("Config file not found, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `LOOTLOOK_FREE_MONTHLY_SCANS`: Override the free monthly scan allotment
    /// - `LOOTLOOK_DATABASE_PATH`: Override the entitlement database location
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `LOOTLOOK_*` environment overrides in place.
    ///
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LOOTLOOK_FREE_MONTHLY_SCANS") {
            if let Ok(scans) = val.parse() {
                self.entitlements.free_monthly_scans = scans;
                tracing::debug!("Override free_monthly_scans from env: {}", scans);
            }
        }

        if let Ok(val) = std::env::var("LOOTLOOK_DATABASE_PATH") {
            if !val.is_empty() {
                tracing::debug!("Override database path from env: {}", val);
                self.entitlements.database_path = Some(PathBuf::from(val));
            }
        }
    }

    /// Check values that would leave the engine unusable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.entitlements.free_monthly_scans == 0 {
            return Err(ConfigError::InvalidValue {
                field: "entitlements.free_monthly_scans".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/lootlook/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "lootlook", "lootlook").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/lootlook`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "lootlook", "lootlook").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Resolve the entitlement database path.
    ///
    /// An explicit `entitlements.database_path` wins; otherwise the database
    /// lives in the data directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.entitlements.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("lootlook.db")),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// UI theme: "light", "dark", or "system"
    pub theme: String,
    /// Whether to send anonymous usage statistics
    pub telemetry: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            telemetry: false,
        }
    }
}

/// Scan allowance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitlementConfig {
    /// Free scans granted each calendar month
    pub free_monthly_scans: u32,
    /// Database file location (defaults to `lootlook.db` in the data dir)
    pub database_path: Option<PathBuf>,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            free_monthly_scans: 5,
            database_path: None,
        }
    }
}

/// Store product identifiers for the in-app purchase catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Consumable pack granting 20 scans
    pub pack_small: String,
    /// Consumable pack granting 100 scans
    pub pack_large: String,
    /// Auto-renewing monthly Pro subscription
    pub pro_monthly: String,
    /// Auto-renewing yearly Pro subscription
    pub pro_yearly: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            pack_small: "lootlook.pack.20".to_string(),
            pack_large: "lootlook.pack.100".to_string(),
            pro_monthly: "lootlook.pro.monthly".to_string(),
            pro_yearly: "lootlook.pro.yearly".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.general.theme, "system");
        assert_eq!(config.entitlements.free_monthly_scans, 5);
        assert!(config.entitlements.database_path.is_none());
        assert_eq!(config.catalog.pack_small, "lootlook.pack.20");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[entitlements]"));
        assert!(toml_str.contains("[catalog]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.catalog.pro_yearly, config.catalog.pro_yearly);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.general.theme = "dark".to_string();
        config.entitlements.free_monthly_scans = 3;

        config.save_to(&config_path).expect("save config");
        let loaded = AppConfig::load_from(&config_path).expect("load config");

        assert_eq!(loaded.general.theme, "dark");
        assert_eq!(loaded.entitlements.free_monthly_scans, 3);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded = AppConfig::load_from(tmp.path().join("absent.toml")).expect("load config");
        assert_eq!(loaded.entitlements.free_monthly_scans, 5);
    }

    #[test]
    fn test_zero_allotment_rejected() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");
        fs::write(&config_path, "[entitlements]\nfree_monthly_scans = 0\n").expect("write");

        let err = AppConfig::load_from(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("LOOTLOOK_FREE_MONTHLY_SCANS", "8");
        std::env::set_var("LOOTLOOK_DATABASE_PATH", "/tmp/lootlook-test.db");

        let mut config = AppConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.entitlements.free_monthly_scans, 8);
        assert_eq!(
            config.database_path().expect("database path"),
            PathBuf::from("/tmp/lootlook-test.db")
        );

        std::env::remove_var("LOOTLOOK_FREE_MONTHLY_SCANS");
        std::env::remove_var("LOOTLOOK_DATABASE_PATH");
    }

    #[test]
    fn test_database_path_key() {
        let toml_str = r#"
[entitlements]
database_path = "/var/lib/lootlook/entitlements.db"
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse config");
        assert_eq!(config.entitlements.free_monthly_scans, 5);
        assert_eq!(
            config.database_path().expect("database path"),
            PathBuf::from("/var/lib/lootlook/entitlements.db")
        );
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[general]
theme = "dark"

[catalog]
pack_small = "com.example.pack.small"
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.general.theme, "dark");
        assert_eq!(config.catalog.pack_small, "com.example.pack.small");
        // These should be defaults
        assert_eq!(config.catalog.pack_large, "lootlook.pack.100");
        assert_eq!(config.entitlements.free_monthly_scans, 5);
    }
}
