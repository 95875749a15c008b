//! # Back Office Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Load order (later overrides earlier)                                   │
//! │                                                                         │
//! │  1. Defaults ─────────► BackofficeConfig::default()                     │
//! │  2. TOML file ────────► --config <path>, or backoffice.toml in the      │
//! │                         platform config dir                             │
//! │  3. Environment ──────► DUKAAN_* variables                              │
//! │  4. validate() ───────► rejects unusable values                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # backoffice.toml
//! [store]
//! name = "Dukaan Fashions"
//! currency_symbol = "₹"
//!
//! [database]
//! path = "/var/lib/dukaan/dukaan.db"
//! max_connections = 5
//! connect_timeout_secs = 30
//!
//! [invoicing]
//! default_tax_type = "CGST_SGST"
//! default_tax_bps = 500        # 5%
//! step_timeout_ms = 5000
//! invoice_prefix = "DK"
//! ```
//!
//! ## Environment Variables
//! | Variable | Overrides |
//! |----------|-----------|
//! | `DUKAAN_DB_PATH` | `database.path` |
//! | `DUKAAN_STORE_NAME` | `store.name` |
//! | `DUKAAN_TAX_TYPE` | `invoicing.default_tax_type` |
//! | `DUKAAN_TAX_BPS` | `invoicing.default_tax_bps` |
//! | `DUKAAN_STEP_TIMEOUT_MS` | `invoicing.step_timeout_ms` |
//! | `DUKAAN_INVOICE_PREFIX` | `invoicing.invoice_prefix` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use dukaan_core::draft::TaxConfig;
use dukaan_core::{TaxRate, TaxType};
use dukaan_db::DbConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No explicit path and no platform config/data directory.
    #[error("No {0} location available on this platform")]
    NoLocation(&'static str),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_name() -> String {
    "Dukaan".to_string()
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to `dukaan.db` in the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Invoice defaults and commit bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicingSettings {
    /// Tax applied to new drafts.
    #[serde(default)]
    pub default_tax_type: TaxType,

    /// Basis points; 1800 = 18%.
    #[serde(default = "default_tax_bps")]
    pub default_tax_bps: u32,

    /// Bound on each ledger query, deduction and persistence write.
    #[serde(default = "default_step_timeout")]
    pub step_timeout_ms: u64,

    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
}

fn default_tax_bps() -> u32 {
    500
}

fn default_step_timeout() -> u64 {
    5_000
}

fn default_invoice_prefix() -> String {
    "DK".to_string()
}

impl Default for InvoicingSettings {
    fn default() -> Self {
        InvoicingSettings {
            default_tax_type: TaxType::default(),
            default_tax_bps: default_tax_bps(),
            step_timeout_ms: default_step_timeout(),
            invoice_prefix: default_invoice_prefix(),
        }
    }
}

// =============================================================================
// Back Office Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackofficeConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub invoicing: InvoicingSettings,
}

impl BackofficeConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// An explicit `config_path` must exist; the platform default is
    /// optional.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if explicit || path.exists() {
                info!(?path, "Loading back office config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoLocation("config"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Back office config saved");
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invoicing.step_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "invoicing.step_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.invoicing.default_tax_bps > 10_000 {
            return Err(ConfigError::Invalid(format!(
                "invoicing.default_tax_bps must be at most 10000, got {}",
                self.invoicing.default_tax_bps
            )));
        }

        if self.invoicing.invoice_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "invoicing.invoice_prefix must not be empty".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `DUKAAN_*` overrides read through `lookup`. Unparseable
    /// values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DUKAAN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup("DUKAAN_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(tax_type) = lookup("DUKAAN_TAX_TYPE") {
            match tax_type.parse::<TaxType>() {
                Ok(parsed) => self.invoicing.default_tax_type = parsed,
                Err(e) => warn!(value = %tax_type, error = %e, "Ignoring DUKAAN_TAX_TYPE"),
            }
        }

        if let Some(bps) = lookup("DUKAAN_TAX_BPS") {
            match bps.trim().parse::<u32>() {
                Ok(parsed) => self.invoicing.default_tax_bps = parsed,
                Err(_) => warn!(value = %bps, "Ignoring DUKAAN_TAX_BPS"),
            }
        }

        if let Some(ms) = lookup("DUKAAN_STEP_TIMEOUT_MS") {
            match ms.trim().parse::<u64>() {
                Ok(parsed) => self.invoicing.step_timeout_ms = parsed,
                Err(_) => warn!(value = %ms, "Ignoring DUKAAN_STEP_TIMEOUT_MS"),
            }
        }

        if let Some(prefix) = lookup("DUKAAN_INVOICE_PREFIX") {
            self.invoicing.invoice_prefix = prefix;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "dukaan", "backoffice")
            .map(|dirs| dirs.config_dir().join("backoffice.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Tax selection for new drafts.
    pub fn tax_config(&self) -> TaxConfig {
        TaxConfig::new(
            self.invoicing.default_tax_type,
            TaxRate::from_bps(self.invoicing.default_tax_bps),
        )
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.invoicing.step_timeout_ms)
    }

    /// The configured database path, or `dukaan.db` under the platform
    /// data directory (created if missing).
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("com", "dukaan", "backoffice")
            .ok_or(ConfigError::NoLocation("data directory"))?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("dukaan.db"))
    }

    pub fn db_config(&self) -> Result<DbConfig, ConfigError> {
        Ok(DbConfig::new(self.database_path()?)
            .max_connections(self.database.max_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = BackofficeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tax_config().rate.bps(), 500);
        assert_eq!(config.step_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: BackofficeConfig = toml::from_str(
            r#"
            [invoicing]
            default_tax_type = "IGST"
            invoice_prefix = "SHOP"
            "#,
        )
        .unwrap();

        assert_eq!(config.invoicing.default_tax_type, TaxType::Igst);
        assert_eq!(config.invoicing.invoice_prefix, "SHOP");
        assert_eq!(config.invoicing.step_timeout_ms, 5_000);
        assert_eq!(config.store.currency_symbol, "₹");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DUKAAN_DB_PATH", "/tmp/dukaan-test.db"),
            ("DUKAAN_TAX_TYPE", "none"),
            ("DUKAAN_TAX_BPS", "1800"),
            ("DUKAAN_STEP_TIMEOUT_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = BackofficeConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/tmp/dukaan-test.db"))
        );
        assert_eq!(config.invoicing.default_tax_type, TaxType::None);
        assert_eq!(config.invoicing.default_tax_bps, 1_800);
        // Bad value ignored
        assert_eq!(config.invoicing.step_timeout_ms, 5_000);
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let mut config = BackofficeConfig::default();
        config.invoicing.step_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = BackofficeConfig::default();
        config.invoicing.default_tax_bps = 10_001;
        assert!(config.validate().is_err());

        let mut config = BackofficeConfig::default();
        config.invoicing.invoice_prefix = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let path =
            std::env::temp_dir().join(format!("dukaan-config-{}.toml", uuid::Uuid::new_v4()));
        let mut config = BackofficeConfig::default();
        config.store.name = "Kapda Ghar".into();

        config.save(Some(path.clone())).unwrap();
        let loaded = BackofficeConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
