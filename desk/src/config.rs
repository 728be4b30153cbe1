//! `desk.toml`: store locations, trade limit, policy and requirement overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dtbp::{AccountSettings, PolicyPreset, RequirementTable};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Desk configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Symbol → maintenance requirement percentage, e.g. `GME = 1.0`.
    #[serde(default)]
    pub requirements: BTreeMap<String, f64>,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Policy overrides applied on top of the stored account settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    /// Replaces the stored margin policy with a named preset.
    #[serde(default)]
    pub preset: Option<PolicyPreset>,
    #[serde(default)]
    pub broker_leveraged_etf_rule: Option<bool>,
}

impl PolicyConfig {
    pub fn apply(&self, mut settings: AccountSettings) -> AccountSettings {
        if let Some(preset) = self.preset {
            settings.policy = preset.policy();
        }
        if let Some(rule) = self.broker_leveraged_etf_rule {
            settings.broker_leveraged_etf_rule = rule;
        }
        settings
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_trades_path")]
    pub trades: PathBuf,
    #[serde(default = "default_settings_path")]
    pub settings: PathBuf,
}

fn default_trades_path() -> PathBuf {
    "./data/trades.json".into()
}
fn default_settings_path() -> PathBuf {
    "./data/settings.json".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            trades: default_trades_path(),
            settings: default_settings_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Refuse to replay logs longer than this.
    #[serde(default = "default_max_trades")]
    pub max_trades: usize,
}

fn default_max_trades() -> usize {
    50_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_trades: default_max_trades(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.max_trades == 0 {
            return Err(Error::Config("max_trades must be > 0".into()));
        }
        if self.store.trades.as_os_str().is_empty() || self.store.settings.as_os_str().is_empty()
        {
            return Err(Error::Config("store paths must not be empty".into()));
        }
        if self.store.trades == self.store.settings {
            return Err(Error::Config(
                "trades and settings must be stored in different files".into(),
            ));
        }
        self.requirement_table()?;
        Ok(())
    }

    /// Symbol requirement overrides as an engine table.
    pub fn requirement_table(&self) -> Result<RequirementTable> {
        let table = RequirementTable::from_pairs(
            self.requirements
                .iter()
                .map(|(sym, pct)| (sym.as_str(), *pct)),
        )?;
        Ok(table)
    }

    /// Location of the JSONL audit trail.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
