//! File-backed persistence for the trade log and account settings.
//!
//! Both are stored as pretty-printed JSON. Writes go to a sibling temp file
//! that is renamed into place, so a crash never leaves a half-written log.

use std::fs;
use std::path::{Path, PathBuf};

use dtbp::{AccountSettings, Trade};
use log::{info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// Trade log and settings files.
#[derive(Debug, Clone)]
pub struct Store {
    trades_path: PathBuf,
    settings_path: PathBuf,
}

impl Store {
    pub fn new(trades_path: impl Into<PathBuf>, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            trades_path: trades_path.into(),
            settings_path: settings_path.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(&config.trades, &config.settings)
    }

    pub fn trades_path(&self) -> &Path {
        &self.trades_path
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load the trade log. A missing file is an empty log.
    pub fn load_trades(&self) -> Result<Vec<Trade>> {
        Ok(read_json(&self.trades_path)?.unwrap_or_default())
    }

    /// Replace the stored trade log.
    pub fn save_trades(&self, trades: &[Trade]) -> Result<()> {
        write_json(&self.trades_path, &trades)
    }

    /// Append a trade, rejecting duplicate ids and malformed values.
    pub fn add_trade(&self, trade: Trade) -> Result<Vec<Trade>> {
        trade.validate()?;
        let mut trades = self.load_trades()?;
        if trades.iter().any(|t| t.id == trade.id) {
            return Err(Error::DuplicateTrade(trade.id.0));
        }
        info!("adding trade {}", trade.id);
        trades.push(trade);
        self.save_trades(&trades)?;
        Ok(trades)
    }

    /// Remove a trade by id. Returns the removed trade.
    pub fn delete_trade(&self, id: &str) -> Result<Trade> {
        let mut trades = self.load_trades()?;
        let idx = trades
            .iter()
            .position(|t| t.id.as_str() == id)
            .ok_or_else(|| Error::TradeNotFound(id.to_string()))?;
        let removed = trades.remove(idx);
        self.save_trades(&trades)?;
        info!("deleted trade {}", removed.id);
        Ok(removed)
    }

    /// Load account settings. A missing file yields defaults.
    pub fn load_settings(&self) -> Result<AccountSettings> {
        match read_json(&self.settings_path)? {
            Some(settings) => Ok(settings),
            None => {
                warn!(
                    "no settings at {}, using defaults",
                    self.settings_path.display()
                );
                Ok(AccountSettings::default())
            }
        }
    }

    /// Validate and store account settings.
    pub fn save_settings(&self, settings: &AccountSettings) -> Result<()> {
        settings.validate()?;
        write_json(&self.settings_path, settings)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::StoreRead {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| Error::StoreParse {
            path: path.to_path_buf(),
            source: e,
        })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let write_err = |e: std::io::Error| Error::StoreWrite {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::StoreParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtbp::{InstrumentKind, MarginPolicy, Side};

    fn store(dir: &tempfile::TempDir) -> Store {
        Store::new(
            dir.path().join("trades.json"),
            dir.path().join("nested").join("settings.json"),
        )
    }

    fn trade(id: &str) -> Trade {
        Trade::new(id, 1, "SPY", InstrumentKind::Stock, Side::Buy, 10.0, 100.0).with_fees(0.5)
    }

    #[test]
    fn missing_files_are_empty_and_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.load_trades().unwrap().is_empty());
        assert_eq!(store.load_settings().unwrap(), AccountSettings::default());
    }

    #[test]
    fn add_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.add_trade(trade("a")).unwrap();
        store.add_trade(trade("b")).unwrap();

        let loaded = store.load_trades().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], trade("a"));
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.add_trade(trade("a")).unwrap();
        assert!(matches!(
            store.add_trade(trade("a")),
            Err(Error::DuplicateTrade(id)) if id == "a"
        ));
    }

    #[test]
    fn add_rejects_invalid_trade() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let mut bad = trade("a");
        bad.quantity = -1.0;
        assert!(matches!(store.add_trade(bad), Err(Error::Validation(_))));
        assert!(!store.trades_path().exists());
    }

    #[test]
    fn delete_removes_trade() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.save_trades(&[trade("a"), trade("b")]).unwrap();

        let removed = store.delete_trade("a").unwrap();
        assert_eq!(removed.id.as_str(), "a");
        assert_eq!(store.load_trades().unwrap(), vec![trade("b")]);
        assert!(matches!(
            store.delete_trade("a"),
            Err(Error::TradeNotFound(_))
        ));
    }

    #[test]
    fn settings_round_trip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let settings = AccountSettings::pdt(30_000.0).with_policy(MarginPolicy::standard());
        store.save_settings(&settings).unwrap();
        assert!(store.settings_path().exists());
        assert_eq!(store.load_settings().unwrap(), settings);
    }

    #[test]
    fn corrupt_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        std::fs::write(store.trades_path(), "not json").unwrap();
        let err = store.load_trades().unwrap_err();
        assert!(err.to_string().contains("trades.json"));
    }
}
