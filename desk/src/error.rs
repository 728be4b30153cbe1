//! Error types for the desk.

use std::path::PathBuf;

/// All errors that can occur while running desk commands.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read {path}: {source}")]
    StoreRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    StoreParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("trade {0} already exists")]
    DuplicateTrade(String),

    #[error("trade {0} not found")]
    TradeNotFound(String),

    #[error("invalid trade input: {0}")]
    TradeInput(String),

    #[error("trade log has {count} trades, limit is {limit}")]
    TooManyTrades { count: usize, limit: usize },

    #[error("engine rejected input: {0}")]
    Validation(#[from] dtbp::ValidationError),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
