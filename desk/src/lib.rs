//! dtbp-desk: command-line desk for the dtbp buying power engine.
//!
//! Keeps the day's trade log and account settings on disk, replays them
//! through the engine on demand, previews hypothetical trades, and writes
//! an audit trail of every command.

pub mod audit;
pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod store;
