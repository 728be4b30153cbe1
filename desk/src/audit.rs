//! Append-only audit trail of desk commands.
//!
//! One JSON record per line: `{"event": ..., "ts": ..., ...fields}`.
//! Calculation records carry the engine's full derivation so a reported
//! buying power figure can be explained after the fact.

use std::fs::{File, OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dtbp::{CalculationResult, Trade};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::Result;

#[derive(Debug, Serialize)]
struct Record<'a> {
    event: &'a str,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    fields: Value,
}

/// Handle to the JSONL audit file.
pub struct AuditLog {
    path: PathBuf,
    file: File,
}

impl AuditLog {
    /// Open the audit file for appending, creating it and its directory.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. `fields` must be a JSON object.
    pub fn record(&mut self, event: &str, fields: Value) -> Result<()> {
        let mut line = serde_json::to_vec(&Record {
            event,
            ts: Utc::now(),
            fields,
        })?;
        line.push(b'\n');
        // Single write per record keeps lines whole under concurrent appends
        self.file.write_all(&line)?;
        Ok(())
    }
}

fn figures(result: &CalculationResult) -> Value {
    json!({
        "stock_bp": result.stock_buying_power,
        "option_bp": result.option_buying_power,
        "dtbp_cap": result.dtbp_cap,
        "dtbp_used": result.dtbp_used,
        "equity": result.equity,
        "maintenance": result.maintenance_requirement,
        "warnings": result.warnings,
    })
}

/// Record a replay of the stored log, with its derivation.
pub fn log_calculation(
    audit: &mut AuditLog,
    trade_count: usize,
    result: &CalculationResult,
) -> Result<()> {
    let mut fields = figures(result);
    fields["trades"] = json!(trade_count);
    fields["derivation"] = json!(result.audit_log);
    audit.record("calculated", fields)
}

/// Record a what-if preview. The hypothetical trade is not persisted.
pub fn log_what_if(audit: &mut AuditLog, trade: &Trade, result: &CalculationResult) -> Result<()> {
    let mut fields = figures(result);
    fields["hypothetical"] = serde_json::to_value(trade)?;
    audit.record("what_if", fields)
}

pub fn log_trade_added(audit: &mut AuditLog, trade: &Trade) -> Result<()> {
    audit.record("trade_added", serde_json::to_value(trade)?)
}

pub fn log_trade_deleted(audit: &mut AuditLog, trade: &Trade) -> Result<()> {
    audit.record(
        "trade_deleted",
        json!({ "id": trade.id.as_str(), "symbol": trade.symbol.as_str() }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtbp::{AccountSettings, InstrumentKind, Side, calculate};

    fn read_records(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn records_are_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let trade = Trade::new("a", 1, "SPY", InstrumentKind::Stock, Side::Buy, 10.0, 100.0);
        let result = calculate(&AccountSettings::pdt(30_000.0), &[trade.clone()]).unwrap();

        let mut audit = AuditLog::open(&path).unwrap();
        log_trade_added(&mut audit, &trade).unwrap();
        log_calculation(&mut audit, 1, &result).unwrap();
        log_what_if(&mut audit, &trade, &result).unwrap();

        let records = read_records(audit.path());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["event"], "trade_added");
        assert_eq!(records[0]["symbol"], "SPY");
        assert_eq!(records[1]["stock_bp"], 119_000.0);
        assert_eq!(records[1]["trades"], 1);
        assert!(records[1]["derivation"].as_array().unwrap().len() > 2);
        assert_eq!(records[2]["hypothetical"]["id"], "a");
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("nested").join("audit.jsonl");

        AuditLog::open(&path).unwrap().record("first", json!({})).unwrap();
        AuditLog::open(&path).unwrap().record("second", json!({})).unwrap();

        let events: Vec<Value> = read_records(&path)
            .into_iter()
            .map(|r| r["event"].clone())
            .collect();
        assert_eq!(events, vec![json!("first"), json!("second")]);
    }
}
