//! Trade ledger rendering and timestamp conversion.

use chrono::{DateTime, Utc};
use dtbp::{Timestamp, Trade, Usd, sequencer};

use crate::error::{Error, Result};

/// Parse an RFC 3339 timestamp into epoch milliseconds.
pub fn parse_timestamp(s: &str) -> Result<Timestamp> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| Error::TradeInput(format!("invalid timestamp '{s}': {e}")))
}

/// Render epoch milliseconds as RFC 3339 (UTC), or the raw value if out of range.
pub fn format_timestamp(ts: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| ts.to_string())
}

/// Render the trade log in replay order.
pub fn format_trades(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return "No trades recorded.\n".to_string();
    }

    let mut out = format!(
        "{:<12} {:<20} {:<6} {:<8} {:<13} {:>10} {:>12} {:>14}\n",
        "ID", "TIME", "SIDE", "SYMBOL", "KIND", "QTY", "PRICE", "NOTIONAL"
    );
    for trade in sequencer::order(trades) {
        out.push_str(&format!(
            "{:<12} {:<20} {:<6} {:<8} {:<13} {:>10} {:>12} {:>14}\n",
            trade.id.as_str(),
            format_timestamp(trade.timestamp),
            trade.side.to_string(),
            trade.symbol.as_str(),
            trade.kind.to_string(),
            trade.quantity,
            Usd(trade.price).to_string(),
            Usd(trade.notional()).to_string(),
        ));
    }
    let fees: f64 = trades.iter().map(|t| t.fees).sum();
    out.push_str(&format!("{} trades, fees {}\n", trades.len(), Usd(fees)));
    out
}
