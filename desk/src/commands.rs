//! Desk commands: load → replay → report, with an audit trail.
//!
//! Each `run_*` function prints to stdout; the non-printing helpers
//! (`calculate`, `what_if`, `build_trade`) are what the tests exercise.

use std::fmt;

use chrono::{DateTime, Utc};
use dtbp::{
    AccountSettings, AccountType, CalculationResult, Engine, InstrumentKind, PolicyPreset, Side,
    Trade, Usd, resolve_cap,
};
use log::{info, warn};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ledger;
use crate::store::Store;

/// Raw trade fields as entered on the command line.
#[derive(Debug, Clone)]
pub struct TradeInput {
    pub id: Option<String>,
    /// RFC 3339 execution time. Defaults to now.
    pub at: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub kind: InstrumentKind,
    pub quantity: f64,
    pub price: f64,
    pub fees: f64,
    pub leverage: Option<f64>,
}

/// Turn command-line input into a validated trade.
///
/// Missing ids are generated from the execution time.
pub fn build_trade(input: TradeInput, now: DateTime<Utc>) -> Result<Trade> {
    let timestamp = match &input.at {
        Some(at) => ledger::parse_timestamp(at)?,
        None => now.timestamp_millis(),
    };
    let id = input.id.unwrap_or_else(|| format!("t{timestamp}"));

    let mut trade = Trade::new(
        id,
        timestamp,
        &input.symbol,
        input.kind,
        input.side,
        input.quantity,
        input.price,
    )
    .with_fees(input.fees);

    if let Some(leverage) = input.leverage {
        if input.kind != InstrumentKind::LeveragedEtf {
            return Err(Error::TradeInput(format!(
                "--leverage only applies to leveraged-etf trades, not {}",
                input.kind
            )));
        }
        trade = trade.with_leverage(leverage);
    }

    trade.validate()?;
    Ok(trade)
}

/// Engine carrying the configured symbol requirement table.
fn engine(config: &Config) -> Result<Engine> {
    Ok(Engine::new(config.requirement_table()?))
}

fn enforce_trade_limit(config: &Config, count: usize) -> Result<()> {
    let limit = config.engine.max_trades;
    if count > limit {
        return Err(Error::TooManyTrades { count, limit });
    }
    Ok(())
}

/// Stored settings with the config's policy overrides applied.
fn load_settings(config: &Config, store: &Store) -> Result<AccountSettings> {
    Ok(config.policy.apply(store.load_settings()?))
}

fn load_trades(config: &Config, store: &Store) -> Result<Vec<Trade>> {
    let trades = store.load_trades()?;
    enforce_trade_limit(config, trades.len())?;
    Ok(trades)
}

/// Replay the stored log.
pub fn calculate(config: &Config) -> Result<CalculationResult> {
    let store = Store::from_config(&config.store);
    let settings = load_settings(config, &store)?;
    let trades = load_trades(config, &store)?;
    Ok(engine(config)?.calculate(&settings, &trades)?)
}

/// Snapshots before and after a hypothetical trade.
#[derive(Debug, Clone)]
pub struct WhatIf {
    pub trade: Trade,
    pub before: CalculationResult,
    pub after: CalculationResult,
}

impl WhatIf {
    /// Warnings the hypothetical trade would introduce.
    pub fn new_warnings(&self) -> Vec<&str> {
        self.after
            .warnings
            .iter()
            .filter(|w| !self.before.warnings.contains(w))
            .map(String::as_str)
            .collect()
    }
}

fn delta_line(f: &mut fmt::Formatter<'_>, label: &str, before: f64, after: f64) -> fmt::Result {
    writeln!(
        f,
        "  {label:<14} {:>14} -> {:>14} ({})",
        Usd(before).to_string(),
        Usd(after).to_string(),
        Usd(after - before)
    )
}

impl fmt::Display for WhatIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WHAT-IF: {}", self.trade)?;
        delta_line(
            f,
            "Stock BP:",
            self.before.stock_buying_power,
            self.after.stock_buying_power,
        )?;
        delta_line(
            f,
            "Option BP:",
            self.before.option_buying_power,
            self.after.option_buying_power,
        )?;
        delta_line(f, "DTBP used:", self.before.dtbp_used, self.after.dtbp_used)?;
        delta_line(
            f,
            "Maintenance:",
            self.before.maintenance_requirement,
            self.after.maintenance_requirement,
        )?;
        delta_line(f, "Equity:", self.before.equity, self.after.equity)?;
        let fresh = self.new_warnings();
        if !fresh.is_empty() {
            writeln!(f, "NEW WARNINGS:")?;
            for w in fresh {
                writeln!(f, "  ! {w}")?;
            }
        }
        Ok(())
    }
}

/// Preview a trade against the stored log without persisting it.
pub fn what_if(config: &Config, trade: Trade) -> Result<WhatIf> {
    let store = Store::from_config(&config.store);
    let settings = load_settings(config, &store)?;
    let trades = load_trades(config, &store)?;
    enforce_trade_limit(config, trades.len() + 1)?;

    let engine = engine(config)?;
    let before = engine.calculate(&settings, &trades)?;
    let after = engine.what_if(&settings, &trades, &trade)?;
    Ok(WhatIf {
        trade,
        before,
        after,
    })
}

/// `calc`: replay the stored log and print the snapshot.
pub fn run_calc(config: &Config, json: bool, explain: bool) -> Result<()> {
    let result = calculate(config)?;

    let mut audit = AuditLog::open(&config.audit_path())?;
    let count = Store::from_config(&config.store).load_trades()?.len();
    audit::log_calculation(&mut audit, count, &result)?;

    for w in &result.warnings {
        warn!("{w}");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print!("{result}");
    if explain {
        println!("DERIVATION:");
        for line in &result.audit_log {
            println!("  {line}");
        }
    }
    Ok(())
}

/// `what-if`: print the effect of a hypothetical trade.
pub fn run_what_if(config: &Config, input: TradeInput) -> Result<()> {
    let trade = build_trade(input, Utc::now())?;
    let preview = what_if(config, trade)?;

    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_what_if(&mut audit, &preview.trade, &preview.after)?;

    print!("{preview}");
    Ok(())
}

/// `add`: append a trade to the log and print the updated buying power.
pub fn run_add(config: &Config, input: TradeInput) -> Result<()> {
    let trade = build_trade(input, Utc::now())?;
    let store = Store::from_config(&config.store);

    let existing = store.load_trades()?;
    enforce_trade_limit(config, existing.len() + 1)?;

    let trades = store.add_trade(trade.clone())?;
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_trade_added(&mut audit, &trade)?;
    println!("Added {trade}");

    let settings = load_settings(config, &store)?;
    let result = engine(config)?.calculate(&settings, &trades)?;
    for w in &result.warnings {
        warn!("{w}");
    }
    println!(
        "Stock BP {}, option BP {}",
        Usd(result.stock_buying_power),
        Usd(result.option_buying_power)
    );
    Ok(())
}

/// `delete`: remove a trade by id, confirming unless `force`.
pub fn run_delete(config: &Config, id: &str, force: bool) -> Result<()> {
    let store = Store::from_config(&config.store);
    let trade = store
        .load_trades()?
        .into_iter()
        .find(|t| t.id.as_str() == id)
        .ok_or_else(|| Error::TradeNotFound(id.to_string()))?;

    let mut audit = AuditLog::open(&config.audit_path())?;

    if !force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete {trade}?"))
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

        if !confirmed {
            println!("Aborted.");
            audit.record(
                "delete_declined",
                serde_json::json!({ "id": id }),
            )?;
            return Ok(());
        }
    }

    let removed = store.delete_trade(id)?;
    audit::log_trade_deleted(&mut audit, &removed)?;
    println!("Deleted {removed}");
    Ok(())
}

/// `trades`: print the stored log in replay order.
pub fn show_trades(config: &Config) -> Result<()> {
    let trades = Store::from_config(&config.store).load_trades()?;
    print!("{}", ledger::format_trades(&trades));
    Ok(())
}

/// Account settings changes given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub equity: Option<f64>,
    pub maintenance: Option<f64>,
    pub cash: Option<f64>,
    pub dtbp_override: Option<f64>,
    pub clear_override: bool,
    pub pattern_day_trader: Option<bool>,
    pub account_type: Option<AccountType>,
    pub preset: Option<PolicyPreset>,
    pub broker_leveraged_etf_rule: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.equity.is_none()
            && self.maintenance.is_none()
            && self.cash.is_none()
            && self.dtbp_override.is_none()
            && !self.clear_override
            && self.pattern_day_trader.is_none()
            && self.account_type.is_none()
            && self.preset.is_none()
            && self.broker_leveraged_etf_rule.is_none()
    }

    pub fn apply(&self, mut settings: AccountSettings) -> AccountSettings {
        if let Some(v) = self.equity {
            settings.start_equity = v;
        }
        if let Some(v) = self.maintenance {
            settings.start_maintenance = v;
        }
        if let Some(v) = self.cash {
            settings.start_cash = v;
        }
        if self.clear_override {
            settings.dtbp_override = None;
        }
        if let Some(v) = self.dtbp_override {
            settings.dtbp_override = Some(v);
        }
        if let Some(v) = self.pattern_day_trader {
            settings.pattern_day_trader = v;
        }
        if let Some(v) = self.account_type {
            settings.account_type = v;
        }
        if let Some(preset) = self.preset {
            settings.policy = preset.policy();
        }
        if let Some(v) = self.broker_leveraged_etf_rule {
            settings.broker_leveraged_etf_rule = v;
        }
        settings
    }
}

fn format_settings(settings: &AccountSettings) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Account:          {}{}\n",
        settings.account_type,
        if settings.pattern_day_trader {
            " (pattern day trader)"
        } else {
            ""
        }
    ));
    out.push_str(&format!("Start equity:     {}\n", Usd(settings.start_equity)));
    out.push_str(&format!(
        "Start maint.:     {}\n",
        Usd(settings.start_maintenance)
    ));
    out.push_str(&format!("Start cash:       {}\n", Usd(settings.start_cash)));
    out.push_str(&format!("Policy:           {}\n", settings.policy));
    if settings.broker_leveraged_etf_rule {
        out.push_str("Broker leveraged-ETF house rule in effect\n");
    }
    out.push_str(&format!("{}\n", resolve_cap(settings)));
    out
}

/// `settings`: show the effective settings, saving any changes first.
pub fn show_settings(config: &Config, update: &SettingsUpdate) -> Result<()> {
    let store = Store::from_config(&config.store);

    if !update.is_empty() {
        let updated = update.apply(store.load_settings()?);
        store.save_settings(&updated)?;
        let mut audit = AuditLog::open(&config.audit_path())?;
        audit.record("settings_saved", serde_json::to_value(&updated)?)?;
        info!("saved settings to {}", store.settings_path().display());
    }

    print!("{}", format_settings(&load_settings(config, &store)?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(symbol: &str, side: Side, qty: f64, price: f64) -> TradeInput {
        TradeInput {
            id: None,
            at: None,
            symbol: symbol.into(),
            side,
            kind: InstrumentKind::Stock,
            quantity: qty,
            price,
            fees: 0.0,
            leverage: None,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_772_461_800_000).unwrap()
    }

    #[test]
    fn build_trade_defaults_id_and_time() {
        let trade = build_trade(input("spy", Side::Buy, 10.0, 100.0), now()).unwrap();
        assert_eq!(trade.timestamp, 1_772_461_800_000);
        assert_eq!(trade.id.as_str(), "t1772461800000");
        assert_eq!(trade.symbol.as_str(), "SPY");
    }

    #[test]
    fn build_trade_parses_time() {
        let mut raw = input("SPY", Side::Buy, 10.0, 100.0);
        raw.at = Some("2026-03-02T09:31:00-05:00".into());
        raw.id = Some("open".into());
        let trade = build_trade(raw, now()).unwrap();
        assert_eq!(trade.timestamp, 1_772_461_860_000);
        assert_eq!(trade.id.as_str(), "open");
    }

    #[test]
    fn leverage_requires_leveraged_etf() {
        let mut raw = input("TQQQ", Side::Buy, 10.0, 50.0);
        raw.leverage = Some(3.0);
        assert!(matches!(build_trade(raw.clone(), now()), Err(Error::TradeInput(_))));

        raw.kind = InstrumentKind::LeveragedEtf;
        let trade = build_trade(raw, now()).unwrap();
        assert_eq!(trade.leverage_factor(), 3.0);
    }

    #[test]
    fn build_trade_validates() {
        assert!(matches!(
            build_trade(input("SPY", Side::Buy, 0.0, 100.0), now()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn settings_update_applies_only_given_fields() {
        let update = SettingsUpdate {
            maintenance: Some(5_000.0),
            preset: Some(PolicyPreset::Standard),
            ..Default::default()
        };
        assert!(!update.is_empty());
        let settings = update.apply(AccountSettings::pdt(30_000.0));
        assert_eq!(settings.start_equity, 30_000.0);
        assert_eq!(settings.start_maintenance, 5_000.0);
        assert_eq!(settings.policy, dtbp::MarginPolicy::standard());
        assert!(SettingsUpdate::default().is_empty());
    }

    #[test]
    fn clear_override() {
        let base = AccountSettings {
            dtbp_override: Some(90_000.0),
            ..AccountSettings::pdt(30_000.0)
        };
        let cleared = SettingsUpdate {
            clear_override: true,
            ..Default::default()
        }
        .apply(base);
        assert_eq!(cleared.dtbp_override, None);
    }

    #[test]
    fn settings_report_shows_cap() {
        let text = format_settings(&AccountSettings::pdt(30_000.0));
        assert!(text.contains("margin (pattern day trader)"));
        assert!(text.contains("Start DTBP cap $120000.00 = maintenance excess $30000.00 x 4"));
    }

    #[test]
    fn trade_limit() {
        let mut config = Config::default();
        config.engine.max_trades = 2;
        assert!(enforce_trade_limit(&config, 2).is_ok());
        assert!(matches!(
            enforce_trade_limit(&config, 3),
            Err(Error::TooManyTrades { count: 3, limit: 2 })
        ));
    }
}
