//! Result snapshot returned by the engine.

use std::collections::BTreeMap;
use std::fmt;

use crate::policy::{MarginPolicy, OptionsPool};
use crate::position::Position;
use crate::replay::EngineState;
use crate::types::{Symbol, Usd};

/// Stock buying power may not exceed this multiple of current excess.
pub const EXCESS_LEVERAGE_BOUND: f64 = 4.0;

pub const NO_STOCK_BP_WARNING: &str = "No stock buying power remaining";
pub const NO_OPTION_BP_WARNING: &str = "No option buying power remaining";

/// Immutable snapshot of one engine run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalculationResult {
    pub equity: f64,
    /// Spendable cash, clamped at zero.
    pub cash_capacity: f64,
    pub stock_buying_power: f64,
    pub option_buying_power: f64,
    /// Start-of-day cap used for the run.
    pub dtbp_cap: f64,
    /// Remaining DTBP before the excess-equity bound.
    pub intraday_buying_power: f64,
    pub dtbp_used: f64,
    pub maintenance_requirement: f64,
    pub pending_proceeds: f64,
    pub warnings: Vec<String>,
    pub audit_log: Vec<String>,
    pub positions: BTreeMap<Symbol, Position>,
}

impl CalculationResult {
    /// Equity minus maintenance requirement, clamped at zero.
    pub fn maintenance_excess(&self) -> f64 {
        (self.equity - self.maintenance_requirement).max(0.0)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Derive the final figures from the terminal replay state.
///
/// `stock_bp = min(remaining DTBP, excess * 4)`: the day-trade cap is bounded
/// both by capacity consumed and by what current excess equity can support.
pub fn synthesize(state: EngineState, policy: &MarginPolicy) -> CalculationResult {
    let EngineState {
        dtbp_cap,
        dtbp_used,
        maintenance,
        equity,
        cash,
        pending_proceeds,
        positions,
        mut warnings,
        mut audit,
    } = state;

    let final_dtbp = (dtbp_cap - dtbp_used).max(0.0);
    let final_excess = (equity - maintenance).max(0.0);
    let cash_capacity = cash.max(0.0);
    let option_bp = match policy.options_pool {
        OptionsPool::SharedDtbp => final_excess,
        OptionsPool::CashOnly => final_excess.min(cash_capacity),
    };
    let stock_bp = final_dtbp.min(final_excess * EXCESS_LEVERAGE_BOUND);

    if stock_bp <= 0.0 {
        warnings.push(NO_STOCK_BP_WARNING.to_string());
    }
    if option_bp <= 0.0 {
        warnings.push(NO_OPTION_BP_WARNING.to_string());
    }

    audit.push(format!(
        "Stock BP {} = min(DTBP remaining {}, excess {} x {})",
        Usd(stock_bp),
        Usd(final_dtbp),
        Usd(final_excess),
        EXCESS_LEVERAGE_BOUND
    ));
    audit.push(format!("Option BP {} (no leverage on options)", Usd(option_bp)));

    CalculationResult {
        equity,
        cash_capacity,
        stock_buying_power: stock_bp,
        option_buying_power: option_bp,
        dtbp_cap,
        intraday_buying_power: final_dtbp,
        dtbp_used,
        maintenance_requirement: maintenance,
        pending_proceeds,
        warnings: warnings.into_vec(),
        audit_log: audit,
        positions: positions.into_iter().collect(),
    }
}

impl fmt::Display for CalculationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BUYING POWER:")?;
        writeln!(f, "  Stock BP:        {}", Usd(self.stock_buying_power))?;
        writeln!(f, "  Option BP:       {}", Usd(self.option_buying_power))?;
        writeln!(f, "  Intraday BP:     {}", Usd(self.intraday_buying_power))?;
        writeln!(
            f,
            "  DTBP used:       {} of {}",
            Usd(self.dtbp_used),
            Usd(self.dtbp_cap)
        )?;
        writeln!(f, "  Equity:          {}", Usd(self.equity))?;
        writeln!(f, "  Maintenance:     {}", Usd(self.maintenance_requirement))?;
        writeln!(f, "  Cash:            {}", Usd(self.cash_capacity))?;
        if self.pending_proceeds > 0.0 {
            writeln!(f, "  Pending:         {}", Usd(self.pending_proceeds))?;
        }
        if !self.positions.is_empty() {
            writeln!(f, "OPEN POSITIONS:")?;
            for (sym, pos) in &self.positions {
                writeln!(
                    f,
                    "  {:<10} {:>10} @ {}",
                    sym.as_str(),
                    pos.quantity,
                    Usd(pos.avg_entry_price)
                )?;
            }
        }
        if !self.warnings.is_empty() {
            writeln!(f, "WARNINGS:")?;
            for w in &self.warnings {
                writeln!(f, "  ! {w}")?;
            }
        }
        Ok(())
    }
}
