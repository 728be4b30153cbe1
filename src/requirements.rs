//! Maintenance requirement percentages per trade.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::ValidationError;
use crate::side::Side;
use crate::trade::{InstrumentKind, Trade};
use crate::types::Symbol;

/// Standard long requirement for marginable stock.
pub const DEFAULT_REQUIREMENT: f64 = 0.25;
/// Flat rate for short entries without a symbol override.
pub const SHORT_REQUIREMENT: f64 = 0.40;
/// Base rate scaled by leverage for leveraged-ETF longs.
pub const LEVERAGED_BASE_REQUIREMENT: f64 = 0.25;
/// Options are non-marginable.
pub const OPTION_REQUIREMENT: f64 = 1.0;

/// Which rule produced a requirement percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequirementRule {
    Option,
    SymbolOverride,
    Short,
    LeveragedEtf,
    AccountDefault,
    Default,
}

impl fmt::Display for RequirementRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequirementRule::Option => "option, cash-only",
            RequirementRule::SymbolOverride => "symbol override",
            RequirementRule::Short => "short",
            RequirementRule::LeveragedEtf => "leveraged ETF",
            RequirementRule::AccountDefault => "account default",
            RequirementRule::Default => "default",
        };
        f.write_str(s)
    }
}

/// Symbol-specific maintenance requirement overrides.
///
/// Typically holds high-volatility names a broker margins above the standard
/// rate. Injected into the engine so it can be configured per broker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequirementTable {
    overrides: FxHashMap<Symbol, f64>,
}

impl RequirementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(symbol, percentage)` pairs, validating each percentage.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut table = Self::new();
        for (sym, pct) in pairs {
            table.insert(Symbol::new(sym), pct)?;
        }
        Ok(table)
    }

    /// Insert or replace an override. Percentages must be in `(0, 1]`.
    pub fn insert(&mut self, symbol: Symbol, pct: f64) -> Result<(), ValidationError> {
        if !pct.is_finite() || pct <= 0.0 || pct > 1.0 {
            return Err(ValidationError::InvalidRequirement {
                key: symbol.to_string(),
                value: pct,
            });
        }
        self.overrides.insert(symbol, pct);
        Ok(())
    }

    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.overrides.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Requirement percentage for an entry, first matching rule wins.
    ///
    /// `account_default` replaces [`DEFAULT_REQUIREMENT`] for the final fallback.
    pub fn requirement(&self, trade: &Trade, account_default: Option<f64>) -> (f64, RequirementRule) {
        self.requirement_for(trade, trade.side == Side::SellShort, account_default)
    }

    /// Same rules with the short flag given explicitly, so a cover can be
    /// priced like the short it closes.
    pub fn requirement_for(
        &self,
        trade: &Trade,
        short: bool,
        account_default: Option<f64>,
    ) -> (f64, RequirementRule) {
        if trade.kind == InstrumentKind::Option {
            return (OPTION_REQUIREMENT, RequirementRule::Option);
        }
        if let Some(pct) = self.get(&trade.symbol) {
            return (pct, RequirementRule::SymbolOverride);
        }
        let leverage = trade.leverage_factor();
        if short {
            return ((SHORT_REQUIREMENT * leverage).min(1.0), RequirementRule::Short);
        }
        if trade.kind == InstrumentKind::LeveragedEtf {
            return (
                (LEVERAGED_BASE_REQUIREMENT * leverage).min(1.0),
                RequirementRule::LeveragedEtf,
            );
        }
        match account_default {
            Some(pct) => (pct, RequirementRule::AccountDefault),
            None => (DEFAULT_REQUIREMENT, RequirementRule::Default),
        }
    }
}
