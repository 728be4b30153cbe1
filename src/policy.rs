//! Margin policy: the broker/mode rules that govern DTBP consumption and credit-back.
//!
//! One replay algorithm serves every broker mode. The differences live in a
//! [`MarginPolicy`] value, which the replay consults at exactly two points:
//! [`MarginPolicy::entry_draw`] when an entry consumes capacity, and
//! [`MarginPolicy::exit_credit`] when an exit may return it.

use std::fmt;

use crate::trade::{InstrumentKind, Trade};

/// Largest leverage multiple applied to leveraged-ETF DTBP consumption.
pub const LEVERAGE_PENALTY_CAP: f64 = 4.0;

/// Whether exits return consumed DTBP within the same day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CreditBack {
    /// Closing a position credits its consumption back.
    Standard,
    /// Call avoidance: consumption is never returned intraday.
    #[default]
    Conservative,
}

/// Which pool option purchases draw from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum OptionsPool {
    /// Options compete with stocks for the same DTBP.
    #[default]
    SharedDtbp,
    /// Options are paid from cash and leave DTBP untouched.
    CashOnly,
}

/// When the leveraged-ETF consumption multiple applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum LeveragePenalty {
    #[default]
    Always,
    /// Only when the account's broker enforces a leveraged-ETF house rule.
    BrokerSpecific,
}

/// Whether sale proceeds are spendable on the trade date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ProceedsAvailability {
    /// Proceeds sit in a pending bucket until settlement.
    #[default]
    Pending,
    SameDay,
}

/// Complete set of policy switches for one replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MarginPolicy {
    pub credit_back: CreditBack,
    pub options_pool: OptionsPool,
    pub leverage_penalty: LeveragePenalty,
    pub proceeds: ProceedsAvailability,
    /// Count the cash credit of a short sale as spendable cash.
    pub short_credit_spendable: bool,
}

/// Named policy presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PolicyPreset {
    #[default]
    CallAvoidance,
    Standard,
}

impl PolicyPreset {
    pub fn policy(self) -> MarginPolicy {
        match self {
            PolicyPreset::CallAvoidance => MarginPolicy::call_avoidance(),
            PolicyPreset::Standard => MarginPolicy::standard(),
        }
    }
}

impl std::str::FromStr for PolicyPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "call-avoidance" | "conservative" => Ok(PolicyPreset::CallAvoidance),
            "standard" => Ok(PolicyPreset::Standard),
            other => Err(format!("unknown policy preset '{other}'")),
        }
    }
}

/// Where an entry's consumption is charged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pool {
    Dtbp,
    Cash,
}

/// Capacity drawn by one entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntryDraw {
    pub pool: Pool,
    /// Amount added to DTBP used (zero when charged to cash).
    pub dtbp: f64,
    /// Leverage multiple applied, 1.0 when no penalty.
    pub multiple: f64,
}

impl MarginPolicy {
    /// Never credits DTBP back, options share the DTBP pool, leverage penalty always on.
    pub fn call_avoidance() -> Self {
        Self {
            credit_back: CreditBack::Conservative,
            options_pool: OptionsPool::SharedDtbp,
            leverage_penalty: LeveragePenalty::Always,
            proceeds: ProceedsAvailability::Pending,
            short_credit_spendable: false,
        }
    }

    /// Credits DTBP on exits, options are cash-only, leverage penalty per broker rule.
    pub fn standard() -> Self {
        Self {
            credit_back: CreditBack::Standard,
            options_pool: OptionsPool::CashOnly,
            leverage_penalty: LeveragePenalty::BrokerSpecific,
            proceeds: ProceedsAvailability::SameDay,
            short_credit_spendable: false,
        }
    }

    /// Leverage multiple for a trade, `min(leverage, 4)` when the penalty applies.
    pub fn leverage_multiple(&self, trade: &Trade, broker_house_rule: bool) -> f64 {
        if trade.kind != InstrumentKind::LeveragedEtf {
            return 1.0;
        }
        let applies = match self.leverage_penalty {
            LeveragePenalty::Always => true,
            LeveragePenalty::BrokerSpecific => broker_house_rule,
        };
        if applies {
            trade.leverage_factor().min(LEVERAGE_PENALTY_CAP)
        } else {
            1.0
        }
    }

    /// Capacity consumed by an entry.
    pub fn entry_draw(&self, trade: &Trade, broker_house_rule: bool) -> EntryDraw {
        if trade.kind == InstrumentKind::Option && self.options_pool == OptionsPool::CashOnly {
            return EntryDraw {
                pool: Pool::Cash,
                dtbp: 0.0,
                multiple: 1.0,
            };
        }
        let multiple = self.leverage_multiple(trade, broker_house_rule);
        EntryDraw {
            pool: Pool::Dtbp,
            dtbp: trade.total_cost() * multiple,
            multiple,
        }
    }

    /// DTBP returned by an exit that closes `attributed` worth of prior consumption.
    #[inline]
    pub fn exit_credit(&self, attributed: f64) -> f64 {
        match self.credit_back {
            CreditBack::Standard => attributed.max(0.0),
            CreditBack::Conservative => 0.0,
        }
    }
}

impl fmt::Display for MarginPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credit = match self.credit_back {
            CreditBack::Standard => "credit-back",
            CreditBack::Conservative => "no credit-back",
        };
        let pool = match self.options_pool {
            OptionsPool::SharedDtbp => "options share DTBP",
            OptionsPool::CashOnly => "options cash-only",
        };
        let penalty = match self.leverage_penalty {
            LeveragePenalty::Always => "leverage penalty always",
            LeveragePenalty::BrokerSpecific => "leverage penalty per broker",
        };
        write!(f, "{credit}, {pool}, {penalty}")
    }
}
