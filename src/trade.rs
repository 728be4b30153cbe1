//! Executed trade records fed to the engine.

use std::fmt;

use crate::error::ValidationError;
use crate::side::Side;
use crate::types::{MAX_AMOUNT, Symbol, Timestamp, TradeId, Usd};

/// Standard equity option contract size.
pub const OPTION_MULTIPLIER: f64 = 100.0;

/// Kind of instrument traded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum InstrumentKind {
    #[default]
    Stock,
    Option,
    LeveragedEtf,
}

impl InstrumentKind {
    /// Contract multiplier applied to `quantity * price`.
    #[inline]
    pub fn multiplier(self) -> f64 {
        match self {
            InstrumentKind::Option => OPTION_MULTIPLIER,
            InstrumentKind::Stock | InstrumentKind::LeveragedEtf => 1.0,
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Stock => write!(f, "stock"),
            InstrumentKind::Option => write!(f, "option"),
            InstrumentKind::LeveragedEtf => write!(f, "leveraged-etf"),
        }
    }
}

impl std::str::FromStr for InstrumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stock" | "equity" => Ok(InstrumentKind::Stock),
            "option" | "opt" => Ok(InstrumentKind::Option),
            "leveraged-etf" | "letf" | "etf3x" => Ok(InstrumentKind::LeveragedEtf),
            other => Err(format!("unknown instrument kind '{other}'")),
        }
    }
}

/// One executed order. Never mutated once recorded.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trade {
    pub id: TradeId,
    pub timestamp: Timestamp,
    pub symbol: Symbol,
    pub kind: InstrumentKind,
    pub side: Side,
    /// Shares or contracts, always positive.
    pub quantity: f64,
    /// Per-share (or per-contract-unit) price in dollars.
    pub price: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fees: f64,
    /// Daily leverage of a leveraged ETF (e.g. 3.0 for a 3x fund).
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub leverage: Option<f64>,
}

impl Trade {
    /// Create a fee-free trade.
    pub fn new(
        id: impl Into<String>,
        timestamp: Timestamp,
        symbol: &str,
        kind: InstrumentKind,
        side: Side,
        quantity: f64,
        price: f64,
    ) -> Self {
        Self {
            id: TradeId::new(id),
            timestamp,
            symbol: Symbol::new(symbol),
            kind,
            side,
            quantity,
            price,
            fees: 0.0,
            leverage: None,
        }
    }

    pub fn with_fees(mut self, fees: f64) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_leverage(mut self, leverage: f64) -> Self {
        self.leverage = Some(leverage);
        self
    }

    /// Effective leverage factor: the recorded value for leveraged ETFs, 1 otherwise.
    #[inline]
    pub fn leverage_factor(&self) -> f64 {
        match self.kind {
            InstrumentKind::LeveragedEtf => self.leverage.unwrap_or(1.0),
            _ => 1.0,
        }
    }

    /// `quantity * price * multiplier`.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.quantity * self.price * self.kind.multiplier()
    }

    /// Notional plus fees.
    #[inline]
    pub fn total_cost(&self) -> f64 {
        self.notional() + self.fees
    }

    /// Reject values the replay cannot interpret.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let id = || self.id.0.clone();
        if self.id.0.trim().is_empty() {
            return Err(ValidationError::EmptyTradeId);
        }
        if self.symbol.is_empty() {
            return Err(ValidationError::EmptySymbol { id: id() });
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(ValidationError::InvalidQuantity {
                id: id(),
                value: self.quantity,
            });
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::InvalidPrice {
                id: id(),
                value: self.price,
            });
        }
        if !self.fees.is_finite() || self.fees < 0.0 {
            return Err(ValidationError::InvalidFees {
                id: id(),
                value: self.fees,
            });
        }
        if let Some(lev) = self.leverage.filter(|l| !l.is_finite() || *l <= 0.0) {
            return Err(ValidationError::InvalidLeverage { id: id(), value: lev });
        }
        // Each field can be finite while the product overflows
        let total = self.total_cost();
        if !total.is_finite() || total > MAX_AMOUNT {
            return Err(ValidationError::NotionalOutOfRange {
                id: id(),
                value: total,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} @ {}",
            self.id,
            self.side,
            self.quantity,
            self.symbol,
            Usd(self.price)
        )?;
        match self.kind {
            InstrumentKind::Stock => Ok(()),
            InstrumentKind::Option => write!(f, " (option x{})", OPTION_MULTIPLIER),
            InstrumentKind::LeveragedEtf => {
                write!(f, " ({}x leveraged ETF)", self.leverage_factor())
            }
        }
    }
}
