//! Core types: Symbol, TradeId, Timestamp, Usd

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// Ticker or contract symbol, e.g. `SPY` or `SPY240119C00480000`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol. Surrounding whitespace is trimmed and letters are upper-cased.
    pub fn new(s: &str) -> Self {
        Self(s.trim().to_ascii_uppercase())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

/// Caller-assigned trade identifier. Unique within one trade log.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TradeId(pub String);

impl TradeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Execution time in milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Largest notional or account amount accepted at the boundary.
///
/// Keeps every sum the replay forms finite.
pub const MAX_AMOUNT: f64 = 1e15;

/// Dollar amount.
///
/// Displays with two decimals and a leading sign for negatives.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Usd(pub f64);

impl Usd {
    pub const ZERO: Usd = Usd(0.0);

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Add for Usd {
    type Output = Usd;
    #[inline]
    fn add(self, rhs: Usd) -> Usd {
        Usd(self.0 + rhs.0)
    }
}

impl Sub for Usd {
    type Output = Usd;
    #[inline]
    fn sub(self, rhs: Usd) -> Usd {
        Usd(self.0 - rhs.0)
    }
}

impl AddAssign for Usd {
    #[inline]
    fn add_assign(&mut self, rhs: Usd) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Usd {
    #[inline]
    fn sub_assign(&mut self, rhs: Usd) {
        self.0 -= rhs.0;
    }
}

/// Scale by a quantity, fraction, or rate.
impl Mul<f64> for Usd {
    type Output = Usd;
    #[inline]
    fn mul(self, rhs: f64) -> Usd {
        Usd(self.0 * rhs)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Avoid printing "-$0.00" for tiny negative drift
        let v = if self.0.abs() < 0.005 { 0.0 } else { self.0 };
        if v < 0.0 {
            write!(f, "-${:.2}", v.abs())
        } else {
            write!(f, "${:.2}", v)
        }
    }
}
