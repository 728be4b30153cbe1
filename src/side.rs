//! Trade side: Buy, Sell, SellShort, BuyToCover

use std::fmt;

/// Side of an executed trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Side {
    Buy,
    Sell,
    SellShort,
    BuyToCover,
}

/// Whether a trade opens or closes exposure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Opens or increases risk exposure.
    Entry,
    /// Reduces existing exposure.
    Exit,
}

impl Side {
    /// `Buy` and `SellShort` are entries, `Sell` and `BuyToCover` are exits.
    #[inline]
    pub fn action(self) -> Action {
        match self {
            Side::Buy | Side::SellShort => Action::Entry,
            Side::Sell | Side::BuyToCover => Action::Exit,
        }
    }

    /// Sign applied to quantity when updating a net position:
    /// `+1` for buys, `-1` for sells.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy | Side::BuyToCover => 1.0,
            Side::Sell | Side::SellShort => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
            Side::SellShort => write!(f, "SHORT"),
            Side::BuyToCover => write!(f, "COVER"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" | "b" => Ok(Side::Buy),
            "sell" | "s" => Ok(Side::Sell),
            "sell-short" | "short" | "ss" => Ok(Side::SellShort),
            "buy-to-cover" | "cover" | "btc" => Ok(Side::BuyToCover),
            other => Err(format!("unknown side '{other}'")),
        }
    }
}
