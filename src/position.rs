//! Position tracking for a single symbol.

use crate::trade::InstrumentKind;
use crate::types::{Symbol, Usd};

/// Positions smaller than this are treated as flat (absorbs float drift).
pub const POSITION_EPSILON: f64 = 1e-9;

/// A net position in one instrument.
///
/// Tracks quantity (positive = long, negative = short), the weighted-average
/// entry price, and the maintenance requirement and DTBP consumption
/// attributed to the open quantity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub symbol: Symbol,
    pub kind: InstrumentKind,
    /// Net quantity: positive = long, negative = short
    pub quantity: f64,
    /// Weighted-average entry price per share (before contract multiplier)
    pub avg_entry_price: f64,
    /// Maintenance requirement held against the open quantity
    pub maintenance: Usd,
    /// DTBP consumed by the entries still open
    pub dtbp_consumed: Usd,
}

/// Portion of a position closed by a fill.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Closed {
    pub quantity: f64,
    pub realized_pnl: Usd,
    pub maintenance_released: Usd,
    pub dtbp_released: Usd,
}

/// Outcome of an entry fill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntryFill {
    /// Portion netted against an opposite position.
    pub netted: Option<Closed>,
    /// Share of the fill that opened new exposure, in `[0, 1]`.
    pub opened_fraction: f64,
}

impl Position {
    /// Create a new flat position for the given symbol.
    pub fn new(symbol: Symbol, kind: InstrumentKind) -> Self {
        Self {
            symbol,
            kind,
            quantity: 0.0,
            avg_entry_price: 0.0,
            maintenance: Usd::ZERO,
            dtbp_consumed: Usd::ZERO,
        }
    }

    /// Returns true if the position is flat within [`POSITION_EPSILON`].
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.quantity.abs() < POSITION_EPSILON
    }

    #[inline]
    pub fn is_long(&self) -> bool {
        !self.is_flat() && self.quantity > 0.0
    }

    #[inline]
    pub fn is_short(&self) -> bool {
        !self.is_flat() && self.quantity < 0.0
    }

    /// Cost basis of the open quantity, contract multiplier applied.
    #[inline]
    pub fn cost_basis(&self) -> Usd {
        Usd(self.quantity.abs() * self.avg_entry_price * self.kind.multiplier())
    }

    /// Apply an entry fill carrying `maintenance` and `dtbp` for its full size.
    ///
    /// `qty` is signed: positive = buy, negative = short. Adding in the same
    /// direction blends the average price:
    /// `(old_qty * old_avg + qty * price) / new_qty`. An entry against an
    /// opposite position first closes it; only the remainder opens the new
    /// side, and only the remainder's share of `maintenance` and `dtbp` is
    /// attributed to the position.
    pub fn apply_entry(&mut self, qty: f64, price: f64, maintenance: Usd, dtbp: Usd) -> EntryFill {
        let same_direction = self.is_flat() || (self.quantity > 0.0) == (qty > 0.0);

        if same_direction {
            let new_qty = self.quantity + qty;
            if self.is_flat() {
                self.avg_entry_price = price;
            } else {
                self.avg_entry_price =
                    (self.quantity.abs() * self.avg_entry_price + qty.abs() * price) / new_qty.abs();
            }
            self.quantity = new_qty;
            self.maintenance += maintenance;
            self.dtbp_consumed += dtbp;
            return EntryFill {
                netted: None,
                opened_fraction: 1.0,
            };
        }

        let closed = self.close(qty.abs(), price);
        let remainder = qty.abs() - closed.quantity;
        let mut opened_fraction = 0.0;
        if remainder >= POSITION_EPSILON {
            // Flipped sides
            opened_fraction = remainder / qty.abs();
            self.quantity = remainder * qty.signum();
            self.avg_entry_price = price;
            self.maintenance += maintenance * opened_fraction;
            self.dtbp_consumed += dtbp * opened_fraction;
        }
        EntryFill {
            netted: Some(closed),
            opened_fraction,
        }
    }

    /// Close up to `qty` (unsigned) of the open position at `price`.
    ///
    /// Never flips the position: the closed quantity is at most the open
    /// magnitude. Attributed maintenance and DTBP are released pro rata.
    pub fn close(&mut self, qty: f64, price: f64) -> Closed {
        if self.is_flat() || qty <= 0.0 {
            return Closed::default();
        }

        let open = self.quantity.abs();
        let close_qty = qty.min(open);
        let fraction = close_qty / open;
        let per_unit = if self.quantity > 0.0 {
            price - self.avg_entry_price // long: sell higher = profit
        } else {
            self.avg_entry_price - price // short: cover lower = profit
        };

        let closed = Closed {
            quantity: close_qty,
            realized_pnl: Usd(per_unit * close_qty * self.kind.multiplier()),
            maintenance_released: self.maintenance * fraction,
            dtbp_released: self.dtbp_consumed * fraction,
        };

        self.quantity -= close_qty * self.quantity.signum();
        self.maintenance -= closed.maintenance_released;
        self.dtbp_consumed -= closed.dtbp_released;

        if self.is_flat() {
            self.quantity = 0.0;
            self.avg_entry_price = 0.0;
            self.maintenance = Usd::ZERO;
            self.dtbp_consumed = Usd::ZERO;
        }
        closed
    }
}
