//! # dtbp
//!
//! A deterministic day-trade buying power (DTBP) estimator for margin accounts.
//!
//! The engine replays a trade log against start-of-day account settings and
//! returns a [`CalculationResult`]: stock and option buying power, equity,
//! the maintenance requirement, warnings, and an audit trail explaining every
//! step of the derivation.
//!
//! ## Features
//!
//! - **PDT leverage**: 4x maintenance excess for pattern day traders, 2x otherwise
//! - **Per-instrument requirements**: options 100%, shorts 40%, leveraged ETFs scaled
//! - **Injectable overrides**: symbol-specific requirement table
//! - **Policy switch**: call-avoidance or standard credit-back, shared or cash-only option pool
//! - **Pure replay**: same inputs, same result, no state kept between calls
//!
//! ## Quick Start
//!
//! ```
//! use dtbp::{AccountSettings, InstrumentKind, Side, Trade, calculate};
//!
//! let settings = AccountSettings::pdt(30_000.0);
//! let trades = [Trade::new("1", 0, "SPY", InstrumentKind::Stock, Side::Buy, 100.0, 100.0)];
//!
//! let result = calculate(&settings, &trades).unwrap();
//! assert_eq!(result.dtbp_cap, 120_000.0);
//! assert_eq!(result.stock_buying_power, 110_000.0);
//! ```
//!
//! ## Policies
//!
//! The call-avoidance policy (default) never returns consumed DTBP within
//! the day. The standard policy credits it back when positions close:
//!
//! ```
//! use dtbp::{AccountSettings, InstrumentKind, MarginPolicy, Side, Trade, calculate};
//!
//! let trades = [
//!     Trade::new("1", 0, "SPY", InstrumentKind::Stock, Side::Buy, 100.0, 100.0),
//!     Trade::new("2", 1, "SPY", InstrumentKind::Stock, Side::Sell, 100.0, 100.0),
//! ];
//!
//! let conservative = calculate(&AccountSettings::pdt(30_000.0), &trades).unwrap();
//! assert_eq!(conservative.stock_buying_power, 110_000.0);
//!
//! let settings = AccountSettings::pdt(30_000.0).with_policy(MarginPolicy::standard());
//! let standard = calculate(&settings, &trades).unwrap();
//! assert_eq!(standard.stock_buying_power, 120_000.0);
//! ```
//!
//! ## Requirement Overrides
//!
//! ```
//! use dtbp::{AccountSettings, Engine, InstrumentKind, RequirementTable, Side, Trade};
//!
//! let table = RequirementTable::from_pairs([("GME", 1.0)]).unwrap();
//! let engine = Engine::new(table);
//!
//! let trades = [Trade::new("1", 0, "GME", InstrumentKind::Stock, Side::Buy, 10.0, 20.0)];
//! let result = engine.calculate(&AccountSettings::pdt(30_000.0), &trades).unwrap();
//! assert_eq!(result.maintenance_requirement, 200.0);
//! ```

mod engine;
mod error;
pub mod policy;
pub mod position;
pub mod replay;
pub mod requirements;
pub mod result;
pub mod sequencer;
pub mod settings;
mod side;
mod trade;
mod types;

// Re-export public API
pub use engine::{Engine, calculate};
pub use error::ValidationError;
pub use policy::{
    CreditBack, LeveragePenalty, MarginPolicy, OptionsPool, PolicyPreset, ProceedsAvailability,
};
pub use position::Position;
pub use requirements::RequirementTable;
pub use result::CalculationResult;
pub use settings::{AccountSettings, AccountType, resolve_cap};
pub use side::{Action, Side};
pub use trade::{InstrumentKind, OPTION_MULTIPLIER, Trade};
pub use types::{Symbol, Timestamp, TradeId, Usd};
