//! Property-based tests for replay invariants.
//!
//! These tests use proptest to verify that key invariants hold
//! across randomly generated trade logs.

use dtbp::replay::{EngineState, ReplayContext};
use dtbp::{
    AccountSettings, InstrumentKind, MarginPolicy, RequirementTable, Side, Trade, calculate,
    resolve_cap, sequencer,
};
use proptest::prelude::*;

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![
        Just(Side::Buy),
        Just(Side::Sell),
        Just(Side::SellShort),
        Just(Side::BuyToCover),
    ]
}

fn kind_strategy() -> impl Strategy<Value = InstrumentKind> {
    prop_oneof![
        Just(InstrumentKind::Stock),
        Just(InstrumentKind::Option),
        Just(InstrumentKind::LeveragedEtf),
    ]
}

fn symbol_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("SPY"), Just("QQQ"), Just("TQQQ")]
}

fn policy_strategy() -> impl Strategy<Value = MarginPolicy> {
    prop_oneof![
        Just(MarginPolicy::call_avoidance()),
        Just(MarginPolicy::standard()),
    ]
}

/// Generate a trade log with timestamps in a narrow range so ties occur.
fn trades_strategy() -> impl Strategy<Value = Vec<Trade>> {
    prop::collection::vec(
        (
            0i64..20,
            symbol_strategy(),
            kind_strategy(),
            side_strategy(),
            1u32..500,
            0u32..50_000,
            0u32..1_000,
            1u32..6,
        ),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (ts, sym, kind, side, qty, cents, fee_cents, lev))| {
                let trade = Trade::new(
                    format!("t{i}"),
                    ts,
                    sym,
                    kind,
                    side,
                    qty as f64,
                    cents as f64 / 100.0,
                )
                .with_fees(fee_cents as f64 / 100.0);
                if kind == InstrumentKind::LeveragedEtf {
                    trade.with_leverage(lev as f64)
                } else {
                    trade
                }
            })
            .collect()
    })
}

/// Stock entries on a few symbols, each followed by the exit that flattens it.
fn flattened_book_strategy() -> impl Strategy<Value = Vec<Trade>> {
    prop::collection::vec(
        (
            symbol_strategy(),
            prop_oneof![Just(Side::Buy), Just(Side::SellShort)],
            1u32..500,
            1u32..50_000,
        ),
        1..30,
    )
    .prop_map(|rows| {
        let mut trades = Vec::with_capacity(rows.len() + 3);
        let mut net: Vec<(&str, f64)> = Vec::new();
        for (i, (sym, side, qty, cents)) in rows.into_iter().enumerate() {
            let qty = qty as f64;
            let signed = if side == Side::Buy { qty } else { -qty };
            match net.iter_mut().find(|(s, _)| *s == sym) {
                Some((_, q)) => *q += signed,
                None => net.push((sym, signed)),
            }
            trades.push(Trade::new(
                format!("e{i}"),
                i as i64,
                sym,
                InstrumentKind::Stock,
                side,
                qty,
                cents as f64 / 100.0,
            ));
        }
        for (sym, q) in net.into_iter().filter(|(_, q)| *q != 0.0) {
            let side = if q > 0.0 { Side::Sell } else { Side::BuyToCover };
            trades.push(Trade::new(
                format!("x{sym}"),
                1_000,
                sym,
                InstrumentKind::Stock,
                side,
                q.abs(),
                10.0,
            ));
        }
        trades
    })
}

fn settings_strategy() -> impl Strategy<Value = AccountSettings> {
    (0u32..200_000, 0u32..50_000, any::<bool>(), policy_strategy()).prop_map(
        |(equity, maint, pdt, policy)| AccountSettings {
            start_equity: equity as f64,
            start_maintenance: maint as f64,
            start_cash: equity as f64,
            pattern_day_trader: pdt,
            policy,
            ..AccountSettings::default()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Same inputs, same snapshot.
    #[test]
    fn idempotent(settings in settings_strategy(), trades in trades_strategy()) {
        let a = calculate(&settings, &trades).unwrap();
        let b = calculate(&settings, &trades).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Capacities are never negative.
    #[test]
    fn capacities_clamped(settings in settings_strategy(), trades in trades_strategy()) {
        let result = calculate(&settings, &trades).unwrap();
        prop_assert!(result.stock_buying_power >= 0.0);
        prop_assert!(result.option_buying_power >= 0.0);
        prop_assert!(result.intraday_buying_power >= 0.0);
        prop_assert!(result.cash_capacity >= 0.0);
        prop_assert!(result.maintenance_requirement >= 0.0);
        prop_assert!(result.stock_buying_power.is_finite());
    }

    /// Under call avoidance DTBP used never decreases during the replay.
    #[test]
    fn conservative_dtbp_monotonic(
        equity in 0u32..200_000,
        trades in trades_strategy(),
    ) {
        let settings = AccountSettings::pdt(equity as f64);
        let table = RequirementTable::new();
        let ctx = ReplayContext::new(&settings, &table);
        let mut state = EngineState::start(&settings, &resolve_cap(&settings));
        let mut last = state.dtbp_used;
        for trade in sequencer::order(&trades) {
            state.apply(&ctx, trade);
            prop_assert!(state.dtbp_used >= last, "dtbp_used decreased on {}", trade.id);
            last = state.dtbp_used;
        }
    }

    /// Input order of trades with distinct timestamps does not matter.
    #[test]
    fn distinct_timestamps_order_invariant(
        settings in settings_strategy(),
        trades in trades_strategy(),
    ) {
        let trades: Vec<Trade> = trades
            .into_iter()
            .enumerate()
            .map(|(i, mut t)| { t.timestamp = i as i64 * 1_000; t })
            .collect();
        let mut reversed = trades.clone();
        reversed.reverse();

        let a = calculate(&settings, &trades).unwrap();
        let b = calculate(&settings, &reversed).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Every trade gets at least one audit line.
    #[test]
    fn audit_covers_every_trade(settings in settings_strategy(), trades in trades_strategy()) {
        let result = calculate(&settings, &trades).unwrap();
        for trade in &trades {
            let tag = format!("{} {} ", trade.id, trade.side);
            prop_assert!(result.audit_log.iter().any(|l| l.starts_with(&tag)));
        }
    }

    /// A book flattened by matched exits carries no requirement.
    #[test]
    fn flat_book_has_no_requirement(
        settings in settings_strategy(),
        trades in flattened_book_strategy(),
    ) {
        let settings = AccountSettings { start_maintenance: 0.0, ..settings };
        let result = calculate(&settings, &trades).unwrap();
        prop_assert!(result.positions.is_empty());
        prop_assert!(
            result.maintenance_requirement < 1e-6,
            "residual requirement {}",
            result.maintenance_requirement
        );
    }

    /// Warnings are unique.
    #[test]
    fn warnings_unique(settings in settings_strategy(), trades in trades_strategy()) {
        let result = calculate(&settings, &trades).unwrap();
        let mut sorted = result.warnings.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), result.warnings.len());
    }
}
