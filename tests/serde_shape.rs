//! JSON shape of the public types, as stored and reported by the desk.

#![cfg(feature = "serde")]

use dtbp::{AccountSettings, CalculationResult, InstrumentKind, MarginPolicy, Side, Trade, calculate};

#[test]
fn trade_json_uses_plain_strings() {
    let trade = Trade::new("7", 1, "spy", InstrumentKind::LeveragedEtf, Side::SellShort, 5.0, 40.0)
        .with_leverage(2.0);
    let value = serde_json::to_value(&trade).unwrap();
    assert_eq!(value["id"], "7");
    assert_eq!(value["symbol"], "SPY");
    assert_eq!(value["side"], "sell-short");
    assert_eq!(value["leverage"], 2.0);

    let back: Trade = serde_json::from_value(value).unwrap();
    assert_eq!(back, trade);
}

#[test]
fn trade_fees_default_to_zero() {
    let json = r#"{"id":"1","timestamp":0,"symbol":"SPY","kind":"stock",
                   "side":"buy","quantity":1.0,"price":10.0,"leverage":null}"#;
    let trade: Trade = serde_json::from_str(json).unwrap();
    assert_eq!(trade.fees, 0.0);
}

#[test]
fn partial_settings_fill_defaults() {
    let settings: AccountSettings =
        serde_json::from_str(r#"{"pattern_day_trader":true,"start_equity":30000.0}"#).unwrap();
    assert_eq!(settings.policy, MarginPolicy::call_avoidance());
    assert_eq!(settings.start_maintenance, 0.0);
    assert_eq!(settings.dtbp_override, None);
}

#[test]
fn result_positions_keyed_by_symbol() {
    let trades = [Trade::new("1", 0, "SPY", InstrumentKind::Stock, Side::Buy, 100.0, 100.0)];
    let result = calculate(&AccountSettings::pdt(30_000.0), &trades).unwrap();

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["stock_buying_power"], 110_000.0);
    assert_eq!(value["positions"]["SPY"]["quantity"], 100.0);

    let back: CalculationResult = serde_json::from_value(value).unwrap();
    assert_eq!(back, result);
}
