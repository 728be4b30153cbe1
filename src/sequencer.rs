//! Chronological replay ordering.

use crate::trade::Trade;

/// Order trades for replay: timestamp ascending, ties keep input order.
///
/// DTBP consumption is irreversible within a run, so the replay order
/// changes the result. `sort_by_key` is stable, which makes the order total
/// and deterministic. Nothing is dropped or duplicated.
pub fn order(trades: &[Trade]) -> Vec<&Trade> {
    let mut seq: Vec<&Trade> = trades.iter().collect();
    seq.sort_by_key(|t| t.timestamp);
    seq
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side::Side;
    use crate::trade::InstrumentKind;

    fn at(id: &str, ts: i64) -> Trade {
        Trade::new(id, ts, "SPY", InstrumentKind::Stock, Side::Buy, 1.0, 1.0)
    }

    fn ids(seq: &[&Trade]) -> Vec<String> {
        seq.iter().map(|t| t.id.0.clone()).collect()
    }

    #[test]
    fn sorts_by_timestamp() {
        let trades = vec![at("c", 30), at("a", 10), at("b", 20)];
        assert_eq!(ids(&order(&trades)), ["a", "b", "c"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let trades = vec![at("x", 5), at("y", 5), at("w", 1), at("z", 5)];
        assert_eq!(ids(&order(&trades)), ["w", "x", "y", "z"]);
    }

    #[test]
    fn empty_input() {
        assert!(order(&[]).is_empty());
    }
}
