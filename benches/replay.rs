//! Replay benchmarks: full engine runs over synthetic trade logs.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dtbp::{AccountSettings, InstrumentKind, MarginPolicy, Side, Trade, calculate};

/// Generate `n` trades cycling through entries and exits on 20 symbols.
///
/// Prices drift using a simple deterministic RNG.
fn generate_trades(n: usize) -> Vec<Trade> {
    let symbols: Vec<String> = (0..20).map(|i| format!("S{i:03}")).collect();
    let mut rng_state: u32 = 42;

    (0..n)
        .map(|i| {
            // xorshift32
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 17;
            rng_state ^= rng_state << 5;

            let side = match rng_state % 4 {
                0 => Side::Buy,
                1 => Side::Sell,
                2 => Side::SellShort,
                _ => Side::BuyToCover,
            };
            let kind = if rng_state % 7 == 0 {
                InstrumentKind::Option
            } else {
                InstrumentKind::Stock
            };
            let price = 50.0 + (rng_state % 10_000) as f64 / 100.0;
            Trade::new(
                format!("t{i}"),
                i as i64,
                &symbols[i % symbols.len()],
                kind,
                side,
                (1 + rng_state % 200) as f64,
                price,
            )
            .with_fees(1.0)
        })
        .collect()
}

fn bench_calculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay/calculate");
    let settings = AccountSettings::pdt(250_000.0);

    for n in [100, 1_000, 10_000] {
        let trades = generate_trades(n);
        group.bench_with_input(BenchmarkId::new("call_avoidance", n), &trades, |b, trades| {
            b.iter(|| black_box(calculate(&settings, trades)))
        });
    }

    let standard = settings.clone().with_policy(MarginPolicy::standard());
    let trades = generate_trades(1_000);
    group.bench_function("standard_1000", |b| {
        b.iter(|| black_box(calculate(&standard, &trades)))
    });

    group.finish();
}

criterion_group!(benches, bench_calculate);
criterion_main!(benches);
