//! Criterion benchmarks for the parameter sweep.
//!
//! Run with: `cargo bench -p trailstop-runner`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal_macros::dec;
use trailstop_core::data::{fetch_bars, FetchRequest, SyntheticSource};
use trailstop_core::domain::{Bar, Interval, Side};
use trailstop_core::position_management::PositionParams;
use trailstop_runner::sweep::{ParamSweep, SweepGrid};

fn bars(n: i64) -> Vec<Bar> {
    let request = FetchRequest::new("BENCH", 0, (n - 1) * 300_000, Interval::FiveMinutes);
    fetch_bars(&SyntheticSource::new(42), &request)
        .expect("synthetic bars")
        .bars
}

fn grid() -> SweepGrid {
    SweepGrid {
        take_profit_pct: vec![dec!(0.01), dec!(0.02), dec!(0.05), dec!(0.1)],
        trailing_activation_delta: vec![dec!(0.005), dec!(0.01), dec!(0.02)],
        trailing_delta: vec![dec!(0.002), dec!(0.005), dec!(0.01)],
    }
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    let data = bars(5_000);
    let base = PositionParams {
        side: Side::Buy,
        entry_price: data[0].close,
        amount: dec!(1),
        take_profit_pct: dec!(0.05),
        trailing_activation_delta: dec!(0.01),
        trailing_delta: dec!(0.005),
    };

    for parallel in [false, true] {
        let sweep = ParamSweep::new().with_parallelism(parallel);
        group.bench_with_input(
            BenchmarkId::from_parameter(if parallel { "parallel" } else { "sequential" }),
            &parallel,
            |b, _| {
                b.iter(|| sweep.run("BENCH", black_box(&base), &grid(), black_box(&data)));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_sweep);
criterion_main!(benches);
