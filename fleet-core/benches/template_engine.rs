//! Benchmarks the template engine's hot path: `Execute` under a cache
//! hit (the common case on a pure status re-render, spec.md §4.1) and
//! under a cold compile-and-run.

use std::env;
use std::time::Duration;

use criterion::{black_box, Criterion};
use fleet_core::TemplateEngine;
use serde_json::json;

const TEMPLATE: &str = r#"{{ colorIf(.status.ready, "green", "red", .status.phase) }} ({{ ago(.metadata.creationTimestamp) }})"#;

fn bench_cache_hit(c: &mut Criterion) {
    let engine = TemplateEngine::new(1000);
    let data = json!({
        "status": {"ready": true, "phase": "Running"},
        "metadata": {"creationTimestamp": "2024-01-01T00:00:00Z"},
    });
    // Warm the result cache once outside the timed loop.
    engine.execute(TEMPLATE, &data).unwrap();

    c.bench_function("template_execute_cache_hit", |b| {
        b.iter(|| black_box(engine.execute(black_box(TEMPLATE), black_box(&data)).unwrap()));
    });
}

fn bench_cold_compile(c: &mut Criterion) {
    let data = json!({
        "status": {"ready": true, "phase": "Running"},
        "metadata": {"creationTimestamp": "2024-01-01T00:00:00Z"},
    });

    c.bench_function("template_execute_cold", |b| {
        b.iter(|| {
            // A fresh engine per iteration forces parse + result-cache
            // miss every time, isolating the cold path from the cache
            // this engine otherwise shares across calls.
            let engine = TemplateEngine::new(1);
            black_box(engine.execute(black_box(TEMPLATE), black_box(&data)).unwrap())
        });
    });
}

fn main() {
    let quick_mode = env::args().skip(1).any(|arg| arg == "--quick");

    let mut criterion = Criterion::default();
    if quick_mode {
        criterion = criterion
            .sample_size(10)
            .warm_up_time(Duration::from_millis(100))
            .measurement_time(Duration::from_millis(250));
    }

    bench_cache_hit(&mut criterion);
    bench_cold_compile(&mut criterion);
    criterion.final_summary();
}
