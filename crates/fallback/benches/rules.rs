use criterion::{black_box, criterion_group, criterion_main, Criterion};
use data_validator::AnomalyInput;
use fallback::FallbackEngine;

fn bench_predict(c: &mut Criterion) {
    let engine = FallbackEngine::new();
    let critical = AnomalyInput::new("EQ001", "Hydraulic", "Pressure drop detected in main valve");
    let baseline = AnomalyInput::new(
        "EQ002",
        "Mechanical",
        "Operator reported an unusual smell near the north conveyor housing after the shift change",
    );

    c.bench_function("fallback_predict_critical", |b| {
        b.iter(|| engine.predict(black_box(&critical)))
    });
    c.bench_function("fallback_predict_baseline", |b| {
        b.iter(|| engine.predict(black_box(&baseline)))
    });
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);
