// Benchmark for motion planning and preview throughput
// Run with: cargo bench -p laserkit-visualizer

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use laserkit_core::Point;
use laserkit_visualizer::{plan, Simulator, SimulatorConfig};

fn bench_plan(c: &mut Criterion) {
    let end = Point::new(120.0, 80.0);
    c.bench_function("plan 144 mm move at 60 Hz", |b| {
        b.iter(|| {
            let segment = plan(
                black_box(Point::ORIGIN),
                black_box(end),
                20.0,
                20.0,
                1.0 / 60.0,
            )
            .unwrap();
            assert!(segment.len() > 1);
        });
    });
}

fn bench_preview(c: &mut Criterion) {
    let mut program = String::from("M3 S30\n");
    for i in 0..1_000 {
        program.push_str(&format!("G1 X{} Y{} F3000\n", i % 100, i / 10));
    }
    program.push_str("M5\nM2\n");

    c.bench_function("preview 1k G1 lines", |b| {
        b.iter(|| {
            let mut sim = Simulator::new(SimulatorConfig::default());
            let executed = sim.preview(black_box(&program));
            assert_eq!(executed, 1_003);
            sim.finish();
        });
    });
}

criterion_group!(benches, bench_plan, bench_preview);
criterion_main!(benches);
