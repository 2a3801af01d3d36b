//! Per-timestep reducer benchmarks
//!
//! Potential energy is the only super-linear stage (O(N^2) pairs per
//! snapshot); kinetic energy and half-mass radius are the linear baseline.
//!
//! Run with: cargo bench --bench energy_benchmarks

#![allow(clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use simtrace::config::GravityParams;
use simtrace::energy::{kinetic_energy, potential_energy};
use simtrace::structure::half_mass_radius;
use simtrace::timestep::{group_by_time, ParticleState, TimestepAnalyzer};

const PARTICLE_COUNTS: [usize; 3] = [100, 1_000, 4_000];

/// Deterministic particle cloud on a jittered lattice.
fn cloud(time: f64, n: usize) -> Vec<ParticleState> {
    (0..n)
        .map(|i| {
            let f = i as f64;
            let id = u32::try_from(i).unwrap_or(u32::MAX);
            ParticleState::new(
                time,
                id,
                [(f * 0.618).sin() * 10.0, (f * 0.414).cos() * 10.0, (f * 0.273).sin() * 10.0],
                [(f * 0.1).cos(), (f * 0.2).sin(), 0.5],
                1.0 / n as f64,
            )
        })
        .collect()
}

fn bench_potential_energy(c: &mut Criterion) {
    let mut group = c.benchmark_group("potential_energy");
    let gravity = GravityParams::default();

    for n in PARTICLE_COUNTS {
        let particles = cloud(0.0, n);
        group.bench_with_input(BenchmarkId::new("softened_pairs", n), &particles, |b, p| {
            b.iter(|| potential_energy(black_box(p), &gravity));
        });
    }

    group.finish();
}

fn bench_linear_reducers(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_reducers");

    for n in PARTICLE_COUNTS {
        let particles = cloud(0.0, n);
        group.bench_with_input(BenchmarkId::new("kinetic_energy", n), &particles, |b, p| {
            b.iter(|| kinetic_energy(black_box(p)));
        });
        group.bench_with_input(BenchmarkId::new("half_mass_radius", n), &particles, |b, p| {
            b.iter(|| half_mass_radius(black_box(p)));
        });
    }

    group.finish();
}

fn bench_timestep_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("timestep_analysis");
    let analyzer = TimestepAnalyzer::new(GravityParams::default());

    // 100 snapshots x 200 particles, rows interleaved by particle
    let mut rows = Vec::new();
    for step in 0..100 {
        rows.extend(cloud(f64::from(step) * 0.01, 200));
    }
    rows.sort_by_key(|p| p.id);

    group.bench_function("group_by_time_20k_rows", |b| {
        b.iter(|| group_by_time(black_box(&rows)));
    });
    group.bench_function("analyze_20k_rows", |b| {
        b.iter(|| analyzer.analyze(black_box(&rows)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_potential_energy,
    bench_linear_reducers,
    bench_timestep_analysis
);
criterion_main!(benches);
