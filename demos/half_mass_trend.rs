//! Half-Mass Radius Trend vs Particle Count
//!
//! Synthesizes repeated runs per particle count, reduces each to its
//! half-mass radius series, and fits the stationary expansion rate.
//!
//! Run with: RUST_LOG=info cargo run --example half_mass_trend

#![allow(clippy::cast_precision_loss)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use simtrace::config::AnalysisConfig;
use simtrace::sweep::FailurePolicy;
use simtrace::trend::TrendVariant;
use simtrace::Pipeline;
use tracing_subscriber::EnvFilter;

const PARTICLE_COUNTS: [u32; 3] = [32, 64, 128];
const RUNS_PER_POINT: u32 = 4;
const STEPS: u32 = 40;
const DT: f64 = 0.05;

/// Particles on a sphere shell whose radius grows after a settling transient.
/// Expansion rate falls with N; each run gets its own phase.
fn write_run(dir: &Path, n: u32, run: u32) -> anyhow::Result<PathBuf> {
    let rate = 4.0 / f64::from(n).sqrt();
    let mut csv = String::from("time,id,x,y,z,vx,vy,vz\n");
    for step in 0..STEPS {
        let t = f64::from(step) * DT;
        let settle = (-4.0 * t).exp();
        for id in 0..n {
            let phase = f64::from(id).mul_add(2.399, f64::from(run));
            let r = rate.mul_add(t, 1.0) + settle * (phase.sin() * 0.3);
            let z = (2.0 * f64::from(id) + 1.0) / f64::from(n) - 1.0;
            let ring = z.mul_add(-z, 1.0).sqrt();
            writeln!(
                csv,
                "{t},{id},{},{},{},0,0,0",
                r * ring * phase.cos(),
                r * ring * phase.sin(),
                r * z
            )?;
        }
    }
    let path = dir.join(format!("n{n}_run{run}.csv"));
    fs::write(&path, csv)?;
    Ok(path)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            HALF-MASS RADIUS TREND vs PARTICLE COUNT          ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let config = AnalysisConfig::load_or_default("simtrace.toml");
    let dir = tempfile::tempdir()?;

    let mut points = Vec::new();
    for n in PARTICLE_COUNTS {
        let runs = (0..RUNS_PER_POINT)
            .map(|run| write_run(dir.path(), n, run))
            .collect::<anyhow::Result<Vec<_>>>()?;
        points.push((f64::from(n), runs));
    }

    for (label, strategy) in [
        ("full stationary range", TrendVariant::FullRange),
        ("last half of stationary range", TrendVariant::TailFraction { frac_tail: 0.5 }),
    ] {
        let pipeline = Pipeline::builder()
            .config(config.clone())
            .trend_strategy(strategy)
            .failure_policy(FailurePolicy::SkipAndReport)
            .build()?;
        let trend = pipeline.half_mass_trend_sweep(points.clone())?;

        println!("┌─ {label} ");
        for point in trend.points() {
            println!(
                "│ N = {:>4}   slope = {:.4} ± {:.4}   ({} runs)",
                point.parameter, point.slope, point.slope_std, point.run_count
            );
        }
        if let Some(ymax) = trend.envelope_max() {
            println!("│ shared y-limit: {ymax:.3}");
        }
        for failure in trend.failures() {
            println!("│ skipped {}: {}", failure.point, failure.error);
        }
        println!("└────────────────────────────────────────────────────────────┘\n");
    }

    Ok(())
}
