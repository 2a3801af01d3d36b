//! Oscillator Error Sweep: integrator × step size → MSE
//!
//! Writes synthetic trajectories whose error scales with the integrator's
//! order, runs the error sweep, and prints the best step size per integrator.
//!
//! Run with: RUST_LOG=info cargo run --example oscillator_sweep

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use simtrace::config::{AnalysisConfig, OscillatorParams};
use simtrace::oscillator::{analytic_solution, OscillatorMetric};
use simtrace::sweep::{best_step_size, SweepKey};
use simtrace::Pipeline;
use tracing_subscriber::EnvFilter;

const INTEGRATORS: [(&str, i32); 3] = [("euler", 1), ("verlet", 2), ("gear5", 5)];
const STEP_SIZES: [f64; 4] = [1.0e-2, 1.0e-3, 1.0e-4, 1.0e-5];

/// Trajectory sampled every 1e-3 s with a perturbation of size `dt^order`.
fn write_trajectory(dir: &Path, params: &OscillatorParams, name: &str, dt: f64, order: i32) -> anyhow::Result<PathBuf> {
    let times: Vec<f64> = (0..=1000).map(|i| f64::from(i) * 1.0e-3).collect();
    let analytic = analytic_solution(&times, params)?;
    let error = dt.powi(order);

    let mut csv = String::from("time,id,x,y,z,vx,vy,vz\n");
    for (i, &t) in times.iter().enumerate() {
        let wobble = error * (7.0 * t).sin();
        writeln!(
            csv,
            "{t:.6e},0,{:.12e},0,0,{:.12e},0,0",
            analytic.positions[i] + wobble,
            analytic.velocities[i] - wobble
        )?;
    }

    let path = dir.join(format!("{name}_{dt:e}.csv"));
    fs::write(&path, csv)?;
    Ok(path)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              OSCILLATOR ERROR vs STEP SIZE SWEEP             ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let config = AnalysisConfig::load_or_default("simtrace.toml");
    let pipeline = Pipeline::from_config(config)?;
    let dir = tempfile::tempdir()?;

    let mut points = Vec::new();
    for (name, order) in INTEGRATORS {
        for dt in STEP_SIZES {
            let path = write_trajectory(dir.path(), &pipeline.config().oscillator, name, dt, order)?;
            points.push((SweepKey::new(name, dt), path));
        }
    }

    let table = pipeline.oscillator_error_sweep(OscillatorMetric::Position, points)?;

    println!("┌─ POSITION MSE ─────────────────────────────────────────────┐");
    for name in table.integrators() {
        println!("│ {name}");
        for (dt, mse) in table.points(name) {
            println!("│   dt = {dt:.0e}   mse = {mse:.3e}");
        }
    }
    println!("└────────────────────────────────────────────────────────────┘\n");

    println!("┌─ BEST STEP SIZE (mse < 1e-10) ─────────────────────────────┐");
    for name in table.integrators() {
        match best_step_size(&table, name, 1.0e-10) {
            Some(record) => println!("│ {name:<8} dt = {:.0e}", record.step_size()),
            None => println!("│ {name:<8} no step size reaches the threshold"),
        }
    }
    println!("└────────────────────────────────────────────────────────────┘\n");

    let out = dir.path().join("ecm_results.csv");
    table.save_csv(&out)?;
    print!("{}", fs::read_to_string(&out)?);
    Ok(())
}
