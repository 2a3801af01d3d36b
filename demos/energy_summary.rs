//! Energy Summary of a Particle-State Table
//!
//! Usage: cargo run --example energy_summary -- <states.csv> [energy.csv]
//!
//! Without arguments a small two-body orbit is synthesized. Writes the
//! `Time,E_kin,E_pot,E_tot` table and prints the relative energy drift.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use simtrace::config::AnalysisConfig;
use simtrace::storage::save_energy_csv;
use simtrace::Pipeline;
use tracing_subscriber::EnvFilter;

/// Circular two-body orbit with G = m = 1 at separation 2.
fn synthesize(dir: &std::path::Path) -> anyhow::Result<PathBuf> {
    let omega = 0.5_f64;
    let speed = omega;
    let mut csv = String::from("time,id,x,y,z,vx,vy,vz\n");
    for step in 0..200 {
        let t = f64::from(step) * 0.05;
        let (s, c) = (omega * t).sin_cos();
        writeln!(csv, "{t},0,{},{},0,{},{},0", c, s, -speed * s, speed * c)?;
        writeln!(csv, "{t},1,{},{},0,{},{},0", -c, -s, speed * s, -speed * c)?;
    }
    let path = dir.join("two_body.csv");
    fs::write(&path, csv)?;
    Ok(path)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AnalysisConfig::load_or_default("simtrace.toml");
    let pipeline = Pipeline::from_config(config)?;

    let dir = tempfile::tempdir()?;
    let mut args = env::args().skip(1);
    let input = match args.next() {
        Some(path) => PathBuf::from(path),
        None => synthesize(dir.path())?,
    };
    let output = args
        .next()
        .map_or_else(|| dir.path().join("energy.csv"), PathBuf::from);

    let summary = pipeline.energy_summary(&input)?;
    save_energy_csv(&output, &summary)?;
    let drift = pipeline.energy_drift(&output)?;

    println!("Input:      {}", input.display());
    println!("Timesteps:  {}", summary.len());
    if let (Some(first), Some(last)) = (summary.first(), summary.last()) {
        println!("E_tot:      {:.6e} → {:.6e}", first.total, last.total);
    }
    println!(
        "Drift:      mean {:.3e}  std {:.3e}  max {:.3e}",
        drift.mean, drift.std, drift.max
    );
    println!("Written:    {}", output.display());
    Ok(())
}
