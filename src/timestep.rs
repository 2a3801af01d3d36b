//! Per-timestep grouping of particle-state tables
//!
//! Rows are grouped by exact equality of their `time` value as read from the
//! source. There is no tolerance: timestamps with rounding jitter fracture
//! into separate snapshots, matching how the simulator output has always been
//! grouped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GravityParams;
use crate::energy::{snapshot_energy, EnergyRecord};
use crate::structure::half_mass_radius;
use crate::{Error, Result};

/// State of one particle at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleState {
    /// Snapshot time
    pub time: f64,
    /// Particle id, `0..N-1` within a snapshot
    pub id: u32,
    /// Position `(x, y, z)`
    pub position: [f64; 3],
    /// Velocity `(vx, vy, vz)`
    pub velocity: [f64; 3],
    /// Particle mass
    pub mass: f64,
}

impl ParticleState {
    /// Create a particle state.
    #[must_use]
    pub const fn new(time: f64, id: u32, position: [f64; 3], velocity: [f64; 3], mass: f64) -> Self {
        Self {
            time,
            id,
            position,
            velocity,
            mass,
        }
    }
}

/// All particles sharing one exact `time` value.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    time: f64,
    particles: Vec<ParticleState>,
}

impl Snapshot {
    /// Snapshot time
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Particles in source row order
    #[must_use]
    pub fn particles(&self) -> &[ParticleState] {
        &self.particles
    }

    /// Number of distinct particle ids
    #[must_use]
    pub fn particle_count(&self) -> usize {
        let mut ids: Vec<u32> = self.particles.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Check that the ids are exactly `0..N-1`, each once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParticleIdMismatch`] describing the first violation.
    pub fn check_ids(&self) -> Result<()> {
        let mut ids: Vec<u32> = self.particles.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        for (expected, &id) in (0_u32..).zip(&ids) {
            if id != expected {
                return Err(Error::ParticleIdMismatch {
                    time: self.time,
                    reason: if id < expected {
                        format!("duplicate id {id}")
                    } else {
                        format!("missing id {expected}")
                    },
                });
            }
        }
        Ok(())
    }
}

/// Partition rows into snapshots keyed by exact `time`, ascending.
///
/// Row order inside a snapshot follows the source order.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn group_by_time(rows: &[ParticleState]) -> Vec<Snapshot> {
    let mut sorted = rows.to_vec();
    // Stable: rows sharing a time keep their relative order.
    sorted.sort_by(|a, b| a.time.total_cmp(&b.time));

    let mut snapshots: Vec<Snapshot> = Vec::new();
    for row in sorted {
        match snapshots.last_mut() {
            Some(current) if current.time == row.time => current.particles.push(row),
            _ => snapshots.push(Snapshot {
                time: row.time,
                particles: vec![row],
            }),
        }
    }
    snapshots
}

/// Energies and half-mass radius of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepRecord {
    /// Kinetic, potential and total energy
    pub energy: EnergyRecord,
    /// Half-mass radius
    pub half_mass_radius: f64,
    /// Number of particles in the snapshot
    pub particle_count: usize,
}

impl TimestepRecord {
    /// Snapshot time
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.energy.time
    }
}

/// Applies the per-snapshot reducers to a whole particle-state table.
#[derive(Debug, Clone, Copy)]
pub struct TimestepAnalyzer {
    gravity: GravityParams,
}

impl TimestepAnalyzer {
    /// Create an analyzer for the given gravitational constants.
    #[must_use]
    pub const fn new(gravity: GravityParams) -> Self {
        Self { gravity }
    }

    /// Gravitational constants in use
    #[must_use]
    pub const fn gravity(&self) -> &GravityParams {
        &self.gravity
    }

    /// Group `rows` by time and reduce each snapshot independently.
    ///
    /// With `strict_particle_ids`, every snapshot must hold ids `0..N-1`
    /// with the N of the first snapshot.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyInput`] if `rows` is empty
    /// - [`Error::ParticleIdMismatch`] on an inconsistent id set (strict mode)
    /// - any reducer error, e.g. coincident unsoftened particles
    pub fn analyze(&self, rows: &[ParticleState]) -> Result<Vec<TimestepRecord>> {
        self.analyze_snapshots(&group_by_time(rows))
    }

    /// Reduce pre-grouped snapshots.
    ///
    /// # Errors
    ///
    /// Same as [`TimestepAnalyzer::analyze`].
    pub fn analyze_snapshots(&self, snapshots: &[Snapshot]) -> Result<Vec<TimestepRecord>> {
        let first = snapshots
            .first()
            .ok_or_else(|| Error::EmptyInput("particle table has no rows".to_string()))?;
        let expected_count = first.particle_count();

        let mut records = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            if self.gravity.strict_particle_ids {
                snapshot.check_ids()?;
                if snapshot.particles.len() != expected_count {
                    return Err(Error::ParticleIdMismatch {
                        time: snapshot.time,
                        reason: format!(
                            "{} particles, first snapshot has {expected_count}",
                            snapshot.particles.len()
                        ),
                    });
                }
            }
            records.push(TimestepRecord {
                energy: snapshot_energy(snapshot.time, &snapshot.particles, &self.gravity)?,
                half_mass_radius: half_mass_radius(&snapshot.particles)?,
                particle_count: snapshot.particle_count(),
            });
        }

        debug!(
            snapshots = records.len(),
            particles = expected_count,
            "analyzed particle table"
        );
        Ok(records)
    }

    /// Energy records only, one per snapshot.
    ///
    /// # Errors
    ///
    /// Same as [`TimestepAnalyzer::analyze`].
    pub fn energy_series(&self, rows: &[ParticleState]) -> Result<Vec<EnergyRecord>> {
        Ok(self.analyze(rows)?.into_iter().map(|r| r.energy).collect())
    }
}

/// Half-mass radius per snapshot as `(times, radii)`, without energies.
///
/// Skips the O(N^2) potential, so this is the cheap path for structure-only
/// analysis of large runs.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] if `rows` is empty.
pub fn half_mass_radius_series(rows: &[ParticleState]) -> Result<(Vec<f64>, Vec<f64>)> {
    let snapshots = group_by_time(rows);
    if snapshots.is_empty() {
        return Err(Error::EmptyInput("particle table has no rows".to_string()));
    }
    let mut times = Vec::with_capacity(snapshots.len());
    let mut radii = Vec::with_capacity(snapshots.len());
    for snapshot in &snapshots {
        times.push(snapshot.time);
        radii.push(half_mass_radius(&snapshot.particles)?);
    }
    Ok((times, radii))
}
