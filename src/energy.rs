//! Kinetic and Plummer-softened potential energy of a particle snapshot
//!
//! ```text
//! E_kin = sum_i 0.5 m_i |v_i|^2
//! E_pot = sum_{i<j} -G m_i m_j / sqrt(|r_i - r_j|^2 + h^2)
//! ```
//!
//! The potential is a direct upper-triangular double loop: O(N^2) time,
//! O(1) extra memory. No pair matrix is ever materialized.

use serde::{Deserialize, Serialize};

use crate::config::GravityParams;
use crate::timestep::ParticleState;
use crate::{Error, Result};

/// Energies of the system at one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyRecord {
    /// Snapshot time
    pub time: f64,
    /// Total kinetic energy
    pub kinetic: f64,
    /// Total potential energy
    pub potential: f64,
    /// `kinetic + potential`
    pub total: f64,
}

impl EnergyRecord {
    /// Build a record; `total` is derived.
    #[must_use]
    pub fn new(time: f64, kinetic: f64, potential: f64) -> Self {
        Self {
            time,
            kinetic,
            potential,
            total: kinetic + potential,
        }
    }
}

/// Total kinetic energy of a snapshot.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] for an empty particle set.
///
/// # Example
///
/// ```rust
/// use simtrace::energy::kinetic_energy;
/// use simtrace::timestep::ParticleState;
///
/// let p = ParticleState::new(0.0, 0, [0.0; 3], [3.0, 0.0, 0.0], 2.0);
/// assert_eq!(kinetic_energy(&[p])?, 9.0);
/// # Ok::<(), simtrace::Error>(())
/// ```
pub fn kinetic_energy(particles: &[ParticleState]) -> Result<f64> {
    if particles.is_empty() {
        return Err(Error::EmptyInput("kinetic energy of no particles".to_string()));
    }
    Ok(particles
        .iter()
        .map(|p| {
            let [vx, vy, vz] = p.velocity;
            0.5 * p.mass * vz.mul_add(vz, vx.mul_add(vx, vy * vy))
        })
        .sum())
}

/// Total softened gravitational potential energy of a snapshot.
///
/// `softening_length` may be zero; coincident particles then have no finite
/// potential and are reported as an error rather than returning infinity.
///
/// # Errors
///
/// - [`Error::EmptyInput`] for an empty particle set
/// - [`Error::InvalidParameter`] if two particles coincide with zero softening
pub fn potential_energy(particles: &[ParticleState], gravity: &GravityParams) -> Result<f64> {
    if particles.is_empty() {
        return Err(Error::EmptyInput("potential energy of no particles".to_string()));
    }

    let g = gravity.gravitational_constant;
    let h2 = gravity.softening_length * gravity.softening_length;

    let mut potential = 0.0;
    for (i, a) in particles.iter().enumerate() {
        for b in &particles[i + 1..] {
            let dx = a.position[0] - b.position[0];
            let dy = a.position[1] - b.position[1];
            let dz = a.position[2] - b.position[2];
            let dist = (dz.mul_add(dz, dx.mul_add(dx, dy * dy)) + h2).sqrt();
            if dist == 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "particles {} and {} coincide at t = {} with zero softening",
                    a.id, b.id, a.time
                )));
            }
            potential -= g * a.mass * b.mass / dist;
        }
    }
    Ok(potential)
}

/// Kinetic and potential energy of one snapshot at `time`.
///
/// # Errors
///
/// Propagates [`kinetic_energy`] and [`potential_energy`] errors.
pub fn snapshot_energy(
    time: f64,
    particles: &[ParticleState],
    gravity: &GravityParams,
) -> Result<EnergyRecord> {
    Ok(EnergyRecord::new(
        time,
        kinetic_energy(particles)?,
        potential_energy(particles, gravity)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsoftened() -> GravityParams {
        GravityParams {
            gravitational_constant: 1.0,
            softening_length: 0.0,
            ..GravityParams::default()
        }
    }

    fn at(id: u32, position: [f64; 3]) -> ParticleState {
        ParticleState::new(0.0, id, position, [0.0; 3], 1.0)
    }

    #[test]
    fn test_kinetic_single_particle() {
        let p = ParticleState::new(0.0, 0, [0.0; 3], [3.0, 0.0, 0.0], 2.0);
        assert_eq!(kinetic_energy(&[p]).unwrap(), 9.0);
    }

    #[test]
    fn test_kinetic_sums_components() {
        let p = ParticleState::new(0.0, 0, [0.0; 3], [1.0, 2.0, 2.0], 1.0);
        let q = ParticleState::new(0.0, 1, [0.0; 3], [0.0, 0.0, 1.0], 4.0);
        assert!((kinetic_energy(&[p, q]).unwrap() - 6.5).abs() < 1e-15);
    }

    #[test]
    fn test_potential_pair_at_distance_three() {
        let particles = [at(0, [0.0, 0.0, 0.0]), at(1, [3.0, 0.0, 0.0])];
        let ep = potential_energy(&particles, &unsoftened()).unwrap();
        assert!((ep + 1.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn test_potential_softening() {
        let particles = [at(0, [0.0, 0.0, 0.0]), at(1, [3.0, 0.0, 0.0])];
        let gravity = GravityParams {
            softening_length: 4.0,
            ..unsoftened()
        };
        let ep = potential_energy(&particles, &gravity).unwrap();
        assert!((ep + 0.2).abs() < 1e-15);
    }

    #[test]
    fn test_potential_counts_each_pair_once() {
        // Equilateral triangle of side 1: three pairs.
        let s = 3.0_f64.sqrt() / 2.0;
        let particles = [at(0, [0.0, 0.0, 0.0]), at(1, [1.0, 0.0, 0.0]), at(2, [0.5, s, 0.0])];
        let gravity = GravityParams {
            gravitational_constant: 2.0,
            ..unsoftened()
        };
        let ep = potential_energy(&particles, &gravity).unwrap();
        assert!((ep + 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_particle_has_no_potential() {
        assert_eq!(potential_energy(&[at(0, [1.0, 2.0, 3.0])], &unsoftened()).unwrap(), 0.0);
    }

    #[test]
    fn test_coincident_unsoftened_is_error() {
        let particles = [at(0, [1.0, 1.0, 1.0]), at(1, [1.0, 1.0, 1.0])];
        assert!(matches!(
            potential_energy(&particles, &unsoftened()),
            Err(Error::InvalidParameter(_))
        ));
        // Softening regularizes the same configuration.
        let ep = potential_energy(&particles, &GravityParams::default()).unwrap();
        assert!((ep + 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(matches!(kinetic_energy(&[]), Err(Error::EmptyInput(_))));
        assert!(matches!(potential_energy(&[], &unsoftened()), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_snapshot_energy_total() {
        let p = ParticleState::new(0.5, 0, [0.0; 3], [1.0, 0.0, 0.0], 1.0);
        let q = ParticleState::new(0.5, 1, [3.0, 0.0, 0.0], [0.0; 3], 1.0);
        let record = snapshot_energy(0.5, &[p, q], &unsoftened()).unwrap();
        assert!((record.time - 0.5).abs() < f64::EPSILON);
        assert!((record.total - (0.5 - 1.0 / 3.0)).abs() < 1e-15);
    }
}
