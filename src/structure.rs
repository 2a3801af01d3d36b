//! Spatial structure of a snapshot: centroid and half-mass radius

use crate::timestep::ParticleState;
use crate::{Error, Result};

/// Arithmetic mean position (unweighted by mass).
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] for an empty particle set.
#[allow(clippy::cast_precision_loss)]
pub fn centroid(particles: &[ParticleState]) -> Result<[f64; 3]> {
    if particles.is_empty() {
        return Err(Error::EmptyInput("centroid of no particles".to_string()));
    }
    let n = particles.len() as f64;
    let sum = particles.iter().fold([0.0; 3], |acc, p| {
        [
            acc[0] + p.position[0],
            acc[1] + p.position[1],
            acc[2] + p.position[2],
        ]
    });
    Ok([sum[0] / n, sum[1] / n, sum[2] / n])
}

/// Distance from the centroid below which half the particles lie.
///
/// The distances to the centroid are sorted ascending and the element at
/// index `N / 2` (integer division) is returned. For even N this is the upper
/// of the two middle values, never their average.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] for an empty particle set.
///
/// # Example
///
/// ```rust
/// use simtrace::structure::half_mass_radius;
/// use simtrace::timestep::ParticleState;
///
/// let p = |id, x: f64, y: f64| ParticleState::new(0.0, id, [x, y, 0.0], [0.0; 3], 1.0);
/// // Distances 1, 1, 3, 3 from the origin: result is 3, not 2.
/// let particles = [p(0, 1.0, 0.0), p(1, -1.0, 0.0), p(2, 0.0, 3.0), p(3, 0.0, -3.0)];
/// assert_eq!(half_mass_radius(&particles)?, 3.0);
/// # Ok::<(), simtrace::Error>(())
/// ```
pub fn half_mass_radius(particles: &[ParticleState]) -> Result<f64> {
    let [cx, cy, cz] = centroid(particles)?;
    let mut distances: Vec<f64> = particles
        .iter()
        .map(|p| {
            let dx = p.position[0] - cx;
            let dy = p.position[1] - cy;
            let dz = p.position[2] - cz;
            dz.mul_add(dz, dx.mul_add(dx, dy * dy)).sqrt()
        })
        .collect();
    distances.sort_by(f64::total_cmp);
    Ok(distances[distances.len() / 2])
}
