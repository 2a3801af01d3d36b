//! Property-based tests for simtrace
//!
//! - Test physical invariants of the reducers
//! - Test statistical invariants of the aggregator
//! - Run with ProptestConfig::with_cases(100)

use proptest::prelude::*;
use simtrace::config::{GravityParams, OscillatorParams, TrendConfig};
use simtrace::energy::{kinetic_energy, potential_energy};
use simtrace::ensemble::{EnsembleAggregator, TimeSeries};
use simtrace::metrics::mean_squared_error;
use simtrace::oscillator::DampedOscillator;
use simtrace::structure::half_mass_radius;
use simtrace::timestep::{group_by_time, ParticleState};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Underdamped oscillator parameters: gamma^2 < 4mk is guaranteed by
/// drawing gamma below the critical damping.
fn arb_underdamped() -> impl Strategy<Value = OscillatorParams> {
    (1.0f64..100.0, 1.0f64..1.0e4, 0.0f64..0.9, 0.1f64..2.0).prop_map(|(mass, k, ratio, amplitude)| {
        OscillatorParams {
            mass,
            spring_constant: k,
            damping: ratio * 2.0 * (mass * k).sqrt(),
            amplitude,
        }
    })
}

/// Particles at one snapshot with random state and positive mass.
fn arb_particles(max: usize) -> impl Strategy<Value = Vec<ParticleState>> {
    proptest::collection::vec(
        (
            prop::array::uniform3(-10.0f64..10.0),
            prop::array::uniform3(-5.0f64..5.0),
            0.1f64..10.0,
        ),
        1..max,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (position, velocity, mass))| {
                ParticleState::new(0.0, u32::try_from(i).unwrap(), position, velocity, mass)
            })
            .collect()
    })
}

fn arb_values(len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-1.0e3f64..1.0e3, len)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Oscillator Properties
    // ========================================================================

    /// Property: x(t) satisfies m x'' + gamma x' + k x = 0 (central differences)
    #[test]
    fn prop_analytic_solution_satisfies_ode(params in arb_underdamped(), t in 0.0f64..0.5) {
        let osc = DampedOscillator::new(&params).unwrap();
        let h = 1.0e-5 / osc.damped_frequency().max(1.0);
        let x = osc.position(t);
        let xp = osc.position(t + h);
        let xm = osc.position(t - h);
        let accel = (xp - 2.0 * x + xm) / (h * h);
        let residual = params.mass.mul_add(accel, params.damping.mul_add(osc.velocity(t), params.spring_constant * x));
        let scale = params.spring_constant * params.amplitude;
        prop_assert!(residual.abs() <= 1.0e-3 * scale, "residual {} vs scale {}", residual, scale);
    }

    /// Property: v(t) is the time derivative of x(t)
    #[test]
    fn prop_velocity_is_derivative(params in arb_underdamped(), t in 0.0f64..0.5) {
        let osc = DampedOscillator::new(&params).unwrap();
        let h = 1.0e-6 / osc.damped_frequency().max(1.0);
        let numeric = (osc.position(t + h) - osc.position(t - h)) / (2.0 * h);
        let scale = params.amplitude * (params.spring_constant / params.mass).sqrt();
        prop_assert!((numeric - osc.velocity(t)).abs() <= 1.0e-4 * scale);
    }

    /// Property: x(0) = A
    #[test]
    fn prop_initial_position_is_amplitude(params in arb_underdamped()) {
        let osc = DampedOscillator::new(&params).unwrap();
        prop_assert!((osc.position(0.0) - params.amplitude).abs() < 1.0e-12);
    }

    // ========================================================================
    // Metric Properties
    // ========================================================================

    /// Property: MSE of a sequence with itself is zero
    #[test]
    fn prop_mse_self_is_zero(values in arb_values(20)) {
        prop_assert_eq!(mean_squared_error(&values, &values).unwrap(), 0.0);
    }

    /// Property: MSE is symmetric and non-negative
    #[test]
    fn prop_mse_symmetric(a in arb_values(16), b in arb_values(16)) {
        let ab = mean_squared_error(&a, &b).unwrap();
        let ba = mean_squared_error(&b, &a).unwrap();
        prop_assert!(ab >= 0.0);
        prop_assert!((ab - ba).abs() <= 1.0e-12 * ab.max(1.0));
    }

    // ========================================================================
    // Energy and Structure Properties
    // ========================================================================

    /// Property: kinetic energy is never negative
    #[test]
    fn prop_kinetic_energy_non_negative(particles in arb_particles(20)) {
        prop_assert!(kinetic_energy(&particles).unwrap() >= 0.0);
    }

    /// Property: softened potential energy is never positive
    #[test]
    fn prop_potential_energy_non_positive(particles in arb_particles(20)) {
        let potential = potential_energy(&particles, &GravityParams::default()).unwrap();
        prop_assert!(potential <= 0.0);
    }

    /// Property: potential energy does not depend on particle order
    #[test]
    fn prop_potential_energy_order_independent(particles in arb_particles(12)) {
        let gravity = GravityParams::default();
        let forward = potential_energy(&particles, &gravity).unwrap();
        let mut reversed = particles;
        reversed.reverse();
        let backward = potential_energy(&reversed, &gravity).unwrap();
        prop_assert!((forward - backward).abs() <= 1.0e-9 * forward.abs().max(1.0));
    }

    /// Property: the half-mass radius is one of the centroid distances
    /// (upper median, no interpolation)
    #[test]
    fn prop_half_mass_is_a_sample(particles in arb_particles(25)) {
        let r = half_mass_radius(&particles).unwrap();
        prop_assert!(r >= 0.0);
        let n = particles.len() as f64;
        let c: Vec<f64> = (0..3)
            .map(|k| particles.iter().map(|p| p.position[k]).sum::<f64>() / n)
            .collect();
        let mut dists: Vec<f64> = particles
            .iter()
            .map(|p| {
                let dx = p.position[0] - c[0];
                let dy = p.position[1] - c[1];
                let dz = p.position[2] - c[2];
                (dx * dx + dy * dy + dz * dz).sqrt()
            })
            .collect();
        dists.sort_by(f64::total_cmp);
        prop_assert!((r - dists[dists.len() / 2]).abs() <= 1.0e-12 * r.max(1.0));
    }

    /// Property: grouping keeps every row and yields ascending times
    #[test]
    fn prop_grouping_preserves_rows(times in proptest::collection::vec(0u8..5, 1..40)) {
        let rows: Vec<ParticleState> = times
            .iter()
            .enumerate()
            .map(|(i, &t)| ParticleState::new(f64::from(t), u32::try_from(i).unwrap(), [0.0; 3], [0.0; 3], 1.0))
            .collect();
        let snapshots = group_by_time(&rows);
        let total: usize = snapshots.iter().map(|s| s.particle_count()).sum();
        prop_assert_eq!(total, rows.len());
        prop_assert!(snapshots.windows(2).all(|w| w[0].time() < w[1].time()));
    }

    // ========================================================================
    // Ensemble Properties
    // ========================================================================

    /// Property: identical runs have zero cross-run std at every timestep
    #[test]
    fn prop_identical_runs_zero_std(values in arb_values(12), copies in 2usize..6) {
        let times: Vec<f64> = (0..values.len()).map(|i| i as f64 * 0.1).collect();
        let run = TimeSeries::new(times, values.clone()).unwrap();
        let runs = vec![run; copies];
        let aggregator = EnsembleAggregator::from_config(&TrendConfig::default()).unwrap();
        let summary = aggregator.aggregate(&runs).unwrap();
        prop_assert!(summary.std.iter().all(|&s| s == 0.0));
        prop_assert_eq!(summary.mean, values);
        prop_assert_eq!(summary.slope_std, 0.0);
    }
}
