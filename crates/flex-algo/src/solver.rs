//! Firm capacity inversion.
//!
//! Given a target unserved energy `E*`, find the capacity `C` with
//! `E(C) ≈ E*` by bisection on `[0, max(d)]`. The energy functions in
//! [`crate::threshold`] are non-increasing in `C`, so the bracket always
//! holds the answer when `E(max) ≤ E* ≤ E(0)`.
//!
//! When the bracket does not shrink below the tolerance within the iteration
//! budget the midpoint is still returned as a best estimate, with
//! `converged = false` so callers can flag it.

use flex_core::{DemandSeries, FlexError, FlexResult, Hours, MegawattHours, Megawatts};
use serde::Serialize;
use tracing::{debug, warn};

use crate::threshold::EnergyMethod;

pub const DEFAULT_TOLERANCE_FRACTION: f64 = 1e-3;
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Outcome of a bisection run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacityInversion {
    pub capacity: Megawatts,
    pub iterations: usize,
    pub converged: bool,
    /// Width of the final bracket in MW.
    pub bracket_width: f64,
}

/// Invert `energy_fn` for `target_energy` by bisection.
///
/// `energy_fn(demand, capacity)` must be non-increasing in `capacity`.
/// `tolerance` is an absolute width in MW; bisection stops once the bracket
/// is narrower than it.
pub fn invert_capacity<F>(
    energy_fn: F,
    demand: &[f64],
    target_energy: f64,
    tolerance: f64,
    max_iterations: usize,
) -> FlexResult<CapacityInversion>
where
    F: Fn(&[f64], f64) -> f64,
{
    if demand.is_empty() {
        return Err(FlexError::EmptySeries);
    }
    if !(tolerance > 0.0) {
        return Err(FlexError::Config(format!(
            "bisection tolerance must be positive, got {tolerance}"
        )));
    }
    if !target_energy.is_finite() || target_energy < 0.0 {
        return Err(FlexError::Config(format!(
            "target energy must be a non-negative number, got {target_energy}"
        )));
    }

    let mut low = 0.0_f64;
    let mut high = demand.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut iterations = 0;

    while high - low >= tolerance && iterations < max_iterations {
        let mid = 0.5 * (low + high);
        if energy_fn(demand, mid) > target_energy {
            low = mid;
        } else {
            high = mid;
        }
        iterations += 1;
    }

    let inversion = CapacityInversion {
        capacity: Megawatts(0.5 * (low + high)),
        iterations,
        converged: high - low < tolerance,
        bracket_width: high - low,
    };
    if inversion.converged {
        debug!(
            capacity = inversion.capacity.value(),
            iterations, "bisection converged"
        );
    } else {
        warn!(
            capacity = inversion.capacity.value(),
            iterations,
            bracket_width = inversion.bracket_width,
            "bisection hit the iteration limit before reaching tolerance"
        );
    }
    Ok(inversion)
}

/// Invert a demand series with one of the built-in accounting rules.
///
/// The absolute tolerance is `tolerance_fraction · max(d)`, so the precision
/// scales with the substation size.
pub fn firm_capacity_for_target(
    series: &DemandSeries,
    method: EnergyMethod,
    target: MegawattHours,
    interval: Hours,
    tolerance_fraction: f64,
    max_iterations: usize,
) -> FlexResult<CapacityInversion> {
    let peak = series.max_demand().value();
    let tolerance = tolerance_fraction * peak.abs();
    if !(tolerance > 0.0) {
        return Err(FlexError::Config(format!(
            "tolerance fraction {tolerance_fraction} gives a non-positive tolerance for peak {peak} MW"
        )));
    }
    let dt = interval.value();
    invert_capacity(
        |demand, capacity| method.energy(demand, capacity, dt),
        series.demand(),
        target.value(),
        tolerance,
        max_iterations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::{energy_above_capacity, energy_peak_based};

    #[test]
    fn zero_target_returns_peak() {
        let demand = [10.0, 20.0, 15.0];
        let inv = invert_capacity(
            |d, c| energy_above_capacity(d, c, 0.5),
            &demand,
            0.0,
            1e-6,
            100,
        )
        .unwrap();
        assert!(inv.converged);
        assert!((inv.capacity.value() - 20.0).abs() < 1e-5);
    }

    #[test]
    fn recovers_reference_capacity() {
        let demand = [1.0, 2.0, 3.0, 4.0, 5.0];
        let inv = invert_capacity(|d, c| energy_peak_based(d, c, 0.5), &demand, 2.0, 1e-6, 100)
            .unwrap();
        assert!((inv.capacity.value() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn iteration_limit_reports_best_estimate() {
        let demand = [0.0, 100.0];
        let inv = invert_capacity(
            |d, c| energy_above_capacity(d, c, 1.0),
            &demand,
            40.0,
            1e-9,
            3,
        )
        .unwrap();
        assert_eq!(inv.iterations, 3);
        assert!(!inv.converged);
        assert!((inv.capacity.value() - 60.0).abs() < 12.5 + 1e-9);
    }

    #[test]
    fn rejects_empty_demand() {
        let err = invert_capacity(|_, _| 0.0, &[], 1.0, 1e-3, 10).unwrap_err();
        assert!(matches!(err, FlexError::EmptySeries));
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let err = invert_capacity(|_, _| 0.0, &[1.0], 1.0, 0.0, 10).unwrap_err();
        assert!(matches!(err, FlexError::Config(_)));
    }
}
