use flex_core::{DemandSeries, FlexResult, Hours, MegawattHours, Megawatts};
use serde::Serialize;

use crate::solver::{firm_capacity_for_target, CapacityInversion};
use crate::threshold::{energy_peak_based, EnergyMethod};

/// Summary of one substation's demand against its firm capacity.
///
/// `plain` and `peak` hold the two inversions of the same target; `capacity`
/// is whichever one the analysis adopted (or a supplied override).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityStatistics {
    pub capacity: Megawatts,
    pub method: EnergyMethod,
    pub target_energy: Option<MegawattHours>,
    pub plain: Option<CapacityInversion>,
    pub peak: Option<CapacityInversion>,
    pub mean_demand: Megawatts,
    pub max_demand: Megawatts,
    pub total_energy: MegawattHours,
    /// Peak-based energy above `capacity`.
    pub energy_above_capacity: MegawattHours,
    pub interval: Hours,
}

/// Invert `target` with both accounting rules and adopt the one named by `method`.
pub fn statistics_for_target(
    series: &DemandSeries,
    target: MegawattHours,
    method: EnergyMethod,
    interval: Hours,
    tolerance_fraction: f64,
    max_iterations: usize,
) -> FlexResult<CapacityStatistics> {
    let plain = firm_capacity_for_target(
        series,
        EnergyMethod::AboveCapacity,
        target,
        interval,
        tolerance_fraction,
        max_iterations,
    )?;
    let peak = firm_capacity_for_target(
        series,
        EnergyMethod::PeakBased,
        target,
        interval,
        tolerance_fraction,
        max_iterations,
    )?;
    let capacity = match method {
        EnergyMethod::AboveCapacity => plain.capacity,
        EnergyMethod::PeakBased => peak.capacity,
    };
    let mut stats = statistics_for_capacity(series, capacity, interval);
    stats.method = method;
    stats.target_energy = Some(target);
    stats.plain = Some(plain);
    stats.peak = Some(peak);
    Ok(stats)
}

/// Statistics for a capacity that is already known.
pub fn statistics_for_capacity(
    series: &DemandSeries,
    capacity: Megawatts,
    interval: Hours,
) -> CapacityStatistics {
    CapacityStatistics {
        capacity,
        method: EnergyMethod::PeakBased,
        target_energy: None,
        plain: None,
        peak: None,
        mean_demand: series.mean_demand(),
        max_demand: series.max_demand(),
        total_energy: series.total_energy(interval),
        energy_above_capacity: MegawattHours(energy_peak_based(
            series.demand(),
            capacity.value(),
            interval.value(),
        )),
        interval,
    }
}
