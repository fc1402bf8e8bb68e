//! Firm capacity algorithms.
//!
//! - [`threshold`] energy above a candidate capacity (plain and peak based)
//! - [`solver`] bisection inversion of an energy target into a capacity
//! - [`segments`] overload run extraction at a fixed capacity
//! - [`stats`] per-substation summary used by the batch reports

pub mod segments;
pub mod solver;
pub mod stats;
pub mod threshold;

pub use segments::{
    energy_balance, find_overload_segments, EnergyBalance, OverloadSegment,
    ENERGY_BALANCE_TOLERANCE_MWH,
};
pub use solver::{
    firm_capacity_for_target, invert_capacity, CapacityInversion, DEFAULT_MAX_ITERATIONS,
    DEFAULT_TOLERANCE_FRACTION,
};
pub use stats::{statistics_for_capacity, statistics_for_target, CapacityStatistics};
pub use threshold::{energy_above_capacity, energy_peak_based, EnergyMethod};
