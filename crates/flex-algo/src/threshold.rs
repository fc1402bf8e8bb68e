//! Energy-above-threshold functions.
//!
//! Both functions map a demand profile and a candidate firm capacity to the
//! energy (MWh) that would have to be shed to keep demand at or below that
//! capacity. They are the objective that [`crate::solver::invert_capacity`]
//! inverts.
//!
//! **Accounting rules:**
//! - *Above capacity*: `E(C) = Σ max(dᵢ − C, 0) · Δt`, the per-sample excess.
//! - *Peak based*: each maximal run of samples with `dᵢ > C` contributes
//!   `(peak_of_run − C) · run_length · Δt`. A flexibility provider must hold
//!   the run's full peak reduction for the whole run, so within-run dips do
//!   not reduce the requirement.
//!
//! Both are non-increasing in `C` and zero once `C ≥ max(d)`. Inside a run
//! every sample satisfies `dᵢ − C ≤ peak − C`, so `E_peak(C) ≥ E_above(C)`
//! for every `C`, and the inverted peak-based capacity is never below the
//! plain one.

use serde::{Deserialize, Serialize};

/// `Σ max(dᵢ − C, 0) · Δt`
pub fn energy_above_capacity(demand: &[f64], capacity: f64, interval_hours: f64) -> f64 {
    demand
        .iter()
        .map(|&d| (d - capacity).max(0.0))
        .sum::<f64>()
        * interval_hours
}

/// Peak-based energy: `Σ_runs (peak − C) · len · Δt` over maximal runs of `dᵢ > C`.
///
/// A sample exactly equal to `C` is not an overload and terminates a run.
pub fn energy_peak_based(demand: &[f64], capacity: f64, interval_hours: f64) -> f64 {
    let mut total = 0.0;
    let mut i = 0;
    let n = demand.len();
    while i < n {
        if demand[i] > capacity {
            let mut j = i;
            let mut peak = demand[i];
            while j < n && demand[j] > capacity {
                peak = peak.max(demand[j]);
                j += 1;
            }
            total += (peak - capacity) * ((j - i) as f64 * interval_hours);
            i = j;
        } else {
            i += 1;
        }
    }
    total
}

/// Selects which accounting rule a capacity inversion uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMethod {
    AboveCapacity,
    #[default]
    PeakBased,
}

impl EnergyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyMethod::AboveCapacity => "above_capacity",
            EnergyMethod::PeakBased => "peak_based",
        }
    }

    pub fn energy(&self, demand: &[f64], capacity: f64, interval_hours: f64) -> f64 {
        match self {
            EnergyMethod::AboveCapacity => energy_above_capacity(demand, capacity, interval_hours),
            EnergyMethod::PeakBased => energy_peak_based(demand, capacity, interval_hours),
        }
    }
}

impl std::str::FromStr for EnergyMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "above_capacity" | "plain" => Ok(EnergyMethod::AboveCapacity),
            "peak_based" | "peak" => Ok(EnergyMethod::PeakBased),
            other => Err(format!(
                "unknown energy method '{other}'; use peak_based or above_capacity"
            )),
        }
    }
}
