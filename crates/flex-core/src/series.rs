use chrono::{Datelike, NaiveDateTime};

use crate::error::{FlexError, FlexResult};
use crate::units::{Hours, MegawattHours, Megawatts};

/// Sampling interval assumed when a series is too short to infer one.
pub const DEFAULT_INTERVAL_HOURS: f64 = 0.5;

/// Timestamped demand samples for one substation.
///
/// Construction validates the series: at least one sample, finite demand
/// values and non-decreasing timestamps. Downstream stages rely on these
/// guarantees and never re-check them.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    timestamps: Vec<NaiveDateTime>,
    demand: Vec<f64>,
}

impl DemandSeries {
    pub fn new(timestamps: Vec<NaiveDateTime>, demand: Vec<f64>) -> FlexResult<Self> {
        if timestamps.len() != demand.len() {
            return Err(FlexError::Validation(format!(
                "{} timestamps but {} demand values",
                timestamps.len(),
                demand.len()
            )));
        }
        if timestamps.is_empty() {
            return Err(FlexError::EmptySeries);
        }
        for (row, value) in demand.iter().enumerate() {
            if !value.is_finite() {
                return Err(FlexError::InvalidDemand {
                    row,
                    reason: format!("{value} is not a finite number"),
                });
            }
        }
        for (row, pair) in timestamps.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(FlexError::NonMonotonic {
                    row: row + 1,
                    previous: pair[0].to_string(),
                    current: pair[1].to_string(),
                });
            }
        }
        Ok(Self { timestamps, demand })
    }

    pub fn from_samples<I>(samples: I) -> FlexResult<Self>
    where
        I: IntoIterator<Item = (NaiveDateTime, f64)>,
    {
        let (timestamps, demand) = samples.into_iter().unzip();
        Self::new(timestamps, demand)
    }

    pub fn len(&self) -> usize {
        self.demand.len()
    }

    /// Always false for a constructed series; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.demand.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn demand(&self) -> &[f64] {
        &self.demand
    }

    pub fn timestamp(&self, index: usize) -> Option<NaiveDateTime> {
        self.timestamps.get(index).copied()
    }

    pub fn max_demand(&self) -> Megawatts {
        Megawatts(self.demand.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    pub fn mean_demand(&self) -> Megawatts {
        Megawatts(self.demand.iter().sum::<f64>() / self.demand.len() as f64)
    }

    /// Σ demand · Δt over the whole series.
    pub fn total_energy(&self, interval: Hours) -> MegawattHours {
        MegawattHours(self.demand.iter().sum::<f64>() * interval.value())
    }

    /// Spacing between the first two samples, falling back to half-hourly.
    pub fn infer_interval(&self) -> Hours {
        match (self.timestamps.first(), self.timestamps.get(1)) {
            (Some(first), Some(second)) if second > first => {
                Hours((*second - *first).num_seconds() as f64 / 3600.0)
            }
            _ => Hours(DEFAULT_INTERVAL_HOURS),
        }
    }

    /// Move every timestamp to `year`, keeping month, day and time of day.
    ///
    /// Used to re-date historical demand onto the procurement year. Fails
    /// when a sample cannot exist in the target year (29 February).
    pub fn with_year(&self, year: i32) -> FlexResult<Self> {
        let timestamps = self
            .timestamps
            .iter()
            .map(|ts| {
                ts.with_year(year).ok_or_else(|| {
                    FlexError::Validation(format!("timestamp {ts} has no equivalent in {year}"))
                })
            })
            .collect::<FlexResult<Vec<_>>>()?;
        Self::new(timestamps, self.demand.clone())
    }
}
