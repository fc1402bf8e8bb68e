use std::ops::Range;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use flex_core::calendar::is_weekend;
use flex_core::{DemandSeries, FlexError, FlexResult, Hours, MegawattHours, Megawatts};
use serde::Serialize;
use tracing::{debug, warn};

use crate::threshold::energy_peak_based;

/// Largest tolerated gap (MWh) between Σ segment energy and the peak-based
/// energy of the whole series at the same capacity.
pub const ENERGY_BALANCE_TOLERANCE_MWH: f64 = 0.01;

/// A maximal run of consecutive samples whose demand strictly exceeds the
/// firm capacity.
///
/// Fields are read through accessors; the only ways to build a segment are
/// [`OverloadSegment::new`], which checks the run, and the detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverloadSegment {
    start_index: usize,
    end_index: usize,
    start: NaiveDateTime,
    end: NaiveDateTime,
    peak_demand: Megawatts,
    peak_time: NaiveDateTime,
    firm_capacity: Megawatts,
    required_reduction: Megawatts,
    duration_samples: usize,
    duration: Hours,
    energy: MegawattHours,
    date: NaiveDate,
    weekday: u32,
    is_weekend: bool,
}

impl OverloadSegment {
    /// Build a segment over `range`, checking that every sample in it is
    /// above `capacity`.
    pub fn new(
        series: &DemandSeries,
        range: Range<usize>,
        capacity: Megawatts,
        interval: Hours,
    ) -> FlexResult<Self> {
        if range.start >= range.end || range.end > series.len() {
            return Err(FlexError::Validation(format!(
                "segment range {}..{} is empty or outside a series of {} samples",
                range.start,
                range.end,
                series.len()
            )));
        }
        if let Some(offset) = series.demand()[range.clone()]
            .iter()
            .position(|&d| d <= capacity.value())
        {
            return Err(FlexError::Validation(format!(
                "sample {} is not above firm capacity {}",
                range.start + offset,
                capacity
            )));
        }
        if !(interval.value() > 0.0) {
            return Err(FlexError::Validation(format!(
                "sampling interval must be positive, got {interval}"
            )));
        }
        Ok(Self::from_run(series, range, capacity, interval))
    }

    /// Caller guarantees a non-empty in-bounds run of overloaded samples.
    fn from_run(
        series: &DemandSeries,
        range: Range<usize>,
        capacity: Megawatts,
        interval: Hours,
    ) -> Self {
        let demand = &series.demand()[range.clone()];
        let timestamps = &series.timestamps()[range.clone()];

        let mut peak_offset = 0;
        for (offset, &value) in demand.iter().enumerate() {
            if value > demand[peak_offset] {
                peak_offset = offset;
            }
        }
        let peak_demand = Megawatts(demand[peak_offset]);
        let required_reduction = peak_demand - capacity;
        let duration_samples = range.len();
        let duration = Hours(duration_samples as f64 * interval.value());
        let start = timestamps[0];
        let date = start.date();

        Self {
            start_index: range.start,
            end_index: range.end,
            start,
            end: timestamps[duration_samples - 1],
            peak_demand,
            peak_time: timestamps[peak_offset],
            firm_capacity: capacity,
            required_reduction,
            duration_samples,
            duration,
            energy: required_reduction * duration,
            date,
            weekday: date.weekday().num_days_from_monday(),
            is_weekend: is_weekend(date),
        }
    }

    /// Index of the first overloaded sample.
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// One past the last overloaded sample.
    pub fn end_index(&self) -> usize {
        self.end_index
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Timestamp of the last overloaded sample (not the end of its interval).
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn peak_demand(&self) -> Megawatts {
        self.peak_demand
    }

    pub fn peak_time(&self) -> NaiveDateTime {
        self.peak_time
    }

    pub fn firm_capacity(&self) -> Megawatts {
        self.firm_capacity
    }

    pub fn required_reduction(&self) -> Megawatts {
        self.required_reduction
    }

    pub fn duration_samples(&self) -> usize {
        self.duration_samples
    }

    pub fn duration(&self) -> Hours {
        self.duration
    }

    pub fn energy(&self) -> MegawattHours {
        self.energy
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Monday = 0.
    pub fn weekday(&self) -> u32 {
        self.weekday
    }

    pub fn is_weekend(&self) -> bool {
        self.is_weekend
    }
}

/// Scan `series` once and return every maximal run with demand > `capacity`.
///
/// A run still open at the end of the series is closed at the last sample.
/// The result is ordered by start index and runs never overlap.
pub fn find_overload_segments(
    series: &DemandSeries,
    capacity: Megawatts,
    interval: Hours,
) -> Vec<OverloadSegment> {
    let mut segments = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, &value) in series.demand().iter().enumerate() {
        let overloaded = value > capacity.value();
        match (overloaded, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                segments.push(OverloadSegment::from_run(series, start..i, capacity, interval));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        segments.push(OverloadSegment::from_run(
            series,
            start..series.len(),
            capacity,
            interval,
        ));
    }

    let balance = energy_balance(&segments, series, capacity, interval);
    if balance.is_consistent() {
        debug!(
            segments = segments.len(),
            energy_mwh = balance.segment_total.value(),
            "overload segments extracted"
        );
    } else {
        warn!(
            segment_total = balance.segment_total.value(),
            peak_based = balance.peak_based.value(),
            "segment energies do not add up to the peak-based total"
        );
    }
    segments
}

/// Σ segment energy against the peak-based energy of the whole series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyBalance {
    pub segment_total: MegawattHours,
    pub peak_based: MegawattHours,
}

impl EnergyBalance {
    pub fn mismatch(&self) -> MegawattHours {
        (self.segment_total - self.peak_based).abs()
    }

    pub fn is_consistent(&self) -> bool {
        self.mismatch().value() <= ENERGY_BALANCE_TOLERANCE_MWH
    }
}

pub fn energy_balance(
    segments: &[OverloadSegment],
    series: &DemandSeries,
    capacity: Megawatts,
    interval: Hours,
) -> EnergyBalance {
    EnergyBalance {
        segment_total: segments.iter().map(OverloadSegment::energy).sum(),
        peak_based: MegawattHours(energy_peak_based(
            series.demand(),
            capacity.value(),
            interval.value(),
        )),
    }
}
