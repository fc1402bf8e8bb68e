//! Service windows built from overload segments.
//!
//! A window is the time-of-day slot on one weekday during which a provider
//! must reduce demand by `capacity_required`. Each segment yields one
//! window, which may then be cut into procurement-sized pieces.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveTime};
use flex_algo::OverloadSegment;
use flex_core::calendar::weekday_name;
use flex_core::{FlexError, FlexResult, Hours, MegawattHours, Megawatts};
use serde::{Serialize, Serializer};

/// Floor applied to `capacity_required` so no window asks for ≤ 0 MW.
pub const MIN_CAPACITY_REQUIRED_MW: f64 = 0.1;
pub const MINIMUM_AGGREGATE_ASSET_SIZE: &str = "0.100";

/// A service window as it appears in a competition document.
///
/// `energy` and `duration` are carried for reporting and consistency
/// checks and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceWindow {
    pub name: String,
    #[serde(serialize_with = "serialize_hhmm")]
    pub start: NaiveTime,
    #[serde(serialize_with = "serialize_hhmm")]
    pub end: NaiveTime,
    pub service_days: Vec<String>,
    pub minimum_aggregate_asset_size: String,
    #[serde(serialize_with = "serialize_capacity")]
    pub capacity_required: Megawatts,
    #[serde(flatten)]
    pub optional_fields: BTreeMap<String, String>,
    #[serde(skip)]
    pub energy: MegawattHours,
    #[serde(skip)]
    pub duration: Hours,
}

/// A window still tagged with the calendar date of the segment it came
/// from. Only the period grouping reads the date; it is dropped when the
/// window is placed in a period.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowWithContext {
    pub window: ServiceWindow,
    pub date: NaiveDate,
}

fn hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn serialize_hhmm<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hhmm(*time))
}

fn serialize_capacity<S: Serializer>(
    capacity: &Megawatts,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.3}", capacity.value()))
}

impl ServiceWindow {
    /// Build a window on `day` starting at `start` and lasting `duration`.
    ///
    /// The end time wraps past midnight. `capacity` is floored at
    /// [`MIN_CAPACITY_REQUIRED_MW`].
    pub fn new(
        day: &str,
        start: NaiveTime,
        duration: Hours,
        capacity: Megawatts,
        energy: MegawattHours,
    ) -> Self {
        let end = start + Duration::minutes(duration.as_minutes());
        Self {
            name: format!("{day} {}-{}", hhmm(start), hhmm(end)),
            start,
            end,
            service_days: vec![day.to_string()],
            minimum_aggregate_asset_size: MINIMUM_AGGREGATE_ASSET_SIZE.to_string(),
            capacity_required: capacity.max(Megawatts(MIN_CAPACITY_REQUIRED_MW)),
            optional_fields: BTreeMap::new(),
            energy,
            duration,
        }
    }

    /// The weekday this window applies to.
    pub fn day(&self) -> &str {
        self.service_days.first().map(String::as_str).unwrap_or_default()
    }

    /// Same day, capacity and optional fields over a different span.
    fn respan(&self, start: NaiveTime, duration: Hours, energy: MegawattHours) -> Self {
        let mut window = Self::new(self.day(), start, duration, self.capacity_required, energy);
        window.service_days = self.service_days.clone();
        window.minimum_aggregate_asset_size = self.minimum_aggregate_asset_size.clone();
        window.optional_fields = self.optional_fields.clone();
        window
    }
}

/// Turn a segment into a window covering it.
///
/// The segment's end is the *start* of its last sample, so the window end is
/// pushed out by one sampling interval to cover that sample fully.
pub fn create_service_window(segment: &OverloadSegment) -> WindowWithContext {
    let window = ServiceWindow::new(
        weekday_name(segment.weekday()),
        segment.start().time(),
        segment.duration(),
        segment.required_reduction(),
        segment.energy(),
    );
    WindowWithContext {
        window,
        date: segment.date(),
    }
}

/// Cut a window into `procurement_minutes`-long pieces.
///
/// Windows no longer than the granularity come back unchanged. Otherwise
/// the window is cut into `ceil(duration / granularity)` pieces; the last
/// one takes whatever is left of the duration. Every piece keeps the
/// parent's capacity, and energy is shared by duration with the last piece
/// absorbing rounding so the pieces add up to the parent exactly.
pub fn split_for_procurement(
    window: &WindowWithContext,
    procurement_minutes: i64,
) -> FlexResult<Vec<WindowWithContext>> {
    if procurement_minutes <= 0 {
        return Err(FlexError::Config(format!(
            "procurement window must be a positive number of minutes, got {procurement_minutes}"
        )));
    }
    let parent = &window.window;
    let total_minutes = parent.duration.as_minutes();
    if total_minutes <= procurement_minutes {
        return Ok(vec![window.clone()]);
    }

    let pieces = (total_minutes + procurement_minutes - 1) / procurement_minutes;
    let mut assigned = MegawattHours(0.0);
    let mut split = Vec::with_capacity(pieces as usize);
    for i in 0..pieces {
        let offset = i * procurement_minutes;
        let length = procurement_minutes.min(total_minutes - offset);
        let energy = if i + 1 == pieces {
            parent.energy - assigned
        } else {
            parent.energy * (length as f64 / total_minutes as f64)
        };
        assigned += energy;
        split.push(WindowWithContext {
            window: parent.respan(
                parent.start + Duration::minutes(offset),
                Hours::from_minutes(length),
                energy,
            ),
            date: window.date,
        });
    }
    Ok(split)
}

/// Windows for every segment, split to `procurement_minutes` when given.
pub fn build_windows(
    segments: &[OverloadSegment],
    procurement_minutes: Option<i64>,
) -> FlexResult<Vec<WindowWithContext>> {
    let mut windows = Vec::with_capacity(segments.len());
    for segment in segments {
        let window = create_service_window(segment);
        match procurement_minutes {
            Some(minutes) => windows.extend(split_for_procurement(&window, minutes)?),
            None => windows.push(window),
        }
    }
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use flex_algo::find_overload_segments;
    use flex_core::DemandSeries;

    fn monday_evening(values: &[f64]) -> DemandSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(17, 0, 0)
            .unwrap();
        DemandSeries::from_samples(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (start + Duration::minutes(30 * i as i64), v)),
        )
        .unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn monday_evening_window() {
        // Six samples 17:00..19:30, peak 26.75 against 25.5.
        let series = monday_evening(&[26.0, 26.5, 26.75, 26.2, 25.9, 25.6]);
        let segments = find_overload_segments(&series, Megawatts(25.5), Hours(0.5));
        assert_eq!(segments.len(), 1);

        let ctx = create_service_window(&segments[0]);
        assert_eq!(ctx.window.name, "Monday 17:00-20:00");
        assert_eq!(ctx.window.service_days, ["Monday"]);
        assert_eq!(ctx.date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());

        let json = serde_json::to_value(&ctx.window).unwrap();
        assert_eq!(json["capacity_required"], "1.250");
        assert_eq!(json["start"], "17:00");
        assert_eq!(json["end"], "20:00");
        assert_eq!(json["minimum_aggregate_asset_size"], "0.100");
        assert!(json.get("energy_mwh").is_none());
        assert!(json.get("energy").is_none());
        assert!(json.get("duration").is_none());
    }

    #[test]
    fn capacity_is_floored() {
        let w = ServiceWindow::new(
            "Friday",
            time(9, 0),
            Hours(0.5),
            Megawatts(0.02),
            MegawattHours(0.01),
        );
        assert_eq!(w.capacity_required, Megawatts(0.1));
    }

    #[test]
    fn end_wraps_past_midnight() {
        let w = ServiceWindow::new(
            "Sunday",
            time(23, 30),
            Hours(0.5),
            Megawatts(1.0),
            MegawattHours(0.5),
        );
        assert_eq!(w.name, "Sunday 23:30-00:00");
    }

    #[test]
    fn split_into_equal_hours() {
        let ctx = WindowWithContext {
            window: ServiceWindow::new(
                "Monday",
                time(17, 0),
                Hours(3.0),
                Megawatts(1.25),
                MegawattHours(3.75),
            ),
            date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        };
        let pieces = split_for_procurement(&ctx, 60).unwrap();
        let names: Vec<_> = pieces.iter().map(|p| p.window.name.as_str()).collect();
        assert_eq!(
            names,
            ["Monday 17:00-18:00", "Monday 18:00-19:00", "Monday 19:00-20:00"]
        );
        for piece in &pieces {
            assert_eq!(piece.window.capacity_required, Megawatts(1.25));
            assert!((piece.window.energy.value() - 1.25).abs() < 1e-12);
        }
    }

    #[test]
    fn uneven_split_keeps_totals() {
        let ctx = WindowWithContext {
            window: ServiceWindow::new(
                "Tuesday",
                time(16, 0),
                Hours(3.0),
                Megawatts(2.0),
                MegawattHours(6.0),
            ),
            date: NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
        };
        let pieces = split_for_procurement(&ctx, 70).unwrap();
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2].window.duration, Hours::from_minutes(40));
        let energy: MegawattHours = pieces.iter().map(|p| p.window.energy).sum();
        let duration: Hours = pieces.iter().map(|p| p.window.duration).sum();
        assert!((energy.value() - 6.0).abs() < 1e-12);
        assert!((duration.value() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn short_window_is_not_split() {
        let ctx = WindowWithContext {
            window: ServiceWindow::new(
                "Monday",
                time(17, 0),
                Hours(0.5),
                Megawatts(1.0),
                MegawattHours(0.5),
            ),
            date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        };
        assert_eq!(split_for_procurement(&ctx, 30).unwrap(), vec![ctx.clone()]);
        assert!(split_for_procurement(&ctx, 0).is_err());
    }
}
