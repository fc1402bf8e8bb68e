//! Qualification and bidding dates for a competition.
//!
//! Qualification opens at 12:00 on the first weekday of the month before
//! the service starts and closes 14 days later at 08:00. Bidding runs from
//! 08:30 to 17:00 on the qualification close date.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use flex_core::calendar::{first_weekday_of_month, month_name, previous_month_start};
use flex_core::{FlexError, FlexResult};
use serde::{Serialize, Serializer};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
pub const QUALIFICATION_DAYS: i64 = 14;
pub const ARCHIVE_AFTER_DAYS: i64 = 7;

const QUALIFICATION_OPEN: (u32, u32) = (12, 0);
const QUALIFICATION_CLOSE: (u32, u32) = (8, 0);
const BIDDING_OPEN: (u32, u32) = (8, 30);
const BIDDING_CLOSE: (u32, u32) = (17, 0);

fn at(date: NaiveDate, (hour, minute): (u32, u32)) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN))
}

fn is_at(ts: NaiveDateTime, (hour, minute): (u32, u32)) -> bool {
    NaiveTime::from_hms_opt(hour, minute, 0) == Some(ts.time())
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn serialize_timestamp<S: Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*ts))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompetitionDates {
    #[serde(serialize_with = "serialize_timestamp")]
    pub qualification_open: NaiveDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    pub qualification_closed: NaiveDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    pub bidding_open: NaiveDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    pub bidding_closed: NaiveDateTime,
}

impl CompetitionDates {
    /// Schedule for a service period starting on `service_start`.
    pub fn for_service_start(service_start: NaiveDate) -> Self {
        let open_day = first_weekday_of_month(previous_month_start(service_start));
        let close_day = open_day + Duration::days(QUALIFICATION_DAYS);
        Self {
            qualification_open: at(open_day, QUALIFICATION_OPEN),
            qualification_closed: at(close_day, QUALIFICATION_CLOSE),
            bidding_open: at(close_day, BIDDING_OPEN),
            bidding_closed: at(close_day, BIDDING_CLOSE),
        }
    }

    /// Check the schedule rules: a 14-day qualification window, the fixed
    /// times of day, and bidding on the qualification close date.
    pub fn validate(&self) -> FlexResult<()> {
        let span = (self.qualification_closed.date() - self.qualification_open.date()).num_days();
        if span != QUALIFICATION_DAYS {
            return Err(FlexError::Validation(format!(
                "qualification spans {span} days, expected {QUALIFICATION_DAYS}"
            )));
        }
        let checks = [
            ("qualification_open", self.qualification_open, QUALIFICATION_OPEN),
            ("qualification_closed", self.qualification_closed, QUALIFICATION_CLOSE),
            ("bidding_open", self.bidding_open, BIDDING_OPEN),
            ("bidding_closed", self.bidding_closed, BIDDING_CLOSE),
        ];
        for (label, ts, expected) in checks {
            if !is_at(ts, expected) {
                return Err(FlexError::Validation(format!(
                    "{label} is at {}, expected {:02}:{:02}",
                    ts.time(),
                    expected.0,
                    expected.1
                )));
            }
        }
        if self.bidding_open.date() != self.qualification_closed.date()
            || self.bidding_closed.date() != self.qualification_closed.date()
        {
            return Err(FlexError::Validation(
                "bidding must happen on the qualification close date".to_string(),
            ));
        }
        Ok(())
    }

    pub fn archive_on(&self) -> NaiveDateTime {
        self.bidding_closed + Duration::days(ARCHIVE_AFTER_DAYS)
    }
}

/// A UK financial year, April to March, written `YYYY/YY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinancialYear {
    start_year: i32,
}

impl FinancialYear {
    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Service months of the year, April first.
    pub fn months(&self) -> Vec<NaiveDate> {
        (4..=12)
            .filter_map(|m| NaiveDate::from_ymd_opt(self.start_year, m, 1))
            .chain((1..=3).filter_map(|m| NaiveDate::from_ymd_opt(self.start_year + 1, m, 1)))
            .collect()
    }

    /// One schedule row per service month.
    pub fn schedule(&self) -> Vec<ScheduleRow> {
        self.months()
            .into_iter()
            .map(|service_month| ScheduleRow {
                month: month_name(service_month.month()).to_string(),
                service_month,
                dates: CompetitionDates::for_service_start(service_month),
            })
            .collect()
    }

    /// Schedule for the service month named by `month` (1..=12).
    pub fn dates_for_month(&self, month: u32) -> FlexResult<CompetitionDates> {
        let name = month_name(month);
        self.schedule()
            .into_iter()
            .find(|row| row.month == name)
            .map(|row| row.dates)
            .ok_or_else(|| {
                FlexError::Validation(format!("no dates for {name} in financial year {self}"))
            })
    }
}

impl std::fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

impl std::str::FromStr for FinancialYear {
    type Err = FlexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid =
            || FlexError::Config(format!("financial year must be 'YYYY/YY', got '{value}'"));
        let value_trimmed = value.trim();
        if value_trimmed.len() != 7 {
            return Err(invalid());
        }
        let (first, second) = value_trimmed.split_once('/').ok_or_else(invalid)?;
        let start_year: i32 = first.parse().map_err(|_| invalid())?;
        let end: i32 = second.parse().map_err(|_| invalid())?;
        if first.len() != 4 || end != (start_year + 1).rem_euclid(100) {
            return Err(invalid());
        }
        Ok(Self { start_year })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleRow {
    pub month: String,
    pub service_month: NaiveDate,
    #[serde(flatten)]
    pub dates: CompetitionDates,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn april_service_dates() {
        // 3 March 2025 is the first weekday of March.
        let dates = CompetitionDates::for_service_start(date(2025, 4, 1));
        assert_eq!(format_timestamp(dates.qualification_open), "2025-03-03T12:00:00Z");
        assert_eq!(format_timestamp(dates.qualification_closed), "2025-03-17T08:00:00Z");
        assert_eq!(format_timestamp(dates.bidding_open), "2025-03-17T08:30:00Z");
        assert_eq!(format_timestamp(dates.bidding_closed), "2025-03-17T17:00:00Z");
        assert_eq!(format_timestamp(dates.archive_on()), "2025-03-24T17:00:00Z");
        dates.validate().unwrap();
    }

    #[test]
    fn january_service_opens_in_december() {
        let dates = CompetitionDates::for_service_start(date(2026, 1, 1));
        assert_eq!(dates.qualification_open.date(), date(2025, 12, 1));
    }

    #[test]
    fn validation_catches_bad_times() {
        let mut dates = CompetitionDates::for_service_start(date(2025, 6, 1));
        dates.bidding_open += Duration::minutes(5);
        assert!(matches!(dates.validate(), Err(FlexError::Validation(_))));

        let mut dates = CompetitionDates::for_service_start(date(2025, 6, 1));
        dates.qualification_closed += Duration::days(1);
        assert!(dates.validate().is_err());
    }

    #[test]
    fn financial_year_table() {
        let fy: FinancialYear = "2025/26".parse().unwrap();
        let schedule = fy.schedule();
        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule[0].month, "April");
        assert_eq!(schedule[11].month, "March");
        assert_eq!(schedule[11].service_month, date(2026, 3, 1));
        assert_eq!(
            fy.dates_for_month(1).unwrap(),
            CompetitionDates::for_service_start(date(2026, 1, 1))
        );
        assert_eq!(fy.to_string(), "2025/26");
    }

    #[test]
    fn financial_year_format_is_strict() {
        assert!("2025-26".parse::<FinancialYear>().is_err());
        assert!("2025/27".parse::<FinancialYear>().is_err());
        assert!("25/26".parse::<FinancialYear>().is_err());
        assert!("1999/00".parse::<FinancialYear>().is_ok());
    }
}
