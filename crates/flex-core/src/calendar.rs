//! Calendar helpers shared by the window, period and date builders.
//!
//! All helpers take a `NaiveDate` inside the month of interest so they stay
//! infallible; no month/day arithmetic goes through `from_ymd_opt`.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Monday-first weekday names, indexed by `Weekday::num_days_from_monday`.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Name of a Monday-based weekday index (0 = Monday).
pub fn weekday_name(index: u32) -> &'static str {
    WEEKDAY_NAMES[(index % 7) as usize]
}

/// Name of a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[((month + 11) % 12) as usize]
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First calendar day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let start = month_start(date);
    month_start(start + Duration::days(32)) - Duration::days(1)
}

/// First day of the month preceding the month containing `date`.
pub fn previous_month_start(date: NaiveDate) -> NaiveDate {
    month_start(month_start(date) - Duration::days(1))
}

/// First Monday–Friday day of the month containing `date`.
pub fn first_weekday_of_month(date: NaiveDate) -> NaiveDate {
    let mut day = month_start(date);
    while is_weekend(day) {
        day += Duration::days(1);
    }
    day
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn names_are_monday_first() {
        assert_eq!(weekday_name(0), "Monday");
        assert_eq!(weekday_name(6), "Sunday");
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
    }

    #[test]
    fn month_bounds_handle_leap_years() {
        assert_eq!(month_end(date(2024, 2, 10)), date(2024, 2, 29));
        assert_eq!(month_end(date(2025, 2, 10)), date(2025, 2, 28));
        assert_eq!(month_end(date(2025, 12, 31)), date(2025, 12, 31));
        assert_eq!(month_start(date(2025, 7, 19)), date(2025, 7, 1));
    }

    #[test]
    fn previous_month_wraps_year() {
        assert_eq!(previous_month_start(date(2025, 1, 15)), date(2024, 12, 1));
        assert_eq!(previous_month_start(date(2025, 4, 1)), date(2025, 3, 1));
    }

    #[test]
    fn first_weekday_skips_weekend() {
        // 1 March 2025 is a Saturday.
        assert_eq!(first_weekday_of_month(date(2025, 3, 20)), date(2025, 3, 3));
        // 1 April 2025 is a Tuesday.
        assert_eq!(first_weekday_of_month(date(2025, 4, 20)), date(2025, 4, 1));
    }
}
