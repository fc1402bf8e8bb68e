use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use flex_core::calendar::{month_end, month_name, month_start, weekday_name};
use serde::{Deserialize, Serialize};

use crate::window::{ServiceWindow, WindowWithContext};

/// How windows are bucketed into service periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodGrouping {
    #[default]
    Monthly,
    Daily,
}

/// A named date range holding the windows that fall inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServicePeriod {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub service_windows: Vec<ServiceWindow>,
}

impl ServicePeriod {
    /// Calendar month containing `date`, from its first to its last day.
    pub fn monthly(date: NaiveDate, service_windows: Vec<ServiceWindow>) -> Self {
        Self {
            name: month_name(date.month()).to_string(),
            start: month_start(date),
            end: month_end(date),
            service_windows,
        }
    }

    /// A single day, `[date, date + 1)`.
    pub fn daily(date: NaiveDate, service_windows: Vec<ServiceWindow>) -> Self {
        Self {
            name: format!(
                "{} {} ({})",
                month_name(date.month()),
                date.day(),
                weekday_name(date.weekday().num_days_from_monday())
            ),
            start: date,
            end: date + Duration::days(1),
            service_windows,
        }
    }

    pub fn window_count(&self) -> usize {
        self.service_windows.len()
    }
}

/// One period per (year, month) present, in calendar order.
pub fn group_monthly(windows: Vec<WindowWithContext>) -> Vec<ServicePeriod> {
    let mut by_month: BTreeMap<NaiveDate, Vec<ServiceWindow>> = BTreeMap::new();
    for ctx in windows {
        by_month
            .entry(month_start(ctx.date))
            .or_default()
            .push(ctx.window);
    }
    by_month
        .into_iter()
        .map(|(month, windows)| ServicePeriod::monthly(month, windows))
        .collect()
}

/// One period per calendar date present, in calendar order.
pub fn group_daily(windows: Vec<WindowWithContext>) -> Vec<ServicePeriod> {
    let mut by_day: BTreeMap<NaiveDate, Vec<ServiceWindow>> = BTreeMap::new();
    for ctx in windows {
        by_day.entry(ctx.date).or_default().push(ctx.window);
    }
    by_day
        .into_iter()
        .map(|(day, windows)| ServicePeriod::daily(day, windows))
        .collect()
}

pub fn group_windows(
    windows: Vec<WindowWithContext>,
    grouping: PeriodGrouping,
) -> Vec<ServicePeriod> {
    match grouping {
        PeriodGrouping::Monthly => group_monthly(windows),
        PeriodGrouping::Daily => group_daily(windows),
    }
}
