use serde::Serialize;

use crate::competition::Competition;

/// One service window's energy, flattened for the MWh report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowEnergyRow {
    #[serde(rename = "Competition")]
    pub competition: String,
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Window")]
    pub window: String,
    #[serde(rename = "Capacity (MW)")]
    pub capacity_mw: f64,
    #[serde(rename = "Energy (MWh)")]
    pub energy_mwh: f64,
    #[serde(rename = "Window Duration (h)")]
    pub duration_hours: f64,
    #[serde(rename = "Days")]
    pub days: usize,
}

/// Month a period belongs to, read off its name (`"January"` or
/// `"January 6 (Monday)"`).
fn period_month(name: &str) -> String {
    name.split_whitespace().next().unwrap_or_default().to_string()
}

pub fn window_energy_report(competitions: &[Competition]) -> Vec<WindowEnergyRow> {
    competitions
        .iter()
        .flat_map(|competition| {
            competition.service_periods.iter().flat_map(move |period| {
                period.service_windows.iter().map(move |window| WindowEnergyRow {
                    competition: competition.name.clone(),
                    month: period_month(&period.name),
                    window: window.name.clone(),
                    capacity_mw: window.capacity_required.value(),
                    energy_mwh: window.energy.value(),
                    duration_hours: window.duration.value(),
                    days: window.service_days.len(),
                })
            })
        })
        .collect()
}
