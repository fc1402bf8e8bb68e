use anyhow::{anyhow, Result};
use flex_batch::AnalysisConfig;
use flex_cli::{ColumnArgs, CompetitionArgs, SolverArgs};

pub mod batch;
pub mod capacity;
pub mod competitions;
pub mod completions;
pub mod fields;
pub mod schedule;
pub mod telemetry;

/// Lay command-line flags over a loaded (or default) config.
pub fn apply_solver_args(config: &mut AnalysisConfig, args: &SolverArgs) -> Result<()> {
    let fc = &mut config.firm_capacity;
    if let Some(method) = &args.method {
        fc.method = method.parse().map_err(|err| anyhow!("{err}"))?;
    }
    if let Some(tolerance) = args.tolerance {
        fc.tolerance = tolerance;
    }
    if let Some(max_iterations) = args.max_iterations {
        fc.max_iterations = max_iterations;
    }
    if args.interval_hours.is_some() {
        fc.interval_hours = args.interval_hours;
    }
    Ok(())
}

pub fn apply_column_args(config: &mut AnalysisConfig, args: &ColumnArgs) {
    if let Some(column) = &args.timestamp_column {
        config.input.timestamp_column = column.clone();
    }
    if let Some(column) = &args.demand_column {
        config.input.demand_column = column.clone();
    }
}

pub fn apply_competition_args(config: &mut AnalysisConfig, args: &CompetitionArgs) -> Result<()> {
    let comp = &mut config.competitions;
    if let Some(area) = &args.licence_area {
        comp.licence_area = area.clone();
    }
    if args.no_split {
        comp.procurement_window_minutes = None;
    } else if args.procurement_minutes.is_some() {
        comp.procurement_window_minutes = args.procurement_minutes;
    }
    if args.daily {
        comp.daily_service_periods = true;
    }
    if args.financial_year.is_some() {
        comp.financial_year = args.financial_year.clone();
    }
    if let Some(mode) = &args.config_mode {
        comp.config_mode = mode.parse()?;
    }
    if !args.fields.is_empty() {
        comp.custom_fields = args.fields.clone();
    }
    if args.service_year.is_some() {
        comp.service_year = args.service_year;
    }
    Ok(())
}
