use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use flex_algo::{statistics_for_target, CapacityInversion, CapacityStatistics};
use flex_batch::AnalysisConfig;
use flex_cli::{ColumnArgs, SolverArgs};
use flex_core::MegawattHours;
use flex_ts::load_series;
use tabwriter::TabWriter;
use tracing::info;

use crate::commands::telemetry::record_run_timed;
use crate::commands::{apply_column_args, apply_solver_args};

pub fn handle(
    input: &Path,
    target_mwh: f64,
    solver: &SolverArgs,
    columns: &ColumnArgs,
    out: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();
    let mut config = AnalysisConfig::default();
    apply_solver_args(&mut config, solver)?;
    apply_column_args(&mut config, columns);
    config.firm_capacity.target_mwh = Some(target_mwh);
    config.validate().map_err(|err| anyhow!(err))?;

    let res = (|| -> Result<()> {
        let series = load_series(input, &config.input.single())?;
        let interval = config.interval().unwrap_or_else(|| series.infer_interval());
        let fc = &config.firm_capacity;
        info!(input = %input.display(), samples = series.len(), "inverting firm capacity");
        let stats = statistics_for_target(
            &series,
            MegawattHours(target_mwh),
            fc.method,
            interval,
            fc.tolerance,
            fc.max_iterations,
        )?;
        print_statistics(&stats)?;
        if let Some(path) = out {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(&stats)?;
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        }
        Ok(())
    })();

    if let Some(dir) = out.and_then(Path::parent) {
        let input_s = input.display().to_string();
        let target_s = target_mwh.to_string();
        record_run_timed(
            dir,
            "capacity",
            &[("input", input_s.as_str()), ("target_mwh", target_s.as_str())],
            start,
            &res,
        );
    }
    res
}

fn inversion_cell(inversion: Option<&CapacityInversion>) -> String {
    match inversion {
        Some(inv) if inv.converged => format!("{:.3}", inv.capacity.value()),
        Some(inv) => format!("{:.3} (not converged)", inv.capacity.value()),
        None => "-".to_string(),
    }
}

fn print_statistics(stats: &CapacityStatistics) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "METRIC\tVALUE")?;
    writeln!(writer, "method\t{}", stats.method.as_str())?;
    writeln!(writer, "firm_capacity_mw\t{:.3}", stats.capacity.value())?;
    writeln!(writer, "capacity_plain_mw\t{}", inversion_cell(stats.plain.as_ref()))?;
    writeln!(writer, "capacity_peak_mw\t{}", inversion_cell(stats.peak.as_ref()))?;
    writeln!(writer, "mean_demand_mw\t{:.3}", stats.mean_demand.value())?;
    writeln!(writer, "max_demand_mw\t{:.3}", stats.max_demand.value())?;
    writeln!(writer, "total_energy_mwh\t{:.3}", stats.total_energy.value())?;
    writeln!(
        writer,
        "energy_above_capacity_mwh\t{:.3}",
        stats.energy_above_capacity.value()
    )?;
    writeln!(writer, "interval_hours\t{}", stats.interval.value())?;
    writer.flush()?;
    Ok(())
}
