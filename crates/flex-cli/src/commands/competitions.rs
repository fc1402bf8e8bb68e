use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use flex_batch::{
    analyze_site, load_config, write_site_outputs, AnalysisConfig, CapacitySource,
    SiteOverrides,
};
use flex_cli::{ColumnArgs, CompetitionArgs, SolverArgs};
use flex_core::{MegawattHours, Megawatts};
use flex_ts::load_series;

use crate::commands::telemetry::record_run_timed;
use crate::commands::{apply_column_args, apply_competition_args, apply_solver_args};

pub struct CompetitionsRequest<'a> {
    pub input: &'a Path,
    pub site: Option<&'a str>,
    pub capacity: Option<f64>,
    pub target_mwh: Option<f64>,
    pub config: Option<&'a Path>,
    pub solver: &'a SolverArgs,
    pub columns: &'a ColumnArgs,
    pub competition: &'a CompetitionArgs,
    pub out: &'a Path,
}

pub fn handle(req: &CompetitionsRequest<'_>) -> Result<()> {
    let start = Instant::now();
    let site = match req.site {
        Some(site) => site.to_string(),
        None => req
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("cannot name site from {}; pass --site", req.input.display()))?,
    };

    let mut config = match req.config {
        Some(path) => load_config(path)?,
        None => AnalysisConfig::default(),
    };
    apply_solver_args(&mut config, req.solver)?;
    apply_column_args(&mut config, req.columns);
    apply_competition_args(&mut config, req.competition)?;
    if req.target_mwh.is_some() {
        config.firm_capacity.target_mwh = req.target_mwh;
    }
    config.validate().map_err(|err| anyhow!(err))?;

    let res = (|| -> Result<()> {
        let settings = config.competitions.settings()?;
        let mut substation = config.substation(&site);
        if let Some(voltage) = &req.competition.nominal_voltage {
            substation.nominal_voltage = Some(voltage.clone());
        }
        let source = match req.capacity {
            Some(capacity) => CapacitySource::Known(Megawatts(capacity)),
            None => CapacitySource::resolve(&site, &config, &SiteOverrides::default())?,
        };
        let series = load_series(req.input, &config.input.single())
            .with_context(|| format!("loading demand for {site}"))?;
        let analysis = analyze_site(&substation, &series, source, &config, &settings)?;
        let metadata = write_site_outputs(req.out, &analysis)?;
        println!(
            "{site}: firm capacity {:.3} MW, {} competitions, {} service windows -> {}",
            metadata.firm_capacity_mw,
            metadata.competitions,
            metadata.service_windows,
            req.out.display()
        );
        Ok(())
    })();

    let input_s = req.input.display().to_string();
    let capacity_s = req.capacity.map(|c| c.to_string()).unwrap_or_default();
    let target_s = req
        .target_mwh
        .or(config.firm_capacity.target_mwh)
        .map(|t| MegawattHours(t).to_string())
        .unwrap_or_default();
    record_run_timed(
        req.out,
        "competitions",
        &[
            ("input", input_s.as_str()),
            ("site", site.as_str()),
            ("capacity_mw", capacity_s.as_str()),
            ("target", target_s.as_str()),
        ],
        start,
        &res,
    );
    res
}
