use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use flex_batch::{
    jobs_from_config, load_config, run_batch, BatchRunnerConfig, BatchSummary, SiteOverrides,
};
use tabwriter::TabWriter;

use crate::commands::telemetry::record_run_timed;

pub struct BatchRequest<'a> {
    pub config: &'a Path,
    pub combined: Option<&'a Path>,
    pub capacity_overrides: Option<&'a Path>,
    pub target_overrides: Option<&'a Path>,
    pub threads: usize,
    pub force: bool,
    pub out: Option<&'a Path>,
}

pub fn handle(req: &BatchRequest<'_>) -> Result<()> {
    let start = Instant::now();
    let analysis = load_config(req.config)?;
    let output_root: PathBuf = req
        .out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| analysis.output.base_dir.clone());
    let overrides = SiteOverrides::load(req.capacity_overrides, req.target_overrides)?;
    let jobs = jobs_from_config(&analysis, req.combined)?;

    let config = BatchRunnerConfig {
        jobs,
        output_root: output_root.clone(),
        analysis,
        overrides,
        threads: req.threads,
        force: req.force,
    };
    let mut num_jobs = 0;
    let res = (|| -> Result<()> {
        let summary = run_batch(&config)?;
        num_jobs = summary.jobs.len();
        print_summary(&summary)?;
        println!(
            "batch {} sites -> {}/{}/{} ok/fail/skipped, manifest {}",
            summary.jobs.len(),
            summary.success,
            summary.failure,
            summary.skipped,
            summary.manifest_path.display()
        );
        Ok(())
    })();

    let config_s = req.config.display().to_string();
    let threads_s = req.threads.to_string();
    let jobs_s = num_jobs.to_string();
    record_run_timed(
        &output_root,
        "batch",
        &[
            ("config", config_s.as_str()),
            ("threads", threads_s.as_str()),
            ("num_jobs", jobs_s.as_str()),
        ],
        start,
        &res,
    );
    res
}

fn print_summary(summary: &BatchSummary) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "SITE\tSTATUS\tCAPACITY (MW)\tCOMPETITIONS\tMS\tERROR")?;
    for record in &summary.jobs {
        let capacity = record
            .firm_capacity_mw
            .map(|c| format!("{c:.3}"))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            record.site,
            record.status.as_str(),
            capacity,
            record.competitions,
            record.elapsed_ms,
            record.error.as_deref().unwrap_or("")
        )?;
    }
    writer.flush()?;
    Ok(())
}
