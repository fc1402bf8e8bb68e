use crate::analysis::{analyze_site, write_site_outputs, CapacitySource, METADATA_FILE};
use crate::config::AnalysisConfig;
use crate::job::{JobStatus, SiteJob, SiteJobRecord};
use crate::manifest::{write_batch_manifest, BatchManifest, MANIFEST_FILE};
use crate::overrides::SiteOverrides;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use flex_compete::CompetitionSettings;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

pub struct BatchRunnerConfig {
    pub jobs: Vec<SiteJob>,
    pub output_root: PathBuf,
    pub analysis: AnalysisConfig,
    pub overrides: SiteOverrides,
    /// 0 means one worker per CPU.
    pub threads: usize,
    /// Re-run sites that already have a `metadata.json`.
    pub force: bool,
}

pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<SiteJobRecord>,
}

/// Analyse every site on a bounded pool and write `batch_manifest.json`.
///
/// A failing site is recorded and never stops the others. Only problems
/// that affect every site (output root, settings, pool) are returned as errors.
pub fn run_batch(config: &BatchRunnerConfig) -> Result<BatchSummary> {
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating batch output root '{}'",
            config.output_root.display()
        )
    })?;
    let settings = config
        .analysis
        .competitions
        .settings()
        .map_err(|err| anyhow!(err))
        .context("resolving competition settings")?;

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for site analysis")?;
    info!(sites = config.jobs.len(), threads = thread_count, "starting batch");

    let job_records: Vec<SiteJobRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, config, &settings))
            .collect()
    });

    let count = |status: JobStatus| job_records.iter().filter(|r| r.status == status).count();
    let success = count(JobStatus::Ok);
    let failure = count(JobStatus::Error);
    let skipped = count(JobStatus::Skipped);
    info!(success, failure, skipped, "batch finished");

    let manifest = BatchManifest {
        created_at: Utc::now(),
        num_jobs: job_records.len(),
        success,
        failure,
        skipped,
        threads: thread_count,
        jobs: job_records.clone(),
    };
    let manifest_path = config.output_root.join(MANIFEST_FILE);
    write_batch_manifest(&manifest_path, &manifest)?;
    Ok(BatchSummary {
        success,
        failure,
        skipped,
        manifest_path,
        jobs: job_records,
    })
}

fn run_job(
    job: &SiteJob,
    config: &BatchRunnerConfig,
    settings: &CompetitionSettings,
) -> SiteJobRecord {
    let started = Instant::now();
    let output_dir = config.output_root.join(job.dir_name());
    let mut record = SiteJobRecord {
        site: job.site.clone(),
        status: JobStatus::Ok,
        error: None,
        firm_capacity_mw: None,
        competitions: 0,
        output: output_dir.display().to_string(),
        elapsed_ms: 0,
    };

    if !config.force && output_dir.join(METADATA_FILE).exists() {
        info!(site = %job.site, "already processed, skipping");
        record.status = JobStatus::Skipped;
        return record;
    }

    let runner = || -> Result<(f64, usize)> {
        let series = job.load(&config.analysis)?;
        let substation = config.analysis.substation(&job.site);
        let source = CapacitySource::resolve(&job.site, &config.analysis, &config.overrides)?;
        let analysis = analyze_site(&substation, &series, source, &config.analysis, settings)?;
        let metadata = write_site_outputs(&output_dir, &analysis)?;
        Ok((metadata.firm_capacity_mw, metadata.competitions))
    };
    match runner() {
        Ok((capacity, competitions)) => {
            record.firm_capacity_mw = Some(capacity);
            record.competitions = competitions;
        }
        Err(err) => {
            error!(site = %job.site, "site failed: {err:#}");
            record.status = JobStatus::Error;
            record.error = Some(format!("{err:#}"));
        }
    }
    record.elapsed_ms = started.elapsed().as_millis() as u64;
    record
}
