//! One substation, end to end: firm capacity, then competitions.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use flex_algo::{statistics_for_capacity, statistics_for_target, CapacityStatistics};
use flex_compete::{
    competitions_to_json, window_energy_report, Competition, CompetitionBuilder,
    CompetitionSettings, Substation,
};
use flex_core::{DemandSeries, MegawattHours, Megawatts};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AnalysisConfig;
use crate::overrides::SiteOverrides;

pub const METADATA_FILE: &str = "metadata.json";
pub const COMPETITIONS_FILE: &str = "competitions.json";
pub const WINDOW_REPORT_FILE: &str = "service_window_mwh.csv";

/// Where a site's firm capacity comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapacitySource {
    Known(Megawatts),
    Target(MegawattHours),
}

impl CapacitySource {
    /// Known capacity override, then target override, then the configured target.
    pub fn resolve(site: &str, config: &AnalysisConfig, overrides: &SiteOverrides) -> Result<Self> {
        if let Some(capacity) = overrides.capacity(site) {
            return Ok(Self::Known(capacity));
        }
        if let Some(target) = overrides.target(site) {
            return Ok(Self::Target(target));
        }
        config
            .firm_capacity
            .target_mwh
            .map(|t| Self::Target(MegawattHours(t)))
            .ok_or_else(|| anyhow!("no firm capacity or target energy for {site}"))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Known(_) => "known",
            Self::Target(_) => "target",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteAnalysis {
    pub substation: Substation,
    pub source: CapacitySource,
    pub statistics: CapacityStatistics,
    pub competitions: Vec<Competition>,
    pub energy_consistent: bool,
}

impl SiteAnalysis {
    pub fn capacity(&self) -> Megawatts {
        self.statistics.capacity
    }

    pub fn window_count(&self) -> usize {
        self.competitions
            .iter()
            .flat_map(|c| c.service_periods.iter())
            .map(|p| p.window_count())
            .sum()
    }
}

/// Run the full pipeline for one site.
///
/// The series is re-dated first when a service year is configured; the
/// capacity is taken as given or inverted from the target energy.
pub fn analyze_site(
    substation: &Substation,
    series: &DemandSeries,
    source: CapacitySource,
    config: &AnalysisConfig,
    settings: &CompetitionSettings,
) -> Result<SiteAnalysis> {
    let redated;
    let series = match config.competitions.service_year {
        Some(year) => {
            redated = series
                .with_year(year)
                .with_context(|| format!("moving {} onto {year}", substation.name))?;
            &redated
        }
        None => series,
    };
    let interval = config.interval().unwrap_or_else(|| series.infer_interval());

    let fc = &config.firm_capacity;
    let statistics = match source {
        CapacitySource::Known(capacity) => statistics_for_capacity(series, capacity, interval),
        CapacitySource::Target(target) => statistics_for_target(
            series,
            target,
            fc.method,
            interval,
            fc.tolerance,
            fc.max_iterations,
        )
        .with_context(|| format!("inverting firm capacity for {}", substation.name))?,
    };

    let (competitions, energy_consistent) = CompetitionBuilder::new(substation, settings, interval)
        .create_checked_competitions(series, statistics.capacity)
        .with_context(|| format!("building competitions for {}", substation.name))?;

    info!(
        site = %substation.name,
        source = source.label(),
        capacity_mw = statistics.capacity.value(),
        competitions = competitions.len(),
        "site analysed"
    );

    Ok(SiteAnalysis {
        substation: substation.clone(),
        source,
        statistics,
        competitions,
        energy_consistent,
    })
}

/// Contents of `metadata.json`; its presence marks a site as processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMetadata {
    pub site: String,
    pub licence_area: String,
    pub created_at: DateTime<Utc>,
    pub capacity_source: String,
    pub firm_capacity_mw: f64,
    pub competitions: usize,
    pub service_windows: usize,
    pub energy_consistent: bool,
    pub statistics: serde_json::Value,
}

impl SiteMetadata {
    pub fn from_analysis(analysis: &SiteAnalysis) -> Result<Self> {
        Ok(Self {
            site: analysis.substation.name.clone(),
            licence_area: analysis.substation.licence_area.clone(),
            created_at: Utc::now(),
            capacity_source: analysis.source.label().to_string(),
            firm_capacity_mw: analysis.capacity().value(),
            competitions: analysis.competitions.len(),
            service_windows: analysis.window_count(),
            energy_consistent: analysis.energy_consistent,
            statistics: serde_json::to_value(&analysis.statistics)
                .context("serializing capacity statistics")?,
        })
    }
}

/// Write competitions, the window energy report and, last, the metadata marker.
pub fn write_site_outputs(dir: &Path, analysis: &SiteAnalysis) -> Result<SiteMetadata> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating site output directory {}", dir.display()))?;

    let json = competitions_to_json(&analysis.competitions)?;
    let competitions_path = dir.join(COMPETITIONS_FILE);
    fs::write(&competitions_path, json)
        .with_context(|| format!("writing {}", competitions_path.display()))?;

    let report_path = dir.join(WINDOW_REPORT_FILE);
    let mut writer = csv::Writer::from_path(&report_path)
        .with_context(|| format!("creating {}", report_path.display()))?;
    for row in window_energy_report(&analysis.competitions) {
        writer.serialize(&row).context("writing window energy row")?;
    }
    writer.flush().context("flushing window energy report")?;

    let metadata = SiteMetadata::from_analysis(analysis)?;
    let metadata_path = dir.join(METADATA_FILE);
    let body = serde_json::to_string_pretty(&metadata).context("serializing site metadata")?;
    fs::write(&metadata_path, body)
        .with_context(|| format!("writing {}", metadata_path.display()))?;
    Ok(metadata)
}
