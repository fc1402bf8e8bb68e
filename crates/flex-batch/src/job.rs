use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use flex_core::DemandSeries;
use flex_ts::{load_grouped, load_series};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AnalysisConfig;

/// Where a site's demand comes from.
#[derive(Debug, Clone)]
pub enum DemandSource {
    /// A single-substation file, read by the worker.
    File(PathBuf),
    /// Already split out of a combined dataset.
    Loaded(DemandSeries),
    /// The site's group in the combined dataset could not be turned into a
    /// series. The job fails with this message when it runs.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SiteJob {
    pub site: String,
    pub source: DemandSource,
}

impl SiteJob {
    pub fn load(&self, config: &AnalysisConfig) -> Result<DemandSeries> {
        match &self.source {
            DemandSource::Loaded(series) => Ok(series.clone()),
            DemandSource::Failed(message) => Err(anyhow!("{message}")),
            DemandSource::File(path) => load_series(path, &config.input.single())
                .with_context(|| format!("loading demand for {}", self.site)),
        }
    }

    /// Directory name for this site's outputs.
    pub fn dir_name(&self) -> String {
        site_dir_name(&self.site)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Ok,
    Error,
    Skipped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Ok => "ok",
            JobStatus::Error => "error",
            JobStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteJobRecord {
    pub site: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub firm_capacity_mw: Option<f64>,
    pub competitions: usize,
    pub output: String,
    pub elapsed_ms: u64,
}

/// Letters, digits, `-` and `_` survive; everything else becomes `_`.
pub fn site_dir_name(site: &str) -> String {
    site.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Build one job per site.
///
/// Listed substations with a `demand_file` read that file. The rest, or every
/// group when no substations are listed, come from `combined`, split by the
/// configured group column. A group that fails to load becomes a failing job
/// rather than stopping the batch. Two sites whose output directories would
/// collide are rejected.
pub fn jobs_from_config(config: &AnalysisConfig, combined: Option<&Path>) -> Result<Vec<SiteJob>> {
    let mut groups: Vec<(String, DemandSource)> = match combined {
        Some(path) => load_grouped(path, &config.input.grouped())
            .with_context(|| format!("splitting combined dataset {}", path.display()))?
            .into_iter()
            .map(|(name, series)| {
                let source = match series {
                    Ok(series) => DemandSource::Loaded(series),
                    Err(err) => DemandSource::Failed(format!("{err:#}")),
                };
                (name, source)
            })
            .collect(),
        None => Vec::new(),
    };

    let jobs: Vec<SiteJob> = if config.substations.is_empty() {
        if combined.is_none() {
            bail!("no substations configured and no combined dataset given");
        }
        info!(sites = groups.len(), "one job per group in the combined dataset");
        groups
            .into_iter()
            .map(|(site, source)| SiteJob { site, source })
            .collect()
    } else {
        let mut jobs = Vec::with_capacity(config.substations.len());
        for substation in &config.substations {
            let source = match &substation.demand_file {
                Some(path) => DemandSource::File(path.clone()),
                None => match groups.iter().position(|(name, _)| name == &substation.name) {
                    Some(idx) => groups.swap_remove(idx).1,
                    None => bail!(
                        "substation {} has no demand_file and is not in the combined dataset",
                        substation.name
                    ),
                },
            };
            jobs.push(SiteJob {
                site: substation.name.clone(),
                source,
            });
        }
        if !groups.is_empty() {
            warn!(
                unused = groups.len(),
                "combined dataset has groups that are not listed as substations"
            );
        }
        jobs
    };

    check_distinct_dirs(&jobs)?;
    Ok(jobs)
}

fn check_distinct_dirs(jobs: &[SiteJob]) -> Result<()> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for job in jobs {
        let dir = job.dir_name();
        if let Some(other) = seen.insert(dir.clone(), &job.site) {
            bail!(
                "sites '{other}' and '{}' would share the output directory '{dir}'",
                job.site
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubstationConfig;
    use std::fs;

    #[test]
    fn dir_names_are_filesystem_safe() {
        assert_eq!(site_dir_name("St. John's Rd"), "St__John_s_Rd");
        assert_eq!(site_dir_name(" Dunbar-North "), "Dunbar-North");
    }

    #[test]
    fn jobs_from_listed_files_and_groups() {
        let dir = tempfile::tempdir().unwrap();
        let combined = dir.path().join("all.csv");
        fs::write(
            &combined,
            "Timestamp,Demand (MW),Network Group Name\n\
             2025-01-06 17:00,10,Dunbar\n\
             2025-01-06 17:30,11,Dunbar\n\
             2025-01-06 17:00,20,Portobello\n",
        )
        .unwrap();

        let mut config = AnalysisConfig::default();
        config.substations = vec![
            SubstationConfig {
                name: "Dunbar".into(),
                demand_file: None,
                licence_area: None,
                nominal_voltage: None,
            },
            SubstationConfig {
                name: "Monktonhall".into(),
                demand_file: Some(dir.path().join("monktonhall.csv")),
                licence_area: None,
                nominal_voltage: None,
            },
        ];
        let jobs = jobs_from_config(&config, Some(&combined)).unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(matches!(&jobs[0].source, DemandSource::Loaded(s) if s.len() == 2));
        assert!(matches!(&jobs[1].source, DemandSource::File(_)));

        config.substations.clear();
        let jobs = jobs_from_config(&config, Some(&combined)).unwrap();
        let sites: Vec<_> = jobs.iter().map(|j| j.site.as_str()).collect();
        assert_eq!(sites, ["Dunbar", "Portobello"]);
    }

    #[test]
    fn colliding_dir_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AnalysisConfig::default();
        config.substations = ["A.B", "A_B"]
            .into_iter()
            .map(|name| SubstationConfig {
                name: name.into(),
                demand_file: Some(dir.path().join("demand.csv")),
                licence_area: None,
                nominal_voltage: None,
            })
            .collect();
        let err = jobs_from_config(&config, None).unwrap_err();
        assert!(err.to_string().contains("'A.B' and 'A_B'"), "{err}");
    }

    #[test]
    fn failed_group_fails_when_loaded() {
        let job = SiteJob {
            site: "Portobello".into(),
            source: DemandSource::Failed("timestamps are not monotonic at row 1".into()),
        };
        let err = job.load(&AnalysisConfig::default()).unwrap_err();
        assert!(err.to_string().contains("not monotonic"));
    }

    #[test]
    fn nothing_to_run_is_an_error() {
        assert!(jobs_from_config(&AnalysisConfig::default(), None).is_err());
    }
}
