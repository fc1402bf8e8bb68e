//! Multi-substation firm capacity and competition runs.
//!
//! Each site is independent: its demand is loaded, its firm capacity taken
//! from an override or inverted from a target energy, and its competitions
//! written under `<output_root>/<site>/`. Sites run on a bounded rayon pool;
//! a site with a `metadata.json` is skipped unless forced.

pub mod analysis;
pub mod config;
pub mod job;
pub mod manifest;
pub mod overrides;
pub mod runner;

pub use analysis::{
    analyze_site, write_site_outputs, CapacitySource, SiteAnalysis, SiteMetadata,
    COMPETITIONS_FILE, METADATA_FILE, WINDOW_REPORT_FILE,
};
pub use config::{load_config, AnalysisConfig, SubstationConfig};
pub use job::{jobs_from_config, site_dir_name, DemandSource, JobStatus, SiteJob, SiteJobRecord};
pub use manifest::{load_batch_manifest, write_batch_manifest, BatchManifest, MANIFEST_FILE};
pub use overrides::{load_site_values, SiteOverrides};
pub use runner::{run_batch, BatchRunnerConfig, BatchSummary};
