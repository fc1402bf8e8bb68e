//! Per-site override tables.
//!
//! Two CSV files, both keyed by site name:
//!
//! ```csv
//! Site,Firm_Capacity_MW
//! Monktonhall,25.5
//! ```
//!
//! ```csv
//! Site,Target_MWh
//! Monktonhall,40
//! ```
//!
//! A known capacity skips the inversion entirely; a target replaces the
//! configured one for that site only.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use flex_core::{MegawattHours, Megawatts};
use tracing::{info, warn};

pub const SITE_COLUMN: &str = "Site";
pub const CAPACITY_COLUMN: &str = "Firm_Capacity_MW";
pub const TARGET_COLUMN: &str = "Target_MWh";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteOverrides {
    pub capacities: BTreeMap<String, Megawatts>,
    pub targets: BTreeMap<String, MegawattHours>,
}

impl SiteOverrides {
    pub fn load(capacity_file: Option<&Path>, target_file: Option<&Path>) -> Result<Self> {
        let mut overrides = Self::default();
        if let Some(path) = capacity_file {
            overrides.capacities = load_site_values(path, CAPACITY_COLUMN)?
                .into_iter()
                .map(|(site, v)| (site, Megawatts(v)))
                .collect();
            info!(path = %path.display(), sites = overrides.capacities.len(), "loaded capacity overrides");
        }
        if let Some(path) = target_file {
            overrides.targets = load_site_values(path, TARGET_COLUMN)?
                .into_iter()
                .map(|(site, v)| (site, MegawattHours(v)))
                .collect();
            info!(path = %path.display(), sites = overrides.targets.len(), "loaded target overrides");
        }
        Ok(overrides)
    }

    pub fn capacity(&self, site: &str) -> Option<Megawatts> {
        self.capacities.get(site).copied()
    }

    pub fn target(&self, site: &str) -> Option<MegawattHours> {
        self.targets.get(site).copied()
    }
}

/// Read `Site,<value_column>` rows into a map. Blank sites are skipped;
/// a repeated site keeps its last value.
pub fn load_site_values(path: &Path, value_column: &str) -> Result<BTreeMap<String, f64>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening override table {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| anyhow!("{} has no '{name}' column", path.display()))
    };
    let site_idx = column(SITE_COLUMN)?;
    let value_idx = column(value_column)?;

    let mut values = BTreeMap::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading {} row {row}", path.display()))?;
        let site = record.get(site_idx).unwrap_or_default().trim();
        if site.is_empty() {
            warn!(row, "override row without a site name, skipped");
            continue;
        }
        let raw = record.get(value_idx).unwrap_or_default().trim();
        let value: f64 = raw
            .parse()
            .with_context(|| format!("parsing {value_column} '{raw}' for {site}"))?;
        if !value.is_finite() || value < 0.0 {
            bail!("{value_column} for {site} must be a non-negative number, got {raw}");
        }
        values.insert(site.to_string(), value);
    }
    Ok(values)
}
