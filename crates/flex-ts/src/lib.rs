//! Demand table loading.
//!
//! Reads CSV or Parquet tables with polars and turns them into validated
//! [`DemandSeries`]. A table either holds one substation or carries a group
//! column naming the substation of each row.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    path::Path,
};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use flex_core::{DemandSeries, FlexError};
use polars::prelude::*;
#[cfg(feature = "parquet")]
use polars::prelude::ParquetReader;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod timestamp;

pub use timestamp::parse_timestamp;

pub const DEFAULT_TIMESTAMP_COLUMN: &str = "Timestamp";
pub const DEFAULT_DEMAND_COLUMN: &str = "Demand (MW)";

/// Where the timestamp, demand and (optional) substation name live in a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub timestamp_column: String,
    pub demand_column: String,
    pub group_column: Option<String>,
    /// Alternative header → canonical header, applied before lookup.
    pub column_aliases: BTreeMap<String, String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            demand_column: DEFAULT_DEMAND_COLUMN.to_string(),
            group_column: None,
            column_aliases: BTreeMap::new(),
        }
    }
}

/// Read a `.csv` or `.parquet` table, chosen by extension.
pub fn read_frame(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    match extension.as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => {
            let reader = ParquetReader::new(&mut file);
            reader.finish().context("reading Parquet file")
        }
        #[cfg(not(feature = "parquet"))]
        "parquet" => Err(anyhow!(
            "parquet support is disabled; rebuild with the 'parquet' feature"
        )),
        "csv" => {
            let reader = CsvReader::new(&mut file);
            reader.has_header(true).finish().context("reading CSV file")
        }
        _ => Err(anyhow!(
            "unsupported file extension '{}'; use .csv or .parquet",
            extension
        )),
    }
}

/// Rename alias headers to their canonical names.
///
/// An alias is ignored when the canonical column already exists.
pub fn apply_column_aliases(df: &mut DataFrame, aliases: &BTreeMap<String, String>) -> Result<()> {
    for (alias, canonical) in aliases {
        let names = df.get_column_names();
        if names.contains(&canonical.as_str()) || !names.contains(&alias.as_str()) {
            continue;
        }
        debug!(alias = %alias, canonical = %canonical, "renaming column");
        df.rename(alias, canonical)
            .with_context(|| format!("renaming column '{alias}' to '{canonical}'"))?;
    }
    Ok(())
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name).map_err(|_| {
        anyhow::Error::from(FlexError::MissingColumn {
            column: name.to_string(),
        })
    })
}

/// Build a validated series from the mapped timestamp and demand columns.
pub fn series_from_frame(df: &DataFrame, mapping: &ColumnMapping) -> Result<DemandSeries> {
    let ts_column = require_column(df, &mapping.timestamp_column)?;
    let demand_column = require_column(df, &mapping.demand_column)?;

    let timestamps = timestamps_from_column(ts_column)?;
    let demand = demand_from_column(demand_column)?;
    Ok(DemandSeries::new(timestamps, demand)?)
}

fn timestamps_from_column(column: &Series) -> Result<Vec<NaiveDateTime>> {
    match column.dtype() {
        DataType::Utf8 => column
            .utf8()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                let raw = cell.unwrap_or_default();
                parse_timestamp(raw).ok_or_else(|| {
                    anyhow::Error::from(FlexError::InvalidTimestamp {
                        row,
                        value: raw.to_string(),
                    })
                })
            })
            .collect(),
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let epochs = column
                .cast(&DataType::Int64)
                .context("casting timestamp column to Int64")?;
            epochs
                .i64()?
                .into_iter()
                .enumerate()
                .map(|(row, cell)| {
                    cell.and_then(|v| timestamp::from_epoch(v, unit))
                        .ok_or_else(|| {
                            anyhow::Error::from(FlexError::InvalidTimestamp {
                                row,
                                value: cell.map(|v| v.to_string()).unwrap_or_default(),
                            })
                        })
                })
                .collect()
        }
        other => Err(anyhow!(
            "timestamp column '{}' has unsupported type {other}",
            column.name()
        )),
    }
}

fn demand_from_column(column: &Series) -> Result<Vec<f64>> {
    let numeric = column
        .cast(&DataType::Float64)
        .context("casting demand column to Float64")?;
    numeric
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.ok_or_else(|| {
                let reason = match column.get(row) {
                    Ok(AnyValue::Null) | Err(_) => "missing value".to_string(),
                    Ok(raw) => format!("{raw} is not numeric"),
                };
                anyhow::Error::from(FlexError::InvalidDemand { row, reason })
            })
        })
        .collect()
}

/// Distinct values of `group_column`, sorted.
pub fn group_names(df: &DataFrame, group_column: &str) -> Result<Vec<String>> {
    let column = require_column(df, group_column)?
        .cast(&DataType::Utf8)
        .with_context(|| format!("casting group column '{group_column}' to text"))?;
    let mut names = BTreeSet::new();
    let mut missing = 0usize;
    for cell in column.utf8()?.into_iter() {
        match cell.map(str::trim) {
            Some(name) if !name.is_empty() => {
                names.insert(name.to_string());
            }
            _ => missing += 1,
        }
    }
    if missing > 0 {
        warn!(
            column = group_column,
            rows = missing,
            "rows without a group name are ignored"
        );
    }
    Ok(names.into_iter().collect())
}

/// Rows of `df` whose group column equals `name`.
pub fn frame_for_group(df: &DataFrame, group_column: &str, name: &str) -> Result<DataFrame> {
    let column = require_column(df, group_column)?.cast(&DataType::Utf8)?;
    let mask = column.utf8()?.equal(name);
    df.filter(&mask)
        .with_context(|| format!("selecting rows for group '{name}'"))
}

/// Load a single-substation table.
pub fn load_series(path: &Path, mapping: &ColumnMapping) -> Result<DemandSeries> {
    let mut df = read_frame(path)?;
    apply_column_aliases(&mut df, &mapping.column_aliases)?;
    series_from_frame(&df, mapping).with_context(|| format!("loading {}", path.display()))
}

/// Load a table and split it into one series per group.
///
/// Without a group column the whole table becomes a single series named
/// after the file stem. Reading the table can fail as a whole; a group whose
/// rows do not form a valid series fails on its own and leaves the other
/// groups intact.
pub fn load_grouped(
    path: &Path,
    mapping: &ColumnMapping,
) -> Result<Vec<(String, Result<DemandSeries>)>> {
    let mut df = read_frame(path)?;
    apply_column_aliases(&mut df, &mapping.column_aliases)?;

    let Some(group_column) = mapping.group_column.as_deref() else {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("substation")
            .to_string();
        let series =
            series_from_frame(&df, mapping).with_context(|| format!("loading {}", path.display()))?;
        return Ok(vec![(name, Ok(series))]);
    };

    let mut grouped = Vec::new();
    for name in group_names(&df, group_column)? {
        let frame = frame_for_group(&df, group_column, &name)?;
        let series = series_from_frame(&frame, mapping)
            .with_context(|| format!("loading group '{name}' from {}", path.display()));
        if let Err(err) = &series {
            warn!(group = %name, "{err:#}");
        }
        grouped.push((name, series));
    }
    Ok(grouped)
}
