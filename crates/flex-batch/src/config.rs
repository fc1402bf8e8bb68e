//! Analysis configuration, read from YAML or JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use flex_algo::{EnergyMethod, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE_FRACTION};
use flex_compete::{
    CompetitionProfile, CompetitionSettings, ConfigMode, FieldSelection, FinancialYear,
    PeriodGrouping, Substation, DEFAULT_LICENCE_AREA,
};
use flex_core::{FlexError, FlexResult, Hours};
use flex_ts::{ColumnMapping, DEFAULT_DEMAND_COLUMN, DEFAULT_TIMESTAMP_COLUMN};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GROUP_COLUMN: &str = "Network Group Name";
pub const DEFAULT_PROCUREMENT_MINUTES: i64 = 30;
pub const DEFAULT_OUTPUT_DIR: &str = "flex_output";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub firm_capacity: FirmCapacityConfig,
    pub competitions: CompetitionConfig,
    pub input: InputConfig,
    pub substations: Vec<SubstationConfig>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmCapacityConfig {
    /// Energy above firm capacity (MWh) the network is expected to tolerate.
    pub target_mwh: Option<f64>,
    /// Fraction of peak demand used as the bisection tolerance.
    pub tolerance: f64,
    pub max_iterations: usize,
    pub method: EnergyMethod,
    /// Sampling interval; inferred from the data when absent.
    pub interval_hours: Option<f64>,
}

impl Default for FirmCapacityConfig {
    fn default() -> Self {
        Self {
            target_mwh: None,
            tolerance: DEFAULT_TOLERANCE_FRACTION,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            method: EnergyMethod::PeakBased,
            interval_hours: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitionConfig {
    /// `null` keeps each window whole.
    pub procurement_window_minutes: Option<i64>,
    pub daily_service_periods: bool,
    pub financial_year: Option<String>,
    pub config_mode: ConfigMode,
    pub custom_fields: Vec<String>,
    /// JSON file with `root_fields` / `service_window_fields`, used in custom mode.
    pub custom_fields_file: Option<PathBuf>,
    pub licence_area: String,
    /// Move demand onto this year before building windows.
    pub service_year: Option<i32>,
    pub profile: CompetitionProfile,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            procurement_window_minutes: Some(DEFAULT_PROCUREMENT_MINUTES),
            daily_service_periods: false,
            financial_year: None,
            config_mode: ConfigMode::Standard,
            custom_fields: Vec::new(),
            custom_fields_file: None,
            licence_area: DEFAULT_LICENCE_AREA.to_string(),
            service_year: None,
            profile: CompetitionProfile::default(),
        }
    }
}

impl CompetitionConfig {
    pub fn grouping(&self) -> PeriodGrouping {
        if self.daily_service_periods {
            PeriodGrouping::Daily
        } else {
            PeriodGrouping::Monthly
        }
    }

    /// Resolve the field selection and financial year into builder settings.
    pub fn settings(&self) -> FlexResult<CompetitionSettings> {
        let fields = match (self.config_mode, &self.custom_fields_file) {
            (ConfigMode::Custom, Some(path)) => FieldSelection::load_custom(path)?,
            (mode, _) => FieldSelection::for_mode(mode, &self.custom_fields)?,
        };
        let financial_year = self
            .financial_year
            .as_deref()
            .map(str::parse::<FinancialYear>)
            .transpose()?;
        Ok(CompetitionSettings {
            procurement_minutes: self.procurement_window_minutes,
            grouping: self.grouping(),
            financial_year,
            fields,
            profile: self.profile.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub timestamp_column: String,
    pub demand_column: String,
    pub group_column: String,
    pub column_aliases: BTreeMap<String, String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            demand_column: DEFAULT_DEMAND_COLUMN.to_string(),
            group_column: DEFAULT_GROUP_COLUMN.to_string(),
            column_aliases: BTreeMap::new(),
        }
    }
}

impl InputConfig {
    /// Column mapping for a single-substation file.
    pub fn single(&self) -> ColumnMapping {
        ColumnMapping {
            timestamp_column: self.timestamp_column.clone(),
            demand_column: self.demand_column.clone(),
            group_column: None,
            column_aliases: self.column_aliases.clone(),
        }
    }

    /// Column mapping for a combined dataset split by the group column.
    pub fn grouped(&self) -> ColumnMapping {
        ColumnMapping {
            group_column: Some(self.group_column.clone()),
            ..self.single()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstationConfig {
    pub name: String,
    #[serde(default)]
    pub demand_file: Option<PathBuf>,
    #[serde(default)]
    pub licence_area: Option<String>,
    #[serde(default)]
    pub nominal_voltage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl AnalysisConfig {
    pub fn interval(&self) -> Option<Hours> {
        self.firm_capacity.interval_hours.map(Hours)
    }

    /// Substation identity for `name`, taking per-substation settings when listed.
    pub fn substation(&self, name: &str) -> Substation {
        let listed = self.substations.iter().find(|s| s.name == name);
        Substation {
            name: name.to_string(),
            licence_area: listed
                .and_then(|s| s.licence_area.clone())
                .unwrap_or_else(|| self.competitions.licence_area.clone()),
            nominal_voltage: listed.and_then(|s| s.nominal_voltage.clone()),
        }
    }

    pub fn validate(&self) -> FlexResult<()> {
        let fc = &self.firm_capacity;
        if !(fc.tolerance.is_finite() && fc.tolerance > 0.0) {
            return Err(FlexError::Config(format!(
                "firm_capacity.tolerance must be positive, got {}",
                fc.tolerance
            )));
        }
        if fc.max_iterations == 0 {
            return Err(FlexError::Config(
                "firm_capacity.max_iterations must be at least 1".to_string(),
            ));
        }
        if let Some(target) = fc.target_mwh {
            if !(target.is_finite() && target >= 0.0) {
                return Err(FlexError::Config(format!(
                    "firm_capacity.target_mwh must be non-negative, got {target}"
                )));
            }
        }
        if let Some(interval) = fc.interval_hours {
            if !(interval.is_finite() && interval > 0.0) {
                return Err(FlexError::Config(format!(
                    "firm_capacity.interval_hours must be positive, got {interval}"
                )));
            }
        }
        if let Some(minutes) = self.competitions.procurement_window_minutes {
            if minutes <= 0 {
                return Err(FlexError::Config(format!(
                    "competitions.procurement_window_minutes must be positive, got {minutes}"
                )));
            }
        }
        for substation in &self.substations {
            if substation.name.trim().is_empty() {
                return Err(FlexError::Config("substation name cannot be empty".to_string()));
            }
        }
        self.competitions.settings().map(|_| ())
    }
}

pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading analysis config '{}'", path.display()))?;
    let config: AnalysisConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing analysis config yaml")?
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing analysis config json")?
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing analysis config")?,
    };
    config
        .validate()
        .map_err(|err| anyhow!(err))
        .with_context(|| format!("validating '{}'", path.display()))?;
    Ok(config)
}
