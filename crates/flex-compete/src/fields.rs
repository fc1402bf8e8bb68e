//! Optional competition fields and how they are selected.
//!
//! Every optional field lives either on the document root or on each
//! service window. A [`ConfigMode`] picks a preset; `Custom` takes an
//! explicit list checked against [`OPTIONAL_FIELDS`].

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use flex_core::{FlexError, FlexResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    RequiredOnly,
    #[default]
    Standard,
    Custom,
}

impl FromStr for ConfigMode {
    type Err = FlexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "required_only" | "required" => Ok(ConfigMode::RequiredOnly),
            "standard" => Ok(ConfigMode::Standard),
            "custom" => Ok(ConfigMode::Custom),
            other => Err(FlexError::Config(format!(
                "unknown config mode '{other}'; use required_only, standard or custom"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLevel {
    Root,
    ServiceWindow,
}

/// Catalogue entry for one optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub level: FieldLevel,
    pub standard: bool,
}

const fn root(name: &'static str, description: &'static str, standard: bool) -> FieldInfo {
    FieldInfo {
        name,
        description,
        level: FieldLevel::Root,
        standard,
    }
}

const fn window(name: &'static str, description: &'static str, standard: bool) -> FieldInfo {
    FieldInfo {
        name,
        description,
        level: FieldLevel::ServiceWindow,
        standard,
    }
}

pub const OPTIONAL_FIELDS: &[FieldInfo] = &[
    root(
        "contact",
        "The email address for competition-related communications",
        false,
    ),
    root(
        "archive_on",
        "Date and time at which the Competition archives",
        false,
    ),
    root(
        "dps_record_reference",
        "Reference to a previously uploaded DPS Record",
        true,
    ),
    root("product_type", "Branded names for service products", true),
    root(
        "minimum_connection_voltage",
        "Minimum voltage level in KV",
        true,
    ),
    root(
        "maximum_connection_voltage",
        "Maximum voltage level in KV",
        true,
    ),
    root(
        "minimum_budget",
        "The minimum budget value per year, in £ GBP",
        false,
    ),
    root(
        "maximum_budget",
        "The maximum budget value per year, in £ GBP",
        false,
    ),
    root(
        "availability_guide_price",
        "Guide price for Availability (£/MW/h or £/MVAr/h)",
        false,
    ),
    root(
        "utilisation_guide_price",
        "Guide price for Utilisation (£/MW/h or £/MVAr/h)",
        false,
    ),
    root(
        "service_fee",
        "Annual fee paid for capacity (£/MW/year or £/MVAr/year)",
        false,
    ),
    root(
        "pricing_type",
        "Determines if prices are fixed or part of bid",
        false,
    ),
    window(
        "public_holiday_handling",
        "Designation of public holidays to be included or excluded",
        true,
    ),
    window(
        "minimum_run_time",
        "Minimum time required of the asset to provide flexibility",
        false,
    ),
    window(
        "required_response_time",
        "Time within which an Asset must respond to a utilisation request",
        false,
    ),
    window(
        "dispatch_estimate",
        "The estimated number of Dispatch events expected during the Service Period",
        false,
    ),
    window(
        "dispatch_duration",
        "The estimated duration of each Dispatch event",
        false,
    ),
];

/// All that `RequiredOnly` carries.
const VOLTAGE_FIELDS: [&str; 2] = ["minimum_connection_voltage", "maximum_connection_voltage"];

pub fn field_info(name: &str) -> Option<&'static FieldInfo> {
    OPTIONAL_FIELDS.iter().find(|f| f.name == name)
}

/// The optional fields a competition will carry, split by level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    #[serde(default)]
    pub root_fields: BTreeSet<String>,
    #[serde(default)]
    pub service_window_fields: BTreeSet<String>,
}

impl FieldSelection {
    /// Resolve a mode into a selection. `custom` is only read in `Custom` mode.
    pub fn for_mode(mode: ConfigMode, custom: &[String]) -> FlexResult<Self> {
        match mode {
            ConfigMode::RequiredOnly => {
                Self::from_names(VOLTAGE_FIELDS.iter().map(|s| s.to_string()))
            }
            ConfigMode::Standard => Self::from_names(
                OPTIONAL_FIELDS
                    .iter()
                    .filter(|f| f.standard)
                    .map(|f| f.name.to_string()),
            ),
            ConfigMode::Custom => Self::from_names(custom.iter().cloned()),
        }
    }

    /// Place each name at its catalogue level; unknown names are an error.
    pub fn from_names<I>(names: I) -> FlexResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut selection = Self::default();
        let mut unknown = Vec::new();
        for name in names {
            match field_info(&name) {
                Some(info) => {
                    selection.insert(info);
                }
                None => unknown.push(name),
            }
        }
        if !unknown.is_empty() {
            return Err(FlexError::Config(format!(
                "invalid optional fields specified: {}",
                unknown.join(", ")
            )));
        }
        Ok(selection)
    }

    fn insert(&mut self, info: &FieldInfo) {
        let target = match info.level {
            FieldLevel::Root => &mut self.root_fields,
            FieldLevel::ServiceWindow => &mut self.service_window_fields,
        };
        target.insert(info.name.to_string());
    }

    /// Load `{ "root_fields": [...], "service_window_fields": [...] }`.
    ///
    /// Names must exist in the catalogue and sit under their own level.
    pub fn load_custom(path: &Path) -> FlexResult<Self> {
        let raw = fs::read_to_string(path)?;
        let parsed: FieldSelection = serde_json::from_str(&raw)
            .map_err(|e| FlexError::Parse(format!("{}: {e}", path.display())))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> FlexResult<()> {
        let levels = [
            (FieldLevel::Root, &self.root_fields),
            (FieldLevel::ServiceWindow, &self.service_window_fields),
        ];
        for (level, names) in levels {
            for name in names {
                match field_info(name) {
                    None => {
                        return Err(FlexError::Config(format!(
                            "invalid optional field '{name}'"
                        )))
                    }
                    Some(info) if info.level != level => {
                        return Err(FlexError::Config(format!(
                            "field '{name}' belongs at {:?} level, not {level:?}",
                            info.level
                        )))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    pub fn includes_root(&self, name: &str) -> bool {
        self.root_fields.contains(name)
    }

    pub fn includes_window(&self, name: &str) -> bool {
        self.service_window_fields.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.root_fields.is_empty() && self.service_window_fields.is_empty()
    }
}

/// One row of the field chooser template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldTemplateEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub level: FieldLevel,
    pub included_in_standard: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldTemplate {
    pub optional_fields: Vec<FieldTemplateEntry>,
}

/// Every optional field, sorted by name, with the standard set pre-selected.
pub fn field_template() -> FieldTemplate {
    let mut optional_fields: Vec<_> = OPTIONAL_FIELDS
        .iter()
        .map(|f| FieldTemplateEntry {
            name: f.name,
            description: f.description,
            level: f.level,
            included_in_standard: f.standard,
            selected: f.standard,
        })
        .collect();
    optional_fields.sort_by_key(|e| e.name);
    FieldTemplate { optional_fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn required_only_selects_voltages() {
        let sel = FieldSelection::for_mode(ConfigMode::RequiredOnly, &[]).unwrap();
        assert_eq!(sel.root_fields.len(), 2);
        assert!(sel.includes_root("minimum_connection_voltage"));
        assert!(sel.includes_root("maximum_connection_voltage"));
        assert!(sel.service_window_fields.is_empty());
    }

    #[test]
    fn standard_set() {
        let sel = FieldSelection::for_mode(ConfigMode::Standard, &[]).unwrap();
        let root: Vec<_> = sel.root_fields.iter().map(String::as_str).collect();
        assert_eq!(
            root,
            [
                "dps_record_reference",
                "maximum_connection_voltage",
                "minimum_connection_voltage",
                "product_type"
            ]
        );
        assert!(sel.includes_window("public_holiday_handling"));
        assert_eq!(sel.service_window_fields.len(), 1);
    }

    #[test]
    fn custom_places_fields_by_level() {
        let sel = FieldSelection::for_mode(
            ConfigMode::Custom,
            &["contact".to_string(), "dispatch_duration".to_string()],
        )
        .unwrap();
        assert!(sel.includes_root("contact"));
        assert!(sel.includes_window("dispatch_duration"));
    }

    #[test]
    fn custom_rejects_unknown_field() {
        let err =
            FieldSelection::for_mode(ConfigMode::Custom, &["colour".to_string()]).unwrap_err();
        assert!(matches!(err, FlexError::Config(msg) if msg.contains("colour")));
    }

    #[test]
    fn load_custom_checks_levels() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.json");
        fs::write(
            &good,
            r#"{"root_fields": ["service_fee"], "service_window_fields": ["minimum_run_time"]}"#,
        )
        .unwrap();
        let sel = FieldSelection::load_custom(&good).unwrap();
        assert!(sel.includes_root("service_fee"));

        let misplaced = dir.path().join("bad.json");
        fs::write(&misplaced, r#"{"service_window_fields": ["service_fee"]}"#).unwrap();
        assert!(FieldSelection::load_custom(&misplaced).is_err());
    }

    #[test]
    fn template_lists_every_field_sorted() {
        let template = field_template();
        assert_eq!(template.optional_fields.len(), OPTIONAL_FIELDS.len());
        assert_eq!(template.optional_fields[0].name, "archive_on");
        let selected = template.optional_fields.iter().filter(|e| e.selected).count();
        assert_eq!(selected, 5);
    }

    #[test]
    fn mode_parses() {
        assert_eq!(
            "required-only".parse::<ConfigMode>().unwrap(),
            ConfigMode::RequiredOnly
        );
        assert!("everything".parse::<ConfigMode>().is_err());
    }
}
