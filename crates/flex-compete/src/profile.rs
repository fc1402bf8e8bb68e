//! Fixed values that every competition document carries.
//!
//! Categorical fields, voltage fallbacks and optional-field defaults live in
//! one [`CompetitionProfile`] handed to the assembler, so a test or a
//! licence area can swap them without touching the builder.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Maximum connection voltage buckets (kV), checked in order.
const VOLTAGE_BUCKETS: [(f64, &str); 7] = [
    (0.4, "0.4"),
    (6.6, "6.6"),
    (11.0, "11"),
    (22.0, "22"),
    (33.0, "33"),
    (66.0, "66"),
    (132.0, "132"),
];

/// Nominal voltage assumed for a bare `HV` label.
pub const HV_NOMINAL_KV: f64 = 11.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitionProfile {
    pub area_buffer: String,
    pub need_type: String,
    #[serde(rename = "type")]
    pub competition_type: String,
    pub need_direction: String,
    pub power_type: String,

    pub contact: String,
    pub product_type: String,
    pub minimum_connection_voltage: String,
    /// Used when no nominal voltage is known or it is above every bucket.
    pub default_maximum_connection_voltage: String,
    pub minimum_budget: String,
    pub maximum_budget: String,
    pub availability_guide_price: String,
    pub utilisation_guide_price: String,
    pub service_fee: String,
    pub pricing_type: String,

    pub public_holiday_handling: String,
    /// Minutes.
    pub required_response_time: String,
}

impl Default for CompetitionProfile {
    fn default() -> Self {
        Self {
            area_buffer: "0.100".to_string(),
            need_type: "Pre Fault".to_string(),
            competition_type: "Utilisation".to_string(),
            need_direction: "Deficit".to_string(),
            power_type: "Active Power".to_string(),
            contact: "flexibility@example.com".to_string(),
            product_type: "Scheduled Utilisation".to_string(),
            minimum_connection_voltage: "0.24".to_string(),
            default_maximum_connection_voltage: "33".to_string(),
            minimum_budget: "5000.00".to_string(),
            maximum_budget: "10000.00".to_string(),
            availability_guide_price: "10.00".to_string(),
            utilisation_guide_price: "240".to_string(),
            service_fee: "9.45".to_string(),
            pricing_type: "auction".to_string(),
            public_holiday_handling: "Treat as normal day".to_string(),
            required_response_time: "15".to_string(),
        }
    }
}

impl CompetitionProfile {
    /// Bucket a nominal voltage into a maximum connection voltage.
    ///
    /// Accepts a number of kV or `HV`. Anything unparseable, or above the
    /// largest bucket, falls back to the profile default.
    pub fn maximum_connection_voltage(&self, nominal: Option<&str>) -> String {
        let Some(raw) = nominal.map(str::trim).filter(|s| !s.is_empty()) else {
            return self.default_maximum_connection_voltage.clone();
        };
        let kv = if raw.eq_ignore_ascii_case("hv") {
            Some(HV_NOMINAL_KV)
        } else {
            raw.trim_end_matches(|c: char| c.is_ascii_alphabetic())
                .trim()
                .parse::<f64>()
                .ok()
        };
        match kv {
            Some(kv) => VOLTAGE_BUCKETS
                .iter()
                .find(|(limit, _)| kv <= *limit)
                .map(|(_, label)| label.to_string())
                .unwrap_or_else(|| self.default_maximum_connection_voltage.clone()),
            None => {
                warn!(nominal = raw, "could not read nominal voltage, using default");
                self.default_maximum_connection_voltage.clone()
            }
        }
    }
}
