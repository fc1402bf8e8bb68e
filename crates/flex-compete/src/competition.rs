use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use flex_algo::{energy_peak_based, find_overload_segments};
use flex_core::calendar::{month_name, month_start};
use flex_core::{DemandSeries, FlexError, FlexResult, Hours, MegawattHours, Megawatts};
use serde::Serialize;
use tracing::{info, warn};

use crate::dates::{format_timestamp, serialize_timestamp, CompetitionDates, FinancialYear};
use crate::fields::FieldSelection;
use crate::period::{group_windows, PeriodGrouping, ServicePeriod};
use crate::profile::CompetitionProfile;
use crate::reference::{sanitize_reference, DEFAULT_LICENCE_AREA};
use crate::window::build_windows;

/// Tolerated gap (MWh) between segment energy and the energy carried by the
/// windows of the generated competitions.
pub const COMPETITION_ENERGY_TOLERANCE_MWH: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Boundary {
    pub area_references: Vec<String>,
    pub postcodes: Vec<String>,
}

/// A flexibility competition document.
///
/// Field order matches the published document layout; optional fields are
/// appended after the service periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Competition {
    pub reference: String,
    pub name: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub open: NaiveDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    pub closed: NaiveDateTime,
    pub area_buffer: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub qualification_open: NaiveDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    pub qualification_closed: NaiveDateTime,
    pub boundary: Boundary,
    pub need_type: String,
    #[serde(rename = "type")]
    pub competition_type: String,
    pub need_direction: String,
    pub power_type: String,
    pub service_periods: Vec<ServicePeriod>,
    #[serde(flatten)]
    pub optional_fields: BTreeMap<String, String>,
}

impl Competition {
    /// Energy carried by every window in the document.
    pub fn window_energy(&self) -> MegawattHours {
        self.service_periods
            .iter()
            .flat_map(|p| p.service_windows.iter())
            .map(|w| w.energy)
            .sum()
    }
}

/// Who the competition is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substation {
    pub name: String,
    pub licence_area: String,
    /// kV as written in the source, or `HV`.
    pub nominal_voltage: Option<String>,
}

impl Substation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            licence_area: DEFAULT_LICENCE_AREA.to_string(),
            nominal_voltage: None,
        }
    }
}

/// How windows, periods and optional fields are produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionSettings {
    /// Split windows into pieces of this many minutes. The default splits
    /// into half hours; set `None` (`--no-split` on the command line) to keep
    /// each window whole, e.g. `Monday 17:00-20:00`.
    pub procurement_minutes: Option<i64>,
    pub grouping: PeriodGrouping,
    /// When set, dates come from this year's schedule table.
    pub financial_year: Option<FinancialYear>,
    pub fields: FieldSelection,
    pub profile: CompetitionProfile,
}

impl Default for CompetitionSettings {
    fn default() -> Self {
        Self {
            procurement_minutes: Some(30),
            grouping: PeriodGrouping::Monthly,
            financial_year: None,
            fields: FieldSelection::default(),
            profile: CompetitionProfile::default(),
        }
    }
}

/// Assembles competitions for one substation's demand series.
pub struct CompetitionBuilder<'a> {
    substation: &'a Substation,
    settings: &'a CompetitionSettings,
    interval: Hours,
}

impl<'a> CompetitionBuilder<'a> {
    pub fn new(
        substation: &'a Substation,
        settings: &'a CompetitionSettings,
        interval: Hours,
    ) -> Self {
        Self {
            substation,
            settings,
            interval,
        }
    }

    fn dates_for(&self, service_start: NaiveDate) -> FlexResult<CompetitionDates> {
        let dates = match &self.settings.financial_year {
            Some(fy) => fy.dates_for_month(service_start.month())?,
            None => CompetitionDates::for_service_start(service_start),
        };
        dates.validate()?;
        Ok(dates)
    }

    /// Wrap `periods` into one competition document under `reference`.
    pub fn build(
        &self,
        mut periods: Vec<ServicePeriod>,
        reference: String,
    ) -> FlexResult<Competition> {
        let service_start = periods.iter().map(|p| p.start).min().ok_or_else(|| {
            FlexError::Validation("no service periods for competition".to_string())
        })?;
        let dates = self.dates_for(service_start)?;
        let profile = &self.settings.profile;
        let area = self.substation.name.to_uppercase();

        for period in &mut periods {
            self.apply_window_fields(period);
        }
        let optional_fields = self.root_fields(&reference, &dates);

        Ok(Competition {
            name: format!(
                "{area} {} {}",
                month_name(service_start.month()),
                service_start.year()
            ),
            reference,
            open: dates.bidding_open,
            closed: dates.bidding_closed,
            area_buffer: profile.area_buffer.clone(),
            qualification_open: dates.qualification_open,
            qualification_closed: dates.qualification_closed,
            boundary: Boundary {
                area_references: vec![area],
                postcodes: Vec::new(),
            },
            need_type: profile.need_type.clone(),
            competition_type: profile.competition_type.clone(),
            need_direction: profile.need_direction.clone(),
            power_type: profile.power_type.clone(),
            service_periods: periods,
            optional_fields,
        })
    }

    fn root_fields(&self, reference: &str, dates: &CompetitionDates) -> BTreeMap<String, String> {
        let profile = &self.settings.profile;
        let mut fields = BTreeMap::new();
        for name in &self.settings.fields.root_fields {
            let value = match name.as_str() {
                "contact" => profile.contact.clone(),
                "archive_on" => format_timestamp(dates.archive_on()),
                "dps_record_reference" => format!("flex_{}", reference.to_lowercase()),
                "product_type" => profile.product_type.clone(),
                "minimum_connection_voltage" => profile.minimum_connection_voltage.clone(),
                "maximum_connection_voltage" => profile
                    .maximum_connection_voltage(self.substation.nominal_voltage.as_deref()),
                "minimum_budget" => profile.minimum_budget.clone(),
                "maximum_budget" => profile.maximum_budget.clone(),
                "availability_guide_price" => profile.availability_guide_price.clone(),
                "utilisation_guide_price" => profile.utilisation_guide_price.clone(),
                "service_fee" => profile.service_fee.clone(),
                "pricing_type" => profile.pricing_type.clone(),
                _ => continue,
            };
            fields.insert(name.clone(), value);
        }
        fields
    }

    fn apply_window_fields(&self, period: &mut ServicePeriod) {
        let selected = &self.settings.fields.service_window_fields;
        if selected.is_empty() {
            return;
        }
        let profile = &self.settings.profile;
        let dispatch_estimate = period.window_count().to_string();
        for window in &mut period.service_windows {
            for name in selected {
                let value = match name.as_str() {
                    "public_holiday_handling" => profile.public_holiday_handling.clone(),
                    "minimum_run_time" => self.interval.as_minutes().to_string(),
                    "required_response_time" => profile.required_response_time.clone(),
                    "dispatch_estimate" => dispatch_estimate.clone(),
                    "dispatch_duration" => window.duration.as_minutes().to_string(),
                    _ => continue,
                };
                window.optional_fields.insert(name.clone(), value);
            }
        }
    }

    /// Run segmentation, windowing and grouping at `capacity` and produce one
    /// competition per calendar month that has any service window.
    pub fn create_competitions(
        &self,
        series: &DemandSeries,
        capacity: Megawatts,
    ) -> FlexResult<Vec<Competition>> {
        let segments = find_overload_segments(series, capacity, self.interval);
        if segments.is_empty() {
            info!(
                substation = %self.substation.name,
                capacity_mw = capacity.value(),
                "no overloads, no competitions"
            );
            return Ok(Vec::new());
        }

        let windows = build_windows(&segments, self.settings.procurement_minutes)?;
        let periods = group_windows(windows, self.settings.grouping);

        let mut by_month: BTreeMap<NaiveDate, Vec<ServicePeriod>> = BTreeMap::new();
        for period in periods {
            by_month
                .entry(month_start(period.start))
                .or_default()
                .push(period);
        }

        let mut competitions = Vec::with_capacity(by_month.len());
        for (month, periods) in by_month {
            let reference = sanitize_reference(
                &self.substation.name,
                &self.substation.licence_area,
                month.year(),
                month.month(),
                None,
            );
            competitions.push(self.build(periods, reference)?);
        }

        Ok(competitions)
    }

    /// [`create_competitions`](Self::create_competitions), then check window
    /// energy against the peak-based energy of the series.
    ///
    /// The flag is `false` on a mismatch; the mismatch is logged and does not
    /// stop the run.
    pub fn create_checked_competitions(
        &self,
        series: &DemandSeries,
        capacity: Megawatts,
    ) -> FlexResult<(Vec<Competition>, bool)> {
        let competitions = self.create_competitions(series, capacity)?;
        let expected = MegawattHours(energy_peak_based(
            series.demand(),
            capacity.value(),
            self.interval.value(),
        ));
        let consistent = check_competition_energy(&competitions, expected);
        Ok((competitions, consistent))
    }
}

/// Compare window energy across `competitions` with `expected`, logging the outcome.
pub fn check_competition_energy(competitions: &[Competition], expected: MegawattHours) -> bool {
    let total: MegawattHours = competitions.iter().map(Competition::window_energy).sum();
    let consistent = (total - expected).abs().value() <= COMPETITION_ENERGY_TOLERANCE_MWH;
    if consistent {
        info!(
            competitions = competitions.len(),
            energy_mwh = total.value(),
            "competition energy matches peak-based total"
        );
    } else {
        warn!(
            peak_based_mwh = expected.value(),
            competition_mwh = total.value(),
            "competition energy does not match peak-based total"
        );
    }
    consistent
}

/// Pretty JSON for a list of competitions, without internal window fields.
pub fn competitions_to_json(competitions: &[Competition]) -> FlexResult<String> {
    Ok(serde_json::to_string_pretty(competitions)?)
}
