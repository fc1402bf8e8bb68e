//! Competition documents from overload segments.
//!
//! The pipeline runs segment → [`window`] → [`period`] → [`competition`]:
//! each overload segment becomes a service window (optionally split to the
//! procurement granularity), windows are grouped into monthly or daily
//! service periods, and each calendar month becomes one competition with
//! its dates, reference and optional fields filled in.

pub mod competition;
pub mod dates;
pub mod fields;
pub mod period;
pub mod profile;
pub mod reference;
pub mod report;
pub mod window;

pub use competition::{
    check_competition_energy, competitions_to_json, Boundary, Competition, CompetitionBuilder,
    CompetitionSettings, Substation,
};
pub use dates::{format_timestamp, CompetitionDates, FinancialYear, ScheduleRow};
pub use fields::{field_template, ConfigMode, FieldLevel, FieldSelection, FieldTemplate};
pub use period::{group_daily, group_monthly, group_windows, PeriodGrouping, ServicePeriod};
pub use profile::CompetitionProfile;
pub use reference::{sanitize_reference, DEFAULT_LICENCE_AREA, MAX_REFERENCE_LEN};
pub use report::{window_energy_report, WindowEnergyRow};
pub use window::{
    build_windows, create_service_window, split_for_procurement, ServiceWindow,
    WindowWithContext,
};
