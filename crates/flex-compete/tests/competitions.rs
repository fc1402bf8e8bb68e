use chrono::{Duration, NaiveDate, NaiveDateTime};
use flex_compete::{
    check_competition_energy, window_energy_report, CompetitionBuilder, CompetitionSettings, ConfigMode, FieldSelection,
    FinancialYear, PeriodGrouping, Substation,
};
use flex_core::{DemandSeries, Hours, MegawattHours, Megawatts};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn half_hourly(start: NaiveDateTime, values: &[f64]) -> Vec<(NaiveDateTime, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (start + Duration::minutes(30 * i as i64), v))
        .collect()
}

/// A January evening overload and a short February morning one.
fn two_month_series() -> DemandSeries {
    let mut samples = half_hourly(
        at(2025, 1, 6, 16, 30),
        &[20.0, 26.0, 26.5, 26.75, 26.2, 25.9, 25.6, 20.0],
    );
    samples.extend(half_hourly(at(2025, 2, 3, 8, 0), &[20.0, 27.0, 20.0]));
    DemandSeries::from_samples(samples).unwrap()
}

fn settings(mode: ConfigMode) -> CompetitionSettings {
    CompetitionSettings {
        procurement_minutes: None,
        fields: FieldSelection::for_mode(mode, &[]).unwrap(),
        ..CompetitionSettings::default()
    }
}

#[test]
fn one_competition_per_month() {
    let substation = Substation::new("Monktonhall");
    let settings = settings(ConfigMode::Standard);
    let builder = CompetitionBuilder::new(&substation, &settings, Hours(0.5));
    let competitions = builder
        .create_competitions(&two_month_series(), Megawatts(25.5))
        .unwrap();

    assert_eq!(competitions.len(), 2);
    let jan = &competitions[0];
    assert_eq!(jan.reference, "T2501_SPEN_Monktonhall");
    assert_eq!(jan.name, "MONKTONHALL January 2025");
    assert_eq!(jan.boundary.area_references, ["MONKTONHALL"]);
    assert_eq!(jan.service_periods.len(), 1);
    assert_eq!(jan.service_periods[0].name, "January");
    let window = &jan.service_periods[0].service_windows[0];
    assert_eq!(window.name, "Monday 17:00-20:00");
    assert!((jan.window_energy().value() - 3.75).abs() < 1e-9);

    let feb = &competitions[1];
    assert_eq!(feb.reference, "T2502_SPEN_Monktonhall");
    assert_eq!(
        feb.service_periods[0].service_windows[0].name,
        "Monday 08:30-09:00"
    );
}

#[test]
fn document_layout() {
    let substation = Substation::new("Monktonhall");
    let settings = settings(ConfigMode::Standard);
    let builder = CompetitionBuilder::new(&substation, &settings, Hours(0.5));
    let competitions = builder
        .create_competitions(&two_month_series(), Megawatts(25.5))
        .unwrap();
    let json = serde_json::to_value(&competitions[0]).unwrap();

    assert_eq!(json["open"], "2024-12-16T08:30:00Z");
    assert_eq!(json["closed"], "2024-12-16T17:00:00Z");
    assert_eq!(json["qualification_open"], "2024-12-02T12:00:00Z");
    assert_eq!(json["qualification_closed"], "2024-12-16T08:00:00Z");
    assert_eq!(json["area_buffer"], "0.100");
    assert_eq!(json["type"], "Utilisation");
    assert_eq!(json["need_type"], "Pre Fault");
    assert_eq!(json["need_direction"], "Deficit");
    assert_eq!(json["power_type"], "Active Power");
    assert_eq!(json["boundary"]["postcodes"], serde_json::json!([]));
    assert_eq!(json["product_type"], "Scheduled Utilisation");
    assert_eq!(json["dps_record_reference"], "flex_t2501_spen_monktonhall");
    assert_eq!(json["minimum_connection_voltage"], "0.24");
    assert_eq!(json["maximum_connection_voltage"], "33");
    assert!(json.get("contact").is_none());

    let period = &json["service_periods"][0];
    assert_eq!(period["start"], "2025-01-01");
    assert_eq!(period["end"], "2025-01-31");
    let window = &period["service_windows"][0];
    assert_eq!(window["capacity_required"], "1.250");
    assert_eq!(window["public_holiday_handling"], "Treat as normal day");
    assert!(window.get("energy_mwh").is_none());
    assert!(window.get("duration_hours").is_none());

    // Keys come out in document order.
    let text = serde_json::to_string(&competitions[0]).unwrap();
    let order = [
        "\"reference\"",
        "\"name\"",
        "\"open\"",
        "\"closed\"",
        "\"area_buffer\"",
        "\"qualification_open\"",
        "\"qualification_closed\"",
        "\"boundary\"",
        "\"need_type\"",
        "\"type\"",
        "\"need_direction\"",
        "\"power_type\"",
        "\"service_periods\"",
        "\"dps_record_reference\"",
    ];
    let positions: Vec<_> = order.iter().map(|k| text.find(k).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
}

#[test]
fn required_only_carries_voltages() {
    let substation = Substation {
        nominal_voltage: Some("HV".to_string()),
        ..Substation::new("Portobello")
    };
    let settings = settings(ConfigMode::RequiredOnly);
    let builder = CompetitionBuilder::new(&substation, &settings, Hours(0.5));
    let competitions = builder
        .create_competitions(&two_month_series(), Megawatts(25.5))
        .unwrap();
    let fields = &competitions[0].optional_fields;
    assert_eq!(fields.len(), 2);
    assert_eq!(fields["maximum_connection_voltage"], "11");
    assert!(competitions[0].service_periods[0].service_windows[0]
        .optional_fields
        .is_empty());
}

#[test]
fn custom_window_fields_use_context() {
    let substation = Substation::new("Monktonhall");
    let settings = CompetitionSettings {
        procurement_minutes: Some(60),
        fields: FieldSelection::for_mode(
            ConfigMode::Custom,
            &[
                "minimum_run_time".to_string(),
                "dispatch_estimate".to_string(),
                "dispatch_duration".to_string(),
                "archive_on".to_string(),
            ],
        )
        .unwrap(),
        ..CompetitionSettings::default()
    };
    let builder = CompetitionBuilder::new(&substation, &settings, Hours(0.5));
    let competitions = builder
        .create_competitions(&two_month_series(), Megawatts(25.5))
        .unwrap();
    let jan = &competitions[0];
    assert_eq!(jan.optional_fields["archive_on"], "2024-12-23T17:00:00Z");
    let windows = &jan.service_periods[0].service_windows;
    assert_eq!(windows.len(), 3);
    for window in windows {
        assert_eq!(window.optional_fields["minimum_run_time"], "30");
        assert_eq!(window.optional_fields["dispatch_estimate"], "3");
        assert_eq!(window.optional_fields["dispatch_duration"], "60");
    }
}

#[test]
fn daily_periods_stay_in_monthly_competitions() {
    let mut samples = half_hourly(at(2025, 1, 6, 17, 0), &[30.0, 20.0]);
    samples.extend(half_hourly(at(2025, 1, 8, 18, 0), &[30.0, 20.0]));
    let series = DemandSeries::from_samples(samples).unwrap();

    let substation = Substation::new("Monktonhall");
    let settings = CompetitionSettings {
        grouping: PeriodGrouping::Daily,
        ..settings(ConfigMode::Standard)
    };
    let builder = CompetitionBuilder::new(&substation, &settings, Hours(0.5));
    let competitions = builder.create_competitions(&series, Megawatts(25.0)).unwrap();

    assert_eq!(competitions.len(), 1);
    let names: Vec<_> = competitions[0]
        .service_periods
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, ["January 6 (Monday)", "January 8 (Wednesday)"]);
    assert_eq!(competitions[0].reference, "T2501_SPEN_Monktonhall");
}

#[test]
fn financial_year_dates() {
    let substation = Substation::new("Monktonhall");
    let settings = CompetitionSettings {
        financial_year: Some("2024/25".parse::<FinancialYear>().unwrap()),
        ..settings(ConfigMode::Standard)
    };
    let builder = CompetitionBuilder::new(&substation, &settings, Hours(0.5));
    let competitions = builder
        .create_competitions(&two_month_series(), Megawatts(25.5))
        .unwrap();
    assert_eq!(competitions[1].qualification_open, at(2025, 1, 1, 12, 0));
}

#[test]
fn no_overload_no_competitions() {
    let substation = Substation::new("Monktonhall");
    let settings = settings(ConfigMode::Standard);
    let builder = CompetitionBuilder::new(&substation, &settings, Hours(0.5));
    let competitions = builder
        .create_competitions(&two_month_series(), Megawatts(40.0))
        .unwrap();
    assert!(competitions.is_empty());
}

#[test]
fn energy_report_rows() {
    let substation = Substation::new("Monktonhall");
    let settings = settings(ConfigMode::Standard);
    let builder = CompetitionBuilder::new(&substation, &settings, Hours(0.5));
    let competitions = builder
        .create_competitions(&two_month_series(), Megawatts(25.5))
        .unwrap();
    let rows = window_energy_report(&competitions);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].competition, "MONKTONHALL January 2025");
    assert_eq!(rows[0].month, "January");
    assert_eq!(rows[0].window, "Monday 17:00-20:00");
    assert_eq!(rows[0].capacity_mw, 1.25);
    assert!((rows[0].energy_mwh - 3.75).abs() < 1e-9);
    assert_eq!(rows[0].duration_hours, 3.0);
    assert_eq!(rows[0].days, 1);
    assert!((rows[1].energy_mwh - 0.75).abs() < 1e-9);
}

#[test]
fn energy_check_flags_a_mismatch() {
    let substation = Substation::new("Monktonhall");
    let settings = settings(ConfigMode::Standard);
    let builder = CompetitionBuilder::new(&substation, &settings, Hours(0.5));
    let (competitions, consistent) = builder
        .create_checked_competitions(&two_month_series(), Megawatts(25.5))
        .unwrap();
    assert!(consistent);
    assert!(check_competition_energy(&competitions, MegawattHours(4.5)));
    assert!(!check_competition_energy(&competitions, MegawattHours(5.0)));
    assert!(!check_competition_energy(&[], MegawattHours(0.5)));
}

#[test]
fn default_settings_split_windows_into_half_hours() {
    let substation = Substation::new("Monktonhall");
    let split = CompetitionSettings {
        fields: FieldSelection::for_mode(ConfigMode::Standard, &[]).unwrap(),
        ..CompetitionSettings::default()
    };
    let competitions = CompetitionBuilder::new(&substation, &split, Hours(0.5))
        .create_competitions(&two_month_series(), Megawatts(25.5))
        .unwrap();
    let names: Vec<_> = competitions[0].service_periods[0]
        .service_windows
        .iter()
        .map(|w| w.name.as_str())
        .collect();
    assert_eq!(names.len(), 6);
    assert_eq!(names[0], "Monday 17:00-17:30");
    assert!(!names.contains(&"Monday 17:00-20:00"));

    let whole = settings(ConfigMode::Standard);
    let competitions = CompetitionBuilder::new(&substation, &whole, Hours(0.5))
        .create_competitions(&two_month_series(), Megawatts(25.5))
        .unwrap();
    assert_eq!(
        competitions[0].service_periods[0].service_windows[0].name,
        "Monday 17:00-20:00"
    );
}
