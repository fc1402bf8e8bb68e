use std::fs;
use std::path::Path;

use flex_batch::{
    jobs_from_config, load_batch_manifest, run_batch, AnalysisConfig, BatchRunnerConfig,
    JobStatus, SiteOverrides, SubstationConfig, COMPETITIONS_FILE, METADATA_FILE,
};
use flex_core::Megawatts;

const EVENING_PEAK: [f64; 8] = [20.0, 26.0, 26.5, 26.75, 26.2, 25.9, 25.6, 20.0];

fn write_site(path: &Path, demand_header: &str) {
    let mut body = format!("Timestamp,{demand_header}\n");
    for (i, d) in EVENING_PEAK.iter().enumerate() {
        let minutes = 16 * 60 + 30 + 30 * i;
        body.push_str(&format!(
            "2025-01-06 {:02}:{:02},{d}\n",
            minutes / 60,
            minutes % 60
        ));
    }
    fs::write(path, body).unwrap();
}

fn site(name: &str, file: &Path) -> SubstationConfig {
    SubstationConfig {
        name: name.to_string(),
        demand_file: Some(file.to_path_buf()),
        licence_area: None,
        nominal_voltage: Some("HV".to_string()),
    }
}

#[test]
fn failures_are_recorded_and_reruns_skip() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("monktonhall.csv");
    let bad = dir.path().join("dunbar.csv");
    write_site(&good, "Demand (MW)");
    write_site(&bad, "Load");

    let mut analysis = AnalysisConfig::default();
    analysis.substations = vec![site("Monktonhall", &good), site("Dunbar", &bad)];
    let mut overrides = SiteOverrides::default();
    overrides
        .capacities
        .insert("Monktonhall".to_string(), Megawatts(25.5));
    overrides.capacities.insert("Dunbar".to_string(), Megawatts(25.5));

    let output_root = dir.path().join("out");
    let mut config = BatchRunnerConfig {
        jobs: jobs_from_config(&analysis, None).unwrap(),
        output_root: output_root.clone(),
        analysis,
        overrides,
        threads: 2,
        force: false,
    };

    let summary = run_batch(&config).unwrap();
    assert_eq!(summary.success, 1);
    assert_eq!(summary.failure, 1);
    let dunbar = summary.jobs.iter().find(|r| r.site == "Dunbar").unwrap();
    assert!(dunbar.error.as_deref().unwrap().contains("Demand (MW)"));
    let monktonhall = summary.jobs.iter().find(|r| r.site == "Monktonhall").unwrap();
    assert_eq!(monktonhall.firm_capacity_mw, Some(25.5));
    assert_eq!(monktonhall.competitions, 1);

    let site_dir = output_root.join("Monktonhall");
    assert!(site_dir.join(METADATA_FILE).exists());
    let docs: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(site_dir.join(COMPETITIONS_FILE)).unwrap())
            .unwrap();
    assert_eq!(docs[0]["reference"], "T2501_SPEN_Monktonhall");
    assert_eq!(docs[0]["maximum_connection_voltage"], "11");

    let rerun = run_batch(&config).unwrap();
    assert_eq!(rerun.skipped, 1);
    assert_eq!(rerun.failure, 1);

    config.force = true;
    let forced = run_batch(&config).unwrap();
    assert_eq!(forced.skipped, 0);
    assert_eq!(forced.success, 1);

    let manifest = load_batch_manifest(&forced.manifest_path).unwrap();
    assert_eq!(manifest.num_jobs, 2);
    assert_eq!(manifest.threads, 2);
}

#[test]
fn target_inversion_from_combined_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let combined = dir.path().join("combined.csv");
    let mut body = String::from("Timestamp,Demand (MW),Network Group Name\n");
    for name in ["Dunbar", "Portobello"] {
        for (i, d) in EVENING_PEAK.iter().enumerate() {
            let minutes = 16 * 60 + 30 + 30 * i;
            body.push_str(&format!(
                "2025-02-03 {:02}:{:02},{d},{name}\n",
                minutes / 60,
                minutes % 60
            ));
        }
    }
    fs::write(&combined, body).unwrap();

    let mut analysis = AnalysisConfig::default();
    analysis.firm_capacity.target_mwh = Some(2.0);
    let config = BatchRunnerConfig {
        jobs: jobs_from_config(&analysis, Some(&combined)).unwrap(),
        output_root: dir.path().join("out"),
        analysis,
        overrides: SiteOverrides::default(),
        threads: 0,
        force: false,
    };
    let summary = run_batch(&config).unwrap();
    assert_eq!(summary.success, 2);
    for record in &summary.jobs {
        assert_eq!(record.status, JobStatus::Ok);
        let capacity = record.firm_capacity_mw.unwrap();
        assert!(capacity > 20.0 && capacity < 26.75, "{capacity}");
    }
}

#[test]
fn malformed_group_fails_only_that_site() {
    let dir = tempfile::tempdir().unwrap();
    let combined = dir.path().join("all.csv");
    let mut body = String::from("Timestamp,Demand (MW),Network Group Name\n");
    for (i, d) in EVENING_PEAK.iter().enumerate() {
        let minutes = 16 * 60 + 30 + 30 * i;
        body.push_str(&format!(
            "2025-02-03 {:02}:{:02},{d},Dunbar\n",
            minutes / 60,
            minutes % 60
        ));
    }
    body.push_str("2025-02-03 17:30,26.0,Portobello\n");
    body.push_str("2025-02-03 17:00,25.0,Portobello\n");
    fs::write(&combined, body).unwrap();

    let mut analysis = AnalysisConfig::default();
    analysis.firm_capacity.target_mwh = Some(2.0);
    let jobs = jobs_from_config(&analysis, Some(&combined)).unwrap();
    assert_eq!(jobs.len(), 2);
    let config = BatchRunnerConfig {
        jobs,
        output_root: dir.path().join("out"),
        analysis,
        overrides: SiteOverrides::default(),
        threads: 2,
        force: false,
    };
    let summary = run_batch(&config).unwrap();
    assert_eq!(summary.success, 1);
    assert_eq!(summary.failure, 1);
    let dunbar = summary.jobs.iter().find(|r| r.site == "Dunbar").unwrap();
    assert_eq!(dunbar.status, JobStatus::Ok);
    assert!(dir.path().join("out").join("Dunbar").join(METADATA_FILE).exists());
    let portobello = summary.jobs.iter().find(|r| r.site == "Portobello").unwrap();
    assert_eq!(portobello.status, JobStatus::Error);
    assert!(portobello.error.as_deref().unwrap().contains("not monotonic"));
}

#[test]
fn missing_target_fails_only_that_site() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("site.csv");
    write_site(&file, "Demand (MW)");
    let mut analysis = AnalysisConfig::default();
    analysis.substations = vec![site("Lonely", &file)];
    let config = BatchRunnerConfig {
        jobs: jobs_from_config(&analysis, None).unwrap(),
        output_root: dir.path().join("out"),
        analysis,
        overrides: SiteOverrides::default(),
        threads: 1,
        force: false,
    };
    let summary = run_batch(&config).unwrap();
    assert_eq!(summary.failure, 1);
    assert!(summary.jobs[0]
        .error
        .as_deref()
        .unwrap()
        .contains("no firm capacity or target energy"));
}
