use rtalign::errors::IdentificationReadingError;
use rtalign::{
    CalibrationOptions,
    LoadOptions,
    ModificationMapping,
    NoopObserver,
    Peptidoform,
    RtAlignError,
    RunCollection,
    TracingObserver,
};
use std::path::PathBuf;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
}

fn load_options() -> LoadOptions {
    let mapping = ModificationMapping::from_file(data_dir().join("unimod.json")).unwrap();
    LoadOptions {
        modification_mapping: Some(mapping),
        ..Default::default()
    }
}

fn loaded_collection() -> RunCollection {
    let mut collection = RunCollection::new("fixture", data_dir());
    collection
        .add_runs_by_glob("*", &load_options(), &NoopObserver)
        .unwrap();
    collection
}

#[test]
fn test_glob_discovery() {
    let collection = RunCollection::new("fixture", data_dir());
    assert_eq!(
        collection.discover_run_names("*").unwrap(),
        vec!["run_a".to_string(), "run_b".to_string()]
    );
    assert_eq!(
        collection.discover_run_names("*_b").unwrap(),
        vec!["run_b".to_string()]
    );
    assert!(collection.discover_run_names("nothing*").unwrap().is_empty());
}

#[test]
fn test_glob_character_classes() {
    let collection = RunCollection::new("fixture", data_dir());
    assert_eq!(
        collection.discover_run_names("run_[ab]").unwrap(),
        vec!["run_a".to_string(), "run_b".to_string()]
    );
    assert_eq!(
        collection.discover_run_names("run_[!a]").unwrap(),
        vec!["run_b".to_string()]
    );
    assert!(collection.discover_run_names("run_[cd]").unwrap().is_empty());
}

#[test]
fn test_missing_spectrum_dir() {
    let collection = RunCollection::new("fixture", data_dir()).with_subdirs("nope", "pout");
    assert!(matches!(
        collection.discover_run_names("*"),
        Err(RtAlignError::Io { .. })
    ));
}

#[test]
fn test_eager_load_only_keeps_identified_scans() {
    let collection = loaded_collection();
    assert_eq!(collection.num_runs(), 2);

    let run_a = collection.run("run_a").unwrap();
    assert_eq!(run_a.num_psms(), 6);
    // Scan 107 is in the MGF but was never identified
    assert!(run_a.psm(107).is_none());
    // Scan 106 is identified but has no spectrum
    assert_eq!(run_a.psm(106).unwrap().retention_time, None);
    let frac = run_a.fraction_missing_retention_time().unwrap();
    assert!((frac - 1.0 / 6.0).abs() < 1e-12);

    let run_b = collection.run("run_b").unwrap();
    assert_eq!(run_b.num_psms(), 5);
    assert_eq!(run_b.fraction_missing_retention_time().unwrap(), 0.0);
}

#[test]
fn test_unmapped_modifications_are_warnings() {
    let mut collection = RunCollection::new("fixture", data_dir());
    let warnings = collection
        .add_runs_by_list(&["run_a", "run_b"], &load_options(), &TracingObserver)
        .unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].run, "run_a");
    assert_eq!(warnings[0].modification.key, "UNIMOD:35");

    let psm = collection.run("run_a").unwrap().psm(106).unwrap();
    assert_eq!(psm.modifications.as_deref(), Some("1|UNIMOD:35"));
}

#[test]
fn test_best_psm_per_variant() {
    let collection = loaded_collection();
    let best = collection.run("run_a").unwrap().best_psm_per_variant();
    assert_eq!(best.len(), 5);
    assert_eq!(best[&Peptidoform::new("PEPTIDEK", "")].scan, 101);
    assert_eq!(
        best[&Peptidoform::new("ACDEFGHK", "2|Carbamidomethyl")].charge,
        Some(3)
    );
}

#[test]
fn test_lazy_registration() {
    let mut collection = RunCollection::new("fixture", data_dir());
    let options = LoadOptions {
        eager: false,
        ..Default::default()
    };
    collection
        .add_runs_by_list(&["run_a"], &options, &NoopObserver)
        .unwrap();
    assert_eq!(collection.num_runs(), 1);
    let run = collection.run("run_a").unwrap();
    assert_eq!(run.num_psms(), 0);
    assert!(matches!(
        run.fraction_missing_retention_time(),
        Err(RtAlignError::EmptyRun { .. })
    ));
}

#[test]
fn test_missing_identification_file() {
    let mut collection = RunCollection::new("fixture", data_dir());
    let res = collection.add_runs_by_list(&["run_z"], &LoadOptions::default(), &NoopObserver);
    assert!(matches!(
        res,
        Err(RtAlignError::IdentificationReading(
            IdentificationReadingError::Io { .. }
        ))
    ));
}

#[test]
fn test_flatten() {
    let collection = loaded_collection();
    let rows = collection.flatten();
    assert_eq!(rows.len(), 11);
    assert!(rows.iter().all(|r| &*r.collection == "fixture"));
    assert_eq!(&*rows[0].run, "run_a");
    assert_eq!(rows[0].scan, 101);
    assert_eq!(&*rows[10].run, "run_b");
    assert_eq!(rows[10].usi("PXD000001"), "mzspec:PXD000001:run_b:scan:205");
}

#[test]
fn test_calibrate_collection() {
    let collection = loaded_collection();
    let cal = collection
        .calibrate(&CalibrationOptions::default(), &TracingObserver)
        .unwrap();

    assert_eq!(cal.reference_run.as_deref(), Some("run_a"));
    assert_eq!(cal.num_psms_passing, 10);
    assert_eq!(cal.anchors.len(), 3);

    let consensus: Vec<(&str, &str, f64)> = cal
        .consensus
        .iter()
        .map(|c| {
            (
                c.sequence.as_str(),
                c.modifications.as_str(),
                c.retention_time_calibrated,
            )
        })
        .collect();
    assert_eq!(
        consensus,
        vec![
            ("ACDEFGHK", "2|Carbamidomethyl", 1150.0),
            ("GGGR", "", 1350.0),
            ("LLSEEK", "", 950.0),
            ("PEPTIDEK", "", 580.0),
            ("YYYK", "", 950.0),
        ]
    );

    let curve = &cal.curves["run_b"];
    assert_eq!(curve.num_anchors(), 3);
    assert!(cal.curves["run_a"].is_identity());

    let plot = cal.format_plot(40, 12, false);
    assert!(plot.contains("▲ run_b (n="));
    assert!(plot.contains("run_b: step correction"));
    assert!(!plot.contains("run_a: step correction"));
}

#[test]
fn test_single_run_collection_is_identity() {
    let mut collection = RunCollection::new("fixture", data_dir());
    collection
        .add_runs_by_glob("run_b", &load_options(), &NoopObserver)
        .unwrap();
    let cal = collection
        .calibrate(&CalibrationOptions::default(), &NoopObserver)
        .unwrap();
    assert!(cal.is_identity());
    for row in cal.per_run.iter() {
        assert_eq!(row.retention_time_calibrated, row.retention_time_median);
    }
}
