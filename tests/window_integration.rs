//! Integration tests for the windowed driver and the report files.
//!
//! Files are written to temporary directories and read back the way a
//! downstream consumer would.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use gsm_overlap::report::{MANIFEST_FILE, REMOVAL_LIST_FILE};
use gsm_overlap::{
    load_catalog, read_removal_list, Month, ReportWriter, ResolutionEngine, ResolutionPolicy,
    RunManifest, SeriesId, WindowError, WindowedDriver,
};

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

const CATALOG: &str = "\
gid\tdate\torganisms\tplatform\tsamples
GSE10\tJan 05 2010\tHomo sapiens\tGPL570\tGSM1,GSM2,GSM3,GSM4
GSE11\tJan 20 2010\tHomo sapiens\tGPL570\tGSM1,GSM2,GSM3,GSM4
GSE12\tFeb 02 2010\tHomo sapiens\tGPL96\tGSM3,GSM4,GSM5,GSM6,GSM7,GSM8
GSE13\tMar 15 2010\tMus musculus\tGPL1261\tGSM20,GSM21,GSM22
GSE14\t-\tMus musculus\tGPL1261\tGSM20,GSM21,GSM22,GSM23
";

const OVERLAP: &str = "\
GSE10\tGSE11\t4,4,4\tGSM1,GSM2,GSM3,GSM4
GSE11\tGSE10\t4,4,4\tGSM1,GSM2,GSM3,GSM4
GSE10\tGSE12\t2,4,6\tGSM3,GSM4
GSE11\tGSE12\t2,4,6\tGSM3,GSM4
GSE13\tGSE14\t3,3,4\tGSM20,GSM21,GSM22
";

fn id(s: &str) -> SeriesId {
    SeriesId::parse(s).unwrap()
}

fn write_inputs(dir: &Path) -> (std::path::PathBuf, Vec<String>) {
    let catalog_path = dir.join("series.tsv");
    std::fs::write(&catalog_path, CATALOG).unwrap();
    let lines = OVERLAP.lines().map(str::to_string).collect();
    (catalog_path, lines)
}

fn read_ids(path: &Path) -> BTreeSet<SeriesId> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(id)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Windowed Runs
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_monthly_windows_write_reports() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (catalog_path, lines) = write_inputs(input.path());

    let catalog = Arc::new(load_catalog(&catalog_path).unwrap());
    let driver = WindowedDriver::new(Arc::clone(&catalog), ResolutionPolicy::new(3, 1));

    let count = driver
        .run(
            Month::parse("2010.01").unwrap(),
            Month::parse("2010.04").unwrap(),
            &lines,
            |report| {
                let month = report.month;
                let writer = ReportWriter::create(out.path().join(month.to_string()))
                    .map_err(|source| WindowError::Report { month, source })?;
                writer
                    .write_window(&report, &catalog)
                    .map_err(|source| WindowError::Report { month, source })?;
                Ok(())
            },
        )
        .unwrap();
    assert_eq!(count, 4);

    // January: nothing published before 2010-01-01
    let january = out.path().join("2010.01");
    assert!(read_ids(&january.join("duplicates")).is_empty());
    assert_eq!(std::fs::read_to_string(january.join("series2samples.before")).unwrap(), "");

    // February: GSE10 and GSE11 are identical
    let february = out.path().join("2010.02");
    assert_eq!(read_ids(&february.join("duplicates")), [id("GSE11")].into_iter().collect());

    // March: GSE12 joins and shares GSM3,GSM4 with GSE10
    let march = out.path().join("2010.03");
    assert_eq!(read_ids(&march.join("duplicates")), [id("GSE11")].into_iter().collect());
    let removal = read_removal_list(march.join(REMOVAL_LIST_FILE)).unwrap();
    assert!(removal.removed.contains(&id("GSE11")));
    assert!(removal.removed.contains(&id("GSE10")));
    assert!(removal.removed_samples.is_empty());

    let after = std::fs::read_to_string(march.join("series2samples.after")).unwrap();
    assert_eq!(after, "GSE12\tGSM3,GSM4,GSM5,GSM6,GSM7,GSM8\n");

    // April: GSE13 is in, GSE14 has no date and never is
    let april = out.path().join("2010.04");
    let before = std::fs::read_to_string(april.join("series2samples.before")).unwrap();
    assert!(before.contains("GSE13\t"));
    assert!(!before.contains("GSE14"));

    let manifest: RunManifest =
        serde_json::from_str(&std::fs::read_to_string(april.join(MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(manifest.month.as_deref(), Some("2010.04"));
    assert!(manifest.files.iter().any(|f| f == "samples2series.after"));
    assert!(manifest.files.iter().any(|f| f == "clusters.2"));
}

#[test]
fn test_windows_are_independent_of_range() {
    let input = tempfile::tempdir().unwrap();
    let (catalog_path, lines) = write_inputs(input.path());
    let catalog = Arc::new(load_catalog(&catalog_path).unwrap());
    let driver = WindowedDriver::new(catalog, ResolutionPolicy::new(3, 1));

    let march = Month::parse("2010.03").unwrap();
    let direct = driver.run_window(march, &lines).unwrap();

    let mut from_range = None;
    driver
        .run(Month::parse("2010.01").unwrap(), march, &lines, |report| {
            if report.month == march {
                from_range = Some(report.result.fingerprint());
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(from_range, Some(direct.result.fingerprint()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Single Run
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_single_run_report_round_trip() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (catalog_path, lines) = write_inputs(input.path());
    let catalog = Arc::new(load_catalog(&catalog_path).unwrap());

    let mut engine = ResolutionEngine::new(Arc::clone(&catalog));
    for line in &lines {
        engine.add_overlap_line(line).unwrap();
    }
    let result = engine.find(3, 1).unwrap().clone();
    result.check_invariants().unwrap();

    let writer = ReportWriter::create(out.path()).unwrap();
    let manifest = writer
        .write_result(&result, &engine.find_clusters(), catalog.as_ref())
        .unwrap();

    let removal = read_removal_list(out.path().join(REMOVAL_LIST_FILE)).unwrap();
    assert_eq!(removal.removed, result.dropped_ids());
    assert_eq!(&removal.removed_samples, result.removed_samples());

    assert_eq!(manifest.fingerprint, result.fingerprint().to_string());
    assert_eq!(manifest.params_hash, ResolutionPolicy::new(3, 1).params_hash());

    let clusters = std::fs::read_to_string(out.path().join("clusters.2")).unwrap();
    assert_eq!(clusters, "GSE10\tGSE11\tGSE12\nGSE13\tGSE14\n");
}
