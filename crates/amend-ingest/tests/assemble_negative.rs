use std::fs;
use std::path::PathBuf;

use amend_ingest::{assemble_archive, AssembleOptions};
use amend_model::{MunicipalityMatchPolicy, TimestampPolicy};
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(path)
}

fn options(out: &std::path::Path) -> AssembleOptions {
    AssembleOptions {
        db_path: out.join("amend.db"),
        manifest_path: out.join("amend_manifest.json"),
        necir_csv: fixture("tests/fixtures/tiny/NECIR_CSO_2011.csv"),
        ejscreen_csv: fixture("tests/fixtures/tiny/EPA_EJSCREEN_MA.csv"),
        census_csv: fixture("tests/fixtures/tiny/Census_ACS_MA.csv"),
        enforcement_html: vec![],
        portal_json: vec![],
        state_name: "Massachusetts".to_string(),
        match_policy: MunicipalityMatchPolicy::default(),
        timestamp_policy: TimestampPolicy::DeterministicZero,
        created_at: String::new(),
    }
}

#[test]
fn missing_source_file_fails_with_dataset_name() {
    let out = tempdir().expect("tmp");
    let mut opts = options(out.path());
    opts.necir_csv = out.path().join("does_not_exist.csv");
    let err = assemble_archive(&opts).unwrap_err();
    assert!(err.0.contains("NECIR_CSO"), "error was: {}", err.0);
}

#[test]
fn out_of_range_ejscreen_indicator_aborts_assembly() {
    let out = tempdir().expect("tmp");
    let bad = out.path().join("ejscreen_bad.csv");
    fs::write(
        &bad,
        "ID,STATE_NAME,ACSTOTPOP,MINORPCT,LOWINCPCT,LINGISOPCT,OVER64PCT\n\
         250250001001,Massachusetts,1200,2.42,0.31,0.12,0.18\n",
    )
    .expect("write csv");
    let mut opts = options(out.path());
    opts.ejscreen_csv = bad;
    let err = assemble_archive(&opts).unwrap_err();
    assert!(err.0.contains("EPA_EJSCREEN"), "error was: {}", err.0);
    assert!(err.0.contains("[0,1]"), "error was: {}", err.0);
}

#[test]
fn malformed_block_group_geoid_aborts_assembly() {
    let out = tempdir().expect("tmp");
    let bad = out.path().join("ejscreen_bad_id.csv");
    fs::write(
        &bad,
        "ID,STATE_NAME,ACSTOTPOP,MINORPCT,LOWINCPCT,LINGISOPCT,OVER64PCT\n\
         2502500,Massachusetts,1200,0.42,0.31,0.12,0.18\n",
    )
    .expect("write csv");
    let mut opts = options(out.path());
    opts.ejscreen_csv = bad;
    let err = assemble_archive(&opts).unwrap_err();
    assert!(err.0.contains("12-digit"), "error was: {}", err.0);
}

#[test]
fn empty_canonical_municipality_table_aborts_assembly() {
    let out = tempdir().expect("tmp");
    let empty = out.path().join("census_empty.csv");
    fs::write(&empty, "population_acs52014,Subdivision\n").expect("write csv");
    let mut opts = options(out.path());
    opts.census_csv = empty;
    let err = assemble_archive(&opts).unwrap_err();
    assert!(err.0.contains("Census_ACS"), "error was: {}", err.0);
}

#[test]
fn enforcement_page_with_no_dated_actions_aborts_assembly() {
    let out = tempdir().expect("tmp");
    let page = out.path().join("enforcement_2009.html");
    fs::write(&page, "<html><body><p>No actions posted.</p></body></html>").expect("write html");
    let mut opts = options(out.path());
    opts.enforcement_html = vec![(2009, page)];
    let err = assemble_archive(&opts).unwrap_err();
    assert!(err.0.contains("2009"), "error was: {}", err.0);
}
