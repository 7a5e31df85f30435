use std::fs;
use std::path::Path;
use std::process::Command;

use mapper_cli::convert::discover_inputs;
use mapper_cli::convert_directory;
use mapper_core::MapperConfig;
use mapper_fhir::{CodeTables, EntityKind, Mapper, SourceFormat};
use serde_json::Value;
use tempfile::TempDir;

const PERSONS: &str = "PERSON_ID\tBIRTHDATE\tFIRST\tLAST\tGENDER\tADDRESS\tCITY\tSTATE\tZIP
P1\t04/12/1962\tAna\tRivera\tfemale\t2 Oak Ave\tErie\tPennsylvania\t16501
";

const ENCOUNTERS: &str =
    "ENCOUNTER_ID\tSTART\tSTOP\tPERSON_ID\tCODE\tDESCRIPTION\tREASONCODE\tREASONDESCRIPTION
E1\t03/01/2021 08:00:00 AM\t03/03/2021 02:30:00 PM\tP1\t32485007\tHospital admission\t\t
E2\t03/01/2021 08:00:00 AM\t03/03/2021 02:30:00 PM\tP9\t32485007\tHospital admission\t\t
";

const OBSERVATIONS: &str =
    "DATE\tPATIENT\tENCOUNTER\tCODE\tDESCRIPTION\tVALUE\tUNITS\tTYPE\tCATEGORY
03/01/2021 09:15:00 AM\tP1\tE1\t2345-7\tGlucose\t5.4\tmmol/L\tnumeric\tlaboratory
";

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("fixture should write");
}

fn read_bundle(path: &Path) -> Value {
    let data = fs::read_to_string(path).expect("bundle should exist");
    serde_json::from_str(&data).expect("bundle is JSON")
}

fn cerner_input() -> TempDir {
    let input = TempDir::new().unwrap();
    // Written out of dependency order; discovery sorts them.
    write(input.path(), "observations.tsv", OBSERVATIONS);
    write(input.path(), "encounters.tsv", ENCOUNTERS);
    write(input.path(), "persons.tsv", PERSONS);
    write(input.path(), "README.txt", "not an export");
    input
}

fn cerner_mapper() -> Mapper {
    Mapper::new(
        SourceFormat::Cerner,
        MapperConfig::default(),
        CodeTables::builtin(),
    )
}

#[test]
fn inputs_are_discovered_parents_first() {
    let input = cerner_input();
    let entities: Vec<_> = discover_inputs(input.path())
        .unwrap()
        .into_iter()
        .map(|file| file.entity)
        .collect();
    assert_eq!(
        entities,
        vec![
            EntityKind::Patient,
            EntityKind::Encounter,
            EntityKind::Observation
        ]
    );
}

#[test]
fn directory_converts_into_one_bundle_per_entity() {
    let input = cerner_input();
    let output = TempDir::new().unwrap();

    let summary = convert_directory(&cerner_mapper(), input.path(), output.path()).unwrap();

    assert!(!summary.has_failures());
    assert_eq!(summary.bundles.len(), 3);
    let encounters = &summary.files[1];
    assert_eq!(encounters.mapped, 1);
    assert_eq!(encounters.skipped, 1);

    let patients = read_bundle(&output.path().join("patient_collection_bundle.json"));
    assert_eq!(patients["resourceType"], "Bundle");
    assert_eq!(patients["type"], "collection");
    assert_eq!(patients["entry"].as_array().map(Vec::len), Some(1));

    let observations = read_bundle(&output.path().join("observation_collection_bundle.json"));
    let observation = &observations["entry"][0]["resource"];
    assert_eq!(observation["subject"]["reference"], "Patient/P1");
    assert_eq!(observation["encounter"]["reference"], "Encounter/E1");
}

#[test]
fn failing_file_does_not_stop_the_run() {
    let input = cerner_input();
    write(
        input.path(),
        "encounters_bad.tsv",
        "ENCOUNTER_ID\tSTART\nE3\tyesterday\n",
    );
    let output = TempDir::new().unwrap();

    let summary = convert_directory(&cerner_mapper(), input.path(), output.path()).unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].path.ends_with("encounters_bad.tsv"));
    assert!(output.path().join("observation_collection_bundle.json").exists());
}

#[test]
fn failed_patient_file_leaves_no_parents_behind() {
    let input = cerner_input();
    write(
        input.path(),
        "persons.tsv",
        &format!("{PERSONS}P2\tnot-a-date\tBo\tLee\tmale\t\tErie\tPA\t16501\n"),
    );
    let output = TempDir::new().unwrap();

    let summary = convert_directory(&cerner_mapper(), input.path(), output.path()).unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].path.ends_with("persons.tsv"));
    assert!(!output.path().join("patient_collection_bundle.json").exists());

    let encounters = &summary.files[0];
    assert_eq!(encounters.entity, EntityKind::Encounter);
    assert_eq!(encounters.mapped, 0);
    assert_eq!(encounters.skipped, 2);
    let observations = &summary.files[1];
    assert_eq!(observations.mapped, 0);
    assert_eq!(observations.skipped, 1);
}

#[test]
fn missing_input_directory_aborts() {
    let output = TempDir::new().unwrap();
    let missing = output.path().join("nowhere");
    let err = convert_directory(&cerner_mapper(), &missing, output.path()).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn binary_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_fhir-mapper"))
        .arg("project")
        .arg(dir.path())
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn binary_writes_compact_bundles() {
    let input = cerner_input();
    let output = TempDir::new().unwrap();
    let result = Command::new(env!("CARGO_BIN_EXE_fhir-mapper"))
        .arg("brainai")
        .arg(input.path())
        .arg(output.path())
        .arg("--compact")
        .arg("--log-level")
        .arg("warn")
        .output()
        .unwrap();

    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    let data = fs::read_to_string(output.path().join("patient_collection_bundle.json")).unwrap();
    assert!(!data.contains('\n'));
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("1 patient mapped"));
}

#[test]
fn synthea_run_skips_diagnostic_reports() {
    let input = TempDir::new().unwrap();
    write(
        input.path(),
        "diagnostic_reports.csv",
        "ISSUED,EFFECTIVE\n2020-01-01,2020-01-01\n",
    );
    let output = TempDir::new().unwrap();
    let mapper = Mapper::new(
        SourceFormat::Synthea,
        MapperConfig::default(),
        CodeTables::builtin(),
    );

    let summary = convert_directory(&mapper, input.path(), output.path()).unwrap();

    assert_eq!(summary.ignored.len(), 1);
    assert!(summary.bundles.is_empty());
    assert!(!summary.has_failures());
}
