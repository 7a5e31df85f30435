use std::fs;

use mapper_core::MapperConfig;
use mapper_fhir::{
    CodeTables, Delimiter, DocumentEncoder, JsonEncoder, LinkIndex, Mapper, SourceFormat,
};
use serde_json::Value;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/cerner/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn open(name: &str) -> fs::File {
    fs::File::open(fixture_path(name)).expect("fixture should open")
}

#[test]
fn observation_bundle_matches_golden() {
    let mapper = Mapper::new(
        SourceFormat::Cerner,
        MapperConfig::default(),
        CodeTables::builtin(),
    );
    let mut index = LinkIndex::new();
    mapper
        .map_patients(open("persons.tsv"), Delimiter::Tab, &mut index)
        .expect("persons should map");
    mapper
        .map_encounters(open("encounters.tsv"), Delimiter::Tab, &mut index)
        .expect("encounters should map");
    let batch = mapper
        .map_observations(open("observations.tsv"), Delimiter::Tab, &index)
        .expect("observations should map");
    assert_eq!(batch.skipped.len(), 1);

    let bundle = batch.into_bundle(mapper.config().bundle_type);
    let encoded = JsonEncoder::pretty()
        .encode_bundle(&bundle)
        .expect("bundle should encode");
    let actual: Value = serde_json::from_str(&encoded).expect("encoded bundle is JSON");

    let expected = fs::read_to_string(fixture_path("observation_collection_bundle.json"))
        .expect("golden bundle should read");
    let expected: Value = serde_json::from_str(&expected).expect("golden bundle is JSON");

    assert_eq!(actual, expected);
}
