use mapper_core::{
    CodeableConcept, Encounter, EncounterStatus, Identifier, MapperError, MapperResult, Meta,
    Period, Reference,
};

use super::coded;
use crate::codes::{uri, EncounterClass, IdentifierType};
use crate::layout::{ClassSource, EncounterLayout};
use crate::record::Record;

const CHECK_UP_CODE: &str = "185349003";
const CHECK_UP_DISPLAY: &str = "Encounter for check up";

/// Builds a finished encounter for `subject`.
///
/// A blank type code becomes a SNOMED check-up; an end before the start is
/// [`MapperError::InvalidPeriod`].
pub fn build_encounter(
    record: &Record,
    layout: &EncounterLayout,
    subject: Reference,
) -> MapperResult<Encounter> {
    let line = record.line();
    let start = layout.dates.instant(record.get(layout.start), line, "START")?;
    let end = layout.dates.instant(record.get(layout.stop), line, "STOP")?;
    let period =
        Period::checked(start, end).ok_or(MapperError::InvalidPeriod { line, start, end })?;

    let class = match layout.class {
        ClassSource::Column(column) => EncounterClass::from_source(record.get(column)),
        ClassSource::Fixed(class) => class,
    };

    let identifier = if layout.visit_identifier {
        vec![Identifier {
            kind: Some(IdentifierType::VisitNumber.concept(&[])),
            system: uri::CERNER_ENCOUNTER.to_string(),
            value: record.get(layout.id).to_string(),
        }]
    } else {
        Vec::new()
    };

    let reason_code = match record.get(layout.reason_code) {
        "" => Vec::new(),
        code => vec![coded(
            layout.code_system,
            code,
            record.get(layout.reason_description),
        )],
    };

    Ok(Encounter {
        meta: layout.profile.map(Meta::profile),
        identifier,
        status: EncounterStatus::Finished,
        class: class.coding(),
        kind: vec![encounter_type(record, layout)],
        subject,
        period,
        reason_code,
    })
}

fn encounter_type(record: &Record, layout: &EncounterLayout) -> CodeableConcept {
    let description = record.get(layout.description);
    let mut concept = match record.get(layout.code) {
        "" => coded("SNOMED-CT", CHECK_UP_CODE, CHECK_UP_DISPLAY),
        code => coded(layout.code_system, code, description),
    };
    if layout.type_text && !description.is_empty() {
        concept.text = Some(description.to_string());
    }
    concept
}
