//! Column positions and per-format choices for every (format, entity) pair.
//!
//! Layouts are never unified across formats; each builder in [`crate::build`]
//! reads its columns through one of these.

use crate::codes::{profile, EncounterClass};
use crate::record::FieldLayout;
use crate::time::DatePattern;
use crate::SourceFormat;

/// Identifier set synthesized for a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientIdentifiers {
    /// Synthea id, record number, SSN, driver's license, passport.
    Synthea,
    /// Cerner person id typed PI and MR.
    CernerPerson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientLayout {
    pub fields: FieldLayout,
    pub id: usize,
    pub birth_date: usize,
    pub death_date: Option<usize>,
    pub ssn: Option<usize>,
    pub drivers: Option<usize>,
    pub passport: Option<usize>,
    pub prefix: Option<usize>,
    pub given: usize,
    pub family: usize,
    pub suffix: Option<usize>,
    pub maiden: Option<usize>,
    pub marital: Option<usize>,
    pub race: Option<usize>,
    pub ethnicity: Option<usize>,
    pub gender: usize,
    pub address: usize,
    pub city: usize,
    pub state: usize,
    pub zip: usize,
    pub dates: DatePattern,
    pub identifiers: PatientIdentifiers,
    pub profile: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassSource {
    Column(usize),
    Fixed(EncounterClass),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncounterLayout {
    pub fields: FieldLayout,
    pub id: usize,
    pub start: usize,
    pub stop: usize,
    pub patient: usize,
    pub class: ClassSource,
    pub code: usize,
    pub description: usize,
    pub reason_code: usize,
    pub reason_description: usize,
    pub dates: DatePattern,
    /// Source system name of the type and reason codes.
    pub code_system: &'static str,
    /// Emit the visit number under the Cerner encounter OID.
    pub visit_identifier: bool,
    /// Repeat the description as `type.text`.
    pub type_text: bool,
    pub profile: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    /// Fixed `laboratory` observation category.
    Laboratory,
    /// Category code and display both taken from a column.
    Column(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationLayout {
    pub fields: FieldLayout,
    pub date: usize,
    pub patient: usize,
    pub encounter: usize,
    pub code: usize,
    pub description: usize,
    pub value: usize,
    pub units: usize,
    pub value_type: usize,
    pub category: CategorySource,
    pub dates: DatePattern,
    pub code_system: &'static str,
    /// Stamp `issued` with the effective instant.
    pub issued_from_effective: bool,
    pub profile: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticReportLayout {
    pub fields: FieldLayout,
    pub issued: usize,
    pub effective: usize,
    pub patient: usize,
    pub encounter: usize,
    pub observation: usize,
    pub observation_display: usize,
    pub category_code: usize,
    pub category_display: usize,
    pub code: usize,
    pub code_display: usize,
    pub dates: DatePattern,
    pub code_system: &'static str,
}

const SYNTHEA_PATIENTS: PatientLayout = PatientLayout {
    fields: FieldLayout::strict(21),
    id: 0,
    birth_date: 1,
    death_date: Some(2),
    ssn: Some(3),
    drivers: Some(4),
    passport: Some(5),
    prefix: Some(6),
    given: 7,
    family: 8,
    suffix: Some(9),
    maiden: Some(10),
    marital: Some(11),
    race: Some(12),
    ethnicity: Some(13),
    gender: 14,
    address: 16,
    city: 17,
    state: 18,
    zip: 20,
    dates: DatePattern::IsoDate,
    identifiers: PatientIdentifiers::Synthea,
    profile: profile::US_CORE_PATIENT,
};

const CERNER_PERSONS: PatientLayout = PatientLayout {
    fields: FieldLayout::strict(9),
    id: 0,
    birth_date: 1,
    death_date: None,
    ssn: None,
    drivers: None,
    passport: None,
    prefix: None,
    given: 2,
    family: 3,
    suffix: None,
    maiden: None,
    marital: None,
    race: None,
    ethnicity: None,
    gender: 4,
    address: 5,
    city: 6,
    state: 7,
    zip: 8,
    dates: DatePattern::UsDate,
    identifiers: PatientIdentifiers::CernerPerson,
    profile: profile::US_CORE_PATIENT,
};

const SYNTHEA_ENCOUNTERS: EncounterLayout = EncounterLayout {
    fields: FieldLayout::padded(15),
    id: 0,
    start: 1,
    stop: 2,
    patient: 3,
    class: ClassSource::Column(7),
    code: 8,
    description: 9,
    reason_code: 13,
    reason_description: 14,
    dates: DatePattern::IsoInstant,
    code_system: "SNOMED-CT",
    visit_identifier: false,
    type_text: false,
    profile: Some(profile::US_CORE_ENCOUNTER),
};

const CERNER_ENCOUNTERS: EncounterLayout = EncounterLayout {
    fields: FieldLayout::strict(8),
    id: 0,
    start: 1,
    stop: 2,
    patient: 3,
    class: ClassSource::Fixed(EncounterClass::Inpatient),
    code: 4,
    description: 5,
    reason_code: 6,
    reason_description: 7,
    dates: DatePattern::UsTimestamp,
    code_system: "SNOMED-CT",
    visit_identifier: true,
    type_text: true,
    profile: None,
};

const SYNTHEA_OBSERVATIONS: ObservationLayout = ObservationLayout {
    fields: FieldLayout::padded(8),
    date: 0,
    patient: 1,
    encounter: 2,
    code: 3,
    description: 4,
    value: 5,
    units: 6,
    value_type: 7,
    category: CategorySource::Laboratory,
    dates: DatePattern::IsoDate,
    code_system: "LOINC",
    issued_from_effective: true,
    profile: Some(profile::US_CORE_OBSERVATION_LAB),
};

const CERNER_OBSERVATIONS: ObservationLayout = ObservationLayout {
    fields: FieldLayout::strict(9),
    date: 0,
    patient: 1,
    encounter: 2,
    code: 3,
    description: 4,
    value: 5,
    units: 6,
    value_type: 7,
    category: CategorySource::Column(8),
    dates: DatePattern::UsTimestamp,
    code_system: "LOINC",
    issued_from_effective: false,
    profile: None,
};

const CERNER_DIAGNOSTIC_REPORTS: DiagnosticReportLayout = DiagnosticReportLayout {
    fields: FieldLayout::strict(10),
    issued: 0,
    effective: 1,
    patient: 2,
    encounter: 3,
    observation: 4,
    observation_display: 5,
    category_code: 6,
    category_display: 7,
    code: 8,
    code_display: 9,
    dates: DatePattern::UsTimestamp,
    code_system: "LOINC",
};

impl SourceFormat {
    pub fn patient_layout(self) -> &'static PatientLayout {
        match self {
            SourceFormat::Synthea => &SYNTHEA_PATIENTS,
            SourceFormat::Cerner => &CERNER_PERSONS,
        }
    }

    pub fn encounter_layout(self) -> &'static EncounterLayout {
        match self {
            SourceFormat::Synthea => &SYNTHEA_ENCOUNTERS,
            SourceFormat::Cerner => &CERNER_ENCOUNTERS,
        }
    }

    pub fn observation_layout(self) -> &'static ObservationLayout {
        match self {
            SourceFormat::Synthea => &SYNTHEA_OBSERVATIONS,
            SourceFormat::Cerner => &CERNER_OBSERVATIONS,
        }
    }

    /// Synthea exports carry no diagnostic reports.
    pub fn diagnostic_report_layout(self) -> Option<&'static DiagnosticReportLayout> {
        match self {
            SourceFormat::Synthea => None,
            SourceFormat::Cerner => Some(&CERNER_DIAGNOSTIC_REPORTS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_cover_every_referenced_column() {
        for format in SourceFormat::ALL {
            let patients = format.patient_layout();
            let highest = [patients.id, patients.given, patients.gender, patients.zip]
                .into_iter()
                .chain(patients.ethnicity)
                .max()
                .unwrap_or(0);
            assert!(highest < patients.fields.width, "{}", format.name());

            let encounters = format.encounter_layout();
            assert!(encounters.reason_description < encounters.fields.width);

            let observations = format.observation_layout();
            assert!(observations.value_type < observations.fields.width);
            if let CategorySource::Column(column) = observations.category {
                assert!(column < observations.fields.width);
            }
        }

        let reports = SourceFormat::Cerner.diagnostic_report_layout().unwrap();
        assert_eq!(reports.fields.width, reports.code_display + 1);
    }

    #[test]
    fn ragged_layouts_are_synthea_dependents() {
        use crate::record::ShortRows;

        assert_eq!(
            SourceFormat::Synthea.encounter_layout().fields.short_rows,
            ShortRows::Pad
        );
        assert_eq!(
            SourceFormat::Synthea.observation_layout().fields.short_rows,
            ShortRows::Pad
        );
        assert_eq!(
            SourceFormat::Synthea.patient_layout().fields.short_rows,
            ShortRows::Reject
        );
        assert_eq!(
            SourceFormat::Cerner.encounter_layout().fields.short_rows,
            ShortRows::Reject
        );
    }
}
