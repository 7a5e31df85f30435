//! Flat clinical exports (Synthea CSV, Cerner TSV) to FHIR R4 resources.
//!
//! A file is mapped in one pass: [`record`] splits lines into positional
//! fields, [`build`] turns one record into one resource, [`index`] resolves
//! dependent records against parents mapped earlier in the run, and
//! [`aggregate`] folds diagnostic-report rows into one report per encounter.
//! [`pipeline::Mapper`] ties these together per entity type.

pub mod aggregate;
pub mod build;
pub mod codes;
pub mod encode;
pub mod index;
pub mod layout;
pub mod pipeline;
pub mod record;
pub mod time;

pub use aggregate::ReportAggregator;
pub use build::ValueType;
pub use codes::{CodeTables, StateTable};
pub use encode::{DocumentEncoder, JsonEncoder};
pub use index::{LinkIndex, Linkage, MissingParent, SkipLedger, SkippedRecord};
pub use pipeline::{Batch, Mapper};
pub use record::{read_records, Delimiter, FieldLayout, Record, ShortRows};
pub use time::DatePattern;

/// Export families with their own field layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Synthea synthetic-patient CSV exports.
    Synthea,
    /// Cerner EHR extracts (tab separated).
    Cerner,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 2] = [SourceFormat::Synthea, SourceFormat::Cerner];

    pub fn name(self) -> &'static str {
        match self {
            SourceFormat::Synthea => "synthea",
            SourceFormat::Cerner => "cerner",
        }
    }

    /// Case-insensitive lookup; `brainai` is accepted for Cerner extracts.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "synthea" => Some(SourceFormat::Synthea),
            "cerner" | "brainai" => Some(SourceFormat::Cerner),
            _ => None,
        }
    }

    /// How dependent records of this format reach their parents.
    pub fn linkage(self) -> Linkage {
        match self {
            SourceFormat::Synthea => Linkage::Urn,
            SourceFormat::Cerner => Linkage::Indexed,
        }
    }

    pub fn supports(self, entity: EntityKind) -> bool {
        !matches!(
            (self, entity),
            (SourceFormat::Synthea, EntityKind::DiagnosticReport)
        )
    }
}

/// Resource family selected by an input file's name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Patient,
    Encounter,
    Observation,
    DiagnosticReport,
}

impl EntityKind {
    /// Parents before dependents.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Patient,
        EntityKind::Encounter,
        EntityKind::Observation,
        EntityKind::DiagnosticReport,
    ];

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.starts_with("patients") || lower.starts_with("persons") {
            Some(EntityKind::Patient)
        } else if lower.starts_with("encounters") {
            Some(EntityKind::Encounter)
        } else if lower.starts_with("observations") {
            Some(EntityKind::Observation)
        } else if lower.starts_with("diagnostic_report") {
            Some(EntityKind::DiagnosticReport)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Patient => "patient",
            EntityKind::Encounter => "encounter",
            EntityKind::Observation => "observation",
            EntityKind::DiagnosticReport => "diagnostic_report",
        }
    }

    pub fn bundle_file_name(self) -> String {
        format!("{}_collection_bundle.json", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_follows_file_prefix() {
        assert_eq!(
            EntityKind::from_file_name("patients.csv"),
            Some(EntityKind::Patient)
        );
        assert_eq!(
            EntityKind::from_file_name("persons.tsv"),
            Some(EntityKind::Patient)
        );
        assert_eq!(
            EntityKind::from_file_name("Encounters_2020.csv"),
            Some(EntityKind::Encounter)
        );
        assert_eq!(
            EntityKind::from_file_name("diagnostic_reports.tsv"),
            Some(EntityKind::DiagnosticReport)
        );
        assert_eq!(EntityKind::from_file_name("providers.csv"), None);
    }

    #[test]
    fn format_names_round_trip() {
        for format in SourceFormat::ALL {
            assert_eq!(SourceFormat::from_name(format.name()), Some(format));
        }
        assert_eq!(SourceFormat::from_name(" BrainAI "), Some(SourceFormat::Cerner));
        assert_eq!(SourceFormat::from_name("project"), None);
    }

    #[test]
    fn bundle_file_names() {
        assert_eq!(
            EntityKind::Observation.bundle_file_name(),
            "observation_collection_bundle.json"
        );
    }
}
