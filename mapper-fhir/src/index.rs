//! Parent lookup for dependent records and the ledger of records dropped
//! because their parent could not be found.

use std::collections::HashMap;
use std::fmt;

use mapper_core::{Encounter, Patient, Reference};

/// Natural-key maps filled while parents are mapped.
///
/// Registered during the patient and encounter passes, then only read.
#[derive(Debug, Default)]
pub struct LinkIndex {
    patients: HashMap<String, Patient>,
    encounters: HashMap<String, Encounter>,
}

impl LinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// A later registration under the same key replaces the earlier one.
    pub fn register_patient(&mut self, key: impl Into<String>, patient: Patient) {
        self.patients.insert(key.into(), patient);
    }

    pub fn register_encounter(&mut self, key: impl Into<String>, encounter: Encounter) {
        self.encounters.insert(key.into(), encounter);
    }

    /// Moves every registration of `other` into this index; `other` wins on
    /// a shared key.
    pub fn absorb(&mut self, other: LinkIndex) {
        self.patients.extend(other.patients);
        self.encounters.extend(other.encounters);
    }

    pub fn patient(&self, key: &str) -> Option<&Patient> {
        self.patients.get(key)
    }

    pub fn encounter(&self, key: &str) -> Option<&Encounter> {
        self.encounters.get(key)
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }

    pub fn encounter_count(&self) -> usize {
        self.encounters.len()
    }
}

/// How a dependent record turns a parent key into a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// `urn:uuid:<key>` without lookup.
    Urn,
    /// Lookup in the [`LinkIndex`]; a miss drops the record.
    Indexed,
}

impl Linkage {
    pub fn subject(self, index: &LinkIndex, key: &str) -> Result<Reference, MissingParent> {
        let missing = || MissingParent::Patient(key.to_string());
        if key.is_empty() {
            return Err(missing());
        }
        match self {
            Linkage::Urn => Ok(urn(key)),
            Linkage::Indexed => {
                let patient = index.patient(key).ok_or_else(missing)?;
                let id = patient
                    .first_identifier()
                    .map_or(key, |identifier| identifier.value.as_str());
                let display = patient
                    .official_name()
                    .map(|name| name.full_name())
                    .unwrap_or_default();
                Ok(Reference::with_display(format!("Patient/{id}"), &display))
            }
        }
    }

    pub fn encounter(self, index: &LinkIndex, key: &str) -> Result<Reference, MissingParent> {
        let missing = || MissingParent::Encounter(key.to_string());
        if key.is_empty() {
            return Err(missing());
        }
        match self {
            Linkage::Urn => Ok(urn(key)),
            Linkage::Indexed => {
                let encounter = index.encounter(key).ok_or_else(missing)?;
                let id = encounter
                    .first_identifier()
                    .map_or(key, |identifier| identifier.value.as_str());
                Ok(Reference::new(format!("Encounter/{id}")))
            }
        }
    }
}

fn urn(key: &str) -> Reference {
    Reference::new(format!("urn:uuid:{key}"))
}

/// The parent a dependent record pointed at but could not reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingParent {
    Patient(String),
    Encounter(String),
}

impl fmt::Display for MissingParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingParent::Patient(key) => write!(f, "no patient registered for key {key:?}"),
            MissingParent::Encounter(key) => {
                write!(f, "no encounter registered for key {key:?}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub line: u64,
    pub missing: MissingParent,
}

/// Records dropped from a batch for a missing parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipLedger {
    records: Vec<SkippedRecord>,
}

impl SkipLedger {
    pub fn record(&mut self, line: u64, missing: MissingParent) {
        tracing::debug!(line, %missing, "dropping record without parent");
        self.records.push(SkippedRecord { line, missing });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkippedRecord> {
        self.records.iter()
    }

    pub fn merge(&mut self, other: SkipLedger) {
        self.records.extend(other.records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mapper_core::{AdministrativeGender, HumanName, Identifier, NameUse};

    fn patient(id: &str) -> Patient {
        Patient {
            meta: None,
            extension: Vec::new(),
            identifier: vec![Identifier {
                kind: None,
                system: "urn:oid:2.16.840.1.113883.6.1000".into(),
                value: id.into(),
            }],
            name: vec![HumanName {
                name_use: NameUse::Official,
                family: Some("Rivera".into()),
                given: vec!["Ana".into()],
                prefix: Vec::new(),
                suffix: Vec::new(),
            }],
            gender: AdministrativeGender::Female,
            birth_date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            deceased_date_time: None,
            address: Vec::new(),
            marital_status: None,
        }
    }

    #[test]
    fn urn_linkage_needs_no_index() {
        let index = LinkIndex::new();
        let subject = Linkage::Urn.subject(&index, "abc").unwrap();
        assert_eq!(subject.reference, "urn:uuid:abc");
        assert_eq!(subject.display, None);
    }

    #[test]
    fn indexed_linkage_reads_registered_patient() {
        let mut index = LinkIndex::new();
        index.register_patient("P1", patient("P1"));

        let subject = Linkage::Indexed.subject(&index, "P1").unwrap();
        assert_eq!(subject.reference, "Patient/P1");
        assert_eq!(subject.display.as_deref(), Some("Ana Rivera"));
        assert_eq!(index.patient_count(), 1);
    }

    #[test]
    fn absorb_moves_registrations() {
        let mut index = LinkIndex::new();
        index.register_patient("P1", patient("P1"));
        let mut pending = LinkIndex::new();
        pending.register_patient("P2", patient("P2"));

        index.absorb(pending);
        assert_eq!(index.patient_count(), 2);
        assert!(index.patient("P2").is_some());
    }

    #[test]
    fn indexed_miss_names_the_parent() {
        let index = LinkIndex::new();
        assert_eq!(
            Linkage::Indexed.subject(&index, "P9"),
            Err(MissingParent::Patient("P9".into()))
        );
        assert_eq!(
            Linkage::Indexed.encounter(&index, "E9"),
            Err(MissingParent::Encounter("E9".into()))
        );
    }

    #[test]
    fn blank_key_is_a_miss_for_both_linkages() {
        let index = LinkIndex::new();
        assert!(Linkage::Urn.subject(&index, "").is_err());
        assert!(Linkage::Urn.encounter(&index, "").is_err());
    }

    #[test]
    fn ledger_keeps_arrival_order() {
        let mut ledger = SkipLedger::default();
        ledger.record(3, MissingParent::Patient("a".into()));
        let mut other = SkipLedger::default();
        other.record(5, MissingParent::Encounter("b".into()));
        ledger.merge(other);

        let lines: Vec<_> = ledger.iter().map(|skip| skip.line).collect();
        assert_eq!(lines, vec![3, 5]);
    }
}
