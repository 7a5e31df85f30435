//! Static translation tables: coding-system URIs, demographic vocabularies,
//! encounter classes, identifier types and US state abbreviations.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use csv::{ReaderBuilder, Trim};
use mapper_core::{AdministrativeGender, CodeableConcept, Coding, MapperError, MapperResult};

/// Canonical system URIs.
pub mod uri {
    pub const SNOMED: &str = "http://snomed.info/sct";
    pub const LOINC: &str = "http://loinc.org";
    pub const RXNORM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
    pub const CVX: &str = "http://hl7.org/fhir/sid/cvx";
    pub const DICOM_DCM: &str = "http://dicom.nema.org/resources/ontology/DCM";
    pub const UCUM: &str = "http://unitsofmeasure.org";

    pub const ACT_CODE: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";
    pub const NULL_FLAVOR: &str = "http://terminology.hl7.org/CodeSystem/v3-NullFlavor";
    pub const MARITAL_STATUS: &str = "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus";
    pub const IDENTIFIER_TYPE: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";
    pub const OBSERVATION_CATEGORY: &str =
        "http://terminology.hl7.org/CodeSystem/observation-category";
    pub const DIAGNOSTIC_SERVICE_SECTION: &str = "http://terminology.hl7.org/CodeSystem/v2-0074";
    pub const CDC_RACE_ETHNICITY: &str = "urn:oid:2.16.840.1.113883.6.238";

    pub const SYNTHEA_IDENTIFIER: &str = "https://github.com/synthetichealth/synthea";
    pub const SMART_HOSPITAL: &str = "http://hospital.smarthealthit.org";
    pub const US_SSN: &str = "http://hl7.org/fhir/sid/us-ssn";
    pub const DRIVERS_LICENSE: &str = "urn:oid:2.16.840.1.113883.4.3.25";
    pub const PASSPORT: &str =
        "http://standardhealthrecord.org/fhir/StructureDefinition/passportNumber";
    pub const CERNER_PERSON: &str = "urn:oid:2.16.840.1.113883.6.1000";
    pub const CERNER_ENCOUNTER: &str = "urn:oid:2.16.840.1.113883.3.552";
}

/// US Core profile canonicals stamped into `meta.profile`.
pub mod profile {
    pub const US_CORE_PATIENT: &str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-patient";
    pub const US_CORE_ENCOUNTER: &str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-encounter";
    pub const US_CORE_OBSERVATION_LAB: &str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-observation-lab";
}

pub mod extension_url {
    pub const US_CORE_RACE: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-race";
    pub const US_CORE_ETHNICITY: &str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-ethnicity";
    pub const US_CORE_BIRTHSEX: &str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-birthsex";
}

/// Resolves a source coding-system name to its canonical URI.
///
/// Unknown names pass through unchanged.
pub fn system_uri(name: &str) -> &str {
    match name.trim().to_ascii_lowercase().as_str() {
        "snomed-ct" | "snomed" => uri::SNOMED,
        "loinc" => uri::LOINC,
        "rxnorm" => uri::RXNORM,
        "cvx" => uri::CVX,
        "dicom-dcm" => uri::DICOM_DCM,
        _ => name,
    }
}

fn unknown_coding() -> Coding {
    Coding::new(uri::NULL_FLAVOR, "UNK", "unknown")
}

/// v2-0203 identifier types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierType {
    MedicalRecordNumber,
    SocialSecurityNumber,
    DriversLicenseNumber,
    PassportNumber,
    PatientInternalIdentifier,
    VisitNumber,
}

impl IdentifierType {
    pub fn code(self) -> &'static str {
        match self {
            IdentifierType::MedicalRecordNumber => "MR",
            IdentifierType::SocialSecurityNumber => "SS",
            IdentifierType::DriversLicenseNumber => "DL",
            IdentifierType::PassportNumber => "PPN",
            IdentifierType::PatientInternalIdentifier => "PI",
            IdentifierType::VisitNumber => "VN",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            IdentifierType::MedicalRecordNumber => "Medical record number",
            IdentifierType::SocialSecurityNumber => "Social Security number",
            IdentifierType::DriversLicenseNumber => "Driver's license number",
            IdentifierType::PassportNumber => "Passport number",
            IdentifierType::PatientInternalIdentifier => "Patient internal identifier",
            IdentifierType::VisitNumber => "Visit number",
        }
    }

    pub fn coding(self) -> Coding {
        Coding::new(uri::IDENTIFIER_TYPE, self.code(), self.display())
    }

    /// Concept carrying `self` first (and as text), then `others`.
    pub fn concept(self, others: &[IdentifierType]) -> CodeableConcept {
        let mut concept = CodeableConcept::with_text(self.coding());
        concept
            .coding
            .extend(others.iter().map(|other| other.coding()));
        concept
    }
}

/// Source encounter classes and their v3-ActCode targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterClass {
    Wellness,
    Ambulatory,
    Outpatient,
    Inpatient,
    Emergency,
    UrgentCare,
    Hospice,
    Home,
    Snf,
    Virtual,
    Unknown,
}

impl EncounterClass {
    /// Blank means ambulatory and `super` means inpatient; anything
    /// unrecognised is [`EncounterClass::Unknown`].
    pub fn from_source(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return EncounterClass::Ambulatory;
        }
        match value.to_ascii_lowercase().as_str() {
            "wellness" => EncounterClass::Wellness,
            "ambulatory" => EncounterClass::Ambulatory,
            "outpatient" => EncounterClass::Outpatient,
            "inpatient" | "super" => EncounterClass::Inpatient,
            "emergency" => EncounterClass::Emergency,
            "urgentcare" => EncounterClass::UrgentCare,
            "hospice" => EncounterClass::Hospice,
            "home" => EncounterClass::Home,
            "snf" => EncounterClass::Snf,
            "virtual" => EncounterClass::Virtual,
            _ => EncounterClass::Unknown,
        }
    }

    pub fn act_code(self) -> Option<&'static str> {
        match self {
            EncounterClass::Wellness
            | EncounterClass::Ambulatory
            | EncounterClass::Outpatient
            | EncounterClass::UrgentCare => Some("AMB"),
            EncounterClass::Inpatient | EncounterClass::Snf => Some("IMP"),
            EncounterClass::Emergency => Some("EMER"),
            EncounterClass::Hospice | EncounterClass::Home => Some("HH"),
            EncounterClass::Virtual => Some("VR"),
            EncounterClass::Unknown => None,
        }
    }

    pub fn coding(self) -> Coding {
        match self.act_code() {
            Some(code) => Coding::new(uri::ACT_CODE, code, act_display(code)),
            None => unknown_coding(),
        }
    }
}

fn act_display(code: &str) -> &'static str {
    match code {
        "AMB" => "ambulatory",
        "IMP" => "inpatient encounter",
        "EMER" => "emergency",
        "HH" => "home health",
        "VR" => "virtual",
        _ => "",
    }
}

/// Accepts letter (`M`/`F`) and word (`male`/`female`) spellings, any case.
pub fn administrative_gender(value: &str) -> AdministrativeGender {
    match value.trim().to_ascii_lowercase().as_str() {
        "m" | "male" => AdministrativeGender::Male,
        "f" | "female" => AdministrativeGender::Female,
        _ => AdministrativeGender::Unknown,
    }
}

/// US Core birth-sex code for a source sex value.
pub fn birth_sex_code(value: &str) -> &'static str {
    match administrative_gender(value) {
        AdministrativeGender::Male => "M",
        AdministrativeGender::Female => "F",
        AdministrativeGender::Other | AdministrativeGender::Unknown => "UNK",
    }
}

pub fn marital_status(value: &str) -> CodeableConcept {
    let coding = match value.trim() {
        "S" => Coding::new(uri::MARITAL_STATUS, "S", "Never Married"),
        "M" => Coding::new(uri::MARITAL_STATUS, "M", "Married"),
        _ => unknown_coding(),
    };
    CodeableConcept::from(coding)
}

/// OMB race categories as exported by Synthea.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Race {
    White,
    Black,
    Asian,
    Native,
    Hawaiian,
    Other,
}

impl Race {
    pub fn from_source(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "white" => Race::White,
            "black" => Race::Black,
            "asian" => Race::Asian,
            "native" => Race::Native,
            "hawaiian" => Race::Hawaiian,
            _ => Race::Other,
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Race::White => "White",
            Race::Black => "Black or African American",
            Race::Asian => "Asian",
            Race::Native => "American Indian or Alaska Native",
            Race::Hawaiian => "Native Hawaiian or Other Pacific Islander",
            Race::Other => "Other",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Race::White => "2106-3",
            Race::Black => "2054-5",
            Race::Asian => "2028-9",
            Race::Native => "1002-5",
            Race::Hawaiian => "2076-8",
            Race::Other => "2131-1",
        }
    }

    /// `Other` has no OMB category and codes as unknown.
    pub fn omb_coding(self) -> Coding {
        match self {
            Race::Other => Coding::new(uri::NULL_FLAVOR, "UNK", "Unknown"),
            _ => Coding::new(uri::CDC_RACE_ETHNICITY, self.code(), self.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ethnicity {
    Hispanic,
    NonHispanic,
    Unknown,
}

impl Ethnicity {
    pub fn from_source(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "hispanic" => Ethnicity::Hispanic,
            "nonhispanic" => Ethnicity::NonHispanic,
            _ => Ethnicity::Unknown,
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Ethnicity::Hispanic => "Hispanic or Latino",
            Ethnicity::NonHispanic => "Not Hispanic or Latino",
            Ethnicity::Unknown => "Unknown",
        }
    }

    pub fn omb_coding(self) -> Coding {
        match self {
            Ethnicity::Hispanic => Coding::new(uri::CDC_RACE_ETHNICITY, "2135-2", self.display()),
            Ethnicity::NonHispanic => {
                Coding::new(uri::CDC_RACE_ETHNICITY, "2186-5", self.display())
            }
            Ethnicity::Unknown => Coding::new(uri::NULL_FLAVOR, "UNK", "Unknown"),
        }
    }
}

const US_STATES: [(&str, &str); 56] = [
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("American Samoa", "AS"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("District of Columbia", "DC"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Guam", "GU"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Northern Mariana Islands", "MP"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Puerto Rico", "PR"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("U.S. Virgin Islands", "VI"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

/// State name to USPS abbreviation, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StateTable {
    by_name: HashMap<String, String>,
    abbreviations: HashSet<String>,
}

impl StateTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (name, abbreviation) in US_STATES {
            table.insert(name, abbreviation);
        }
        table
    }

    /// Reads a Synthea `zipcodes.csv`-style reference table: state name in
    /// the second column, abbreviation in the third. Rows with fewer than
    /// three columns are ignored, as is the header row.
    pub fn from_reader<R: Read>(reader: R) -> MapperResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut table = Self::default();
        for row in reader.records() {
            let row = row.map_err(|err| MapperError::Delimited {
                line: err.position().map_or(0, |pos| pos.line()),
                message: err.to_string(),
            })?;
            if let (Some(name), Some(abbreviation)) = (row.get(1), row.get(2)) {
                if !name.is_empty() && !abbreviation.is_empty() {
                    table.insert(name, abbreviation);
                }
            }
        }
        Ok(table)
    }

    pub fn insert(&mut self, name: &str, abbreviation: &str) {
        let abbreviation = abbreviation.trim().to_ascii_uppercase();
        self.abbreviations.insert(abbreviation.clone());
        self.by_name
            .insert(name.trim().to_uppercase(), abbreviation);
    }

    /// Abbreviation for a state name; a value that already is a known
    /// abbreviation comes back unchanged.
    pub fn abbreviation(&self, state: &str) -> Option<&str> {
        let key = state.trim().to_uppercase();
        if let Some(abbreviation) = self.by_name.get(&key) {
            return Some(abbreviation.as_str());
        }
        self.abbreviations.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Read-only lookup tables shared by every builder of a run.
#[derive(Debug, Clone)]
pub struct CodeTables {
    states: StateTable,
}

impl CodeTables {
    pub fn builtin() -> Self {
        Self::with_states(StateTable::builtin())
    }

    pub fn with_states(states: StateTable) -> Self {
        Self { states }
    }

    pub fn states(&self) -> &StateTable {
        &self.states
    }
}

impl Default for CodeTables {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_system_names_resolve() {
        assert_eq!(system_uri("SNOMED-CT"), uri::SNOMED);
        assert_eq!(system_uri("loinc"), uri::LOINC);
        assert_eq!(system_uri("RxNorm"), uri::RXNORM);
        assert_eq!(system_uri("CVX"), uri::CVX);
        assert_eq!(system_uri("DICOM-DCM"), uri::DICOM_DCM);
    }

    #[test]
    fn unknown_system_name_passes_through() {
        assert_eq!(system_uri("urn:oid:1.2.3"), "urn:oid:1.2.3");
        assert_eq!(system_uri("ICD-10-CM"), "ICD-10-CM");
    }

    #[test]
    fn gender_translation_is_total() {
        assert_eq!(administrative_gender("M"), AdministrativeGender::Male);
        assert_eq!(administrative_gender("F"), AdministrativeGender::Female);
        assert_eq!(administrative_gender(""), AdministrativeGender::Unknown);
        assert_eq!(administrative_gender("female"), AdministrativeGender::Female);
        assert_eq!(administrative_gender("Male"), AdministrativeGender::Male);
        assert_eq!(administrative_gender("X"), AdministrativeGender::Unknown);
        assert_eq!(administrative_gender("unknown"), AdministrativeGender::Unknown);
    }

    #[test]
    fn encounter_classes_map_to_act_codes() {
        assert_eq!(EncounterClass::from_source("").act_code(), Some("AMB"));
        assert_eq!(EncounterClass::from_source("wellness").act_code(), Some("AMB"));
        assert_eq!(EncounterClass::from_source("super").act_code(), Some("IMP"));
        assert_eq!(EncounterClass::from_source("emergency").act_code(), Some("EMER"));
        assert_eq!(EncounterClass::from_source("snf").act_code(), Some("IMP"));
        assert_eq!(EncounterClass::from_source("home").act_code(), Some("HH"));
        assert_eq!(EncounterClass::from_source("virtual").act_code(), Some("VR"));

        let unknown = EncounterClass::from_source("telepathy");
        assert_eq!(unknown, EncounterClass::Unknown);
        assert_eq!(unknown.coding().system.as_deref(), Some(uri::NULL_FLAVOR));
        assert_eq!(unknown.coding().code.as_deref(), Some("UNK"));
    }

    #[test]
    fn marital_status_falls_back_to_null_flavor() {
        let married = marital_status("M");
        assert_eq!(married.coding[0].display.as_deref(), Some("Married"));

        let divorced = marital_status("D");
        assert_eq!(divorced.coding[0].system.as_deref(), Some(uri::NULL_FLAVOR));
        assert_eq!(divorced.coding[0].code.as_deref(), Some("UNK"));
    }

    #[test]
    fn race_other_codes_as_unknown() {
        let race = Race::from_source("other");
        assert_eq!(race.display(), "Other");
        assert_eq!(race.omb_coding().code.as_deref(), Some("UNK"));

        let race = Race::from_source("black");
        assert_eq!(race.omb_coding().code.as_deref(), Some("2054-5"));
    }

    #[test]
    fn ethnicity_codes() {
        assert_eq!(
            Ethnicity::from_source("hispanic").omb_coding().code.as_deref(),
            Some("2135-2")
        );
        assert_eq!(
            Ethnicity::from_source("nonhispanic").omb_coding().code.as_deref(),
            Some("2186-5")
        );
        assert_eq!(Ethnicity::from_source(""), Ethnicity::Unknown);
    }

    #[test]
    fn builtin_states_resolve_any_case() {
        let states = StateTable::builtin();
        assert_eq!(states.abbreviation("Pennsylvania"), Some("PA"));
        assert_eq!(states.abbreviation("PENNSYLVANIA"), Some("PA"));
        assert_eq!(states.abbreviation("ma"), Some("MA"));
        assert_eq!(states.abbreviation("Atlantis"), None);
    }

    #[test]
    fn state_table_reads_zipcode_reference() {
        let csv = "\
,USPS,ST,NAME,ZCTA5
0,Massachusetts,MA,Boston,02108
1,Pennsylvania,PA,Pittsburgh,15213
2,short
";
        let states = StateTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(states.abbreviation("Pennsylvania"), Some("PA"));
        assert_eq!(states.abbreviation("massachusetts"), Some("MA"));
        assert_eq!(states.abbreviation("Ohio"), None);
        assert_eq!(states.abbreviation("USPS"), None);
        assert_eq!(states.abbreviation("ST"), None);
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn identifier_concept_lists_primary_type_first() {
        let concept = IdentifierType::PatientInternalIdentifier
            .concept(&[IdentifierType::MedicalRecordNumber]);
        assert_eq!(concept.text.as_deref(), Some("Patient internal identifier"));
        assert_eq!(concept.coding.len(), 2);
        assert_eq!(concept.coding[1].code.as_deref(), Some("MR"));
    }
}
