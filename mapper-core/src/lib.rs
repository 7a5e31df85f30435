//! FHIR R4 resource model produced by the flat-file mappers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Switches that shape a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapperConfig {
    /// Pretty-print encoded bundles.
    pub pretty_print: bool,
    /// Log and skip a malformed line instead of abandoning the whole file.
    pub skip_malformed_records: bool,
    /// Type stamped on every assembled bundle.
    pub bundle_type: BundleType,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            pretty_print: true,
            skip_malformed_records: false,
            bundle_type: BundleType::Collection,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    /// Blank code or display text is left out rather than emitted as `""`.
    pub fn new(system: impl Into<String>, code: &str, display: &str) -> Self {
        Self {
            system: Some(system.into()),
            code: non_blank(code),
            display: non_blank(display),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Concept whose text repeats the display of its first coding.
    pub fn with_text(coding: Coding) -> Self {
        Self {
            text: coding.display.clone(),
            coding: vec![coding],
        }
    }

    pub fn first_coding(&self) -> Option<&Coding> {
        self.coding.first()
    }
}

impl From<Coding> for CodeableConcept {
    fn from(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identifier {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CodeableConcept>,
    pub system: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NameUse {
    Official,
    Maiden,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HumanName {
    #[serde(rename = "use")]
    pub name_use: NameUse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suffix: Vec<String>,
}

impl HumanName {
    /// Given names followed by the family name, space separated.
    pub fn full_name(&self) -> String {
        self.given
            .iter()
            .map(String::as_str)
            .chain(self.family.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// FHIR administrative gender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AdministrativeGender {
    Male,
    Female,
    Other,
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Extension with an optional `value[x]` and nested sub-extensions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Extension {
    pub url: String,
    #[serde(flatten)]
    pub value: Option<ExtensionValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

impl Extension {
    pub fn with_value(url: impl Into<String>, value: ExtensionValue) -> Self {
        Self {
            url: url.into(),
            value: Some(value),
            extension: Vec::new(),
        }
    }

    pub fn nested(url: impl Into<String>, extension: Vec<Extension>) -> Self {
        Self {
            url: url.into(),
            value: None,
            extension,
        }
    }

    /// Looks up a direct sub-extension by url.
    pub fn child(&self, url: &str) -> Option<&Extension> {
        self.extension.iter().find(|ext| ext.url == url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtensionValue {
    #[serde(rename = "valueString")]
    String(String),
    #[serde(rename = "valueCoding")]
    Coding(Coding),
    #[serde(rename = "valueCode")]
    Code(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,
}

impl Meta {
    pub fn profile(url: &str) -> Self {
        Self {
            profile: vec![url.to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            display: None,
        }
    }

    pub fn with_display(reference: impl Into<String>, display: &str) -> Self {
        Self {
            reference: reference.into(),
            display: non_blank(display),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// Returns `None` when `end` falls before `start`.
    pub fn checked(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    pub identifier: Vec<Identifier>,
    pub name: Vec<HumanName>,
    pub gender: AdministrativeGender,
    pub birth_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deceased_date_time: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<CodeableConcept>,
}

impl Patient {
    pub fn first_identifier(&self) -> Option<&Identifier> {
        self.identifier.first()
    }

    pub fn official_name(&self) -> Option<&HumanName> {
        self.name
            .iter()
            .find(|name| name.name_use == NameUse::Official)
    }

    pub fn extension(&self, url: &str) -> Option<&Extension> {
        self.extension.iter().find(|ext| ext.url == url)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EncounterStatus {
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,
    pub status: EncounterStatus,
    pub class: Coding,
    #[serde(rename = "type")]
    pub kind: Vec<CodeableConcept>,
    pub subject: Reference,
    pub period: Period,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason_code: Vec<CodeableConcept>,
}

impl Encounter {
    pub fn first_identifier(&self) -> Option<&Identifier> {
        self.identifier.first()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObservationStatus {
    Final,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quantity {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// `value[x]` choice carried by an observation component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ObservationValue {
    #[serde(rename = "valueQuantity")]
    Quantity(Quantity),
    #[serde(rename = "valueString")]
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservationComponent {
    pub code: CodeableConcept,
    #[serde(flatten)]
    pub value: Option<ObservationValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    pub status: ObservationStatus,
    pub category: Vec<CodeableConcept>,
    pub code: CodeableConcept,
    pub subject: Reference,
    pub encounter: Reference,
    pub effective_date_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<DateTime<Utc>>,
    pub component: Vec<ObservationComponent>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticReportStatus {
    Final,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub status: DiagnosticReportStatus,
    pub category: Vec<CodeableConcept>,
    pub code: CodeableConcept,
    pub subject: Reference,
    pub encounter: Reference,
    pub effective_date_time: DateTime<Utc>,
    pub issued: DateTime<Utc>,
    #[serde(default)]
    pub result: Vec<Reference>,
}

/// Any resource that can sit in a bundle entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Patient(Patient),
    Encounter(Encounter),
    Observation(Observation),
    DiagnosticReport(DiagnosticReport),
}

impl Resource {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Resource::Patient(_) => "Patient",
            Resource::Encounter(_) => "Encounter",
            Resource::Observation(_) => "Observation",
            Resource::DiagnosticReport(_) => "DiagnosticReport",
        }
    }
}

impl From<Patient> for Resource {
    fn from(value: Patient) -> Self {
        Resource::Patient(value)
    }
}

impl From<Encounter> for Resource {
    fn from(value: Encounter) -> Self {
        Resource::Encounter(value)
    }
}

impl From<Observation> for Resource {
    fn from(value: Observation) -> Self {
        Resource::Observation(value)
    }
}

impl From<DiagnosticReport> for Resource {
    fn from(value: DiagnosticReport) -> Self {
        Resource::DiagnosticReport(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Document,
    Message,
    Transaction,
    Batch,
    Searchset,
    #[default]
    Collection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleEntry {
    pub resource: Resource,
}

/// Ordered container of resources; one entry per resource, no dedup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "resourceType", rename = "Bundle")]
pub struct Bundle {
    #[serde(rename = "type")]
    pub bundle_type: BundleType,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    pub fn new(bundle_type: BundleType) -> Self {
        Self {
            bundle_type,
            entry: Vec::new(),
        }
    }

    /// Wraps `resources` in input order.
    pub fn assemble<I, R>(bundle_type: BundleType, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Resource>,
    {
        let mut bundle = Self::new(bundle_type);
        bundle.extend(resources);
        bundle
    }

    pub fn collection<I, R>(resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Resource>,
    {
        Self::assemble(BundleType::Collection, resources)
    }

    pub fn push(&mut self, resource: impl Into<Resource>) {
        self.entry.push(BundleEntry {
            resource: resource.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().map(|entry| &entry.resource)
    }
}

impl<R: Into<Resource>> Extend<R> for Bundle {
    fn extend<T: IntoIterator<Item = R>>(&mut self, iter: T) {
        self.entry.extend(iter.into_iter().map(|resource| BundleEntry {
            resource: resource.into(),
        }));
    }
}

/// Errors raised while mapping a delimited export.
///
/// Line numbers are 1-based positions in the source file (the header is line 1).
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("line {line}: expected at least {expected} fields, found {found}")]
    MalformedRecord {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: {field} {value:?} does not match {pattern}")]
    DateFormat {
        line: u64,
        field: &'static str,
        value: String,
        pattern: &'static str,
    },
    #[error("line {line}: {field} {value:?} is not a number")]
    InvalidNumber {
        line: u64,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: period ends at {end} before it starts at {start}")]
    InvalidPeriod {
        line: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("line {line}: {message}")]
    Delimited { line: u64, message: String },
    #[error("{format} exports carry no {entity} records")]
    Unsupported {
        format: &'static str,
        entity: &'static str,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding failed: {0}")]
    Encode(String),
}

impl MapperError {
    /// Source line of a record-level failure.
    pub fn line(&self) -> Option<u64> {
        match self {
            MapperError::MalformedRecord { line, .. }
            | MapperError::DateFormat { line, .. }
            | MapperError::InvalidNumber { line, .. }
            | MapperError::InvalidPeriod { line, .. }
            | MapperError::Delimited { line, .. } => Some(*line),
            MapperError::Unsupported { .. } | MapperError::Io(_) | MapperError::Encode(_) => None,
        }
    }

    /// True for failures confined to one source line.
    pub fn is_record_level(&self) -> bool {
        self.line().is_some()
    }
}

pub type MapperResult<T> = Result<T, MapperError>;

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
