use mapper_core::{
    Address, Extension, ExtensionValue, HumanName, Identifier, MapperResult, Meta, NameUse,
    Patient,
};

use crate::codes::{
    self, extension_url, uri, CodeTables, Ethnicity, IdentifierType, Race,
};
use crate::layout::{PatientIdentifiers, PatientLayout};
use crate::record::Record;

const COUNTRY: &str = "USA";

pub fn build_patient(
    record: &Record,
    layout: &PatientLayout,
    tables: &CodeTables,
) -> MapperResult<Patient> {
    let line = record.line();
    let birth_date = layout
        .dates
        .date(record.get(layout.birth_date), line, "BIRTHDATE")?;
    let deceased_date_time = match optional(record, layout.death_date) {
        "" => None,
        value => Some(layout.dates.date(value, line, "DEATHDATE")?),
    };

    let gender_value = record.get(layout.gender);
    let mut extension = Vec::new();
    if let Some(column) = layout.race {
        extension.push(race_extension(Race::from_source(record.get(column))));
    }
    if let Some(column) = layout.ethnicity {
        extension.push(ethnicity_extension(Ethnicity::from_source(
            record.get(column),
        )));
    }
    if layout.identifiers == PatientIdentifiers::Synthea {
        extension.push(Extension::with_value(
            extension_url::US_CORE_BIRTHSEX,
            ExtensionValue::Code(codes::birth_sex_code(gender_value).to_string()),
        ));
    }

    Ok(Patient {
        meta: Some(Meta::profile(layout.profile)),
        extension,
        identifier: identifiers(record, layout),
        name: names(record, layout),
        gender: codes::administrative_gender(gender_value),
        birth_date,
        deceased_date_time,
        address: vec![address(record, layout, tables)],
        marital_status: layout
            .marital
            .map(|column| codes::marital_status(record.get(column))),
    })
}

fn optional(record: &Record, column: Option<usize>) -> &str {
    column.map_or("", |column| record.get(column))
}

fn identifiers(record: &Record, layout: &PatientLayout) -> Vec<Identifier> {
    let id = record.get(layout.id);
    match layout.identifiers {
        PatientIdentifiers::CernerPerson => vec![Identifier {
            kind: Some(
                IdentifierType::PatientInternalIdentifier
                    .concept(&[IdentifierType::MedicalRecordNumber]),
            ),
            system: uri::CERNER_PERSON.to_string(),
            value: id.to_string(),
        }],
        PatientIdentifiers::Synthea => {
            let mut identifiers = vec![
                Identifier {
                    kind: None,
                    system: uri::SYNTHEA_IDENTIFIER.to_string(),
                    value: id.to_string(),
                },
                typed(IdentifierType::MedicalRecordNumber, uri::SMART_HOSPITAL, id),
            ];
            let optional_ids = [
                (layout.ssn, IdentifierType::SocialSecurityNumber, uri::US_SSN),
                (
                    layout.drivers,
                    IdentifierType::DriversLicenseNumber,
                    uri::DRIVERS_LICENSE,
                ),
                (layout.passport, IdentifierType::PassportNumber, uri::PASSPORT),
            ];
            for (column, kind, system) in optional_ids {
                let value = optional(record, column);
                if !value.is_empty() {
                    identifiers.push(typed(kind, system, value));
                }
            }
            identifiers
        }
    }
}

fn typed(kind: IdentifierType, system: &str, value: &str) -> Identifier {
    Identifier {
        kind: Some(kind.concept(&[])),
        system: system.to_string(),
        value: value.to_string(),
    }
}

fn names(record: &Record, layout: &PatientLayout) -> Vec<HumanName> {
    let name = |name_use, family: &str| HumanName {
        name_use,
        family: present(family),
        given: present(record.get(layout.given)).into_iter().collect(),
        prefix: present(optional(record, layout.prefix)).into_iter().collect(),
        suffix: present(optional(record, layout.suffix)).into_iter().collect(),
    };

    let mut names = vec![name(NameUse::Official, record.get(layout.family))];
    let maiden = optional(record, layout.maiden);
    if !maiden.is_empty() {
        names.push(name(NameUse::Maiden, maiden));
    }
    names
}

fn address(record: &Record, layout: &PatientLayout, tables: &CodeTables) -> Address {
    Address {
        line: present(record.get(layout.address)).into_iter().collect(),
        city: present(record.get(layout.city)),
        state: tables
            .states()
            .abbreviation(record.get(layout.state))
            .map(str::to_string),
        postal_code: present(record.get(layout.zip)),
        country: Some(COUNTRY.to_string()),
    }
}

fn race_extension(race: Race) -> Extension {
    Extension::nested(
        extension_url::US_CORE_RACE,
        vec![
            Extension::with_value("ombCategory", ExtensionValue::Coding(race.omb_coding())),
            Extension::with_value("text", ExtensionValue::String(race.display().to_string())),
        ],
    )
}

fn ethnicity_extension(ethnicity: Ethnicity) -> Extension {
    Extension::nested(
        extension_url::US_CORE_ETHNICITY,
        vec![
            Extension::with_value(
                "ombCategory",
                ExtensionValue::Coding(ethnicity.omb_coding()),
            ),
            Extension::with_value(
                "text",
                ExtensionValue::String(ethnicity.display().to_string()),
            ),
        ],
    )
}

fn present(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
