use mapper_core::{
    CodeableConcept, Coding, MapperError, MapperResult, Meta, Observation, ObservationComponent,
    ObservationStatus, ObservationValue, Quantity, Reference,
};

use super::coded;
use crate::codes::uri;
use crate::layout::{CategorySource, ObservationLayout};
use crate::record::Record;

/// Source tag that selects a component's `value[x]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Numeric,
    Text,
    /// Any other tag; the component carries no value.
    Untyped,
}

impl ValueType {
    pub fn from_source(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "numeric" => ValueType::Numeric,
            "text" => ValueType::Text,
            _ => ValueType::Untyped,
        }
    }
}

pub fn build_observation(
    record: &Record,
    layout: &ObservationLayout,
    subject: Reference,
    encounter: Reference,
) -> MapperResult<Observation> {
    let line = record.line();
    let effective = layout.dates.instant(record.get(layout.date), line, "DATE")?;
    let code = coded(
        layout.code_system,
        record.get(layout.code),
        record.get(layout.description),
    );
    let value = component_value(
        ValueType::from_source(record.get(layout.value_type)),
        record.get(layout.value),
        record.get(layout.units),
        line,
    )?;

    let category = match layout.category {
        CategorySource::Laboratory => {
            Coding::new(uri::OBSERVATION_CATEGORY, "laboratory", "Laboratory")
        }
        CategorySource::Column(column) => {
            let category = record.get(column);
            Coding::new(uri::OBSERVATION_CATEGORY, category, category)
        }
    };

    Ok(Observation {
        meta: layout.profile.map(Meta::profile),
        status: ObservationStatus::Final,
        category: vec![CodeableConcept::from(category)],
        component: vec![ObservationComponent {
            code: code.clone(),
            value,
        }],
        code,
        subject,
        encounter,
        effective_date_time: effective,
        issued: layout.issued_from_effective.then_some(effective),
    })
}

/// Typed component value; a numeric tag with a non-numeric or non-finite
/// value is an error.
pub fn component_value(
    value_type: ValueType,
    value: &str,
    unit: &str,
    line: u64,
) -> MapperResult<Option<ObservationValue>> {
    match value_type {
        ValueType::Numeric => {
            let number = value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .ok_or_else(|| MapperError::InvalidNumber {
                    line,
                    field: "VALUE",
                    value: value.to_string(),
                })?;
            let unit = (!unit.is_empty()).then(|| unit.to_string());
            Ok(Some(ObservationValue::Quantity(Quantity {
                value: number,
                unit: unit.clone(),
                system: uri::UCUM.to_string(),
                code: unit,
            })))
        }
        ValueType::Text => Ok(Some(ObservationValue::Text(value.to_string()))),
        ValueType::Untyped => Ok(None),
    }
}
