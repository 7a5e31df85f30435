//! One builder per entity type, each reading its columns through the
//! format's layout. Builders do no I/O and take resolved parent references
//! from the caller.

mod diagnostic_report;
mod encounter;
mod observation;
mod patient;

pub use diagnostic_report::{build_report_header, result_reference};
pub use encounter::build_encounter;
pub use observation::{build_observation, component_value, ValueType};
pub use patient::build_patient;

use mapper_core::{CodeableConcept, Coding};

use crate::codes::system_uri;

/// Concept with a single coding under the resolved `system` name.
fn coded(system: &str, code: &str, display: &str) -> CodeableConcept {
    CodeableConcept::from(Coding::new(system_uri(system), code, display))
}
