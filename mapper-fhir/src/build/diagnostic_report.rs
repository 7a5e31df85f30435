use mapper_core::{
    Coding, CodeableConcept, DiagnosticReport, DiagnosticReportStatus, MapperResult, Reference,
};

use super::coded;
use crate::codes::uri;
use crate::layout::DiagnosticReportLayout;
use crate::record::Record;

/// Report built from the first row seen for an encounter, `result` still empty.
pub fn build_report_header(
    record: &Record,
    layout: &DiagnosticReportLayout,
    subject: Reference,
    encounter: Reference,
) -> MapperResult<DiagnosticReport> {
    let line = record.line();
    let issued = layout.dates.instant(record.get(layout.issued), line, "ISSUED")?;
    let effective = layout
        .dates
        .instant(record.get(layout.effective), line, "EFFECTIVE")?;

    Ok(DiagnosticReport {
        status: DiagnosticReportStatus::Final,
        category: vec![CodeableConcept::from(Coding::new(
            uri::DIAGNOSTIC_SERVICE_SECTION,
            record.get(layout.category_code),
            record.get(layout.category_display),
        ))],
        code: coded(
            layout.code_system,
            record.get(layout.code),
            record.get(layout.code_display),
        ),
        subject,
        encounter,
        effective_date_time: effective,
        issued,
        result: Vec::new(),
    })
}

/// The observation a report row points at, copied as given.
pub fn result_reference(record: &Record, layout: &DiagnosticReportLayout) -> Reference {
    Reference::with_display(
        record.get(layout.observation),
        record.get(layout.observation_display),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceFormat;

    #[test]
    fn header_reads_category_and_code() {
        let layout = SourceFormat::Cerner.diagnostic_report_layout().unwrap();
        let record = Record::from_fields(
            2,
            [
                "03/02/2021 10:00:00 AM",
                "03/01/2021 09:00:00 AM",
                "P1",
                "E1",
                "Observation/O1",
                "Glucose",
                "LAB",
                "Laboratory",
                "24323-8",
                "Comprehensive metabolic panel",
            ],
        );
        let report = build_report_header(
            &record,
            layout,
            Reference::new("Patient/P1"),
            Reference::new("Encounter/E1"),
        )
        .unwrap();

        let category = &report.category[0].coding[0];
        assert_eq!(category.system.as_deref(), Some(uri::DIAGNOSTIC_SERVICE_SECTION));
        assert_eq!(category.code.as_deref(), Some("LAB"));
        assert_eq!(report.code.coding[0].system.as_deref(), Some(uri::LOINC));
        assert_eq!(report.status, DiagnosticReportStatus::Final);
        assert!(report.result.is_empty());
        assert!(report.issued > report.effective_date_time);

        let result = result_reference(&record, layout);
        assert_eq!(result.reference, "Observation/O1");
        assert_eq!(result.display.as_deref(), Some("Glucose"));
    }
}
