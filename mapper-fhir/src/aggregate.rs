//! Folds diagnostic-report rows into one report per encounter.

use std::collections::HashMap;

use mapper_core::{DiagnosticReport, MapperResult, Reference};

use crate::build::{build_report_header, result_reference};
use crate::index::{LinkIndex, Linkage, SkipLedger};
use crate::layout::DiagnosticReportLayout;
use crate::record::Record;

/// Groups rows by encounter key in arrival order.
///
/// The first row of a key supplies the report header; every resolved row
/// adds one `result` reference. Reports come out in first-seen order.
pub struct ReportAggregator<'a> {
    layout: &'a DiagnosticReportLayout,
    linkage: Linkage,
    index: &'a LinkIndex,
    positions: HashMap<String, usize>,
    headers: Vec<DiagnosticReport>,
    results: Vec<Vec<Reference>>,
    skipped: SkipLedger,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(layout: &'a DiagnosticReportLayout, linkage: Linkage, index: &'a LinkIndex) -> Self {
        Self {
            layout,
            linkage,
            index,
            positions: HashMap::new(),
            headers: Vec::new(),
            results: Vec::new(),
            skipped: SkipLedger::default(),
        }
    }

    /// Rows whose patient or encounter cannot be resolved go to the ledger.
    pub fn add(&mut self, record: &Record) -> MapperResult<()> {
        let patient_key = record.get(self.layout.patient);
        let encounter_key = record.get(self.layout.encounter);

        let subject = match self.linkage.subject(self.index, patient_key) {
            Ok(subject) => subject,
            Err(missing) => {
                self.skipped.record(record.line(), missing);
                return Ok(());
            }
        };
        let encounter = match self.linkage.encounter(self.index, encounter_key) {
            Ok(encounter) => encounter,
            Err(missing) => {
                self.skipped.record(record.line(), missing);
                return Ok(());
            }
        };

        let position = match self.positions.get(encounter_key) {
            Some(&position) => position,
            None => {
                let header = build_report_header(record, self.layout, subject, encounter)?;
                let position = self.headers.len();
                self.headers.push(header);
                self.results.push(Vec::new());
                self.positions.insert(encounter_key.to_string(), position);
                position
            }
        };
        self.results[position].push(result_reference(record, self.layout));
        Ok(())
    }

    pub fn report_count(&self) -> usize {
        self.headers.len()
    }

    pub fn finish(self) -> (Vec<DiagnosticReport>, SkipLedger) {
        let reports = self
            .headers
            .into_iter()
            .zip(self.results)
            .map(|(mut report, results)| {
                report.result = results;
                report
            })
            .collect();
        (reports, self.skipped)
    }
}
