//! Per-file mapping: records in, one batch of resources out.

use std::io::Read;

use mapper_core::{
    Bundle, BundleType, DiagnosticReport, Encounter, MapperConfig, MapperError, MapperResult,
    Observation, Patient, Resource,
};
use tracing::{info, warn};

use crate::aggregate::ReportAggregator;
use crate::build;
use crate::codes::CodeTables;
use crate::index::{LinkIndex, Linkage, SkipLedger};
use crate::record::{read_records, Delimiter, FieldLayout, Record};
use crate::{EntityKind, SourceFormat};

/// Resources mapped from one file, in source order.
#[derive(Debug)]
pub struct Batch<T> {
    pub resources: Vec<T>,
    /// Dependent records dropped for a missing parent.
    pub skipped: SkipLedger,
    /// Malformed lines passed over when recovery is enabled.
    pub recovered: Vec<MapperError>,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            resources: Vec::new(),
            skipped: SkipLedger::default(),
            recovered: Vec::new(),
        }
    }
}

impl<T: Into<Resource>> Batch<T> {
    pub fn into_resources(self) -> Batch<Resource> {
        Batch {
            resources: self.resources.into_iter().map(Into::into).collect(),
            skipped: self.skipped,
            recovered: self.recovered,
        }
    }

    pub fn into_bundle(self, bundle_type: BundleType) -> Bundle {
        Bundle::assemble(bundle_type, self.resources)
    }
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Appends another batch of the same entity after this one.
    pub fn merge(&mut self, other: Batch<T>) {
        self.resources.extend(other.resources);
        self.skipped.merge(other.skipped);
        self.recovered.extend(other.recovered);
    }
}

/// Maps the files of one source format.
///
/// Parents must be mapped before dependents: for indexed formats, patients
/// and encounters register in the [`LinkIndex`] that observations and
/// reports read.
#[derive(Debug, Clone)]
pub struct Mapper {
    format: SourceFormat,
    config: MapperConfig,
    tables: CodeTables,
}

impl Mapper {
    pub fn new(format: SourceFormat, config: MapperConfig, tables: CodeTables) -> Self {
        Self {
            format,
            config,
            tables,
        }
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn map<R: Read>(
        &self,
        entity: EntityKind,
        input: R,
        delimiter: Delimiter,
        index: &mut LinkIndex,
    ) -> MapperResult<Batch<Resource>> {
        match entity {
            EntityKind::Patient => self
                .map_patients(input, delimiter, index)
                .map(Batch::into_resources),
            EntityKind::Encounter => self
                .map_encounters(input, delimiter, index)
                .map(Batch::into_resources),
            EntityKind::Observation => self
                .map_observations(input, delimiter, index)
                .map(Batch::into_resources),
            EntityKind::DiagnosticReport => self
                .map_diagnostic_reports(input, delimiter, index)
                .map(Batch::into_resources),
        }
    }

    /// Maps patients and, for indexed formats, registers each under its
    /// source id.
    ///
    /// Registrations reach `index` only when the whole file maps, so a
    /// failed file leaves no parent behind for dependents to reference.
    pub fn map_patients<R: Read>(
        &self,
        input: R,
        delimiter: Delimiter,
        index: &mut LinkIndex,
    ) -> MapperResult<Batch<Patient>> {
        let layout = self.format.patient_layout();
        let indexed = self.format.linkage() == Linkage::Indexed;
        let mut pending = LinkIndex::new();
        let mut batch = Batch::default();
        self.each_record(input, delimiter, layout.fields, &mut batch.recovered, |record| {
            let patient = build::build_patient(&record, layout, &self.tables)?;
            if indexed {
                pending.register_patient(record.get(layout.id), patient.clone());
            }
            batch.resources.push(patient);
            Ok(())
        })?;
        index.absorb(pending);
        self.log_batch(EntityKind::Patient, &batch);
        Ok(batch)
    }

    /// Maps encounters whose patient resolves. Registration follows
    /// [`Mapper::map_patients`].
    pub fn map_encounters<R: Read>(
        &self,
        input: R,
        delimiter: Delimiter,
        index: &mut LinkIndex,
    ) -> MapperResult<Batch<Encounter>> {
        let layout = self.format.encounter_layout();
        let linkage = self.format.linkage();
        let mut pending = LinkIndex::new();
        let mut batch = Batch::default();
        let Batch {
            resources,
            skipped,
            recovered,
        } = &mut batch;
        self.each_record(input, delimiter, layout.fields, recovered, |record| {
            let subject = match linkage.subject(index, record.get(layout.patient)) {
                Ok(subject) => subject,
                Err(missing) => {
                    skipped.record(record.line(), missing);
                    return Ok(());
                }
            };
            let encounter = build::build_encounter(&record, layout, subject)?;
            if linkage == Linkage::Indexed {
                pending.register_encounter(record.get(layout.id), encounter.clone());
            }
            resources.push(encounter);
            Ok(())
        })?;
        index.absorb(pending);
        self.log_batch(EntityKind::Encounter, &batch);
        Ok(batch)
    }

    pub fn map_observations<R: Read>(
        &self,
        input: R,
        delimiter: Delimiter,
        index: &LinkIndex,
    ) -> MapperResult<Batch<Observation>> {
        let layout = self.format.observation_layout();
        let linkage = self.format.linkage();
        let mut batch = Batch::default();
        let Batch {
            resources,
            skipped,
            recovered,
        } = &mut batch;
        self.each_record(input, delimiter, layout.fields, recovered, |record| {
            let parents = linkage
                .subject(index, record.get(layout.patient))
                .and_then(|subject| {
                    linkage
                        .encounter(index, record.get(layout.encounter))
                        .map(|encounter| (subject, encounter))
                });
            match parents {
                Ok((subject, encounter)) => {
                    resources.push(build::build_observation(&record, layout, subject, encounter)?);
                }
                Err(missing) => skipped.record(record.line(), missing),
            }
            Ok(())
        })?;
        self.log_batch(EntityKind::Observation, &batch);
        Ok(batch)
    }

    /// One report per encounter key, in first-seen order.
    pub fn map_diagnostic_reports<R: Read>(
        &self,
        input: R,
        delimiter: Delimiter,
        index: &LinkIndex,
    ) -> MapperResult<Batch<DiagnosticReport>> {
        let layout = self
            .format
            .diagnostic_report_layout()
            .ok_or(MapperError::Unsupported {
                format: self.format.name(),
                entity: EntityKind::DiagnosticReport.label(),
            })?;
        let mut aggregator = ReportAggregator::new(layout, self.format.linkage(), index);
        let mut recovered = Vec::new();
        self.each_record(input, delimiter, layout.fields, &mut recovered, |record| {
            aggregator.add(&record)
        })?;

        let (resources, skipped) = aggregator.finish();
        let batch = Batch {
            resources,
            skipped,
            recovered,
        };
        self.log_batch(EntityKind::DiagnosticReport, &batch);
        Ok(batch)
    }

    /// Feeds every conforming record to `handle`.
    ///
    /// A record-level failure aborts the file unless malformed records are
    /// skipped, in which case it is logged and collected in `recovered`.
    fn each_record<R, F>(
        &self,
        input: R,
        delimiter: Delimiter,
        layout: FieldLayout,
        recovered: &mut Vec<MapperError>,
        mut handle: F,
    ) -> MapperResult<()>
    where
        R: Read,
        F: FnMut(Record) -> MapperResult<()>,
    {
        for row in read_records(input, delimiter) {
            let outcome = row
                .and_then(|record| record.conform(layout))
                .and_then(&mut handle);
            match outcome {
                Ok(()) => {}
                Err(err) if self.config.skip_malformed_records && err.is_record_level() => {
                    warn!(line = err.line(), error = %err, "skipping malformed record");
                    recovered.push(err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn log_batch<T>(&self, entity: EntityKind, batch: &Batch<T>) {
        info!(
            format = self.format.name(),
            entity = entity.label(),
            mapped = batch.len(),
            skipped = batch.skipped.len(),
            recovered = batch.recovered.len(),
            "mapped file"
        );
    }
}
