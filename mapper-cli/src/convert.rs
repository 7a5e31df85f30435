//! Converts every recognised export in a directory, parents first, and
//! writes one bundle per entity type.

use std::collections::BTreeMap;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use mapper_core::Resource;
use mapper_fhir::{Batch, Delimiter, DocumentEncoder, EntityKind, JsonEncoder, LinkIndex, Mapper};
use tracing::{error, info, warn};

/// A recognised export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub entity: EntityKind,
    pub delimiter: Delimiter,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub entity: EntityKind,
    pub mapped: usize,
    pub skipped: usize,
    pub recovered: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBundle {
    pub entity: EntityKind,
    pub path: PathBuf,
    pub entries: usize,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
    /// Files whose entity the source format does not carry.
    pub ignored: Vec<PathBuf>,
    pub bundles: Vec<WrittenBundle>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// `.csv`/`.tsv` files of `dir` whose name selects an entity, in
/// dependency order and then by path.
pub fn discover_inputs(dir: &Path) -> anyhow::Result<Vec<InputFile>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))?;

    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("cannot list {}", dir.display()))?
            .path();
        if !path.is_file() {
            continue;
        }
        let entity = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(EntityKind::from_file_name);
        match (entity, Delimiter::from_path(&path)) {
            (Some(entity), Some(delimiter)) => inputs.push(InputFile {
                entity,
                delimiter,
                path,
            }),
            _ => tracing::debug!(file = %path.display(), "not an export, ignoring"),
        }
    }
    inputs.sort_by(|a, b| (a.entity, &a.path).cmp(&(b.entity, &b.path)));
    Ok(inputs)
}

/// Maps every export under `input` and writes the bundles into `output`.
///
/// A file that fails contributes nothing and is listed in
/// [`RunSummary::failures`]; the remaining files still convert.
pub fn convert_directory(
    mapper: &Mapper,
    input: &Path,
    output: &Path,
) -> anyhow::Result<RunSummary> {
    ensure_directory(input, "input")?;
    ensure_directory(output, "output")?;

    let format = mapper.format();
    let mut summary = RunSummary::default();
    let mut index = LinkIndex::new();
    let mut batches: BTreeMap<EntityKind, Batch<Resource>> = BTreeMap::new();

    for file in discover_inputs(input)? {
        if !format.supports(file.entity) {
            warn!(
                file = %file.path.display(),
                format = format.name(),
                "format carries no {} records, skipping file",
                file.entity.label()
            );
            summary.ignored.push(file.path);
            continue;
        }

        match map_file(mapper, &file, &mut index) {
            Ok(batch) => {
                summary.files.push(FileReport {
                    path: file.path.clone(),
                    entity: file.entity,
                    mapped: batch.len(),
                    skipped: batch.skipped.len(),
                    recovered: batch.recovered.len(),
                });
                batches.entry(file.entity).or_default().merge(batch);
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(file = %file.path.display(), error = %message, "file failed");
                summary.failures.push(FileFailure {
                    path: file.path,
                    error: message,
                });
            }
        }
    }

    let bundle_type = mapper.config().bundle_type;
    let encoder = JsonEncoder::new(mapper.config().pretty_print);
    for (entity, batch) in batches {
        let bundle = batch.into_bundle(bundle_type);
        let path = output.join(entity.bundle_file_name());
        let document = encoder.encode_bundle(&bundle)?;
        fs::write(&path, document)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!(file = %path.display(), entries = bundle.len(), "wrote bundle");
        summary.bundles.push(WrittenBundle {
            entity,
            path,
            entries: bundle.len(),
        });
    }

    Ok(summary)
}

fn map_file(
    mapper: &Mapper,
    file: &InputFile,
    index: &mut LinkIndex,
) -> anyhow::Result<Batch<Resource>> {
    let handle = fs::File::open(&file.path)
        .with_context(|| format!("cannot open {}", file.path.display()))?;
    let batch = mapper
        .map(file.entity, BufReader::new(handle), file.delimiter, index)
        .with_context(|| format!("cannot map {}", file.path.display()))?;
    Ok(batch)
}

fn ensure_directory(path: &Path, role: &str) -> anyhow::Result<()> {
    if !path.exists() {
        bail!("{role} directory {} does not exist", path.display());
    }
    if !path.is_dir() {
        bail!("{role} path {} is not a directory", path.display());
    }
    Ok(())
}
