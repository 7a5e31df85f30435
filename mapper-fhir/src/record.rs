//! Positional records read from delimited exports.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use mapper_core::{MapperError, MapperResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    /// `.csv` is comma separated, `.tsv` tab separated; anything else is not an export.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Delimiter::Comma),
            "tsv" => Some(Delimiter::Tab),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

/// What to do with a row that has fewer fields than its layout needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortRows {
    Reject,
    /// Missing trailing fields read as empty strings.
    Pad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Highest referenced column index plus one.
    pub width: usize,
    pub short_rows: ShortRows,
}

impl FieldLayout {
    pub const fn strict(width: usize) -> Self {
        Self {
            width,
            short_rows: ShortRows::Reject,
        }
    }

    pub const fn padded(width: usize) -> Self {
        Self {
            width,
            short_rows: ShortRows::Pad,
        }
    }
}

/// One data line of an export, fields trimmed.
#[derive(Debug, Clone)]
pub struct Record {
    line: u64,
    fields: StringRecord,
}

impl Record {
    pub fn from_fields<I, T>(line: u64, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut record = StringRecord::new();
        for field in fields {
            record.push_field(field.as_ref().trim());
        }
        Self {
            line,
            fields: record,
        }
    }

    /// 1-based source line; the header is line 1.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field at `index`, or `""` past the end of the row.
    pub fn get(&self, index: usize) -> &str {
        self.fields.get(index).unwrap_or("")
    }

    /// Checks the row against `layout`, padding short rows where allowed.
    pub fn conform(mut self, layout: FieldLayout) -> MapperResult<Self> {
        let found = self.fields.len();
        if found >= layout.width {
            return Ok(self);
        }
        match layout.short_rows {
            ShortRows::Reject => Err(MapperError::MalformedRecord {
                line: self.line,
                expected: layout.width,
                found,
            }),
            ShortRows::Pad => {
                for _ in found..layout.width {
                    self.fields.push_field("");
                }
                Ok(self)
            }
        }
    }
}

/// Data rows of `input`; the first line is taken as the header and skipped.
///
/// Rows may be ragged. Quoting is honoured for comma-separated input only.
pub fn read_records<R: Read>(
    input: R,
    delimiter: Delimiter,
) -> impl Iterator<Item = MapperResult<Record>> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Fields)
        .delimiter(delimiter.as_byte())
        .quoting(delimiter == Delimiter::Comma)
        .from_reader(input)
        .into_records()
        .map(|row| {
            let fields = row.map_err(delimited_error)?;
            let line = fields.position().map_or(0, |pos| pos.line());
            Ok(Record { line, fields })
        })
}

fn delimited_error(err: csv::Error) -> MapperError {
    let line = err.position().map_or(0, |pos| pos.line());
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io) => MapperError::Io(io),
        _ => MapperError::Delimited { line, message },
    }
}
