//! Row codec for recorded CSV files.
//!
//! Column order: `Time, CPU, GPU, FPS, Jank, Stutter, Memory, Battery, Rx, Tx`,
//! optionally followed by a `Label` column which is ignored here. The time
//! column is kept verbatim as a display label.

use crate::error::AppResult;
use csv::{ErrorKind, ReaderBuilder, StringRecord, Trim};
use std::io::Read;

/// Rows with fewer fields than this are skipped.
pub const MIN_FIELDS: usize = 8;

/// Column headers written by exports and recognized on import.
pub const HEADER: [&str; 11] = [
    "Time", "CPU", "GPU", "FPS", "Jank", "Stutter", "Memory", "Battery", "Rx", "Tx", "Label",
];

const BOM: char = '\u{feff}';

/// One parsed data row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvRow {
    /// Time label as written in the file.
    pub time: String,
    /// CPU %.
    pub cpu: f64,
    /// GPU %.
    pub gpu: f64,
    /// Frames per second.
    pub fps: f64,
    /// Jank frame count.
    pub jank: f64,
    /// Stutter %.
    pub stutter: f64,
    /// Memory in MB.
    pub memory: f64,
    /// Battery temperature in °C.
    pub battery: f64,
    /// Download rate in KB/s.
    pub rx: f64,
    /// Upload rate in KB/s.
    pub tx: f64,
}

/// Lenient number parsing: anything unparseable or non-finite reads as 0.
fn number(field: Option<&str>) -> f64 {
    field
        .and_then(|f| f.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

impl CsvRow {
    /// Parse one record, or `None` when it has fewer than [`MIN_FIELDS`] fields.
    #[must_use]
    pub fn from_record(record: &StringRecord) -> Option<Self> {
        if record.len() < MIN_FIELDS {
            return None;
        }
        let field = |i: usize| record.get(i);
        Some(Self {
            time: field(0).unwrap_or_default().trim_start_matches(BOM).to_string(),
            cpu: number(field(1)),
            gpu: number(field(2)),
            fps: number(field(3)),
            jank: number(field(4)),
            stutter: number(field(5)),
            memory: number(field(6)),
            battery: number(field(7)),
            rx: number(field(8)),
            tx: number(field(9)),
        })
    }
}

/// Whether the first record of a file is a header row.
#[must_use]
pub fn is_header(record: &StringRecord) -> bool {
    record.get(0).is_some_and(|first| {
        let first = first.trim_start_matches(BOM).to_lowercase();
        first.contains("time") || first.contains("时间")
    })
}

/// Read every valid data row from a recording.
///
/// Short rows and rows that are not valid UTF-8 are skipped; only I/O failures
/// are errors.
pub fn read_rows<R: Read>(reader: R) -> AppResult<Vec<CsvRow>> {
    let mut csv = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (index, result) in csv.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if matches!(e.kind(), ErrorKind::Io(_)) => return Err(e.into()),
            Err(e) => {
                tracing::debug!(row = index, error = %e, "Skipping unreadable row");
                skipped += 1;
                continue;
            }
        };
        if index == 0 && is_header(&record) {
            continue;
        }
        match CsvRow::from_record(&record) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, kept = rows.len(), "Skipped malformed rows");
    }
    Ok(rows)
}
