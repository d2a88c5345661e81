//! CSV export of a live session.
//!
//! The file starts with a UTF-8 byte-order mark so spreadsheet tools pick the
//! right encoding, uses the [`HEADER`] columns, and labels each row with the
//! nearest marker inside the export tolerance. Exports can be fed straight back
//! into [`AnalysisEngine`](crate::analysis::AnalysisEngine).

use crate::analysis::csv_row::HEADER;
use crate::correlate::nearest_marker;
use crate::data::{MetricsSnapshot, StoreSnapshot};
use crate::error::AppResult;
use crate::measurement_types::{Marker, TimestampMs};
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Time column format.
pub const TIME_FORMAT: &str = "%Y%m%d %H:%M:%S";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn format_time<Tz>(tz: &Tz, timestamp_ms: TimestampMs) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// Write `metrics` as CSV to `writer`, returning the number of data rows.
pub fn export_recording<W, Tz>(
    mut writer: W,
    metrics: &MetricsSnapshot,
    markers: &[Marker],
    tz: &Tz,
    marker_tolerance_ms: i64,
) -> AppResult<usize>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    writer.write_all(UTF8_BOM)?;

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;

    for sample in metrics.samples() {
        let label = nearest_marker(markers, sample.timestamp_ms, marker_tolerance_ms)
            .map(|m| m.label.as_str())
            .unwrap_or_default();
        csv.write_record([
            format_time(tz, sample.timestamp_ms),
            sample.cpu.to_string(),
            sample.gpu.to_string(),
            sample.fps.to_string(),
            sample.jank.to_string(),
            sample.stutter_pct.to_string(),
            sample.memory_mb.to_string(),
            sample.battery_temp_c.to_string(),
            sample.network_rx_kb.to_string(),
            sample.network_tx_kb.to_string(),
            label.to_string(),
        ])?;
    }
    csv.flush()?;

    tracing::debug!(rows = metrics.len(), markers = markers.len(), "Recording exported");
    Ok(metrics.len())
}

/// Export a session snapshot to a file at `path`.
pub fn write_recording<P, Tz>(
    path: P,
    snapshot: &StoreSnapshot,
    tz: &Tz,
    marker_tolerance_ms: i64,
) -> AppResult<usize>
where
    P: AsRef<Path>,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let path = path.as_ref();
    let file = BufWriter::new(File::create(path)?);
    let rows = export_recording(file, &snapshot.metrics, &snapshot.markers, tz, marker_tolerance_ms)?;
    tracing::info!(path = %path.display(), rows, "Recording written");
    Ok(rows)
}

/// File name for a recording started at `started_at`: `{millis}_{target}.csv`,
/// with `unknown` standing in for a missing target.
#[must_use]
pub fn recording_file_name(started_at: DateTime<Utc>, target: Option<&str>) -> String {
    let target: String = target
        .filter(|t| !t.is_empty())
        .unwrap_or("unknown")
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    format!("{}_{}.csv", started_at.timestamp_millis(), target)
}
