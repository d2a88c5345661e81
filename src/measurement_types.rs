//! Measurement and event types shared by the session manager, the store and export.
//!
//! All timestamps are milliseconds since the UNIX epoch, as stamped by the
//! device-side producer. They are kept in construction order and never
//! re-sorted, so producer clock skew shows up as-is in the history.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since the UNIX epoch.
pub type TimestampMs = i64;

/// Per-heap breakdown of the target process' memory, in MB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryBreakdown {
    /// Java/ART heap.
    pub java: f64,
    /// Native heap.
    pub native: f64,
    /// Graphics buffers.
    pub graphics: f64,
    /// Mapped code.
    pub code: f64,
    /// Thread stacks.
    pub stack: f64,
}

/// One tick of every metric channel for the monitored application.
///
/// Samples are immutable once built; the history stores each field in its own
/// column but always appends and evicts a whole sample at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Producer timestamp.
    pub timestamp_ms: TimestampMs,
    /// Package the producer attributed the sample to, if any.
    pub package: Option<String>,
    /// CPU usage in percent.
    pub cpu: f64,
    /// GPU usage in percent.
    pub gpu: f64,
    /// Frames rendered during the last second.
    pub fps: f64,
    /// Janky frames during the last second.
    pub jank: u32,
    /// Stutter rate in percent, as reported by the producer.
    pub stutter_pct: f64,
    /// Total memory (PSS) in MB.
    pub memory_mb: f64,
    /// Optional per-heap split of `memory_mb`.
    pub memory_breakdown: Option<MemoryBreakdown>,
    /// Battery temperature in °C.
    pub battery_temp_c: f64,
    /// Network receive rate in KB/s.
    pub network_rx_kb: f64,
    /// Network transmit rate in KB/s.
    pub network_tx_kb: f64,
}

impl Sample {
    /// A sample at `timestamp_ms` with every channel at zero.
    #[must_use]
    pub fn at(timestamp_ms: TimestampMs) -> Self {
        Self {
            timestamp_ms,
            ..Self::default()
        }
    }
}

/// User-placed annotation on the time axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// When the marker was placed.
    pub timestamp_ms: TimestampMs,
    /// Free-form label shown on charts and in exports.
    pub label: String,
}

impl Marker {
    /// Build a marker.
    pub fn new(timestamp_ms: TimestampMs, label: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            label: label.into(),
        }
    }
}

/// Device screenshot captured by the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    /// Capture time.
    pub timestamp_ms: TimestampMs,
    /// Opaque reference to the image (usually a URL path served by the producer).
    pub url: String,
}

/// Severity of a device log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Logcat `V`.
    Verbose,
    /// Logcat `D`.
    Debug,
    /// Logcat `I`.
    Info,
    /// Logcat `W`.
    Warn,
    /// Logcat `E`.
    Error,
}

impl LogLevel {
    /// Parse a level name, falling back to `Info` for anything unrecognized.
    #[must_use]
    pub fn from_name_lossy(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "verbose" | "v" => Self::Verbose,
            "debug" | "d" => Self::Debug,
            "warn" | "warning" | "w" => Self::Warn,
            "error" | "e" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// A device log line forwarded by the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the producer read the line.
    pub timestamp_ms: TimestampMs,
    /// Parsed severity.
    pub level: LogLevel,
    /// Raw log line.
    pub message: String,
    /// Whether the line belongs to a crash or ANR report.
    pub is_crash: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_at_zeroes_channels() {
        let s = Sample::at(1_700_000_000_000);
        assert_eq!(s.timestamp_ms, 1_700_000_000_000);
        assert_eq!(s.fps, 0.0);
        assert_eq!(s.jank, 0);
        assert!(s.memory_breakdown.is_none());
        assert!(s.package.is_none());
    }

    #[test]
    fn test_log_level_lossy_parse() {
        assert_eq!(LogLevel::from_name_lossy("error"), LogLevel::Error);
        assert_eq!(LogLevel::from_name_lossy("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from_name_lossy("v"), LogLevel::Verbose);
        assert_eq!(LogLevel::from_name_lossy("fatal"), LogLevel::Info);
        assert_eq!(LogLevel::from_name_lossy(""), LogLevel::Info);
    }

    #[test]
    fn test_log_level_display_matches_wire_names() {
        for level in [
            LogLevel::Verbose,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{level}\""));
        }
    }
}
