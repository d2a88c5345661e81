//! Wire codec for the device-producer link.
//!
//! Every frame is one JSON object, normally discriminated by its `type` field.
//! Metrics ticks may also arrive without `type` (the iOS collector sends them
//! bare); such an object is read as `metrics` when it has the required fields.
//!
//! | direction | `type`                  | payload                                        |
//! |-----------|-------------------------|------------------------------------------------|
//! | out       | `start`                 | `target?`                                      |
//! | out       | `stop`                  | (none)                                         |
//! | in        | `metrics` (`monitor`)   | `timestamp, package?, cpu, gpu?, fps, jank?, stutter?, memory, memory_detail?, battery?, network?` |
//! | in        | `log`                   | `timestamp, message, level, is_crash`          |
//! | in        | `screenshot`            | `timestamp, url`                               |
//!
//! Decoding never fails loudly: anything that is not a well-formed inbound
//! message yields `None` and the caller drops it.

use crate::error::AppResult;
use crate::measurement_types::{
    LogEntry, LogLevel, MemoryBreakdown, Sample, Screenshot, TimestampMs,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Commands sent from the session to the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// Begin streaming, optionally pinned to one application.
    Start {
        /// Package / bundle id to monitor. The producer picks the foreground app when absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    /// Stop streaming and finalize the producer-side recording.
    Stop,
}

impl OutboundMessage {
    /// Serialize to a text frame.
    pub fn encode(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A decoded producer frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// One metrics tick.
    Metrics(Sample),
    /// One device log line.
    Log(LogEntry),
    /// A freshly captured screenshot.
    Screenshot(Screenshot),
}

impl InboundMessage {
    /// Short kind name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Metrics(_) => "metrics",
            Self::Log(_) => "log",
            Self::Screenshot(_) => "screenshot",
        }
    }
}

/// Decode one text frame, returning `None` for unknown or malformed input.
#[must_use]
pub fn decode(frame: &str) -> Option<InboundMessage> {
    let parsed = serde_json::from_str::<serde_json::Value>(frame).and_then(|value| {
        if value.is_object() && value.get("type").is_none() {
            RawMetrics::deserialize(value).map(RawFrame::Metrics)
        } else {
            RawFrame::deserialize(value)
        }
    });
    match parsed {
        Ok(raw) => Some(raw.into()),
        Err(e) => {
            tracing::debug!(error = %e, "Dropping malformed frame");
            None
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawFrame {
    #[serde(alias = "monitor")]
    Metrics(RawMetrics),
    Log(RawLog),
    Screenshot(RawScreenshot),
}

#[derive(Deserialize)]
struct RawMetrics {
    #[serde(deserialize_with = "de_timestamp")]
    timestamp: TimestampMs,
    #[serde(default)]
    package: Option<String>,
    cpu: f64,
    #[serde(default, deserialize_with = "de_number_or_zero")]
    gpu: f64,
    fps: f64,
    #[serde(default, deserialize_with = "de_number_or_zero")]
    jank: f64,
    #[serde(default, deserialize_with = "de_number_or_zero")]
    stutter: f64,
    memory: f64,
    #[serde(default)]
    memory_detail: Option<RawMemoryDetail>,
    #[serde(default)]
    battery: Option<RawBattery>,
    #[serde(default)]
    network: Option<RawNetwork>,
}

#[derive(Deserialize, Default)]
struct RawMemoryDetail {
    java: Option<f64>,
    native: Option<f64>,
    graphics: Option<f64>,
    code: Option<f64>,
    stack: Option<f64>,
}

#[derive(Deserialize)]
struct RawBattery {
    #[serde(default)]
    temp: Option<f64>,
}

#[derive(Deserialize)]
struct RawNetwork {
    #[serde(default)]
    rx: Option<f64>,
    #[serde(default)]
    tx: Option<f64>,
}

#[derive(Deserialize)]
struct RawLog {
    #[serde(deserialize_with = "de_timestamp")]
    timestamp: TimestampMs,
    message: String,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    is_crash: Option<bool>,
}

#[derive(Deserialize)]
struct RawScreenshot {
    #[serde(deserialize_with = "de_timestamp")]
    timestamp: TimestampMs,
    url: String,
}

/// Timestamps arrive as integers from most producers and as floats from some.
fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimestampMs, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(value.round() as TimestampMs)
}

/// Optional numeric fields: absent and `null` both read as zero.
fn de_number_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

impl RawMemoryDetail {
    fn into_breakdown(self) -> Option<MemoryBreakdown> {
        if self.java.is_none()
            && self.native.is_none()
            && self.graphics.is_none()
            && self.code.is_none()
            && self.stack.is_none()
        {
            return None;
        }
        Some(MemoryBreakdown {
            java: self.java.unwrap_or(0.0),
            native: self.native.unwrap_or(0.0),
            graphics: self.graphics.unwrap_or(0.0),
            code: self.code.unwrap_or(0.0),
            stack: self.stack.unwrap_or(0.0),
        })
    }
}

impl From<RawMetrics> for Sample {
    fn from(raw: RawMetrics) -> Self {
        let (rx, tx) = raw
            .network
            .map(|n| (n.rx.unwrap_or(0.0), n.tx.unwrap_or(0.0)))
            .unwrap_or((0.0, 0.0));
        Sample {
            timestamp_ms: raw.timestamp,
            package: raw.package.filter(|p| !p.is_empty()),
            cpu: raw.cpu,
            gpu: raw.gpu,
            fps: raw.fps,
            jank: raw.jank.max(0.0).round() as u32,
            stutter_pct: raw.stutter,
            memory_mb: raw.memory,
            memory_breakdown: raw.memory_detail.and_then(RawMemoryDetail::into_breakdown),
            battery_temp_c: raw.battery.and_then(|b| b.temp).unwrap_or(0.0),
            network_rx_kb: rx,
            network_tx_kb: tx,
        }
    }
}

impl From<RawFrame> for InboundMessage {
    fn from(raw: RawFrame) -> Self {
        match raw {
            RawFrame::Metrics(m) => InboundMessage::Metrics(m.into()),
            RawFrame::Log(l) => InboundMessage::Log(LogEntry {
                timestamp_ms: l.timestamp,
                level: l
                    .level
                    .as_deref()
                    .map_or(LogLevel::Info, LogLevel::from_name_lossy),
                message: l.message,
                is_crash: l.is_crash.unwrap_or(false),
            }),
            RawFrame::Screenshot(s) => InboundMessage::Screenshot(Screenshot {
                timestamp_ms: s.timestamp,
                url: s.url,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_encodes_target() {
        let frame = OutboundMessage::Start {
            target: Some("com.example.app".into()),
        }
        .encode()
        .unwrap();
        assert_eq!(frame, r#"{"type":"start","target":"com.example.app"}"#);
    }

    #[test]
    fn test_start_without_target_omits_field() {
        let frame = OutboundMessage::Start { target: None }.encode().unwrap();
        assert_eq!(frame, r#"{"type":"start"}"#);
        assert_eq!(OutboundMessage::Stop.encode().unwrap(), r#"{"type":"stop"}"#);
    }

    #[test]
    fn test_full_metrics_frame() {
        let frame = r#"{
            "type": "metrics", "timestamp": 1700000000123, "package": "com.demo",
            "cpu": 12.5, "gpu": 30.0, "fps": 58, "jank": 2, "stutter": 1.5,
            "memory": 420.0,
            "memory_detail": {"java": 100, "native": 200, "graphics": 80, "code": 30, "stack": 10, "total": 420},
            "battery": {"level": 80, "temp": 36.5},
            "network": {"rx": 12.0, "tx": 3.5}
        }"#;
        let Some(InboundMessage::Metrics(s)) = decode(frame) else {
            panic!("expected metrics");
        };
        assert_eq!(s.timestamp_ms, 1_700_000_000_123);
        assert_eq!(s.package.as_deref(), Some("com.demo"));
        assert_eq!(s.fps, 58.0);
        assert_eq!(s.jank, 2);
        assert_eq!(s.battery_temp_c, 36.5);
        assert_eq!(s.network_tx_kb, 3.5);
        let mem = s.memory_breakdown.unwrap();
        assert_eq!(mem.native, 200.0);
    }

    #[test]
    fn test_minimal_metrics_defaults_optional_fields() {
        let frame = r#"{"type":"metrics","timestamp":1000,"cpu":1.0,"fps":30,"memory":50}"#;
        let Some(InboundMessage::Metrics(s)) = decode(frame) else {
            panic!("expected metrics");
        };
        assert_eq!(s.gpu, 0.0);
        assert_eq!(s.jank, 0);
        assert_eq!(s.stutter_pct, 0.0);
        assert_eq!(s.network_rx_kb, 0.0);
        assert!(s.memory_breakdown.is_none());
        assert!(s.package.is_none());
    }

    #[test]
    fn test_monitor_alias_and_null_package() {
        let frame = r#"{"type":"monitor","timestamp":1000,"package":null,"cpu":1,"fps":0,
                        "memory":0,"memory_detail":{},"gpu":null}"#;
        let Some(InboundMessage::Metrics(s)) = decode(frame) else {
            panic!("expected metrics");
        };
        assert!(s.package.is_none());
        assert!(s.memory_breakdown.is_none());
        assert_eq!(s.gpu, 0.0);
    }

    #[test]
    fn test_log_frame() {
        let frame = r#"{"type":"log","timestamp":5,"message":"FATAL EXCEPTION: main","level":"error","is_crash":true}"#;
        let Some(InboundMessage::Log(entry)) = decode(frame) else {
            panic!("expected log");
        };
        assert_eq!(entry.level, LogLevel::Error);
        assert!(entry.is_crash);
    }

    #[test]
    fn test_screenshot_frame() {
        let frame = r#"{"type":"screenshot","timestamp":7,"url":"/screenshots/abc/7.jpg"}"#;
        assert_eq!(
            decode(frame),
            Some(InboundMessage::Screenshot(Screenshot {
                timestamp_ms: 7,
                url: "/screenshots/abc/7.jpg".into()
            }))
        );
    }

    #[test]
    fn test_malformed_frames_are_dropped() {
        assert!(decode("not json").is_none());
        assert!(decode("[1,2,3]").is_none());
        assert!(decode(r#"{"type":"telemetry","timestamp":1}"#).is_none());
        // metrics without the required cpu field
        assert!(decode(r#"{"type":"metrics","timestamp":1,"fps":1,"memory":1}"#).is_none());
        // screenshot without url
        assert!(decode(r#"{"type":"screenshot","timestamp":1}"#).is_none());
        // no discriminator and no metrics fields
        assert!(decode(r#"{"timestamp":1,"message":"hello"}"#).is_none());
        // unknown discriminator, even with metrics fields
        assert!(decode(r#"{"type":"heartbeat","timestamp":1,"cpu":1,"fps":1,"memory":1}"#).is_none());
    }

    #[test]
    fn test_untyped_frame_with_metrics_fields_is_metrics() {
        let frame = r#"{"timestamp":1000,"cpu":1,"fps":1,"memory":1}"#;
        assert_eq!(decode(frame).map(|m| m.kind()), Some("metrics"));
    }
}
