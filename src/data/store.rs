//! Per-session store for every bounded history the live view needs.

use super::history::{MetricHistory, MetricsSnapshot, DEFAULT_METRICS_CAPACITY};
use super::ring_buffer::RingBuffer;
use crate::measurement_types::{LogEntry, Marker, Sample, Screenshot};
use serde::Serialize;

/// Default number of device log lines retained.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Default number of screenshots retained.
pub const DEFAULT_SCREENSHOT_CAPACITY: usize = 50;

/// Capacities of the store's buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapacity {
    /// Metric ticks.
    pub metrics: usize,
    /// Log lines.
    pub logs: usize,
    /// Screenshots.
    pub screenshots: usize,
}

impl Default for StoreCapacity {
    fn default() -> Self {
        Self {
            metrics: DEFAULT_METRICS_CAPACITY,
            logs: DEFAULT_LOG_CAPACITY,
            screenshots: DEFAULT_SCREENSHOT_CAPACITY,
        }
    }
}

/// Metric history, logs, screenshots and markers of one session.
///
/// The store has no interior locking. The session wraps it in a single
/// `RwLock`, so every method here runs as one atomic step for observers.
#[derive(Debug, Clone)]
pub struct SessionStore {
    metrics: MetricHistory,
    logs: RingBuffer<LogEntry>,
    screenshots: RingBuffer<Screenshot>,
    current_screenshot: Option<Screenshot>,
    markers: Vec<Marker>,
    /// Log lines appended over the store's lifetime; survives `reset`.
    logs_appended: u64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(StoreCapacity::default())
    }
}

impl SessionStore {
    /// Empty store with the given capacities.
    #[must_use]
    pub fn new(capacity: StoreCapacity) -> Self {
        Self {
            metrics: MetricHistory::new(capacity.metrics),
            logs: RingBuffer::new(capacity.logs),
            screenshots: RingBuffer::new(capacity.screenshots),
            current_screenshot: None,
            markers: Vec::new(),
            logs_appended: 0,
        }
    }

    /// Append a metric tick.
    pub fn append(&mut self, sample: &Sample) {
        self.metrics.append(sample);
    }

    /// Append a device log line.
    pub fn append_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
        self.logs_appended += 1;
    }

    /// Append a screenshot and make it the current one.
    pub fn append_screenshot(&mut self, shot: Screenshot) {
        self.current_screenshot = Some(shot.clone());
        self.screenshots.push(shot);
    }

    /// Record a user marker.
    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    /// Clear metrics, logs, screenshots and markers together.
    pub fn reset(&mut self) {
        self.metrics.clear();
        self.logs.clear();
        self.screenshots.clear();
        self.current_screenshot = None;
        self.markers.clear();
    }

    /// Metric channels.
    #[must_use]
    pub fn metrics(&self) -> &MetricHistory {
        &self.metrics
    }

    /// Retained log lines, oldest first.
    #[must_use]
    pub fn logs(&self) -> &RingBuffer<LogEntry> {
        &self.logs
    }

    /// Sequence number of the next log line; pass it to [`Self::logs_after`] later.
    #[must_use]
    pub fn log_cursor(&self) -> u64 {
        self.logs_appended
    }

    /// Retained log lines appended at or after `cursor`, oldest first.
    ///
    /// Lines already evicted or cleared are skipped, so a stale cursor yields
    /// every retained line.
    pub fn logs_after(&self, cursor: u64) -> impl Iterator<Item = &LogEntry> {
        let first_retained = self.logs_appended - self.logs.len() as u64;
        let skip = usize::try_from(cursor.saturating_sub(first_retained)).unwrap_or(usize::MAX);
        self.logs.iter().skip(skip)
    }

    /// Retained screenshots, oldest first.
    #[must_use]
    pub fn screenshots(&self) -> &RingBuffer<Screenshot> {
        &self.screenshots
    }

    /// Most recently received screenshot.
    #[must_use]
    pub fn current_screenshot(&self) -> Option<&Screenshot> {
        self.current_screenshot.as_ref()
    }

    /// Markers in placement order.
    #[must_use]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Consistent copy of everything.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            metrics: self.metrics.snapshot(),
            logs: self.logs.to_vec(),
            screenshots: self.screenshots.to_vec(),
            current_screenshot: self.current_screenshot.clone(),
            markers: self.markers.clone(),
        }
    }
}

/// Point-in-time copy of a [`SessionStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreSnapshot {
    /// Metric channels.
    pub metrics: MetricsSnapshot,
    /// Log lines, oldest first.
    pub logs: Vec<LogEntry>,
    /// Screenshots, oldest first.
    pub screenshots: Vec<Screenshot>,
    /// Latest screenshot.
    pub current_screenshot: Option<Screenshot>,
    /// Markers in placement order.
    pub markers: Vec<Marker>,
}

impl StoreSnapshot {
    /// Whether every buffer and the marker list are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
            && self.logs.is_empty()
            && self.screenshots.is_empty()
            && self.current_screenshot.is_none()
            && self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement_types::LogLevel;

    fn small() -> SessionStore {
        SessionStore::new(StoreCapacity {
            metrics: 3,
            logs: 2,
            screenshots: 2,
        })
    }

    fn log(t: i64) -> LogEntry {
        LogEntry {
            timestamp_ms: t,
            level: LogLevel::Error,
            message: format!("line {t}"),
            is_crash: false,
        }
    }

    fn shot(t: i64) -> Screenshot {
        Screenshot {
            timestamp_ms: t,
            url: format!("/s/{t}.jpg"),
        }
    }

    #[test]
    fn test_each_buffer_evicts_at_its_own_capacity() {
        let mut store = small();
        for t in 0..5 {
            store.append(&Sample::at(t));
            store.append_log(log(t));
            store.append_screenshot(shot(t));
        }
        assert_eq!(store.metrics().len(), 3);
        assert_eq!(store.logs().len(), 2);
        assert_eq!(store.screenshots().len(), 2);
        assert_eq!(store.logs().get(0).map(|l| l.timestamp_ms), Some(3));
        assert_eq!(store.current_screenshot(), Some(&shot(4)));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = small();
        store.append(&Sample::at(1));
        store.append_log(log(1));
        store.append_screenshot(shot(1));
        store.add_marker(Marker::new(1, "login"));

        store.reset();
        let snap = store.snapshot();
        assert!(snap.is_empty());
        assert!(store.metrics().is_aligned());

        // idempotent
        store.reset();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_log_cursor_sees_lines_sharing_a_timestamp() {
        let mut store = small();
        let cursor = store.log_cursor();
        store.append_log(log(7));
        store.append_log(log(7));
        assert_eq!(store.logs_after(cursor).count(), 2);

        let cursor = store.log_cursor();
        assert_eq!(store.logs_after(cursor).count(), 0);
        store.append_log(log(7));
        let fresh: Vec<_> = store.logs_after(cursor).collect();
        assert_eq!(fresh.len(), 1);
        assert_eq!(store.log_cursor(), cursor + 1);
    }

    #[test]
    fn test_log_cursor_after_eviction_and_reset() {
        let mut store = small();
        let cursor = store.log_cursor();
        for t in 0..5 {
            store.append_log(log(t));
        }
        // Capacity 2: only the two newest lines are still there.
        let seen: Vec<_> = store.logs_after(cursor).map(|l| l.timestamp_ms).collect();
        assert_eq!(seen, vec![3, 4]);

        let cursor = store.log_cursor();
        store.reset();
        assert_eq!(store.logs_after(cursor).count(), 0);
        store.append_log(log(9));
        let seen: Vec<_> = store.logs_after(cursor).map(|l| l.timestamp_ms).collect();
        assert_eq!(seen, vec![9]);
    }

    #[test]
    fn test_markers_keep_placement_order() {
        let mut store = SessionStore::default();
        store.add_marker(Marker::new(20, "b"));
        store.add_marker(Marker::new(10, "a"));
        let labels: Vec<_> = store.markers().iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a"]);
    }
}
