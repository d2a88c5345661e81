//! Columnar, multi-channel metric history.
//!
//! Each metric channel lives in its own [`RingBuffer`] column so chart
//! consumers can borrow one series at a time. Columns are private and only
//! [`MetricHistory::append`] / [`MetricHistory::clear`] touch them, always all
//! together, which keeps every column the same length after each call.

use super::ring_buffer::RingBuffer;
use crate::measurement_types::{MemoryBreakdown, Sample, TimestampMs};
use serde::Serialize;

/// Default number of metric ticks retained (one hour at 1 Hz).
pub const DEFAULT_METRICS_CAPACITY: usize = 3600;

/// Fixed-capacity, index-aligned metric channels.
#[derive(Debug, Clone)]
pub struct MetricHistory {
    timestamps: RingBuffer<TimestampMs>,
    cpu: RingBuffer<f64>,
    gpu: RingBuffer<f64>,
    fps: RingBuffer<f64>,
    jank: RingBuffer<u32>,
    stutter: RingBuffer<f64>,
    memory: RingBuffer<f64>,
    memory_breakdown: RingBuffer<Option<MemoryBreakdown>>,
    battery_temp: RingBuffer<f64>,
    network_rx: RingBuffer<f64>,
    network_tx: RingBuffer<f64>,
}

impl Default for MetricHistory {
    fn default() -> Self {
        Self::new(DEFAULT_METRICS_CAPACITY)
    }
}

impl MetricHistory {
    /// Empty history retaining at most `capacity` ticks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            timestamps: RingBuffer::new(capacity),
            cpu: RingBuffer::new(capacity),
            gpu: RingBuffer::new(capacity),
            fps: RingBuffer::new(capacity),
            jank: RingBuffer::new(capacity),
            stutter: RingBuffer::new(capacity),
            memory: RingBuffer::new(capacity),
            memory_breakdown: RingBuffer::new(capacity),
            battery_temp: RingBuffer::new(capacity),
            network_rx: RingBuffer::new(capacity),
            network_tx: RingBuffer::new(capacity),
        }
    }

    /// Append one tick to every channel, evicting the oldest tick at capacity.
    ///
    /// Returns `true` when an eviction happened.
    pub fn append(&mut self, sample: &Sample) -> bool {
        let evicted = self.timestamps.push(sample.timestamp_ms).is_some();
        self.cpu.push(sample.cpu);
        self.gpu.push(sample.gpu);
        self.fps.push(sample.fps);
        self.jank.push(sample.jank);
        self.stutter.push(sample.stutter_pct);
        self.memory.push(sample.memory_mb);
        self.memory_breakdown.push(sample.memory_breakdown);
        self.battery_temp.push(sample.battery_temp_c);
        self.network_rx.push(sample.network_rx_kb);
        self.network_tx.push(sample.network_tx_kb);
        debug_assert!(self.is_aligned());
        evicted
    }

    /// Drop every tick from every channel.
    pub fn clear(&mut self) {
        self.timestamps.clear();
        self.cpu.clear();
        self.gpu.clear();
        self.fps.clear();
        self.jank.clear();
        self.stutter.clear();
        self.memory.clear();
        self.memory_breakdown.clear();
        self.battery_temp.clear();
        self.network_rx.clear();
        self.network_tx.clear();
    }

    /// Number of retained ticks (identical for every channel).
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether no tick is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Maximum number of retained ticks.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.timestamps.capacity()
    }

    /// Lengths of every channel, in column order.
    fn channel_lengths(&self) -> [usize; 11] {
        [
            self.timestamps.len(),
            self.cpu.len(),
            self.gpu.len(),
            self.fps.len(),
            self.jank.len(),
            self.stutter.len(),
            self.memory.len(),
            self.memory_breakdown.len(),
            self.battery_temp.len(),
            self.network_rx.len(),
            self.network_tx.len(),
        ]
    }

    /// Whether every channel has the same length.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        let lengths = self.channel_lengths();
        lengths.iter().all(|&l| l == lengths[0])
    }

    /// Copy every channel out into plain vectors.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamps: self.timestamps.to_vec(),
            cpu: self.cpu.to_vec(),
            gpu: self.gpu.to_vec(),
            fps: self.fps.to_vec(),
            jank: self.jank.to_vec(),
            stutter: self.stutter.to_vec(),
            memory: self.memory.to_vec(),
            memory_breakdown: self.memory_breakdown.to_vec(),
            battery_temp: self.battery_temp.to_vec(),
            network_rx: self.network_rx.to_vec(),
            network_tx: self.network_tx.to_vec(),
        }
    }
}

/// Read-only copy of the metric channels; all vectors share one length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Producer timestamps.
    pub timestamps: Vec<TimestampMs>,
    /// CPU %.
    pub cpu: Vec<f64>,
    /// GPU %.
    pub gpu: Vec<f64>,
    /// Frames per second.
    pub fps: Vec<f64>,
    /// Janky frames per tick.
    pub jank: Vec<u32>,
    /// Stutter %.
    pub stutter: Vec<f64>,
    /// Memory MB.
    pub memory: Vec<f64>,
    /// Per-heap memory split, when the producer sent one.
    pub memory_breakdown: Vec<Option<MemoryBreakdown>>,
    /// Battery temperature °C.
    pub battery_temp: Vec<f64>,
    /// Network receive KB/s.
    pub network_rx: Vec<f64>,
    /// Network transmit KB/s.
    pub network_tx: Vec<f64>,
}

impl MetricsSnapshot {
    /// Number of ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the snapshot holds no tick.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Rebuild the sample at `index`. The package is not part of the history.
    #[must_use]
    pub fn sample(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            timestamp_ms: *self.timestamps.get(index)?,
            package: None,
            cpu: *self.cpu.get(index)?,
            gpu: *self.gpu.get(index)?,
            fps: *self.fps.get(index)?,
            jank: *self.jank.get(index)?,
            stutter_pct: *self.stutter.get(index)?,
            memory_mb: *self.memory.get(index)?,
            memory_breakdown: *self.memory_breakdown.get(index)?,
            battery_temp_c: *self.battery_temp.get(index)?,
            network_rx_kb: *self.network_rx.get(index)?,
            network_tx_kb: *self.network_tx.get(index)?,
        })
    }

    /// Iterate rebuilt samples oldest → newest.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(|i| self.sample(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(t: TimestampMs) -> Sample {
        Sample {
            cpu: t as f64,
            fps: 60.0,
            jank: (t % 3) as u32,
            ..Sample::at(t)
        }
    }

    #[test]
    fn test_append_keeps_channels_aligned_through_eviction() {
        let mut history = MetricHistory::new(4);
        for t in 0..10 {
            let evicted = history.append(&tick(t));
            assert_eq!(evicted, t >= 4);
            assert!(history.is_aligned());
        }
        let snap = history.snapshot();
        assert_eq!(snap.timestamps, vec![6, 7, 8, 9]);
        assert_eq!(snap.cpu, vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(snap.jank.len(), 4);
        assert_eq!(snap.memory_breakdown.len(), 4);
    }

    #[test]
    fn test_snapshot_rebuilds_samples() {
        let mut history = MetricHistory::new(8);
        history.append(&tick(1));
        history.append(&tick(2));
        let snap = history.snapshot();
        let rebuilt: Vec<_> = snap.samples().collect();
        assert_eq!(rebuilt, vec![tick(1), tick(2)]);
        assert!(snap.sample(2).is_none());
    }

    #[test]
    fn test_clear_empties_every_channel() {
        let mut history = MetricHistory::default();
        assert_eq!(history.capacity(), DEFAULT_METRICS_CAPACITY);
        history.append(&tick(1));
        history.clear();
        assert!(history.is_empty());
        assert!(history.is_aligned());
        assert_eq!(history.snapshot(), MetricsSnapshot::default());
    }
}
