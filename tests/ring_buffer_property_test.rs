//! Property tests for the bounded buffers.

use perfscope::correlate::nearest_marker;
use perfscope::data::{MetricHistory, RingBuffer, SessionStore, StoreCapacity};
use perfscope::measurement_types::{Marker, Sample};
use proptest::prelude::*;

fn sample(t: i64) -> Sample {
    Sample {
        cpu: (t % 100) as f64,
        fps: 60.0,
        jank: (t % 4) as u32,
        memory_mb: 100.0 + t as f64,
        ..Sample::at(t)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// After N pushes into capacity C the buffer holds the last min(N, C) values in order.
    #[test]
    fn prop_retains_last_c_in_order(
        capacity in 1usize..64,
        values in prop::collection::vec(any::<i32>(), 0..300)
    ) {
        let mut buf = RingBuffer::new(capacity);
        for &v in &values {
            buf.push(v);
        }
        let kept = values.len().min(capacity);
        prop_assert_eq!(buf.len(), kept);
        prop_assert_eq!(buf.to_vec(), values[values.len() - kept..].to_vec());
    }

    /// Every channel of the metric history stays the same length after every append.
    #[test]
    fn prop_channels_stay_aligned(capacity in 1usize..32, n in 0i64..200) {
        let mut history = MetricHistory::new(capacity);
        for t in 0..n {
            history.append(&sample(t));
            prop_assert!(history.is_aligned());
        }

        let snapshot = history.snapshot();
        let len = snapshot.len();
        prop_assert_eq!(len, (n as usize).min(capacity));
        prop_assert_eq!(snapshot.cpu.len(), len);
        prop_assert_eq!(snapshot.gpu.len(), len);
        prop_assert_eq!(snapshot.fps.len(), len);
        prop_assert_eq!(snapshot.jank.len(), len);
        prop_assert_eq!(snapshot.stutter.len(), len);
        prop_assert_eq!(snapshot.memory.len(), len);
        prop_assert_eq!(snapshot.memory_breakdown.len(), len);
        prop_assert_eq!(snapshot.battery_temp.len(), len);
        prop_assert_eq!(snapshot.network_rx.len(), len);
        prop_assert_eq!(snapshot.network_tx.len(), len);

        // Rebuilt samples line up with what was appended.
        let first = n - len as i64;
        for (i, rebuilt) in snapshot.samples().enumerate() {
            prop_assert_eq!(rebuilt, sample(first + i as i64));
        }
    }

    /// Reset empties every buffer regardless of what came before.
    #[test]
    fn prop_reset_empties_store(n in 0i64..100, markers in 0usize..10) {
        let mut store = SessionStore::new(StoreCapacity { metrics: 16, logs: 4, screenshots: 2 });
        for t in 0..n {
            store.append(&sample(t));
        }
        for i in 0..markers {
            store.add_marker(Marker::new(i as i64, format!("m{i}")));
        }
        store.reset();
        prop_assert!(store.snapshot().is_empty());
    }

    /// The nearest marker is never farther than any other marker, and only found within tolerance.
    #[test]
    fn prop_nearest_marker_is_closest(
        times in prop::collection::vec(-10_000i64..10_000, 0..20),
        t in -10_000i64..10_000,
        tolerance in 0i64..5_000
    ) {
        let markers: Vec<Marker> = times.iter().map(|&m| Marker::new(m, m.to_string())).collect();
        match nearest_marker(&markers, t, tolerance) {
            Some(hit) => {
                let d = (hit.timestamp_ms - t).abs();
                prop_assert!(d <= tolerance);
                prop_assert!(markers.iter().all(|m| (m.timestamp_ms - t).abs() >= d));
            }
            None => prop_assert!(markers.iter().all(|m| (m.timestamp_ms - t).abs() > tolerance)),
        }
    }
}
