//! Nearest-event lookup on the time axis.
//!
//! Charts ask, for every rendered point, whether a marker or a screenshot sits
//! close enough to annotate it. The rule is the same for both:
//!
//! - scan every candidate in insertion order
//! - keep the one with the smallest `|candidate.t - t|`
//! - on an exact tie keep the first one seen
//! - accept it only if that distance is within the tolerance (inclusive)

use crate::measurement_types::{Marker, Screenshot, TimestampMs};

/// Default match window for screenshots.
pub const DEFAULT_SCREENSHOT_TOLERANCE_MS: i64 = 3000;

/// Default match window for labelling exported rows with markers.
pub const DEFAULT_EXPORT_MARKER_TOLERANCE_MS: i64 = 1000;

/// Anything that sits at a point on the time axis.
pub trait Timestamped {
    /// Position on the time axis.
    fn timestamp_ms(&self) -> TimestampMs;
}

impl Timestamped for Marker {
    fn timestamp_ms(&self) -> TimestampMs {
        self.timestamp_ms
    }
}

impl Timestamped for Screenshot {
    fn timestamp_ms(&self) -> TimestampMs {
        self.timestamp_ms
    }
}

/// Closest item to `t` within `tolerance_ms`, first-seen on ties.
pub fn nearest<'a, T, I>(items: I, t: TimestampMs, tolerance_ms: i64) -> Option<&'a T>
where
    T: Timestamped + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut best: Option<(&T, u64)> = None;
    for item in items {
        let distance = item.timestamp_ms().abs_diff(t);
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((item, distance)),
        }
    }
    let tolerance = u64::try_from(tolerance_ms).ok()?;
    best.filter(|&(_, d)| d <= tolerance).map(|(item, _)| item)
}

/// Marker closest to `t` within `tolerance_ms`.
pub fn nearest_marker(markers: &[Marker], t: TimestampMs, tolerance_ms: i64) -> Option<&Marker> {
    nearest(markers, t, tolerance_ms)
}

/// Screenshot closest to `t` within `tolerance_ms`.
///
/// Accepts any insertion-ordered collection, e.g. the session's screenshot
/// ring buffer or a snapshot vector.
pub fn nearest_screenshot<'a, I>(shots: I, t: TimestampMs, tolerance_ms: i64) -> Option<&'a Screenshot>
where
    I: IntoIterator<Item = &'a Screenshot>,
{
    nearest(shots, t, tolerance_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RingBuffer;

    #[test]
    fn test_marker_within_tolerance() {
        let markers = vec![Marker::new(10_000, "scroll")];
        assert_eq!(
            nearest_marker(&markers, 10_500, 1000).map(|m| m.label.as_str()),
            Some("scroll")
        );
        assert!(nearest_marker(&markers, 12_000, 1000).is_none());
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let markers = vec![Marker::new(0, "edge")];
        assert!(nearest_marker(&markers, 1000, 1000).is_some());
        assert!(nearest_marker(&markers, -1000, 1000).is_some());
        assert!(nearest_marker(&markers, 1001, 1000).is_none());
    }

    #[test]
    fn test_picks_closest_not_first() {
        let markers = vec![
            Marker::new(1000, "far"),
            Marker::new(1900, "near"),
            Marker::new(3000, "after"),
        ];
        assert_eq!(
            nearest_marker(&markers, 2000, 5000).map(|m| m.label.as_str()),
            Some("near")
        );
    }

    #[test]
    fn test_exact_tie_keeps_first_inserted() {
        let markers = vec![
            Marker::new(3000, "later-but-first"),
            Marker::new(1000, "earlier"),
        ];
        assert_eq!(
            nearest_marker(&markers, 2000, 5000).map(|m| m.label.as_str()),
            Some("later-but-first")
        );
    }

    #[test]
    fn test_screenshot_from_ring_buffer() {
        let mut shots = RingBuffer::new(50);
        for t in [0, 2000, 4000] {
            shots.push(Screenshot {
                timestamp_ms: t,
                url: format!("/{t}.jpg"),
            });
        }
        let hit = nearest_screenshot(shots.iter(), 4900, DEFAULT_SCREENSHOT_TOLERANCE_MS);
        assert_eq!(hit.map(|s| s.timestamp_ms), Some(4000));
        assert!(nearest_screenshot(shots.iter(), 9000, DEFAULT_SCREENSHOT_TOLERANCE_MS).is_none());
    }

    #[test]
    fn test_empty_and_negative_tolerance() {
        assert!(nearest_marker(&[], 0, 1000).is_none());
        let markers = vec![Marker::new(0, "x")];
        assert!(nearest_marker(&markers, 0, -1).is_none());
    }
}
