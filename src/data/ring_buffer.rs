//! Fixed-capacity FIFO buffer shared by every history kind.
//!
//! The session keeps four bounded histories (metric channels, device logs,
//! screenshots and, per channel, the columns of the metric history). All of them
//! are built on [`RingBuffer`], so the eviction rule lives in exactly one place:
//!
//! - capacity is fixed at construction and never exceeded
//! - pushing into a full buffer evicts the single oldest entry first
//! - iteration is always oldest → newest, in insertion order
//!
//! # Example
//! ```
//! use perfscope::data::ring_buffer::RingBuffer;
//!
//! let mut rb = RingBuffer::new(3);
//! for i in 0..5 {
//!     rb.push(i);
//! }
//! assert_eq!(rb.len(), 3);
//! assert_eq!(rb.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
//! ```

use std::collections::VecDeque;

/// A bounded, insertion-ordered buffer that discards its oldest entry on overflow.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` entries.
    ///
    /// A capacity of zero is bumped to one; a buffer that can hold nothing
    /// would silently drop every sample.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, returning the evicted entry if the buffer was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.data.len() >= self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(value);
        evicted
    }

    /// Entry at `index`, counted from the oldest.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest → newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.data.iter()
    }

    /// Drop every entry, keeping the capacity.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy the retained entries into a `Vec`, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_never_exceeds_capacity() {
        let mut rb = RingBuffer::new(100);
        for i in 0..1000u32 {
            rb.push(i);
            assert!(rb.len() <= 100);
        }
        assert_eq!(rb.len(), 100);
        assert_eq!(rb.get(0), Some(&900));
    }

    #[test]
    fn test_push_returns_evicted_oldest() {
        let mut rb = RingBuffer::new(2);
        assert_eq!(rb.push('a'), None);
        assert_eq!(rb.push('b'), None);
        assert_eq!(rb.push('c'), Some('a'));
        assert_eq!(rb.to_vec(), vec!['b', 'c']);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut rb = RingBuffer::new(4);
        rb.push(7);
        rb.push(7);
        assert_eq!(rb.to_vec(), vec![7, 7]);
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let mut rb = RingBuffer::new(0);
        rb.push(1);
        rb.push(2);
        assert_eq!(rb.capacity(), 1);
        assert_eq!(rb.to_vec(), vec![2]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut rb = RingBuffer::new(5);
        rb.push(1);
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.capacity(), 5);
        assert_eq!(rb.get(0), None);
    }
}
