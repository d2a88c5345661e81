//! Bounded in-memory histories for the live session.
pub mod history;
pub mod ring_buffer;
pub mod store;

pub use history::{MetricHistory, MetricsSnapshot};
pub use ring_buffer::RingBuffer;
pub use store::{SessionStore, StoreCapacity, StoreSnapshot};
