//! # perfscope Core Library
//!
//! This crate is the core library for the `perfscope` application. It encapsulates the
//! components needed to follow a mobile device's performance live and to judge a
//! recording after the fact. Keeping them in a library lets the command-line frontend
//! (`main.rs`) and any future dashboard share the same session and analysis logic.
//!
//! ## Crate Structure
//!
//! - **`network`**: The reconnecting `MetricsSession`, its explicit state machine, the
//!   JSON wire codec and the transport abstraction (WebSocket in production).
//! - **`data`**: Bounded histories. A generic `RingBuffer`, the column-aligned
//!   `MetricHistory`, and the `SessionStore` that groups metrics, logs, screenshots and
//!   markers.
//! - **`correlate`**: Nearest-marker and nearest-screenshot lookups on the time axis.
//! - **`analysis`**: Classification profiles, the recording row codec, threshold
//!   evaluation and the weighted score.
//! - **`export`**: CSV export of a live session, re-readable by the analysis engine.
//! - **`config`**: Layered configuration (defaults, TOML file, environment) via `figment`.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`error`**: The crate-wide `PerfError` enum.
//! - **`measurement_types`**: Samples, log entries, screenshots and markers.

pub mod analysis;
pub mod config;
pub mod correlate;
pub mod data;
pub mod error;
pub mod export;
pub mod logging;
pub mod measurement_types;
pub mod network;
