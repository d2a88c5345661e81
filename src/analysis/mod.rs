//! Offline analysis of recorded sessions.
//!
//! - [`classify`]: label → profile (thresholds and weights)
//! - [`csv_row`]: recording row codec
//! - [`scoring`]: threshold evaluation and the 0-100 score
//! - [`engine`]: parse, aggregate, classify, score
pub mod classify;
pub mod csv_row;
pub mod engine;
pub mod scoring;

pub use classify::{ClassificationProfile, ProfileRegistry, ScoreWeights, Thresholds};
pub use engine::{Analysis, AnalysisEngine, AnalysisSummary, Series};
pub use scoring::{evaluate, Aggregate, AnalysisConclusion, Grade};
