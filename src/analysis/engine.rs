//! Recording analysis.
//!
//! Parses a whole CSV recording in one pass, keeps the per-channel series for
//! charting, classifies the recording by its label (usually the file name) and
//! scores it. The aggregate is cached on [`Analysis`] so a caller can override
//! the detected profile later without re-reading the file.

use crate::analysis::classify::{ClassificationProfile, ProfileRegistry};
use crate::analysis::csv_row::{read_rows, CsvRow};
use crate::analysis::scoring::{evaluate, Aggregate, AnalysisConclusion};
use crate::error::AppResult;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Per-channel values in row order, for charting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    /// Time labels.
    pub time: Vec<String>,
    /// CPU %.
    pub cpu: Vec<f64>,
    /// GPU %.
    pub gpu: Vec<f64>,
    /// FPS.
    pub fps: Vec<f64>,
    /// Jank counts.
    pub jank: Vec<f64>,
    /// Memory MB.
    pub memory: Vec<f64>,
    /// Battery temperature °C.
    pub battery: Vec<f64>,
    /// Download KB/s.
    pub rx: Vec<f64>,
    /// Upload KB/s.
    pub tx: Vec<f64>,
}

impl Series {
    fn push(&mut self, row: &CsvRow) {
        self.time.push(row.time.clone());
        self.cpu.push(row.cpu);
        self.gpu.push(row.gpu);
        self.fps.push(row.fps);
        self.jank.push(row.jank);
        self.memory.push(row.memory);
        self.battery.push(row.battery);
        self.rx.push(row.rx);
        self.tx.push(row.tx);
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Headline numbers for one recording under one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    /// Id of the profile used.
    pub profile_id: String,
    /// Display name of the profile used.
    pub profile_name: String,
    /// Valid rows.
    pub sample_count: usize,
    /// First time label.
    pub start_time: String,
    /// Last time label.
    pub end_time: String,
    /// Mean FPS.
    pub avg_fps: f64,
    /// Mean CPU %.
    pub avg_cpu: f64,
    /// Mean GPU %.
    pub avg_gpu: f64,
    /// Mean memory MB.
    pub avg_mem: f64,
    /// Peak CPU %.
    pub max_cpu: f64,
    /// Peak memory MB.
    pub max_mem: f64,
    /// Sum of jank counts.
    pub total_jank: f64,
    /// Jank rate %.
    pub jank_rate: f64,
    /// Whether low FPS was attributed to a static screen.
    pub is_static: bool,
}

impl AnalysisSummary {
    fn new(aggregate: &Aggregate, series: &Series, profile: &ClassificationProfile) -> Self {
        Self {
            profile_id: profile.id.clone(),
            profile_name: profile.name.clone(),
            sample_count: aggregate.count,
            start_time: series.time.first().cloned().unwrap_or_default(),
            end_time: series.time.last().cloned().unwrap_or_default(),
            avg_fps: aggregate.avg_fps(),
            avg_cpu: aggregate.avg_cpu(),
            avg_gpu: aggregate.avg_gpu(),
            avg_mem: aggregate.avg_mem(),
            max_cpu: aggregate.max_cpu,
            max_mem: aggregate.max_mem,
            total_jank: aggregate.total_jank,
            jank_rate: aggregate.jank_rate(),
            is_static: aggregate.is_static(profile),
        }
    }
}

/// Result of analyzing one recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// Label the recording was classified by.
    pub label: String,
    /// Cached totals.
    pub aggregate: Aggregate,
    /// Chart series.
    pub series: Series,
    /// Headline numbers.
    pub summary: AnalysisSummary,
    /// Score and findings.
    pub conclusion: AnalysisConclusion,
}

impl Analysis {
    /// Re-judge the cached aggregate under another profile.
    pub fn reclassify(&mut self, profile: &ClassificationProfile) {
        self.summary = AnalysisSummary::new(&self.aggregate, &self.series, profile);
        self.conclusion = evaluate(&self.aggregate, profile);
        tracing::debug!(profile = %profile.id, score = self.conclusion.score, "Recording reclassified");
    }
}

/// Analyzes recordings against a profile registry.
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    registry: ProfileRegistry,
}

impl AnalysisEngine {
    /// Engine using `registry` for classification.
    #[must_use]
    pub fn new(registry: ProfileRegistry) -> Self {
        Self { registry }
    }

    /// The registry used for classification and overrides.
    #[must_use]
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Aggregate, classify and score already-parsed rows. `None` when `rows` is empty.
    #[must_use]
    pub fn analyze_rows(&self, label: &str, rows: &[CsvRow]) -> Option<Analysis> {
        if rows.is_empty() {
            return None;
        }

        let mut aggregate = Aggregate::default();
        let mut series = Series::default();
        for row in rows {
            aggregate.count += 1;
            aggregate.total_cpu += row.cpu;
            aggregate.total_gpu += row.gpu;
            aggregate.total_fps += row.fps;
            aggregate.total_mem += row.memory;
            aggregate.total_jank += row.jank;
            aggregate.max_cpu = aggregate.max_cpu.max(row.cpu);
            aggregate.max_mem = aggregate.max_mem.max(row.memory);
            series.push(row);
        }

        let profile = self.registry.classify(label);
        let summary = AnalysisSummary::new(&aggregate, &series, profile);
        let conclusion = evaluate(&aggregate, profile);
        tracing::info!(
            label,
            profile = %profile.id,
            samples = aggregate.count,
            score = conclusion.score,
            "Recording analyzed"
        );

        Some(Analysis {
            label: label.to_string(),
            aggregate,
            series,
            summary,
            conclusion,
        })
    }

    /// Parse and analyze a recording from any reader.
    ///
    /// `Ok(None)` means the input held no valid rows.
    pub fn parse_recording<R: Read>(&self, reader: R, label: &str) -> AppResult<Option<Analysis>> {
        let rows = read_rows(reader)?;
        Ok(self.analyze_rows(label, &rows))
    }

    /// Parse and analyze a recording file, classified by its file name.
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> AppResult<Option<Analysis>> {
        let path = path.as_ref();
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::open(path)?;
        self.parse_recording(BufReader::new(file), &label)
    }

    /// Re-judge `analysis` under the profile registered as `profile_id`.
    pub fn reclassify(&self, analysis: &mut Analysis, profile_id: &str) -> AppResult<()> {
        let profile = self.registry.get(profile_id)?;
        analysis.reclassify(profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PerfError;

    const RECORDING: &str = "Time,CPU,GPU,FPS,Jank,Stutter,Memory,Battery,Rx,Tx\n\
        10:00:00,20,10,60,0,0,300,30,5,1\n\
        10:00:01,30,10,50,1,0,320,30,5,1\n\
        10:00:02,,10,oops,0,0,340,31,5,1\n";

    #[test]
    fn test_aggregate_and_series() {
        let engine = AnalysisEngine::default();
        let analysis = engine
            .parse_recording(RECORDING.as_bytes(), "session.csv")
            .unwrap()
            .unwrap();

        assert_eq!(analysis.aggregate.count, 3);
        assert_eq!(analysis.aggregate.total_fps, 110.0);
        assert_eq!(analysis.aggregate.total_cpu, 50.0);
        assert_eq!(analysis.aggregate.max_mem, 340.0);
        assert_eq!(analysis.series.len(), 3);
        assert_eq!(analysis.series.fps, vec![60.0, 50.0, 0.0]);
        assert_eq!(analysis.summary.start_time, "10:00:00");
        assert_eq!(analysis.summary.end_time, "10:00:02");
        assert!(analysis.summary.profile_id == "default");
    }

    #[test]
    fn test_header_only_is_no_data() {
        let engine = AnalysisEngine::default();
        let result = engine
            .parse_recording("Time,CPU,GPU,FPS,Jank,Stutter,Memory,Battery,Rx,Tx\n".as_bytes(), "x")
            .unwrap();
        assert!(result.is_none());
        assert!(engine.parse_recording("".as_bytes(), "x").unwrap().is_none());
    }

    #[test]
    fn test_reclassify_uses_cached_aggregate() {
        let engine = AnalysisEngine::default();
        let mut analysis = engine
            .parse_recording(RECORDING.as_bytes(), "com.tencent.tmgp.sgame.csv")
            .unwrap()
            .unwrap();
        assert_eq!(analysis.summary.profile_id, "game");
        let aggregate = analysis.aggregate.clone();

        engine.reclassify(&mut analysis, "reading").unwrap();
        assert_eq!(analysis.summary.profile_id, "reading");
        assert_eq!(analysis.aggregate, aggregate);
        assert_eq!(
            analysis.conclusion,
            evaluate(&aggregate, engine.registry().get("reading").unwrap())
        );

        assert!(matches!(
            engine.reclassify(&mut analysis, "racing"),
            Err(PerfError::UnknownProfile(_))
        ));
        assert_eq!(analysis.summary.profile_id, "reading");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let engine = AnalysisEngine::default();
        assert!(matches!(
            engine.analyze_file("/definitely/not/here.csv"),
            Err(PerfError::Io(_))
        ));
    }
}
