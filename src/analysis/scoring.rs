//! Threshold evaluation and the weighted 0-100 score.
//!
//! Everything here is a pure function of an [`Aggregate`] and a
//! [`ClassificationProfile`]: the same inputs always produce the same score,
//! grade, issues and suggestions.
//!
//! The jank rate is `total_jank / total_fps * 100`, i.e. jank frames relative
//! to the sum of per-second frame rates rather than to a frame count.

use crate::analysis::classify::ClassificationProfile;
use serde::Serialize;
use std::fmt;

/// FPS the score treats as perfect.
const TARGET_FPS: f64 = 60.0;
/// Jank total at or above which a low-FPS recording is never "static".
const STATIC_MAX_JANK: f64 = 5.0;
/// Average GPU % that triggers the GPU suggestion.
const GPU_SUGGESTION_PCT: f64 = 60.0;

const MAX_FPS_DEDUCTION: f64 = 30.0;
const MAX_JANK_DEDUCTION: f64 = 40.0;
const MAX_CPU_DEDUCTION: f64 = 20.0;

const SUGGEST_MAIN_THREAD: &str = "Move heavy work (I/O, parsing, layout inflation) off the main thread";
const SUGGEST_OVERDRAW: &str = "Reduce overdraw and flatten deeply nested layouts";
const SUGGEST_FRAME_PACING: &str = "Profile the slowest frames and smooth out rendering spikes";
const SUGGEST_LONG_FRAMES: &str = "Inspect long frames in a system trace to find blocking calls";
const SUGGEST_BACKGROUND: &str = "Check for busy loops, aggressive polling and runaway background tasks";
const SUGGEST_LEAKS: &str = "Look for leaks and oversized bitmaps with a heap dump";
const SUGGEST_CACHES: &str = "Trim caches and release resources when the app is backgrounded";
const SUGGEST_GPU: &str = "GPU load is high; simplify shaders, effects and translucent layers";

const ISSUE_STABLE: &str = "Performance is stable; no significant issues found";
const SUGGEST_NONE: &str = "No optimization suggestions; keep monitoring";

/// Single-pass totals over a recording.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    /// Number of valid rows.
    pub count: usize,
    /// Sum of CPU %.
    pub total_cpu: f64,
    /// Sum of GPU %.
    pub total_gpu: f64,
    /// Sum of FPS.
    pub total_fps: f64,
    /// Sum of memory MB.
    pub total_mem: f64,
    /// Sum of jank counts.
    pub total_jank: f64,
    /// Peak CPU %.
    pub max_cpu: f64,
    /// Peak memory MB.
    pub max_mem: f64,
}

impl Aggregate {
    fn mean(&self, total: f64) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            total / self.count as f64
        }
    }

    /// Mean FPS.
    #[must_use]
    pub fn avg_fps(&self) -> f64 {
        self.mean(self.total_fps)
    }

    /// Mean CPU %.
    #[must_use]
    pub fn avg_cpu(&self) -> f64 {
        self.mean(self.total_cpu)
    }

    /// Mean GPU %.
    #[must_use]
    pub fn avg_gpu(&self) -> f64 {
        self.mean(self.total_gpu)
    }

    /// Mean memory MB.
    #[must_use]
    pub fn avg_mem(&self) -> f64 {
        self.mean(self.total_mem)
    }

    /// Jank frames per hundred FPS units, 0 when no frames were recorded.
    #[must_use]
    pub fn jank_rate(&self) -> f64 {
        if self.total_fps > 0.0 {
            self.total_jank / self.total_fps * 100.0
        } else {
            0.0
        }
    }

    /// Low FPS on an idle screen rather than a rendering problem.
    #[must_use]
    pub fn is_static(&self, profile: &ClassificationProfile) -> bool {
        self.avg_fps() < profile.thresholds.min_fps
            && self.total_jank < STATIC_MAX_JANK
            && self.avg_cpu() < profile.thresholds.static_cpu_pct
    }
}

/// Letter grade derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    /// Score below 60.
    Poor,
    /// Score 60-74.
    Fair,
    /// Score 75-89.
    Good,
    /// Score 90 and above.
    Excellent,
}

impl Grade {
    /// Step function over the score.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        if score >= 90 {
            Self::Excellent
        } else if score >= 75 {
            Self::Good
        } else if score >= 60 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        };
        f.write_str(s)
    }
}

/// Verdict for one recording under one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConclusion {
    /// 0-100.
    pub score: u8,
    /// Grade for `score`.
    pub grade: Grade,
    /// Findings in evaluation order; never empty.
    pub issues: Vec<String>,
    /// Deduplicated advice in first-seen order; never empty.
    pub suggestions: Vec<String>,
}

#[derive(Default)]
struct Findings {
    issues: Vec<String>,
    suggestions: Vec<String>,
}

impl Findings {
    fn issue(&mut self, text: String) {
        self.issues.push(text);
    }

    fn suggest(&mut self, text: &str) {
        if !self.suggestions.iter().any(|s| s == text) {
            self.suggestions.push(text.to_string());
        }
    }
}

/// Score, grade and findings for `aggregate` judged by `profile`.
#[must_use]
pub fn evaluate(aggregate: &Aggregate, profile: &ClassificationProfile) -> AnalysisConclusion {
    let t = &profile.thresholds;
    let avg_fps = aggregate.avg_fps();
    let avg_cpu = aggregate.avg_cpu();
    let jank_rate = aggregate.jank_rate();
    let is_static = aggregate.is_static(profile);

    let mut findings = Findings::default();

    if avg_fps < t.min_fps {
        if is_static {
            findings.issue(format!(
                "Low frame rate ({avg_fps:.1} FPS) on a mostly static screen; treated as idle, not a performance problem"
            ));
        } else {
            findings.issue(format!(
                "FPS too low: average {avg_fps:.1} is below the {:.0} FPS minimum",
                t.min_fps
            ));
            findings.suggest(SUGGEST_OVERDRAW);
            findings.suggest(SUGGEST_MAIN_THREAD);
        }
    } else if avg_fps < t.warn_fps {
        findings.issue(format!(
            "Mediocre FPS: average {avg_fps:.1} is below the {:.0} FPS comfort level",
            t.warn_fps
        ));
        findings.suggest(SUGGEST_FRAME_PACING);
    }

    if jank_rate > 2.0 * t.jank_rate_pct {
        findings.issue(format!(
            "Severe jank: jank rate {jank_rate:.2}% is more than twice the {:.1}% limit",
            t.jank_rate_pct
        ));
        findings.suggest(SUGGEST_LONG_FRAMES);
    } else if jank_rate > t.jank_rate_pct {
        findings.issue(format!(
            "Noticeable jank: jank rate {jank_rate:.2}% exceeds the {:.1}% limit",
            t.jank_rate_pct
        ));
        findings.suggest(SUGGEST_LONG_FRAMES);
    }

    if avg_cpu > t.max_cpu_pct {
        findings.issue(format!(
            "High CPU usage: average {avg_cpu:.1}% exceeds {:.0}%",
            t.max_cpu_pct
        ));
        findings.suggest(SUGGEST_MAIN_THREAD);
        findings.suggest(SUGGEST_BACKGROUND);
    }

    if aggregate.max_mem > t.max_mem_mb {
        findings.issue(format!(
            "High memory usage: peak {:.0} MB exceeds {:.0} MB",
            aggregate.max_mem, t.max_mem_mb
        ));
        findings.suggest(SUGGEST_LEAKS);
        findings.suggest(SUGGEST_CACHES);
    }

    if aggregate.avg_gpu() > GPU_SUGGESTION_PCT {
        findings.suggest(SUGGEST_GPU);
    }

    if findings.issues.is_empty() {
        findings.issue(ISSUE_STABLE.to_string());
    }
    if findings.suggestions.is_empty() {
        findings.suggest(SUGGEST_NONE);
    }

    let score = score(aggregate, profile);
    AnalysisConclusion {
        score,
        grade: Grade::from_score(score),
        issues: findings.issues,
        suggestions: findings.suggestions,
    }
}

/// The weighted score alone.
#[must_use]
pub fn score(aggregate: &Aggregate, profile: &ClassificationProfile) -> u8 {
    let t = &profile.thresholds;
    let w = &profile.weights;
    let avg_cpu = aggregate.avg_cpu();

    let mut score = 100.0;
    if !aggregate.is_static(profile) {
        score -= ((TARGET_FPS - aggregate.avg_fps()) * w.fps)
            .max(0.0)
            .min(MAX_FPS_DEDUCTION);
    }
    score -= (aggregate.jank_rate() * w.jank).min(MAX_JANK_DEDUCTION);
    if avg_cpu > t.max_cpu_pct {
        score -= ((avg_cpu - t.max_cpu_pct) * w.cpu).min(MAX_CPU_DEDUCTION);
    }

    score.clamp(0.0, 100.0).round() as u8
}
