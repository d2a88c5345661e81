//! Configuration System using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (every field has one, so no file is required)
//! 2. `config/perfscope.toml` (or the path passed to [`Settings::load_from`])
//! 3. Environment variables prefixed with `PERFSCOPE_`, nested keys split on `__`
//!
//! # Example
//! ```no_run
//! use perfscope::config::Settings;
//!
//! let settings = Settings::load()?;
//! settings.validate()?;
//! println!("Producer: {}", settings.session.server_url);
//! # Ok::<(), perfscope::error::PerfError>(())
//! ```

use crate::analysis::classify::ClassificationProfile;
use crate::correlate::{DEFAULT_EXPORT_MARKER_TOLERANCE_MS, DEFAULT_SCREENSHOT_TOLERANCE_MS};
use crate::data::store::{
    StoreCapacity, DEFAULT_LOG_CAPACITY, DEFAULT_SCREENSHOT_CAPACITY,
};
use crate::data::history::DEFAULT_METRICS_CAPACITY;
use crate::error::{AppResult, PerfError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/perfscope.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application settings
    pub application: ApplicationConfig,
    /// Live session settings
    pub session: SessionConfig,
    /// Time-axis matching windows
    pub correlation: CorrelationConfig,
    /// Recording analysis settings
    pub analysis: AnalysisConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "perfscope".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Live session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base WebSocket URL of the device producer
    pub server_url: String,
    /// Delay before reconnecting after the link drops, in milliseconds
    pub reconnect_delay_ms: u64,
    /// Metric ticks kept in the rolling window
    pub metrics_capacity: usize,
    /// Device log lines kept
    pub log_capacity: usize,
    /// Screenshots kept
    pub screenshot_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8000".to_string(),
            reconnect_delay_ms: 3000,
            metrics_capacity: DEFAULT_METRICS_CAPACITY,
            log_capacity: DEFAULT_LOG_CAPACITY,
            screenshot_capacity: DEFAULT_SCREENSHOT_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Reconnect delay as a `Duration`.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Buffer capacities for the session store.
    #[must_use]
    pub fn capacity(&self) -> StoreCapacity {
        StoreCapacity {
            metrics: self.metrics_capacity,
            logs: self.log_capacity,
            screenshots: self.screenshot_capacity,
        }
    }
}

/// Matching windows used when correlating events with the time series
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Window for marker lookups on the live chart
    pub marker_tolerance_ms: i64,
    /// Window for screenshot lookups
    pub screenshot_tolerance_ms: i64,
    /// Window for labelling exported rows with markers
    pub export_marker_tolerance_ms: i64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            marker_tolerance_ms: DEFAULT_EXPORT_MARKER_TOLERANCE_MS,
            screenshot_tolerance_ms: DEFAULT_SCREENSHOT_TOLERANCE_MS,
            export_marker_tolerance_ms: DEFAULT_EXPORT_MARKER_TOLERANCE_MS,
        }
    }
}

/// Recording analysis configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Extra classification profiles, evaluated after the built-in ones
    pub profiles: Vec<ClassificationProfile>,
}

impl Settings {
    /// Load configuration from `config/perfscope.toml` and environment variables
    ///
    /// Environment variables override file values with prefix `PERFSCOPE_`.
    /// Example: `PERFSCOPE_SESSION__RECONNECT_DELAY_MS=5000`
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path. A missing file is not an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Self::figment(path.as_ref()).extract().map_err(PerfError::from)
    }

    /// The layered provider stack, exposed for inspection in tests.
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PERFSCOPE_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(PerfError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let url = url::Url::parse(&self.session.server_url).map_err(|e| {
            PerfError::Configuration(format!(
                "Invalid server_url '{}': {}",
                self.session.server_url, e
            ))
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(PerfError::Configuration(format!(
                "Unsupported server_url scheme '{}'. Use ws:// or wss://",
                url.scheme()
            )));
        }

        for (name, value) in [
            ("metrics_capacity", self.session.metrics_capacity),
            ("log_capacity", self.session.log_capacity),
            ("screenshot_capacity", self.session.screenshot_capacity),
        ] {
            if value == 0 {
                return Err(PerfError::Configuration(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        for (name, value) in [
            ("marker_tolerance_ms", self.correlation.marker_tolerance_ms),
            ("screenshot_tolerance_ms", self.correlation.screenshot_tolerance_ms),
            (
                "export_marker_tolerance_ms",
                self.correlation.export_marker_tolerance_ms,
            ),
        ] {
            if value < 0 {
                return Err(PerfError::Configuration(format!(
                    "{name} must not be negative"
                )));
            }
        }

        let mut ids = std::collections::HashSet::new();
        for profile in &self.analysis.profiles {
            if profile.id == crate::analysis::classify::DEFAULT_PROFILE_ID {
                return Err(PerfError::Configuration(
                    "The default profile cannot be redefined".to_string(),
                ));
            }
            if !ids.insert(profile.id.as_str()) {
                return Err(PerfError::Configuration(format!(
                    "Duplicate profile ID: {}",
                    profile.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.session.reconnect_delay(), Duration::from_millis(3000));
        assert_eq!(settings.session.capacity(), StoreCapacity::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = Settings::load_from("does/not/exist.toml").unwrap();
        assert_eq!(settings.application.name, "perfscope");
        assert_eq!(settings.session.metrics_capacity, 3600);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[session]
server_url = "ws://10.0.0.2:9000"
reconnect_delay_ms = 500

[[analysis.profiles]]
id = "maps"
name = "Navigation"
keywords = ["map", "navi"]
thresholds = {{ min_fps = 25.0, warn_fps = 40.0, max_cpu_pct = 55.0, max_mem_mb = 900.0, jank_rate_pct = 5.0, static_cpu_pct = 30.0 }}
weights = {{ fps = 0.6, jank = 2.0, cpu = 0.5 }}
"#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.session.server_url, "ws://10.0.0.2:9000");
        assert_eq!(settings.session.reconnect_delay_ms, 500);
        assert_eq!(settings.session.log_capacity, 1000);
        assert_eq!(settings.analysis.profiles.len(), 1);
        assert_eq!(settings.analysis.profiles[0].keywords, vec!["map", "navi"]);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = Settings::default();
        settings.application.log_level = "loud".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_http_scheme_rejected() {
        let mut settings = Settings::default();
        settings.session.server_url = "http://127.0.0.1:8000".to_string();
        let err = settings.validate().unwrap_err().to_string();
        assert!(err.contains("Unsupported server_url scheme"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut settings = Settings::default();
        settings.session.screenshot_capacity = 0;
        let err = settings.validate().unwrap_err().to_string();
        assert!(err.contains("screenshot_capacity"));
    }
}
