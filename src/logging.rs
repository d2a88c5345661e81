//! Tracing setup for the binary.
//!
//! One `tracing-subscriber` fmt layer writes to stderr in the chosen
//! [`OutputFormat`], so reports printed on stdout stay clean. `RUST_LOG`
//! overrides the configured level.
//!
//! # Example
//! ```no_run
//! use perfscope::config::Settings;
//! use perfscope::logging::{self, OutputFormat, TracingConfig};
//!
//! let settings = Settings::load()?;
//! logging::init(TracingConfig::from_settings(&settings)?.with_format(OutputFormat::Json))?;
//! tracing::warn!(device = "emulator-5554", "Link dropped");
//! # Ok::<(), perfscope::error::PerfError>(())
//! ```

use crate::config::Settings;
use crate::error::{AppResult, PerfError};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-line, colored.
    Pretty,
    /// One line per event, no colors.
    Compact,
    /// One JSON object per event.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "Invalid log format '{other}'. Must be one of: pretty, compact, json"
            )),
        }
    }
}

/// Level and layout of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// Default level when `RUST_LOG` is unset.
    pub level: Level,
    /// Output layout.
    pub format: OutputFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl TracingConfig {
    /// Compact output at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self {
            level,
            format: OutputFormat::Compact,
        }
    }

    /// Take the level from `application.log_level`.
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        let raw = &settings.application.log_level;
        let level = Level::from_str(raw).map_err(|_| {
            PerfError::Configuration(format!(
                "Invalid log level '{raw}'. Must be one of: trace, debug, info, warn, error"
            ))
        })?;
        Ok(Self::new(level))
    }

    /// Set output format
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// Install the global subscriber.
///
/// Idempotent: if a subscriber is already installed this returns `Ok(())`.
pub fn init(config: TracingConfig) -> AppResult<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level).into())
        .from_env_lossy();

    let layer = fmt::layer().with_writer(std::io::stderr);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        OutputFormat::Pretty => layer.pretty().boxed(),
        OutputFormat::Compact => layer.compact().with_ansi(false).boxed(),
        OutputFormat::Json => layer.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .or_else(|e| {
            if tracing::dispatcher::has_been_set() {
                Ok(())
            } else {
                Err(PerfError::Configuration(format!(
                    "Failed to initialize tracing: {e}"
                )))
            }
        })
}
