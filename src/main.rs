//! CLI Entry Point for perfscope
//!
//! Provides command-line interface for:
//! - Following a device live (reconnecting session, optional CSV export on exit)
//! - Analyzing a recorded CSV file
//! - Listing the classification profiles
//!
//! # Usage
//!
//! Monitor a device until Ctrl+C, placing markers by typing a label and Enter:
//! ```bash
//! perfscope monitor emulator-5554 --target com.example.shop --export recordings/
//! ```
//!
//! Analyze a recording:
//! ```bash
//! perfscope analyze recordings/1718000000000_com.example.shop.csv --profile shopping
//! ```

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use perfscope::analysis::{Analysis, AnalysisEngine, ProfileRegistry};
use perfscope::config::{Settings, DEFAULT_CONFIG_PATH};
use perfscope::export::{recording_file_name, write_recording};
use perfscope::logging::{self, OutputFormat, TracingConfig};
use perfscope::measurement_types::LogEntry;
use perfscope::network::MetricsSession;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "perfscope")]
#[command(about = "Live mobile performance monitor and recording analyzer", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, default_value = "compact")]
    log_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a device's metrics until Ctrl+C
    Monitor {
        /// Device serial / id as known to the producer
        device: String,

        /// Application to monitor (defaults to the foreground app)
        #[arg(long)]
        target: Option<String>,

        /// Producer WebSocket URL, overriding the configuration
        #[arg(long)]
        server: Option<String>,

        /// Write the recording as CSV on exit (file or directory)
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Analyze a recorded CSV file
    Analyze {
        /// Recording to analyze
        file: PathBuf,

        /// Judge with this profile instead of the detected one
        #[arg(long)]
        profile: Option<String>,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// List classification profiles in evaluation order
    Profiles,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    settings.validate()?;

    logging::init(TracingConfig::from_settings(&settings)?.with_format(cli.log_format))?;

    let registry = ProfileRegistry::with_extra(settings.analysis.profiles.clone());

    match cli.command {
        Commands::Monitor {
            device,
            target,
            server,
            export,
        } => monitor(settings, device, target, server, export).await,
        Commands::Analyze {
            file,
            profile,
            json,
        } => analyze(AnalysisEngine::new(registry), &file, profile.as_deref(), json),
        Commands::Profiles => {
            list_profiles(&registry);
            Ok(())
        }
    }
}

async fn monitor(
    mut settings: Settings,
    device: String,
    target: Option<String>,
    server: Option<String>,
    export: Option<PathBuf>,
) -> Result<()> {
    if let Some(server) = server {
        settings.session.server_url = server;
        settings.validate()?;
    }

    let session =
        MetricsSession::websocket(&settings.session)?.with_correlation(&settings.correlation);
    let mut state_rx = session.subscribe_state();
    let mut log_rx = session.subscribe_log_updates();
    let mut shot_rx = session.subscribe_screenshot_updates();
    let mut package_rx = session.subscribe_current_package();

    let started_at = Utc::now();
    session.start(device.clone(), target.clone()).await;
    println!(
        "Monitoring {device} via {} (Ctrl+C to stop, type a label + Enter to mark)",
        settings.session.server_url
    );

    let mut labels = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut log_cursor = 0;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                match state.error_message() {
                    Some(reason) => warn!(state = state.label(), %reason, "Session state changed"),
                    None => info!(state = state.label(), "Session state changed"),
                }
            }
            changed = log_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                log_rx.borrow_and_update();
                let (fresh, cursor) = session.with_store(|store| {
                    let fresh: Vec<LogEntry> = store.logs_after(log_cursor).cloned().collect();
                    (fresh, store.log_cursor())
                });
                log_cursor = cursor;
                for entry in fresh {
                    if entry.is_crash {
                        error!(level = %entry.level, "{}", entry.message);
                    } else {
                        info!(level = %entry.level, "{}", entry.message);
                    }
                }
            }
            changed = shot_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                shot_rx.borrow_and_update();
                if let Some(shot) = session.with_store(|s| s.current_screenshot().cloned()) {
                    let marker = session.nearest_marker(shot.timestamp_ms).map(|m| m.label);
                    info!(url = %shot.url, marker = ?marker, "Screenshot captured");
                }
            }
            changed = package_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(package) = package_rx.borrow_and_update().as_deref() {
                    info!(package, "Foreground application");
                }
            }
            line = labels.recv(), if stdin_open => match line {
                Some(label) if !label.trim().is_empty() => {
                    match session.add_marker(label.trim()) {
                        Ok(marker) => {
                            let shot = session.nearest_screenshot(marker.timestamp_ms).map(|s| s.url);
                            info!(label = %marker.label, screenshot = ?shot, "Marker placed");
                        }
                        Err(e) => warn!(error = %e, "Marker rejected"),
                    }
                }
                Some(_) => {}
                None => stdin_open = false,
            },
        }
    }

    session.stop().await;

    if let Some(path) = export {
        let path = resolve_export_path(path, started_at, target.as_deref());
        let rows = write_recording(
            &path,
            &session.snapshot(),
            &Local,
            settings.correlation.export_marker_tolerance_ms,
        )?;
        println!("Wrote {rows} samples to {}", path.display());
    }
    Ok(())
}

/// Marker labels typed on stdin. A plain thread, so a pending read never blocks shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn resolve_export_path(
    path: PathBuf,
    started_at: chrono::DateTime<Utc>,
    target: Option<&str>,
) -> PathBuf {
    if path.is_dir() {
        path.join(recording_file_name(started_at, target))
    } else {
        path
    }
}

fn analyze(engine: AnalysisEngine, file: &Path, profile: Option<&str>, json: bool) -> Result<()> {
    let Some(mut analysis) = engine.analyze_file(file)? else {
        println!("{}: no data to analyze", file.display());
        return Ok(());
    };
    if let Some(profile) = profile {
        engine.reclassify(&mut analysis, profile)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_report(&analysis);
    }
    Ok(())
}

fn print_report(analysis: &Analysis) {
    let s = &analysis.summary;
    let c = &analysis.conclusion;
    println!("Recording: {}", analysis.label);
    println!("Profile:   {} ({})", s.profile_name, s.profile_id);
    println!("Samples:   {} ({} → {})", s.sample_count, s.start_time, s.end_time);
    println!();
    println!("  FPS     avg {:>7.1}", s.avg_fps);
    println!("  CPU     avg {:>7.1}%   max {:>7.1}%", s.avg_cpu, s.max_cpu);
    println!("  GPU     avg {:>7.1}%", s.avg_gpu);
    println!("  Memory  avg {:>7.1} MB max {:>7.1} MB", s.avg_mem, s.max_mem);
    println!("  Jank    total {:.0}, rate {:.2}%", s.total_jank, s.jank_rate);
    if s.is_static {
        println!("  (low frame rate attributed to a static screen)");
    }
    println!();
    println!("Score: {} ({})", c.score, c.grade);
    println!();
    println!("Issues:");
    for issue in &c.issues {
        println!("  - {issue}");
    }
    println!("Suggestions:");
    for suggestion in &c.suggestions {
        println!("  - {suggestion}");
    }
}

fn list_profiles(registry: &ProfileRegistry) {
    for profile in registry.iter() {
        let t = &profile.thresholds;
        let keywords = if profile.keywords.is_empty() {
            "(fallback)".to_string()
        } else {
            profile.keywords.join(", ")
        };
        println!("{} - {}", profile.id, profile.name);
        println!("    keywords: {keywords}");
        println!(
            "    fps min {} / warn {}, cpu max {}%, mem max {} MB, jank {}%, static cpu {}%",
            t.min_fps, t.warn_fps, t.max_cpu_pct, t.max_mem_mb, t.jank_rate_pct, t.static_cpu_pct
        );
    }
}
