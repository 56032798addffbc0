//! Piggyback CLI - store, inspect and clean up piggyback data

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use piggyback_core::application::housekeeping::DEFAULT_HOUSEKEEPING_INTERVAL;
use piggyback_core::application::{shutdown_channel, HousekeepingScheduler, PiggybackService};
use piggyback_core::domain::{
    CacheAgeConfig, CacheAgeSetting, Outcome, RawDataInfo, DEFAULT_MAX_CACHE_AGE,
};
use piggyback_core::port::time_provider::SystemTimeProvider;
use piggyback_infra_fs::{
    FsLayout, FsPiggybackRepository, DEFAULT_PIGGYBACK_DIR, DEFAULT_SOURCE_STATUS_DIR,
};
use serde::Serialize;
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::info;

#[derive(Parser)]
#[command(name = "piggyback")]
#[command(about = "Piggyback data cache for monitoring sources", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding <target>/<source> payload files
    #[arg(long, env = "PIGGYBACK_DIR", default_value = DEFAULT_PIGGYBACK_DIR)]
    piggyback_dir: String,

    /// Directory holding source liveness stamps
    #[arg(long, env = "PIGGYBACK_SOURCE_DIR", default_value = DEFAULT_SOURCE_STATUS_DIR)]
    source_dir: String,

    /// Default maximum age of piggyback files (seconds)
    #[arg(long, env = "PIGGYBACK_MAX_CACHE_AGE", default_value_t = DEFAULT_MAX_CACHE_AGE.as_secs())]
    max_cache_age: u64,

    /// Per-target max age overrides, e.g. "host-a=600,host-b=-1" (negative = never)
    #[arg(long = "override", env = "PIGGYBACK_MAX_AGE_OVERRIDES")]
    overrides: Option<String>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store piggyback data of a source for one target (lines from --file or stdin)
    Store {
        /// Source host that collected the data
        #[arg(short, long)]
        source: String,

        /// Target host the data belongs to
        #[arg(short, long, required_unless_present = "empty")]
        target: Option<String>,

        /// Read payload from this file instead of stdin
        #[arg(short, long, conflicts_with = "empty")]
        file: Option<String>,

        /// Only record that the source ran, without any payload
        #[arg(long, conflicts_with = "target")]
        empty: bool,
    },

    /// Show classified piggyback data of a target host
    Show {
        /// Target host
        target: String,

        /// Max age for this call: seconds, negative for never, or "default"
        #[arg(long, allow_hyphen_values = true)]
        max_age: Option<CacheAgeSetting>,

        /// Print raw data of successfully processed sources instead of a table
        #[arg(long)]
        raw: bool,
    },

    /// Check whether any piggyback data exists for a target (exit code 1 if not)
    Has {
        /// Target host
        target: String,
    },

    /// List source hosts that deposited data for a target
    Sources {
        /// Target host
        target: String,
    },

    /// List (source, target) pairs whose source is still sending
    Hosts,

    /// Remove the liveness stamp of a source
    RemoveStatus {
        /// Source host
        source: String,
    },

    /// Remove outdated piggyback files and stamps once
    Cleanup,

    /// Run cleanup periodically until Ctrl+C
    Housekeeping {
        /// Seconds between cleanup passes
        #[arg(long, default_value_t = DEFAULT_HOUSEKEEPING_INTERVAL.as_secs())]
        interval_secs: u64,
    },
}

#[derive(Tabled)]
struct RecordRow {
    source: String,
    outcome: String,
    reason: String,
    path: String,
}

impl From<&RawDataInfo> for RecordRow {
    fn from(info: &RawDataInfo) -> Self {
        let outcome = match info.outcome {
            Outcome::Processed => info.outcome.to_string().green().to_string(),
            Outcome::TooOld | Outcome::NotUpdated => info.outcome.to_string().yellow().to_string(),
            Outcome::NotSending => info.outcome.to_string().red().to_string(),
        };
        Self {
            source: info.source_hostname.clone(),
            outcome,
            reason: info.reason.clone(),
            path: info.file_path.display().to_string(),
        }
    }
}

#[derive(Serialize, Tabled)]
struct PairRow {
    source: String,
    target: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_lines(file: Option<&str>) -> Result<Vec<String>> {
    let content = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload file {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read payload from stdin")?;
            buf
        }
    };
    Ok(content.lines().map(str::to_string).collect())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_logging()?;

    // Configuration
    let layout = FsLayout::from_config(&cli.piggyback_dir, &cli.source_dir);
    let mut cache_age = CacheAgeConfig::new(Duration::from_secs(cli.max_cache_age));
    if let Some(spec) = cli.overrides.as_deref() {
        cache_age.overrides =
            CacheAgeConfig::parse_overrides(spec).context("Invalid max age overrides")?;
    }

    // DI wiring
    let repo = Arc::new(FsPiggybackRepository::new(layout));
    let service = Arc::new(PiggybackService::new(
        repo,
        Arc::new(SystemTimeProvider),
        cache_age.default_max_age,
    ));

    match cli.command {
        Commands::Store {
            source,
            target,
            file,
            empty,
        } => {
            if empty {
                service
                    .store(&source, Vec::<(String, Vec<String>)>::new())
                    .await?;
            } else if let Some(target) = target {
                let lines = read_lines(file.as_deref())?;
                service.store(&source, [(target, lines)]).await?;
            }
            if !cli.json {
                println!("{}", format!("✓ Stored piggyback data of {}", source).green().bold());
            }
        }

        Commands::Show {
            target,
            max_age,
            raw,
        } => {
            let setting = max_age.unwrap_or_else(|| cache_age.setting_for(&target));
            let infos = service.get_raw_data(&target, setting).await?;

            if cli.json {
                print_json(&infos)?;
            } else if raw {
                for info in infos.iter().filter(|i| i.successfully_processed) {
                    print!("{}", info.raw_data);
                }
            } else if infos.is_empty() {
                println!("{}", format!("No piggyback data for {}", target).yellow());
            } else {
                let rows: Vec<RecordRow> = infos.iter().map(RecordRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Has { target } => {
            let has = service.has_raw_data(&target).await?;
            if cli.json {
                print_json(&serde_json::json!({ "target": target, "has_raw_data": has }))?;
            } else {
                println!("{}", if has { "yes" } else { "no" });
            }
            if !has {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Sources { target } => {
            let sources = service.get_source_hostnames(&target).await?;
            if cli.json {
                print_json(&sources)?;
            } else {
                for source in sources {
                    println!("{}", source);
                }
            }
        }

        Commands::Hosts => {
            let rows: Vec<PairRow> = service
                .get_source_and_target_hosts(CacheAgeSetting::UseDefault)
                .await?
                .into_iter()
                .map(|(source, target)| PairRow { source, target })
                .collect();

            if cli.json {
                print_json(&rows)?;
            } else if rows.is_empty() {
                println!("{}", "No active piggyback relationships".yellow());
            } else {
                println!("{}", Table::new(rows));
            }
        }

        Commands::RemoveStatus { source } => {
            let removed = service.remove_source_status_file(&source).await?;
            if cli.json {
                print_json(&serde_json::json!({ "source": source, "removed": removed }))?;
            } else if removed {
                println!("{}", format!("✓ Removed status of {}", source).green().bold());
            } else {
                println!("{}", format!("○ No status for {}", source).yellow());
            }
        }

        Commands::Cleanup => {
            let stats = service
                .cleanup_piggyback_files(CacheAgeSetting::UseDefault)
                .await?;
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("{}", "✓ Cleanup completed".green().bold());
                println!("  {} {}", "Source stamps removed:".bold(), stats.removed_source_statuses);
                println!("  {} {}", "Payload files removed:".bold(), stats.removed_payload_files);
                println!("  {} {}", "Target dirs removed:".bold(), stats.removed_target_dirs);
            }
        }

        Commands::Housekeeping { interval_secs } => {
            let (shutdown_tx, shutdown_rx) = shutdown_channel();
            let scheduler = HousekeepingScheduler::new(
                service.clone(),
                CacheAgeSetting::UseDefault,
                Duration::from_secs(interval_secs),
            );
            let handle = tokio::spawn(scheduler.run(shutdown_rx));

            info!("Press Ctrl+C to stop housekeeping");
            tokio::signal::ctrl_c().await?;

            info!("Shutdown signal received. Exiting gracefully...");
            shutdown_tx.shutdown();
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }

    Ok(ExitCode::SUCCESS)
}
