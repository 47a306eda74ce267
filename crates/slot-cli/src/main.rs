//! `slots` CLI — compute meeting availability from JSON scenarios.
//!
//! ## Usage
//!
//! ```sh
//! # Compute the availability partition for a scenario (stdin → stdout)
//! slots partition < scenario.json
//!
//! # From a file, with engine config and a fixed clock
//! slots partition -i scenario.json --config engine.json --now 2026-03-16T06:00:00Z
//!
//! # Reduce participants' weekly profiles to their common UTC slots
//! slots reduce -i profiles.json
//!
//! # Validate profiles before storing them
//! slots validate -i profiles.json
//!
//! # Check a meeting time against an event's open windows
//! slots check -i scenario.json --event evt --start 2026-03-17T10:00:00Z --end 2026-03-17T11:00:00Z
//! ```
//!
//! Logs go to stderr; set `SLOTS_LOG=debug` (or `RUST_LOG`) to trace each
//! pipeline stage.

use std::io::{self, Read};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use slot_engine::pipeline::{AvailabilityRequest, AvailabilityService, Collaborators};
use slot_engine::{reduce_profiles, EngineConfig, InMemoryCollaborators, UserAvailabilityProfile};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slots", version, about = "Meeting availability engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the AVAILABLE/UNAVAILABLE partition for a scenario
    Partition {
        /// Scenario file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Current time as RFC 3339; overrides the scenario's `now`
        #[arg(long)]
        now: Option<String>,
        /// Report time no recurring slot can use as UNAVAILABLE
        #[arg(long)]
        include_unavailable: bool,
    },
    /// Reduce a JSON array of profiles to their common weekly slots
    Reduce {
        /// Profiles file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Instant at which named timezones are resolved (default: now)
        #[arg(long)]
        reference: Option<String>,
    },
    /// Validate a JSON array of profiles
    Validate {
        /// Profiles file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Check a meeting time against an event's open windows
    Check {
        /// Scenario file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Event id to check against
        #[arg(long)]
        event: String,
        /// Meeting start as RFC 3339
        #[arg(long)]
        start: String,
        /// Meeting end as RFC 3339
        #[arg(long)]
        end: String,
        /// Current time as RFC 3339; overrides the scenario's `now`
        #[arg(long)]
        now: Option<String>,
        /// Accept meetings in the past
        #[arg(long)]
        allow_past: bool,
    },
}

/// A request plus the collaborator data it runs against.
#[derive(Deserialize)]
struct Scenario {
    #[serde(default)]
    request: AvailabilityRequest,
    #[serde(default)]
    now: Option<DateTime<Utc>>,
    #[serde(flatten)]
    store: InMemoryCollaborators,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SLOTS_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Partition {
            input,
            output,
            now,
            include_unavailable,
        } => {
            let scenario = read_scenario(input.as_deref())?;
            let now = resolve_now(now.as_deref(), scenario.now)?;
            info!("computing availability as of {}", now.to_rfc3339());

            let service = build_service(scenario.store, config);
            let partition = service
                .availability(&scenario.request, now, include_unavailable)
                .await
                .context("Failed to compute availability")?;

            let pretty = serde_json::to_string_pretty(&partition)?;
            write_output(output.as_deref(), &pretty)?;
        }
        Commands::Reduce {
            input,
            output,
            reference,
        } => {
            let profiles = read_profiles(input.as_deref())?;
            let reference = resolve_now(reference.as_deref(), None)?;
            let slots = reduce_profiles(&profiles, &config, reference)
                .context("Failed to reduce profiles")?;
            debug!("{} profiles reduced to {} slots", profiles.len(), slots.len());

            let pretty = serde_json::to_string_pretty(&slots)?;
            write_output(output.as_deref(), &pretty)?;
        }
        Commands::Validate { input } => {
            let profiles = read_profiles(input.as_deref())?;
            for profile in &profiles {
                profile.validate().with_context(|| {
                    format!("Invalid profile for contact '{}'", profile.contact_id)
                })?;
            }
            println!("{} profiles valid", profiles.len());
        }
        Commands::Check {
            input,
            event,
            start,
            end,
            now,
            allow_past,
        } => {
            let scenario = read_scenario(input.as_deref())?;
            let now = resolve_now(now.as_deref(), scenario.now)?;
            let start = parse_instant(&start)?;
            let end = parse_instant(&end)?;

            let service = build_service(scenario.store, config);
            let check = service.validate_meeting_times(&event, start, end, now, allow_past).await;

            println!("{}", serde_json::to_string_pretty(&check)?);
            if !check.status {
                process::exit(1);
            }
        }
    }

    Ok(())
}

fn build_service(store: InMemoryCollaborators, config: EngineConfig) -> AvailabilityService {
    AvailabilityService::new(Collaborators::from_shared(Arc::new(store)), config)
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path).context("Failed to load engine config"),
        None => Ok(EngineConfig::default()),
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid RFC 3339 timestamp: '{}'", raw))
}

/// An explicit flag wins over the scenario's clock, which wins over the system clock.
fn resolve_now(flag: Option<&str>, scenario: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
    match (flag, scenario) {
        (Some(raw), _) => parse_instant(raw),
        (None, Some(now)) => Ok(now),
        (None, None) => Ok(Utc::now()),
    }
}

fn read_scenario(path: Option<&str>) -> Result<Scenario> {
    let json = read_input(path)?;
    serde_json::from_str(&json).context("Failed to parse scenario JSON")
}

fn read_profiles(path: Option<&str>) -> Result<Vec<UserAvailabilityProfile>> {
    let json = read_input(path)?;
    serde_json::from_str(&json).context("Failed to parse profiles JSON")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
