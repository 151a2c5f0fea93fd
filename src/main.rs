//! Binary entry point for feedsweep.
//!
//! This binary provides the CLI interface for the duplicate sweeper.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use feedsweep::config::FeedsweepConfig;
use feedsweep::feed::{FeedSource, SecretResolver};
use feedsweep::models::{
    DEFAULT_FUZZY_THRESHOLD, DEFAULT_WINDOW_HOURS, DuplicateScope, Entry, FeedId, Item,
    MatchPolicy,
};
use feedsweep::observability::{self, ObservabilityConfig};
use feedsweep::services::deduplication::ActionPlanner;
use feedsweep::services::{SkippedEntry, SweepReport, SweepService, prepare_items};
use feedsweep::{ActionPlan, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Feedsweep - marks duplicate stories across Miniflux feeds as read.
#[derive(Parser)]
#[command(name = "feedsweep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run configured jobs against Miniflux.
    Run {
        /// Job to run; repeat for several. Runs every job when omitted.
        #[arg(short, long = "job")]
        jobs: Vec<String>,

        /// Plan and log only, whatever the jobs say.
        #[arg(long)]
        dry_run: bool,

        /// Print the reports as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Plan offline over JSON entry dumps and print the plan.
    Plan {
        /// Unread entries (JSON array, or an object with an `entries` array).
        #[arg(long)]
        unread: PathBuf,

        /// Read entries checked by the already-seen window.
        #[arg(long)]
        read: Option<PathBuf>,

        /// Matching mode: exact or fuzzy.
        #[arg(short, long, default_value = "exact")]
        mode: String,

        /// Fuzzy similarity threshold (1-100).
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
        threshold: Option<u8>,

        /// Feed whose copy of a story is kept.
        #[arg(long)]
        keep_feed: Option<i64>,

        /// Already-seen window in hours; 24 when given without a value.
        #[arg(long, num_args = 0..=1)]
        window_hours: Option<Option<u32>>,

        /// Which losers are marked: any, cross_feed, or same_feed.
        #[arg(long, default_value = "any")]
        scope: String,

        /// End of the already-seen window (RFC 3339). Defaults to now.
        #[arg(long)]
        now: Option<String>,
    },

    /// Show configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match FeedsweepConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let _observability =
        match observability::init(ObservabilityConfig::from_config(&config, cli.verbose)) {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("Failed to initialize observability: {e}");
                return ExitCode::FAILURE;
            },
        };
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    match run_command(cli, config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: FeedsweepConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run {
            jobs,
            dry_run,
            json,
        } => cmd_run(&config, &jobs, dry_run, json),

        Commands::Plan {
            unread,
            read,
            mode,
            threshold,
            keep_feed,
            window_hours,
            scope,
            now,
        } => {
            let policy = plan_policy(&mode, threshold, keep_feed, window_hours, &scope)?;
            cmd_plan(&unread, read.as_deref(), policy, now.as_deref())
        },

        Commands::Config { show } => cmd_config(&config, show),
    }
}

/// Runs configured jobs.
fn cmd_run(
    config: &FeedsweepConfig,
    names: &[String],
    dry_run: bool,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut jobs = config.select_jobs(names)?;
    if dry_run {
        for job in &mut jobs {
            job.dry_run = true;
        }
    }

    let client = config.miniflux.client(&SecretResolver::new())?;
    client.check_connection()?;
    tracing::debug!(url = client.base_url(), "Connected to Miniflux");
    let service = SweepService::new(client);

    let mut reports: Vec<SweepReport> = Vec::with_capacity(jobs.len());
    let mut failed = false;
    for job in &jobs {
        match service.run(job, Utc::now()) {
            Ok(report) => {
                failed |= !report.is_success();
                reports.push(report);
            },
            Err(e) => {
                tracing::error!(job = %job.name, error = %e, "Job aborted");
                eprintln!("{}: aborted: {e}", job.name);
                failed = true;
            },
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", report.summary());
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Builds the policy for an offline plan.
fn plan_policy(
    mode: &str,
    threshold: Option<u8>,
    keep_feed: Option<i64>,
    window_hours: Option<Option<u32>>,
    scope: &str,
) -> Result<MatchPolicy, Error> {
    let mut policy = match mode.trim().to_lowercase().as_str() {
        "exact" => MatchPolicy::exact(),
        "fuzzy" => MatchPolicy::fuzzy(threshold.unwrap_or(DEFAULT_FUZZY_THRESHOLD)),
        other => {
            return Err(Error::InvalidConfig(format!(
                "unknown mode '{other}', expected exact or fuzzy"
            )));
        },
    };

    let scope = DuplicateScope::parse(scope).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "unknown scope '{scope}', expected any, cross_feed, or same_feed"
        ))
    })?;
    policy = policy.with_scope(scope);

    if let Some(feed) = keep_feed {
        policy = policy.with_keep_feed(FeedId::new(feed));
    }
    if let Some(hours) = window_hours {
        policy = policy.with_window_hours(hours.unwrap_or(DEFAULT_WINDOW_HOURS));
    }
    policy.validate()?;
    Ok(policy)
}

/// Entry dump as written by `GET /v1/feeds/{id}/entries` or as a bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum EntryDump {
    Page { entries: Vec<Entry> },
    List(Vec<Entry>),
}

/// Output of the `plan` command.
#[derive(Serialize)]
struct PlanOutput {
    now: DateTime<Utc>,
    skipped: Vec<SkippedEntry>,
    plan: ActionPlan,
}

/// Plans offline over entry dumps.
fn cmd_plan(
    unread: &Path,
    read: Option<&Path>,
    policy: MatchPolicy,
    now: Option<&str>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let now = match now {
        Some(value) => DateTime::parse_from_rfc3339(value.trim())
            .map_err(|e| Error::InvalidConfig(format!("invalid --now '{value}': {e}")))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let (mut unread_items, mut skipped) = prepare_items(read_entries(unread)?);
    let (read_items, skipped_read) = match read {
        Some(path) => prepare_items(read_entries(path)?),
        None => (Vec::new(), Vec::new()),
    };
    skipped.extend(skipped_read);
    unread_items.sort_by(Item::chronological_cmp);

    let plan = ActionPlanner::new(policy).plan(&unread_items, &read_items, now);
    let output = PlanOutput { now, skipped, plan };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

/// Reads an entry dump.
fn read_entries(path: &Path) -> Result<Vec<Entry>, Error> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
        operation: "read_entries".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    let dump: EntryDump = serde_json::from_str(&contents).map_err(|e| Error::OperationFailed {
        operation: "parse_entries".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    Ok(match dump {
        EntryDump::Page { entries } | EntryDump::List(entries) => entries,
    })
}

/// Shows configuration.
fn cmd_config(
    config: &FeedsweepConfig,
    show: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if show {
        if let Some(path) = &config.source_path {
            println!("# Loaded from {}", path.display());
        } else {
            println!("# No config file found, showing defaults");
        }
        print!("{}", config.to_redacted_toml()?);
    } else {
        println!("Use --show to display configuration");
    }
    Ok(ExitCode::SUCCESS)
}
