//! Pushwatch CLI
//!
//! Command-line client for manually exercising a Pushwatch server.
//!
//! # Usage
//!
//! ```bash
//! pushwatch --help
//! pushwatch register --name jobs_done --prefix batch --check-schedule "*/5 * * * *"
//! pushwatch store --name jobs_done --prefix batch --value 3
//! pushwatch --url http://gateway:8080 store --file store.json
//! pushwatch health
//! ```

#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use shared::models::{LabelList, RegistrationRequest, StoreRequest};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Pushwatch CLI - register metrics and push values to a Pushwatch server
#[derive(Parser)]
#[command(name = "pushwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the Pushwatch server
    #[arg(
        short,
        long,
        env = "PUSHWATCH_URL",
        default_value = "http://localhost:8080"
    )]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a metric, optionally with a staleness check for its prefix
    Register(RegisterArgs),
    /// Push a value into a registered metric
    Store(StoreArgs),
    /// Check server health
    Health,
}

/// Fields shared by both request kinds.
#[derive(Args)]
struct SeriesArgs {
    /// Send the contents of this JSON file instead of building a body from flags
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Metric name
    #[arg(long, default_value = "my_metric")]
    name: String,

    /// Metric prefix
    #[arg(long, default_value = "prefix_foo")]
    prefix: String,

    /// Label as key=value, may be repeated
    #[arg(
        long = "label",
        value_parser = parse_label,
        default_values = ["key1=value1", "key2=value2"]
    )]
    labels: Vec<(String, String)>,
}

#[derive(Args)]
struct RegisterArgs {
    #[command(flatten)]
    series: SeriesArgs,

    /// Metric type, counter or gauge
    #[arg(long = "type", default_value = "counter")]
    kind: String,

    /// Schedule for the prefix staleness check, e.g. "*/5 * * * *" or "@every 1m"
    #[arg(long)]
    check_schedule: Option<String>,

    /// Help text shown on the metrics page
    #[arg(long, default_value = "This is a test metric")]
    help_text: String,
}

#[derive(Args)]
struct StoreArgs {
    #[command(flatten)]
    series: SeriesArgs,

    /// Value to add (counter) or set (gauge)
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    value: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Register(args) => {
            let body = match &args.series.file {
                Some(path) => read_body(path)?,
                None => serde_json::to_value(registration_request(&args))?,
            };
            post(&format!("{base}/register"), &body)?;
            println!("Registered");
        }
        Commands::Store(args) => {
            let body = match &args.series.file {
                Some(path) => read_body(path)?,
                None => serde_json::to_value(store_request(&args))?,
            };
            post(&format!("{base}/store"), &body)?;
            println!("Stored");
        }
        Commands::Health => {
            let response = reqwest::blocking::get(format!("{base}/health"))
                .with_context(|| format!("failed to reach {base}"))?;
            let health: Value = response.error_for_status()?.json()?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }

    Ok(())
}

fn registration_request(args: &RegisterArgs) -> RegistrationRequest {
    RegistrationRequest {
        metrics_name: args.series.name.clone(),
        labels: label_list(&args.series.labels),
        prefix: args.series.prefix.clone(),
        metric_type: args.kind.clone(),
        check_schedule: args.check_schedule.clone(),
        help: Some(args.help_text.clone()),
    }
}

fn store_request(args: &StoreArgs) -> StoreRequest {
    StoreRequest {
        metrics_name: args.series.name.clone(),
        prefix: args.series.prefix.clone(),
        labels: label_list(&args.series.labels),
        value: args.value,
    }
}

/// One single-entry map per label, as the server expects.
fn label_list(labels: &[(String, String)]) -> LabelList {
    labels
        .iter()
        .map(|(k, v)| BTreeMap::from([(k.clone(), v.clone())]))
        .collect()
}

fn parse_label(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

fn read_body(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn post(url: &str, body: &Value) -> Result<()> {
    tracing::info!(%url, "Sending request");
    let response = reqwest::blocking::Client::new()
        .post(url)
        .json(body)
        .send()
        .with_context(|| format!("failed to send request to {url}"))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let text = response.text().unwrap_or_default();
        bail!("request to {url} failed with {status}: {text}");
    }
    Ok(())
}
