use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ipintel_client::client::ApiClient;
use ipintel_client::config::ClientConfig;
use ipintel_client::table::{RenderedTable, Session};
use ipintel_client::types::{Batch, DisplayMode};
use ipintel_client::{export, pipeline, server};

/// ipintel: submit a batch of IPs to the intelligence API and view or export the results.
#[derive(Debug, Parser)]
#[command(
    name = "ipintel",
    version,
    about = "Submit a batch of IPs to the intelligence API and view or export the results.",
    long_about = None
)]
struct Cli {
    /// JSON config file (defaults to ./ipintel.json when present).
    #[arg(long, global = true, env = "IPINTEL_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the intelligence API.
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,

    /// Pre-shared API key sent as X-API-Key.
    #[arg(long = "api-key", global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Look up each IP individually.
    Query(BatchArgs),
    /// Ask the API to (re)analyze the IPs.
    Analyze {
        #[command(flatten)]
        batch: BatchArgs,
        /// Use internal analysis (port details and security recommendations).
        #[arg(long)]
        internal: bool,
    },
    /// Start the embedded browser UI.
    Serve {
        /// Listen address, e.g. 127.0.0.1:8080.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// IP addresses. Read from --input or stdin when omitted.
    ips: Vec<String>,

    /// File with one IP per line.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Sort by this column key; repeat to click the header again.
    #[arg(long = "sort")]
    sort: Vec<String>,

    /// Write the displayed table as CSV (to the configured report filename if no path is given).
    #[arg(long, num_args = 0..=1)]
    csv: Option<Option<PathBuf>>,

    /// Write the result set as pretty JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(key) = cli.api_key {
        config.api_key = key;
    }
    let config = config.normalized();
    if config.api_key.is_empty() {
        warn!("no API key configured; the API will answer Unauthorized");
    }
    info!(api = %config.api_base_url, "ipintel configuration loaded");

    match cli.command {
        Command::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            println!("UI server starting at http://{} (Ctrl+C to stop)", config.bind);
            tokio::select! {
                res = server::spawn_server(&config) => res?,
                _ = tokio::signal::ctrl_c() => info!("shutting down"),
            }
        }
        Command::Query(args) => {
            let client = ApiClient::new(&config)?;
            let raw = read_input(&args)?;
            let batch = pipeline::run_query(&client, &raw).await?;
            present(batch, &args, &config)?;
        }
        Command::Analyze { batch, internal } => {
            let client = ApiClient::new(&config)?;
            let raw = read_input(&batch)?;
            let mode = if internal {
                DisplayMode::Internal
            } else {
                DisplayMode::External
            };
            let result = pipeline::run_analyze(&client, &raw, mode).await?;
            present(result, &batch, &config)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(args: &BatchArgs) -> Result<String> {
    if !args.ips.is_empty() {
        return Ok(args.ips.join("\n"));
    }
    if let Some(path) = &args.input {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file: {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read IPs from stdin")?;
    Ok(buf)
}

fn present(batch: Batch, args: &BatchArgs, config: &ClientConfig) -> Result<()> {
    let mut session = Session::new();
    let mut table = session.replace(batch);
    for column in &args.sort {
        table = session.sort_by(column)?;
    }
    print_table(&table);

    if let Some(path) = &args.csv {
        let path = path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.report_filename));
        export::write_csv(&session, &path)?;
        println!("Wrote CSV report to {}", path.display());
    }
    if let Some(path) = &args.json {
        export::write_json(&session, path)?;
        println!("Wrote JSON results to {}", path.display());
    }
    Ok(())
}

const MAX_CELL: usize = 60;

fn print_table(table: &RenderedTable) {
    let clip = |s: &str| -> String { s.chars().take(MAX_CELL).collect() };

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.label.chars().count()).collect();
    for row in &table.rows {
        for (w, cell) in widths.iter_mut().zip(&row.cells) {
            *w = (*w).max(cell.chars().count().min(MAX_CELL));
        }
    }

    println!("\nRows: {} ({:?} view)", table.rows.len(), table.mode);
    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c.label, w = *w))
        .collect();
    println!("{}", header.join("  "));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("  "));
    for row in &table.rows {
        let line: Vec<String> = row
            .cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", clip(cell), w = *w))
            .collect();
        let tag = row.class.map(|c| format!("  [{}]", c.css_class())).unwrap_or_default();
        println!("{}{}", line.join("  "), tag);
    }
}
