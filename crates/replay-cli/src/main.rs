//! # contract-replay entry point
//!
//! Parses arguments, installs logging, runs the harness once and maps the
//! result to an exit status: 0 all passed, 1 some interaction failed,
//! 2 the run could not start.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use replay_cli::report::Report;
use replay_cli::{exit_status, run_harness, HarnessConfig, ReplayOverrides, FATAL_EXIT_STATUS};
use replay_runner::ReplayConfig;

/// Replay a provider contract against a schema-validating mock of itself.
///
/// Every interaction in the contract becomes a mock route; every recorded
/// request is then sent to the mock, and both directions are validated
/// against the OpenAPI document.
#[derive(Parser, Debug)]
#[command(name = "contract-replay", version, about, long_about = None)]
struct Cli {
    /// Contract fixture (Pact JSON).
    #[arg(long, env = "REPLAY_CONTRACT")]
    contract: PathBuf,

    /// OpenAPI 3.0/3.1 document (JSON or YAML).
    #[arg(long, env = "REPLAY_SCHEMA")]
    schema: PathBuf,

    /// Port for the mock; 0 picks a free one. Overrides REPLAY_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Base URL the runner targets. Overrides REPLAY_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Per-call deadline in seconds. Overrides REPLAY_TIMEOUT_SECS.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write the replay summary as JSON to this file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(verbose: u8, format: LogFormat) {
    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let overrides = ReplayOverrides {
        port: cli.port,
        base_url: cli.base_url.clone(),
        timeout_secs: cli.timeout_secs,
    };
    let replay = overrides.apply(ReplayConfig::from_env()?)?;
    Ok(HarnessConfig::new(&cli.contract, &cli.schema, replay))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);
    tracing::debug!(?cli, "contract-replay starting");

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(FATAL_EXIT_STATUS);
        }
    };

    let summary = match run_harness(&config).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(FATAL_EXIT_STATUS);
        }
    };

    if let Some(path) = &cli.report {
        if let Err(e) = Report::new(&config, &summary).write(path) {
            tracing::error!("{e}");
            return ExitCode::from(FATAL_EXIT_STATUS);
        }
    }

    for description in summary.failing_descriptions() {
        tracing::error!(description, "failed interaction");
    }
    ExitCode::from(exit_status(&summary))
}
