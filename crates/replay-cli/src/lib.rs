//! # replay-cli — Contract Replay Harness
//!
//! One-shot self-test of a provider contract:
//!
//! ```text
//! load contract ─→ load schema ─→ compile routes ─→ start mock
//!        ─→ replay every interaction ─→ shut mock down ─→ summary
//! ```
//!
//! Loading the contract or the schema, binding the socket, and building the
//! HTTP client are fatal. Everything after that is reported per interaction
//! in the [`ReplaySummary`].
//!
//! ```bash
//! contract-replay --contract pacts/web-widgets.json --schema openapi.yaml --port 0
//! ```

pub mod report;

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use replay_core::{FixtureError, InteractionRegistry};
use replay_mock::{MockServer, ServerConfig, ServerError};
use replay_runner::config::parse_base_url;
use replay_runner::{ConfigError, ReplayConfig, ReplayError, ReplaySummary, Runner};
use replay_schema::{OpenApiValidator, SchemaLoadError};

/// Fatal harness errors. Any of these means no replay took place.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The contract fixture could not be loaded.
    #[error("contract: {0}")]
    Fixture(#[from] FixtureError),

    /// The interface document could not be loaded.
    #[error("schema: {0}")]
    Schema(#[from] SchemaLoadError),

    /// The mock server could not start.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The runner could not be built.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Invalid configuration.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// The report could not be written.
    #[error("cannot write report '{path}': {reason}")]
    Report {
        /// Report path.
        path: PathBuf,
        /// Underlying error.
        reason: String,
    },
}

/// Everything one harness run needs.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Contract fixture (Pact JSON).
    pub contract: PathBuf,
    /// OpenAPI document (JSON or YAML).
    pub schema: PathBuf,
    /// Mock listener settings.
    pub server: ServerConfig,
    /// Replay target settings. The port is replaced by the bound port.
    pub replay: ReplayConfig,
}

impl HarnessConfig {
    /// Bind where `replay` points: the base URL's host when it is an IP
    /// address, loopback otherwise, on `replay.port`.
    pub fn new(contract: impl Into<PathBuf>, schema: impl Into<PathBuf>, replay: ReplayConfig) -> Self {
        let host = match replay.base_url.host_str() {
            Some(h) => h
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let server = ServerConfig {
            bind: SocketAddr::new(host, replay.port),
            ..ServerConfig::default()
        };
        Self {
            contract: contract.into(),
            schema: schema.into(),
            server,
            replay,
        }
    }
}

/// Command-line overrides applied on top of [`ReplayConfig::from_env`].
#[derive(Debug, Clone, Default)]
pub struct ReplayOverrides {
    /// `--port`
    pub port: Option<u16>,
    /// `--base-url`
    pub base_url: Option<String>,
    /// `--timeout-secs`
    pub timeout_secs: Option<u64>,
}

impl ReplayOverrides {
    /// Apply the overrides that are set.
    pub fn apply(&self, mut config: ReplayConfig) -> Result<ReplayConfig, ConfigError> {
        if let Some(raw) = &self.base_url {
            config.base_url = parse_base_url("--base-url", raw)?;
        }
        require_root_base(&config)?;
        if let Some(port) = self.port {
            config.port = port;
        }
        match self.timeout_secs {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => config.request_timeout = Duration::from_secs(secs),
            None => {}
        }
        Ok(config)
    }
}

/// Mock routes live at the recorded paths, so a base URL path would send
/// every replay to a route that does not exist.
fn require_root_base(config: &ReplayConfig) -> Result<(), ConfigError> {
    if config.base_url.path() == "/" {
        Ok(())
    } else {
        Err(ConfigError::BasePath(config.base_url.to_string()))
    }
}

/// Run the full self-test once and return the summary.
///
/// # Errors
///
/// Returns a [`HarnessError`] if the run could not start. Interaction
/// failures are reported in the summary, not as errors.
pub async fn run_harness(config: &HarnessConfig) -> Result<ReplaySummary, HarnessError> {
    require_root_base(&config.replay)?;

    let registry = InteractionRegistry::from_path(&config.contract)?;
    tracing::info!(
        contract = %config.contract.display(),
        consumer = registry.consumer().unwrap_or("-"),
        provider = registry.provider().unwrap_or("-"),
        interactions = registry.len(),
        "contract loaded"
    );

    let validator = OpenApiValidator::from_path(&config.schema)?;
    tracing::info!(
        schema = %config.schema.display(),
        title = validator.title().unwrap_or("-"),
        operations = validator.operation_count(),
        "schema loaded"
    );

    let routes = replay_mock::compile(&registry);
    if !routes.shadowed().is_empty() {
        tracing::warn!(
            shadowed = routes.shadowed().len(),
            "duplicate routes: later interactions replaced earlier ones"
        );
    }
    let not_registered: BTreeMap<usize, String> = routes
        .rejected()
        .iter()
        .map(|r| (r.index, r.error.to_string()))
        .collect();

    let app = replay_mock::app(&routes, Arc::new(validator), &config.server);
    let server = MockServer::start(&config.server, app).await?;
    let runner = Runner::new(config.replay.clone().with_port(server.port()))?;

    let summary = runner.replay_except(&registry, &not_registered).await;

    if let Err(e) = server.shutdown().await {
        tracing::warn!("{e}");
    }
    tracing::info!("{summary}");
    Ok(summary)
}

/// Process exit status for a finished run: 0 when everything passed, 1 otherwise.
pub fn exit_status(summary: &ReplaySummary) -> u8 {
    if summary.all_passed() {
        0
    } else {
        1
    }
}

/// Process exit status for a run that could not start.
pub const FATAL_EXIT_STATUS: u8 = 2;
