//! Weekly Metrics Engine
//!
//! Batch run publishing privacy-suppressed weekly metrics:
//! - job offer performance averaged per platform
//! - partner reach, growth and loyalty
//! - user activity per city
//!
//! Every enabled family is run once; the process exits non-zero if any
//! family failed.

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use clickhouse_client::{ensure_connection, ClickHouseClient, ClickHouseConfig, ClickHouseConnector};
use pipeline::{EntityFamily, Orchestrator, PipelineConfig, RunReport};
use telemetry::init_tracing_from_env;

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(flatten)]
    pipeline: PipelineConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Weekly Metrics Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let pipeline_config = config.pipeline.clone();
    pipeline_config
        .validate()
        .context("Invalid pipeline configuration")?;

    info!(
        url = %config.clickhouse.url,
        database = %config.clickhouse.database,
        namespace = %pipeline_config.output_namespace,
        families = ?pipeline_config.families,
        "Loaded configuration"
    );

    // Fail fast before any family opens its own handle
    let probe = ClickHouseClient::new(config.clickhouse.clone())
        .context("Failed to create ClickHouse client")?;
    ensure_connection(&probe)
        .await
        .context("ClickHouse health check failed")?;
    drop(probe);

    let orchestrator = Orchestrator::new(
        ClickHouseConnector::new(config.clickhouse.clone()),
        pipeline_config,
    );
    let reports = orchestrator.run_all().await;

    for report in &reports {
        log_report(report);
    }

    let failed: Vec<String> = reports
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| r.family.to_string())
        .collect();
    if !failed.is_empty() {
        bail!(
            "{} of {} families failed: {}",
            failed.len(),
            reports.len(),
            failed.join(", ")
        );
    }

    info!("Run complete");
    Ok(())
}

fn log_report(report: &RunReport) {
    match &report.error {
        None => info!(
            family = %report.family,
            run_id = %report.run_id,
            fetched = report.fetched,
            malformed = report.malformed,
            rows = report.published_rows,
            suppressed = report.suppressed_rows,
            elapsed_ms = report.elapsed_ms,
            "Family succeeded"
        ),
        Some(e) => error!(
            family = %report.family,
            run_id = %report.run_id,
            code = e.error_code(),
            fetched = report.fetched,
            elapsed_ms = report.elapsed_ms,
            "Family failed: {}",
            e
        ),
    }
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("METRICS")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("families"),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested ClickHouse config
    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(url) = std::env::var("METRICS_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("METRICS_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("METRICS_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("METRICS_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }
    if let Ok(timeout) = std::env::var("METRICS_CLICKHOUSE_TIMEOUT_SECS") {
        config.clickhouse.timeout_secs = timeout
            .parse()
            .context("METRICS_CLICKHOUSE_TIMEOUT_SECS must be a number of seconds")?;
    }

    // Comma-separated family list, e.g. "partners,users"
    if let Ok(families) = std::env::var("METRICS_FAMILIES") {
        config.pipeline.families = families
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<EntityFamily>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Invalid METRICS_FAMILIES")?;
    }

    Ok(config)
}
