//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use metrics_core::{Connector, Error, Result};
use tracing::{debug, info};

/// ClickHouse client wrapper.
///
/// Implements both [`metrics_core::EventSource`] and
/// [`metrics_core::TableSink`], so one handle serves a whole pipeline run.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::connection("ClickHouse URL is empty"));
        }

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database)
            .with_option("max_execution_time", config.timeout_secs.to_string());

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }
}

impl Drop for ClickHouseClient {
    fn drop(&mut self) {
        debug!(url = %self.config.url, "Released ClickHouse handle");
    }
}

/// Opens a fresh [`ClickHouseClient`] for each pipeline run.
#[derive(Debug, Clone)]
pub struct ClickHouseConnector {
    config: ClickHouseConfig,
}

impl ClickHouseConnector {
    pub fn new(config: ClickHouseConfig) -> Self {
        Self { config }
    }
}

impl Connector for ClickHouseConnector {
    type Warehouse = ClickHouseClient;

    fn connect(&self) -> Result<ClickHouseClient> {
        ClickHouseClient::new(self.config.clone())
    }
}
