//! ClickHouse health checks.

use crate::client::ClickHouseClient;
use metrics_core::{Error, Result};
use tracing::{debug, error};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Like [`check_connection`], but as a connection error for callers that
/// want to abort early.
pub async fn ensure_connection(client: &ClickHouseClient) -> Result<()> {
    if check_connection(client).await {
        Ok(())
    } else {
        Err(Error::connection(format!(
            "ClickHouse at {} is not reachable",
            client.config().url
        )))
    }
}
