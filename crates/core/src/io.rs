//! Boundaries to the warehouse: where events come from and where tables go.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::EventRecord;
use crate::table::Table;

/// The fixed extracts the pipelines read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceQuery {
    /// Offer views, flagged `clicked` when the viewer also clicked the offer.
    JobOfferViews,
    /// One row per user click on an offer, with partner cost measures.
    PartnerClicks,
    /// Views by registered users, with city and offer rating.
    UserViews,
}

impl SourceQuery {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JobOfferViews => "job_offer_views",
            Self::PartnerClicks => "partner_clicks",
            Self::UserViews => "user_views",
        }
    }
}

/// Result of publishing a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub table: String,
    pub rows_written: usize,
}

/// Source of raw event records.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch(&self, query: SourceQuery) -> Result<Vec<EventRecord>>;
}

/// Destination of finished tables. Publishing replaces any previous table
/// of the same name.
#[async_trait]
pub trait TableSink: Send + Sync {
    async fn publish(&self, name: &str, namespace: &str, table: &Table) -> Result<PublishResult>;
}

/// Opens a warehouse handle scoped to one pipeline run.
///
/// The handle is dropped when the run ends, whatever the outcome.
pub trait Connector: Send + Sync {
    type Warehouse: EventSource + TableSink;

    fn connect(&self) -> Result<Self::Warehouse>;
}
