//! The entity families the engine publishes.

use std::fmt;
use std::str::FromStr;

use metrics_core::{Error, Result, SourceQuery, Suppressed, SuppressionRule, Table, WeeklyEvent};
use serde::{Deserialize, Serialize};

use crate::{job_offers, partners, users};

/// One published table and the pipeline that builds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityFamily {
    JobOffers,
    Partners,
    Users,
}

impl EntityFamily {
    pub const ALL: [EntityFamily; 3] = [Self::JobOffers, Self::Partners, Self::Users];

    /// Name of the published table.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::JobOffers => "job_offers",
            Self::Partners => "partners",
            Self::Users => "users",
        }
    }

    pub fn source_query(&self) -> SourceQuery {
        match self {
            Self::JobOffers => SourceQuery::JobOfferViews,
            Self::Partners => SourceQuery::PartnerClicks,
            Self::Users => SourceQuery::UserViews,
        }
    }

    /// Column holding the cohort size of a published row.
    pub fn cohort_column(&self) -> &'static str {
        match self {
            Self::JobOffers => "unique_clickers",
            Self::Partners => "users",
            Self::Users => "unique_users",
        }
    }

    /// Runs the family's transform over bucketed events.
    pub fn build(&self, events: &[WeeklyEvent], rule: &SuppressionRule) -> Result<FamilyOutput> {
        match self {
            Self::JobOffers => job_offers::build(events, rule),
            Self::Partners => partners::build(events, rule),
            Self::Users => users::build(events, rule),
        }
    }
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for EntityFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|family| family.table_name() == s.trim())
            .ok_or_else(|| Error::config(format!("unknown entity family: {:?}", s)))
    }
}

/// A finished table, ready to publish.
#[derive(Debug, Clone)]
pub struct FamilyOutput {
    pub table: Table,
    /// Rows removed by suppression.
    pub suppressed: usize,
}

impl From<Suppressed> for FamilyOutput {
    fn from(s: Suppressed) -> Self {
        Self {
            table: s.table,
            suppressed: s.suppressed,
        }
    }
}
