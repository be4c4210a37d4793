//! Event extraction from the operational tables.
//!
//! Each [`SourceQuery`] maps to one fixed join. All extracts return the same
//! row shape; columns an extract has no data for are selected as NULL.

use crate::client::ClickHouseClient;
use async_trait::async_trait;
use chrono::DateTime;
use clickhouse::Row;
use metrics_core::{Error, EventRecord, EventSource, Result, SourceQuery};
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info};

/// Flat extract row, as decoded from ClickHouse.
#[derive(Debug, Clone, Default, Row, Deserialize)]
pub struct SourceRow {
    pub ts_ms: Option<i64>,
    pub user_id: Option<String>,
    pub offer_id: Option<i64>,
    pub platform: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub clicked: u8,
    pub rating: Option<f64>,
    pub low_on_cost_rating: Option<f64>,
    pub cpc: Option<f64>,
    pub cpa: Option<f64>,
    pub weight: Option<f64>,
    pub budget_spent: Option<f64>,
    pub brand_id: Option<i64>,
    pub view_type: Option<String>,
    pub language: Option<String>,
}

impl From<SourceRow> for EventRecord {
    fn from(row: SourceRow) -> Self {
        EventRecord {
            timestamp: row
                .ts_ms
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.naive_utc()),
            user: row.user_id,
            offer_id: row.offer_id,
            platform: row.platform,
            city: row.city,
            country: row.country,
            clicked: row.clicked != 0,
            rating: row.rating,
            low_on_cost_rating: row.low_on_cost_rating,
            cpc: row.cpc,
            cpa: row.cpa,
            weight: row.weight,
            budget_spent: row.budget_spent,
            brand_id: row.brand_id,
            view_type: row.view_type,
            language: row.language,
        }
    }
}

/// Offer views. `clicked` is set when a click row matches both the offer and
/// the viewer; click rows are deduplicated so a view is never repeated.
const JOB_OFFER_VIEWS_SQL: &str = r#"
SELECT
    CAST(toUnixTimestamp64Milli(toDateTime64(vw.created_at, 3)) AS Nullable(Int64)) AS ts_ms,
    CAST(vw.user_id AS Nullable(String)) AS user_id,
    CAST(jo.id AS Nullable(Int64)) AS offer_id,
    CAST(pt.name AS Nullable(String)) AS platform,
    CAST(ct.name AS Nullable(String)) AS city,
    CAST(cnt.name AS Nullable(String)) AS country,
    toUInt8(ujo.job_offer_id IS NOT NULL) AS clicked,
    CAST(NULL AS Nullable(Float64)) AS rating,
    CAST(NULL AS Nullable(Float64)) AS low_on_cost_rating,
    CAST(NULL AS Nullable(Float64)) AS cpc,
    CAST(NULL AS Nullable(Float64)) AS cpa,
    CAST(NULL AS Nullable(Float64)) AS weight,
    CAST(NULL AS Nullable(Float64)) AS budget_spent,
    CAST(NULL AS Nullable(Int64)) AS brand_id,
    CAST(NULL AS Nullable(String)) AS view_type,
    CAST(NULL AS Nullable(String)) AS language
FROM views AS vw
LEFT JOIN job_offers AS jo
    ON vw.job_offer_id = jo.id
LEFT JOIN (SELECT DISTINCT job_offer_id, user_id FROM user_job_offers) AS ujo
    ON ujo.job_offer_id = vw.job_offer_id
    AND ujo.user_id = vw.user_id
JOIN partners AS pt
    ON jo.partner_id = pt.id
JOIN cities AS ct
    ON jo.city_id = ct.id
JOIN countries AS cnt
    ON ct.country_id = cnt.id
SETTINGS join_use_nulls = 1
"#;

/// Offer clicks with partner cost measures. Every row is a click.
const PARTNER_CLICKS_SQL: &str = r#"
SELECT
    CAST(toUnixTimestamp64Milli(toDateTime64(ujo.created_at, 3)) AS Nullable(Int64)) AS ts_ms,
    CAST(ujo.user_id AS Nullable(String)) AS user_id,
    CAST(ujo.job_offer_id AS Nullable(Int64)) AS offer_id,
    CAST(pt.name AS Nullable(String)) AS platform,
    CAST(ct.name AS Nullable(String)) AS city,
    CAST(cnt.name AS Nullable(String)) AS country,
    toUInt8(1) AS clicked,
    CAST(jo.rating AS Nullable(Float64)) AS rating,
    CAST(jo.low_on_cost_rating AS Nullable(Float64)) AS low_on_cost_rating,
    CAST(ujo.cpc AS Nullable(Float64)) AS cpc,
    CAST(ujo.cpa AS Nullable(Float64)) AS cpa,
    CAST(ujo.weight AS Nullable(Float64)) AS weight,
    CAST(ujo.budget_exhausted AS Nullable(Float64)) AS budget_spent,
    CAST(pt.brand_id AS Nullable(Int64)) AS brand_id,
    CAST(NULL AS Nullable(String)) AS view_type,
    CAST(NULL AS Nullable(String)) AS language
FROM partners AS pt
JOIN job_offers AS jo
    ON jo.partner_id = pt.id
JOIN user_job_offers AS ujo
    ON ujo.job_offer_id = jo.id
JOIN cities AS ct
    ON jo.city_id = ct.id
JOIN countries AS cnt
    ON ct.country_id = cnt.id
SETTINGS join_use_nulls = 1
"#;

/// Views by registered users, located by the view's city.
const USER_VIEWS_SQL: &str = r#"
SELECT
    CAST(toUnixTimestamp64Milli(toDateTime64(vw.created_at, 3)) AS Nullable(Int64)) AS ts_ms,
    CAST(usr.id AS Nullable(String)) AS user_id,
    CAST(vw.job_offer_id AS Nullable(Int64)) AS offer_id,
    CAST(pt.name AS Nullable(String)) AS platform,
    CAST(ct.name AS Nullable(String)) AS city,
    CAST(cnt.name AS Nullable(String)) AS country,
    toUInt8(ujo.job_offer_id IS NOT NULL) AS clicked,
    CAST(jo.rating AS Nullable(Float64)) AS rating,
    CAST(NULL AS Nullable(Float64)) AS low_on_cost_rating,
    CAST(ujo.weight AS Nullable(Float64)) AS cpc,
    CAST(NULL AS Nullable(Float64)) AS cpa,
    CAST(NULL AS Nullable(Float64)) AS weight,
    CAST(NULL AS Nullable(Float64)) AS budget_spent,
    CAST(NULL AS Nullable(Int64)) AS brand_id,
    CAST(vw.type AS Nullable(String)) AS view_type,
    CAST(vw.locale AS Nullable(String)) AS language
FROM views AS vw
JOIN auth0_users AS usr
    ON vw.user_id = usr.id
LEFT JOIN (
    SELECT job_offer_id, user_id, any(weight) AS weight
    FROM user_job_offers
    GROUP BY job_offer_id, user_id
) AS ujo
    ON vw.user_id = ujo.user_id
    AND vw.job_offer_id = ujo.job_offer_id
LEFT JOIN partners AS pt
    ON vw.partner_id = pt.id
LEFT JOIN cities AS ct
    ON vw.city_id = ct.id
JOIN countries AS cnt
    ON ct.country_id = cnt.id
LEFT JOIN job_offers AS jo
    ON vw.job_offer_id = jo.id
SETTINGS join_use_nulls = 1
"#;

/// SQL text of the extract behind `query`.
pub fn extract_sql(query: SourceQuery) -> &'static str {
    match query {
        SourceQuery::JobOfferViews => JOB_OFFER_VIEWS_SQL,
        SourceQuery::PartnerClicks => PARTNER_CLICKS_SQL,
        SourceQuery::UserViews => USER_VIEWS_SQL,
    }
}

#[async_trait]
impl EventSource for ClickHouseClient {
    async fn fetch(&self, query: SourceQuery) -> Result<Vec<EventRecord>> {
        let start = Instant::now();
        debug!(query = query.name(), "Running extract");

        let rows: Vec<SourceRow> = self
            .inner()
            .query(extract_sql(query))
            .fetch_all()
            .await
            .map_err(|e| {
                Error::source_unavailable(format!("{} extract failed: {}", query.name(), e))
            })?;

        info!(
            query = query.name(),
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Extract complete"
        );

        Ok(rows.into_iter().map(EventRecord::from).collect())
    }
}
