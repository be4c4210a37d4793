//! Job offer performance, averaged per platform.
//!
//! Metrics are first computed per offer and week, then averaged over the
//! offers of each (week, country, platform). The offer id is a grouping
//! dimension, so it never enters the average.

use metrics_core::reduce::{count_distinct, ratio};
use metrics_core::{
    aggregate, merge, regroup, rollup_mean, suppress, Dimension, MetricSpec, Result,
    SuppressionRule, Table, TableRow, WeeklyEvent,
};
use tracing::debug;

use crate::family::FamilyOutput;

const OFFER_KEY: [Dimension; 4] = [
    Dimension::Period,
    Dimension::Country,
    Dimension::Platform,
    Dimension::Offer,
];

const PLATFORM_KEY: [Dimension; 3] = [Dimension::Period, Dimension::Country, Dimension::Platform];

fn clicked(rows: &[&WeeklyEvent]) -> f64 {
    rows.iter().filter(|e| e.record.clicked).count() as f64
}

fn view_metrics() -> Vec<MetricSpec<WeeklyEvent>> {
    vec![
        MetricSpec::new("unique_viewers", |rows: &[&WeeklyEvent]| {
            Some(count_distinct(rows.iter().map(|e| e.user())) as f64)
        }),
        MetricSpec::new("total_views", |rows: &[&WeeklyEvent]| Some(rows.len() as f64)),
        MetricSpec::new("attractiveness", |rows: &[&WeeklyEvent]| {
            let views = rows.len() as f64;
            let viewers = count_distinct(rows.iter().map(|e| e.user())) as f64;
            Some(ratio(views - viewers, views))
        }),
        MetricSpec::new("ctr", |rows: &[&WeeklyEvent]| {
            Some(ratio(clicked(rows), rows.len() as f64))
        }),
    ]
}

/// Clickers, clicks and loyalty per offer, from per-user click totals.
fn click_metrics(events: &[WeeklyEvent]) -> Result<Table> {
    let mut user_key = OFFER_KEY.to_vec();
    user_key.push(Dimension::User);

    let per_user = aggregate(
        events,
        &user_key,
        &[MetricSpec::new("clicks", |rows: &[&WeeklyEvent]| {
            Some(clicked(rows))
        })],
    )?;

    let per_offer = regroup(
        &per_user,
        &OFFER_KEY,
        &[
            MetricSpec::new("unique_clickers", |rows: &[&TableRow<'_>]| {
                Some(rows.iter().filter(|r| r.value_or_zero("clicks") > 0.0).count() as f64)
            }),
            MetricSpec::new("total_clicks", |rows: &[&TableRow<'_>]| {
                Some(rows.iter().map(|r| r.value_or_zero("clicks")).sum())
            }),
        ],
    )?;

    per_offer.derive("loyalty", |row| {
        let clicks = row.value_or_zero("total_clicks");
        let clickers = row.value_or_zero("unique_clickers");
        Some(ratio(clicks - clickers, clicks))
    })
}

/// Per-offer performance for every (week, country, platform, offer).
pub fn offer_metrics(events: &[WeeklyEvent]) -> Result<Table> {
    let views = aggregate(events, &OFFER_KEY, &view_metrics())?;
    let clicks = click_metrics(events)?;
    merge(&[&views, &clicks])
}

/// Builds the published `job_offers` table.
pub fn build(events: &[WeeklyEvent], rule: &SuppressionRule) -> Result<FamilyOutput> {
    let per_offer = offer_metrics(events)?;
    let per_platform = rollup_mean(&per_offer, &PLATFORM_KEY)?;

    debug!(
        offers = per_offer.len(),
        platforms = per_platform.len(),
        "Rolled up offer metrics"
    );

    Ok(suppress(per_platform, rule)?.into())
}
