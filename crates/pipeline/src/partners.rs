//! Partner reach, growth and loyalty per (platform, country) and week.

use std::collections::HashMap;

use metrics_core::reduce::{count_distinct, mean, ratio, round2};
use metrics_core::{
    aggregate, expanding_mean, merge, period_growth, regroup, suppress, Dimension, MetricSpec,
    Result, SuppressionRule, Table, TableRow, WeeklyEvent,
};

use crate::family::FamilyOutput;

const SERIES_KEY: [Dimension; 3] = [Dimension::Platform, Dimension::Country, Dimension::Period];

fn performance_metrics() -> Vec<MetricSpec<WeeklyEvent>> {
    vec![
        MetricSpec::new("users", |rows: &[&WeeklyEvent]| {
            Some(count_distinct(rows.iter().map(|e| e.user())) as f64)
        }),
        // A click is identified by its second, user and offer.
        MetricSpec::new("clicks", |rows: &[&WeeklyEvent]| {
            let clicks = rows
                .iter()
                .map(|e| (e.timestamp().and_utc().timestamp(), e.user(), e.offer_id()));
            Some(count_distinct(clicks) as f64)
        }),
        MetricSpec::new("rating", |rows: &[&WeeklyEvent]| {
            mean(rows.iter().map(|e| e.record.rating)).map(round2)
        }),
    ]
}

/// Users, clicks and rating with weekly and compounded growth.
pub fn performance(events: &[WeeklyEvent]) -> Result<Table> {
    let table = aggregate(events, &SERIES_KEY, &performance_metrics())?;
    let table = period_growth(table, "users", "weekly_user_growth", "user_growth")?;
    period_growth(table, "clicks", "weekly_click_growth", "click_growth")
}

/// Weekly and long-term loyalty.
///
/// A user's share of a week is their interactions in that week's group over
/// their interactions in the whole extract. Weekly loyalty is the mean share
/// of the group's users; long-term loyalty is its expanding mean.
pub fn loyalty(events: &[WeeklyEvent]) -> Result<Table> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for event in events
        .iter()
        .filter(|e| e.record.platform.is_some() && e.record.country.is_some())
    {
        *totals.entry(event.user().to_string()).or_default() += 1.0;
    }

    let mut user_key = SERIES_KEY.to_vec();
    user_key.push(Dimension::User);

    let shares = aggregate(
        events,
        &user_key,
        &[MetricSpec::new("share", move |rows: &[&WeeklyEvent]| {
            let total = totals.get(rows.first()?.user())?;
            Some(ratio(rows.len() as f64, *total))
        })],
    )?;

    let weekly = regroup(
        &shares,
        &SERIES_KEY,
        &[MetricSpec::new("loyalty", |rows: &[&TableRow<'_>]| {
            mean(rows.iter().map(|r| r.value("share"))).map(round2)
        })],
    )?;

    expanding_mean(weekly, "loyalty", "longterm_loyalty")
}

/// Builds the published `partners` table.
pub fn build(events: &[WeeklyEvent], rule: &SuppressionRule) -> Result<FamilyOutput> {
    let performance = performance(events)?;
    let loyalty = loyalty(events)?;
    let merged = merge(&[&performance, &loyalty])?;
    Ok(suppress(merged, rule)?.into())
}
