//! User activity per (week, country, city).

use metrics_core::reduce::{count_distinct, mean, ratio, round2};
use metrics_core::{
    aggregate, merge, regroup, suppress, Dimension, MetricSpec, Result, SuppressionRule, Table,
    TableRow, WeeklyEvent,
};

use crate::family::FamilyOutput;

const CITY_KEY: [Dimension; 3] = [Dimension::Period, Dimension::Country, Dimension::City];

fn unique_users(rows: &[&WeeklyEvent]) -> f64 {
    count_distinct(rows.iter().map(|e| e.user())) as f64
}

fn clicks(rows: &[&WeeklyEvent]) -> f64 {
    rows.iter().filter(|e| e.record.clicked).count() as f64
}

fn activity_metrics() -> Vec<MetricSpec<WeeklyEvent>> {
    vec![
        MetricSpec::new("unique_users", |rows: &[&WeeklyEvent]| Some(unique_users(rows))),
        MetricSpec::new("total_click", |rows: &[&WeeklyEvent]| Some(clicks(rows))),
        MetricSpec::new("total_views", |rows: &[&WeeklyEvent]| Some(rows.len() as f64)),
        MetricSpec::new("ctr", |rows: &[&WeeklyEvent]| {
            Some(round2(ratio(clicks(rows), rows.len() as f64)))
        }),
        MetricSpec::new("views_per_user", |rows: &[&WeeklyEvent]| {
            Some(round2(ratio(rows.len() as f64, unique_users(rows))))
        }),
        MetricSpec::new("offer_rating", |rows: &[&WeeklyEvent]| {
            mean(rows.iter().map(|e| e.record.rating)).map(round2)
        }),
    ]
}

/// Mean number of distinct platforms each user of the group viewed.
fn platforms_per_user(events: &[WeeklyEvent]) -> Result<Table> {
    let mut user_key = CITY_KEY.to_vec();
    user_key.push(Dimension::User);

    let per_user = aggregate(
        events,
        &user_key,
        &[MetricSpec::new("platforms", |rows: &[&WeeklyEvent]| {
            let platforms = rows.iter().filter_map(|e| e.record.platform.as_deref());
            Some(count_distinct(platforms) as f64)
        })],
    )?;

    let table = regroup(
        &per_user,
        &CITY_KEY,
        &[MetricSpec::new(
            "platforms_per_user",
            |rows: &[&TableRow<'_>]| mean(rows.iter().map(|r| r.value("platforms"))).map(round2),
        )],
    )?;
    Ok(table)
}

/// Builds the published `users` table.
pub fn build(events: &[WeeklyEvent], rule: &SuppressionRule) -> Result<FamilyOutput> {
    let activity = aggregate(events, &CITY_KEY, &activity_metrics())?;
    let platforms = platforms_per_user(events)?;
    let merged = merge(&[&activity, &platforms])?;
    Ok(suppress(merged, rule)?.into())
}
