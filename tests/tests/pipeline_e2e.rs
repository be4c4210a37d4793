//! End-to-end tests for the weekly pipelines.
//!
//! These tests run the orchestrator against `MockConnector`, which
//! implements the same source, sink and connector traits as the ClickHouse
//! warehouse, and check the tables it would publish.

use integration_tests::{fixtures, mocks::MockConnector};
use metrics_core::{bucket_events, DimValue, GroupKey, PeriodKey, SourceQuery};
use pipeline::{job_offers, EntityFamily, Orchestrator, PipelineConfig};

fn text(value: &str) -> DimValue {
    DimValue::Text(value.to_string())
}

fn week(n: u32) -> DimValue {
    DimValue::Period(PeriodKey::new(2024, n))
}

fn sequential(families: Vec<EntityFamily>) -> PipelineConfig {
    PipelineConfig::default()
        .with_parallel(false)
        .with_families(families)
}

/// 100 views, 2 users, 30 clicks: the per-offer metrics before averaging.
#[test]
fn test_two_viewer_offer_metrics() {
    let events = bucket_events(fixtures::two_viewer_offer()).events;
    let table = job_offers::offer_metrics(&events).unwrap();

    let key = GroupKey::new(vec![week(1), text("Sweden"), text("Wolt"), DimValue::Id(1)]);
    let round = |v: Option<f64>| v.map(metrics_core::reduce::round2);

    assert_eq!(table.value(&key, "total_views"), Some(100.0));
    assert_eq!(table.value(&key, "unique_clickers"), Some(2.0));
    assert_eq!(table.value(&key, "total_clicks"), Some(30.0));
    assert_eq!(round(table.value(&key, "loyalty")), Some(0.93));
    assert_eq!(round(table.value(&key, "ctr")), Some(0.3));
}

#[tokio::test]
async fn test_job_offers_published_per_platform() {
    let mut records = fixtures::popular_offer(1, 1, 25);
    records.extend(fixtures::popular_offer(2, 1, 23));
    let connector = MockConnector::new().with_extract(SourceQuery::JobOfferViews, records);

    let orchestrator = Orchestrator::new(
        connector.clone(),
        sequential(vec![EntityFamily::JobOffers]),
    );
    let reports = orchestrator.run_all().await;
    assert!(reports[0].is_success(), "{:?}", reports[0].error);
    assert_eq!(reports[0].table.as_deref(), Some("dev.job_offers"));

    let table = connector.published_table("job_offers").unwrap();
    let key = GroupKey::new(vec![week(1), text("Sweden"), text("Wolt")]);

    assert_eq!(table.len(), 1);
    assert_eq!(table.value(&key, "unique_clickers"), Some(24.0));
    assert_eq!(table.value(&key, "unique_viewers"), Some(24.0));
    assert_eq!(table.value(&key, "total_views"), Some(48.0));
    assert_eq!(table.value(&key, "ctr"), Some(0.5));
    assert_eq!(table.value(&key, "attractiveness"), Some(0.5));
    assert_eq!(table.value(&key, "loyalty"), Some(0.0));
}

#[tokio::test]
async fn test_partners_growth_and_loyalty() {
    // users 0..35 click in both weeks, 35..42 only in week 2
    let mut records = fixtures::partner_clicks(1, 0, 35);
    records.extend(fixtures::partner_clicks(2, 0, 42));
    let connector = MockConnector::new().with_extract(SourceQuery::PartnerClicks, records);

    let orchestrator =
        Orchestrator::new(connector.clone(), sequential(vec![EntityFamily::Partners]));
    let reports = orchestrator.run_all().await;
    assert!(reports[0].is_success(), "{:?}", reports[0].error);

    let table = connector.published_table("partners").unwrap();
    let first = GroupKey::new(vec![text("Wolt"), text("Sweden"), week(1)]);
    let second = GroupKey::new(vec![text("Wolt"), text("Sweden"), week(2)]);

    assert_eq!(table.len(), 2);
    assert_eq!(table.value(&first, "users"), Some(35.0));
    assert_eq!(table.value(&first, "weekly_user_growth"), None);
    assert_eq!(table.value(&first, "user_growth"), Some(100.0));
    assert_eq!(table.value(&second, "users"), Some(42.0));
    assert_eq!(table.value(&second, "weekly_user_growth"), Some(20.0));
    assert_eq!(table.value(&second, "user_growth"), Some(120.0));
    assert_eq!(table.value(&second, "weekly_click_growth"), Some(20.0));
    assert_eq!(table.value(&second, "rating"), Some(4.0));

    assert_eq!(table.value(&first, "loyalty"), Some(0.5));
    assert_eq!(table.value(&second, "loyalty"), Some(0.58));
    assert_eq!(table.value(&second, "longterm_loyalty"), Some(0.54));
}

#[tokio::test]
async fn test_users_small_cities_suppressed() {
    let mut records = fixtures::city_views("Stockholm", 1, 22);
    records.extend(fixtures::city_views("Malmö", 1, 3));
    let connector = MockConnector::new().with_extract(SourceQuery::UserViews, records);

    let orchestrator = Orchestrator::new(connector.clone(), sequential(vec![EntityFamily::Users]));
    let report = orchestrator.run_family(EntityFamily::Users).await;
    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.published_rows, 1);
    assert_eq!(report.suppressed_rows, 1);

    let table = connector.published_table("users").unwrap();
    let key = GroupKey::new(vec![week(1), text("Sweden"), text("Stockholm")]);

    assert_eq!(table.value(&key, "unique_users"), Some(22.0));
    assert_eq!(table.value(&key, "total_views"), Some(44.0));
    assert_eq!(table.value(&key, "total_click"), Some(22.0));
    assert_eq!(table.value(&key, "ctr"), Some(0.5));
    assert_eq!(table.value(&key, "views_per_user"), Some(2.0));
    assert_eq!(table.value(&key, "offer_rating"), Some(3.5));
    assert_eq!(table.value(&key, "platforms_per_user"), Some(2.0));
}

#[tokio::test]
async fn test_all_families_in_parallel() {
    let mut offer_views = fixtures::popular_offer(1, 1, 21);
    offer_views.extend(fixtures::malformed_records());

    let connector = MockConnector::new()
        .with_extract(SourceQuery::JobOfferViews, offer_views)
        .with_extract(SourceQuery::PartnerClicks, fixtures::partner_clicks(1, 0, 31))
        .with_extract(SourceQuery::UserViews, fixtures::city_views("Stockholm", 1, 21));

    let config = PipelineConfig::default().with_namespace("analytics");
    let reports = Orchestrator::new(connector.clone(), config).run_all().await;

    let families: Vec<_> = reports.iter().map(|r| r.family).collect();
    assert_eq!(families, EntityFamily::ALL.to_vec());
    assert!(reports.iter().all(|r| r.is_success()));
    assert!(reports.iter().all(|r| r.published_rows == 1));

    assert_eq!(reports[0].fetched, 45);
    assert_eq!(reports[0].malformed, 3);
    assert_eq!(reports[1].malformed, 0);

    let published = connector.published();
    assert_eq!(published.len(), 3);
    assert!(published.iter().all(|p| p.namespace == "analytics"));
    assert_eq!(connector.connects(), 3);
    assert_eq!(connector.open_handles(), 0);
}

#[tokio::test]
async fn test_rerun_replaces_tables() {
    let connector = MockConnector::new()
        .with_extract(SourceQuery::UserViews, fixtures::city_views("Stockholm", 1, 21));
    let orchestrator = Orchestrator::new(connector.clone(), sequential(vec![EntityFamily::Users]));

    orchestrator.run_all().await;
    orchestrator.run_all().await;

    assert_eq!(connector.published().len(), 1);
    assert_eq!(connector.connects(), 2);
}
