//! Tests for the ClickHouse source and sink.
//!
//! Tables are published into a namespace per test so the tests can share an
//! external server.
//!
//! Requires Docker to be running for testcontainers.

use integration_tests::setup::WarehouseContext;
use metrics_core::{
    bucket_events, DimValue, Dimension, EventRecord, EventSource, GroupKey, PeriodKey,
    SourceQuery, Table, TableSink,
};

fn city_table(cities: &[(&str, f64)]) -> Table {
    let mut table = Table::new(vec![Dimension::Period, Dimension::City], vec!["users".into()])
        .unwrap();
    for (city, users) in cities {
        table
            .insert(
                GroupKey::new(vec![
                    DimValue::Period(PeriodKey::new(2024, 1)),
                    DimValue::Text(city.to_string()),
                ]),
                vec![Some(*users)],
            )
            .unwrap();
    }
    table
}

fn by_user<'a>(records: &'a [EventRecord], user: &str) -> &'a EventRecord {
    records
        .iter()
        .find(|r| r.user.as_deref() == Some(user))
        .unwrap_or_else(|| panic!("no record for {}", user))
}

/// Publishing twice replaces the rows and drops the staging table
#[tokio::test]
async fn test_publish_replaces_table() {
    let ctx = WarehouseContext::new().await;
    let namespace = "publish_replace";

    let first = city_table(&[("Stockholm", 40.0), ("Malmö", 25.0)]);
    let result = ctx.client.publish("users", namespace, &first).await.unwrap();
    assert_eq!(result.table, "publish_replace.users");
    assert_eq!(result.rows_written, 2);
    assert_eq!(ctx.count_rows("publish_replace.users").await, 2);

    let second = city_table(&[("Lund", 31.0)]);
    ctx.client.publish("users", namespace, &second).await.unwrap();

    assert_eq!(
        ctx.text_column("publish_replace.users", "city").await,
        vec!["Lund".to_string()]
    );
    assert!(ctx.table_exists(namespace, "users").await);
    assert!(
        !ctx.table_exists(namespace, "users_staging").await,
        "staging table should be dropped after the exchange"
    );
}

/// An empty table is still published, with every column
#[tokio::test]
async fn test_publish_empty_table() {
    let ctx = WarehouseContext::new().await;
    let namespace = "publish_empty";

    let result = ctx
        .client
        .publish("users", namespace, &city_table(&[]))
        .await
        .unwrap();
    assert_eq!(result.rows_written, 0);

    assert_eq!(ctx.count_rows("publish_empty.users").await, 0);
    assert_eq!(
        ctx.columns(namespace, "users").await,
        vec![
            ("year_week".to_string(), "String".to_string()),
            ("city".to_string(), "String".to_string()),
            ("users".to_string(), "Nullable(Float64)".to_string()),
        ]
    );
}

/// A rejected table leaves the published one in place
#[tokio::test]
async fn test_failed_publish_keeps_previous_table() {
    let ctx = WarehouseContext::new().await;
    let namespace = "publish_failed";

    ctx.client
        .publish("users", namespace, &city_table(&[("Stockholm", 40.0)]))
        .await
        .unwrap();

    let invalid = Table::new(vec![Dimension::Period], vec!["users; DROP".into()]).unwrap();
    assert!(ctx.client.publish("users", namespace, &invalid).await.is_err());

    assert_eq!(
        ctx.text_column("publish_failed.users", "city").await,
        vec!["Stockholm".to_string()]
    );
}

/// Every extract decodes against the operational tables
#[tokio::test]
async fn test_extracts_decode() {
    let ctx = WarehouseContext::new().await;
    ctx.seed_source_tables().await;

    let views = ctx.client.fetch(SourceQuery::JobOfferViews).await.unwrap();
    assert_eq!(views.len(), 2);
    let clicked = by_user(&views, "auth0|1");
    assert!(clicked.clicked);
    assert_eq!(clicked.offer_id, Some(1000));
    assert_eq!(clicked.platform.as_deref(), Some("Wolt"));
    assert_eq!(clicked.city.as_deref(), Some("Stockholm"));
    assert_eq!(clicked.country.as_deref(), Some("Sweden"));
    assert!(!by_user(&views, "auth0|2").clicked);

    let clicks = ctx.client.fetch(SourceQuery::PartnerClicks).await.unwrap();
    assert_eq!(clicks.len(), 1);
    let click = &clicks[0];
    assert!(click.clicked);
    assert_eq!(click.cpc, Some(0.5));
    assert_eq!(click.cpa, Some(2.0));
    assert_eq!(click.weight, Some(1.5));
    assert_eq!(click.budget_spent, Some(0.0));
    assert_eq!(click.brand_id, Some(7));
    assert_eq!(click.rating, Some(4.5));
    assert_eq!(click.low_on_cost_rating, Some(3.0));

    let user_views = ctx.client.fetch(SourceQuery::UserViews).await.unwrap();
    assert_eq!(user_views.len(), 2);
    let first = by_user(&user_views, "auth0|1");
    assert!(first.clicked);
    assert_eq!(first.cpc, Some(1.5));
    assert_eq!(first.view_type.as_deref(), Some("list"));
    assert_eq!(first.language.as_deref(), Some("sv"));
    let second = by_user(&user_views, "auth0|2");
    assert!(!second.clicked);
    assert_eq!(second.cpc, None);
    assert_eq!(second.rating, Some(4.5));

    // Every row carries a timestamp in week 1 of 2024
    for records in [views, clicks, user_views] {
        let bucketed = bucket_events(records);
        assert_eq!(bucketed.malformed.total(), 0);
        assert!(bucketed
            .events
            .iter()
            .all(|e| e.period == PeriodKey::new(2024, 1)));
    }
}
