//! Warehouse setup for tests that run against ClickHouse.

use clickhouse_client::{ClickHouseClient, ClickHouseConfig};

use crate::containers::TestContainers;

/// Operational tables read by the extracts, with one partner, one offer in
/// Stockholm, two viewers and one click by `auth0|1`.
const SOURCE_TABLES: &[(&str, &str, &str)] = &[
    (
        "countries",
        "id Int64, name String",
        "(1, 'Sweden')",
    ),
    (
        "cities",
        "id Int64, name String, country_id Int64",
        "(10, 'Stockholm', 1)",
    ),
    (
        "partners",
        "id Int64, name String, brand_id Int64",
        "(100, 'Wolt', 7)",
    ),
    (
        "job_offers",
        "id Int64, partner_id Int64, city_id Int64, rating Float64, low_on_cost_rating Float64",
        "(1000, 100, 10, 4.5, 3.0)",
    ),
    (
        "views",
        "created_at DateTime, user_id String, job_offer_id Int64, partner_id Int64, \
         city_id Int64, type String, locale String",
        "('2024-01-08 09:30:00', 'auth0|1', 1000, 100, 10, 'list', 'sv'), \
         ('2024-01-08 11:00:00', 'auth0|2', 1000, 100, 10, 'map', 'en')",
    ),
    (
        "user_job_offers",
        "job_offer_id Int64, user_id String, created_at DateTime, cpc Float64, cpa Float64, \
         weight Float64, budget_exhausted Float64",
        "(1000, 'auth0|1', '2024-01-08 09:31:00', 0.5, 2.0, 1.5, 0)",
    ),
    (
        "auth0_users",
        "id String",
        "('auth0|1'), ('auth0|2')",
    ),
];

/// A client connected to a test ClickHouse.
pub struct WarehouseContext {
    pub containers: TestContainers,
    pub client: ClickHouseClient,
}

impl WarehouseContext {
    pub async fn new() -> Self {
        let containers = TestContainers::start().await;
        let config = ClickHouseConfig {
            url: containers.clickhouse_url.clone(),
            database: containers.clickhouse_database.clone(),
            username: containers.clickhouse_username.clone(),
            password: containers.clickhouse_password.clone(),
            timeout_secs: 30,
        };

        // The configured database may not exist yet on an external server
        let bootstrap = ClickHouseClient::new(ClickHouseConfig {
            database: "default".to_string(),
            ..config.clone()
        })
        .expect("Failed to create ClickHouse client");
        bootstrap
            .inner()
            .query(&format!(
                "CREATE DATABASE IF NOT EXISTS {}",
                config.database
            ))
            .execute()
            .await
            .expect("Failed to create database");

        let client = ClickHouseClient::new(config).expect("Failed to create ClickHouse client");
        Self { containers, client }
    }

    /// Recreates the operational tables with their fixture rows.
    pub async fn seed_source_tables(&self) {
        for (name, columns, rows) in SOURCE_TABLES {
            self.execute(&format!("DROP TABLE IF EXISTS {}", name)).await;
            self.execute(&format!(
                "CREATE TABLE {} ({}) ENGINE = MergeTree ORDER BY tuple()",
                name, columns
            ))
            .await;
            self.execute(&format!("INSERT INTO {} VALUES {}", name, rows))
                .await;
        }
    }

    pub async fn execute(&self, sql: &str) {
        self.client
            .inner()
            .query(sql)
            .execute()
            .await
            .unwrap_or_else(|e| panic!("query failed: {}\n{}", e, sql));
    }

    pub async fn count_rows(&self, qualified: &str) -> u64 {
        self.client
            .inner()
            .query(&format!("SELECT count() FROM {}", qualified))
            .fetch_one::<u64>()
            .await
            .expect("Failed to count rows")
    }

    pub async fn table_exists(&self, database: &str, table: &str) -> bool {
        self.client
            .inner()
            .query("SELECT count() FROM system.tables WHERE database = ? AND name = ?")
            .bind(database)
            .bind(table)
            .fetch_one::<u64>()
            .await
            .expect("Failed to query system.tables")
            > 0
    }

    /// `(name, type)` of each column, in table order.
    pub async fn columns(&self, database: &str, table: &str) -> Vec<(String, String)> {
        self.client
            .inner()
            .query(
                "SELECT name, type FROM system.columns \
                 WHERE database = ? AND table = ? ORDER BY position",
            )
            .bind(database)
            .bind(table)
            .fetch_all::<(String, String)>()
            .await
            .expect("Failed to query system.columns")
    }

    /// Values of a `String` column, sorted.
    pub async fn text_column(&self, qualified: &str, column: &str) -> Vec<String> {
        self.client
            .inner()
            .query(&format!(
                "SELECT {} FROM {} ORDER BY {}",
                column, qualified, column
            ))
            .fetch_all::<String>()
            .await
            .expect("Failed to read column")
    }
}
