//! Replace-publish of metric tables.
//!
//! A table is written to a staging table first and swapped in with
//! `EXCHANGE TABLES`, so a failed publish leaves the previous table intact.

use crate::client::ClickHouseClient;
use crate::schema::{create_database_sql, create_table_sql, qualified_name};
use async_trait::async_trait;
use metrics_core::{DimValue, Error, PublishResult, Result, Table, TableSink};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

/// Renders `table` as `JSONEachRow` lines.
///
/// `?` characters are written as the `?` escape: the client treats a
/// bare `?` in query text as a bind placeholder.
pub fn json_each_row(table: &Table) -> Result<String> {
    let mut lines = Vec::with_capacity(table.len());

    for row in table.rows() {
        let mut object = Map::new();
        for (dim, value) in table.dimensions().iter().zip(row.key().values()) {
            let json = match value {
                DimValue::Period(p) => Value::String(p.to_string()),
                DimValue::Text(s) => Value::String(s.clone()),
                DimValue::Id(id) => Value::Number((*id).into()),
            };
            object.insert(dim.column_name().to_string(), json);
        }
        for (column, value) in table.columns().iter().zip(row.values()) {
            let json = value
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
            object.insert(column.clone(), json);
        }

        let line = serde_json::to_string(&Value::Object(object))
            .map_err(|e| Error::internal(format!("failed to encode row: {}", e)))?;
        lines.push(line.replace('?', "\\u003f"));
    }

    Ok(lines.join("\n"))
}

impl ClickHouseClient {
    async fn execute(&self, table: &str, sql: &str) -> Result<()> {
        self.inner()
            .query(sql)
            .execute()
            .await
            .map_err(|e| Error::publish(table, e.to_string()))
    }
}

#[async_trait]
impl TableSink for ClickHouseClient {
    async fn publish(&self, name: &str, namespace: &str, table: &Table) -> Result<PublishResult> {
        let target = qualified_name(namespace, name)?;
        let staging = qualified_name(namespace, &format!("{}_staging", name))?;

        self.execute(name, &create_database_sql(namespace)?).await?;
        self.execute(name, &format!("DROP TABLE IF EXISTS {}", staging))
            .await?;
        self.execute(name, &create_table_sql(&staging, table)?).await?;

        if !table.is_empty() {
            let body = json_each_row(table)?;
            let insert = format!("INSERT INTO {} FORMAT JSONEachRow\n{}", staging, body);
            self.execute(name, &insert).await?;
            debug!(table = %staging, rows = table.len(), "Staged rows");
        }

        self.execute(
            name,
            &format!("CREATE TABLE IF NOT EXISTS {} AS {}", target, staging),
        )
        .await?;
        self.execute(
            name,
            &format!("EXCHANGE TABLES {} AND {}", staging, target),
        )
        .await?;
        self.execute(name, &format!("DROP TABLE IF EXISTS {}", staging))
            .await?;

        info!(table = %target, rows = table.len(), "Published table");

        Ok(PublishResult {
            table: target,
            rows_written: table.len(),
        })
    }
}
