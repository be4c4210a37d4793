//! DDL for published metric tables.
//!
//! Published tables are derived from the [`Table`] being written:
//! - dimensions become key columns (`Int64` for offer ids, `String` otherwise)
//! - metrics become `Nullable(Float64)`
//! - the table is ordered by its dimensions

use metrics_core::{Dimension, Error, Result, Table};

/// Checks that a database, table or column name is a plain identifier.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(Error::config(format!("invalid identifier: {:?}", name)))
    }
}

/// `namespace.name`, validated.
pub fn qualified_name(namespace: &str, name: &str) -> Result<String> {
    Ok(format!(
        "{}.{}",
        validate_identifier(namespace)?,
        validate_identifier(name)?
    ))
}

fn dimension_type(dim: Dimension) -> &'static str {
    match dim {
        Dimension::Offer => "Int64",
        _ => "String",
    }
}

/// SQL for creating the database that holds published tables.
pub fn create_database_sql(namespace: &str) -> Result<String> {
    Ok(format!(
        "CREATE DATABASE IF NOT EXISTS {}",
        validate_identifier(namespace)?
    ))
}

/// SQL for creating a table shaped like `table`.
pub fn create_table_sql(qualified: &str, table: &Table) -> Result<String> {
    let mut columns = Vec::new();
    for dim in table.dimensions() {
        columns.push(format!("    {} {}", dim.column_name(), dimension_type(*dim)));
    }
    for metric in table.columns() {
        columns.push(format!(
            "    {} Nullable(Float64)",
            validate_identifier(metric)?
        ));
    }

    let order_by = if table.dimensions().is_empty() {
        "tuple()".to_string()
    } else {
        let dims: Vec<&str> = table.dimensions().iter().map(|d| d.column_name()).collect();
        format!("({})", dims.join(", "))
    };

    Ok(format!(
        "CREATE TABLE {} (\n{}\n)\nENGINE = MergeTree()\nORDER BY {}",
        qualified,
        columns.join(",\n"),
        order_by
    ))
}
