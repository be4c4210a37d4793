//! Cross-view merge of aggregate tables.

use crate::error::{Error, Result};
use crate::table::Table;

/// Inner-joins tables on their group key.
///
/// All tables must share the same dimensions and contribute disjoint metric
/// columns. A key missing from any table is left out of the result.
pub fn merge(tables: &[&Table]) -> Result<Table> {
    let (first, rest) = tables
        .split_first()
        .ok_or_else(|| Error::schema("merge needs at least one table"))?;

    for table in rest {
        if table.dimensions() != first.dimensions() {
            return Err(Error::schema(format!(
                "cannot merge tables keyed by {:?} and {:?}",
                first.dimensions(),
                table.dimensions()
            )));
        }
    }

    let columns: Vec<String> = tables
        .iter()
        .flat_map(|t| t.columns().iter().cloned())
        .collect();
    let mut merged = Table::new(first.dimensions().to_vec(), columns)?;

    'rows: for row in first.rows() {
        let mut values = row.values().to_vec();
        for table in rest {
            match table.get(row.key()) {
                Some(other) => values.extend_from_slice(other.values()),
                None => continue 'rows,
            }
        }
        merged.insert(row.key().clone(), values)?;
    }

    Ok(merged)
}
