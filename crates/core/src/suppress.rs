//! Minimum cohort size suppression.
//!
//! Rows backed by too few distinct individuals could re-identify them, so
//! they are dropped before a table is published.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::table::Table;

/// Keep rows whose `cohort_column` is strictly greater than `min_exclusive`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub cohort_column: String,
    pub min_exclusive: f64,
}

impl SuppressionRule {
    pub fn new(cohort_column: impl Into<String>, min_exclusive: f64) -> Self {
        Self {
            cohort_column: cohort_column.into(),
            min_exclusive,
        }
    }
}

/// A suppressed table and the number of rows removed.
#[derive(Debug, Clone)]
pub struct Suppressed {
    pub table: Table,
    pub suppressed: usize,
}

/// Applies `rule` to the final table. Rows with no cohort value are dropped.
pub fn suppress(table: Table, rule: &SuppressionRule) -> Result<Suppressed> {
    table.column_index(&rule.cohort_column)?;

    let before = table.len();
    let table = table.retain(|row| {
        row.value(&rule.cohort_column)
            .is_some_and(|size| size > rule.min_exclusive)
    });
    let suppressed = before - table.len();

    debug!(
        cohort_column = %rule.cohort_column,
        threshold = rule.min_exclusive,
        kept = table.len(),
        suppressed = suppressed,
        "Applied suppression"
    );

    Ok(Suppressed { table, suppressed })
}
