//! Grouped aggregation.
//!
//! [`aggregate`] groups any [`Dimensional`] rows by a list of dimensions and
//! evaluates a set of named reducers per group. Tables are themselves
//! groupable through [`TableRow`], which is how two-stage aggregations work:
//! aggregate the events at a fine key, then [`regroup`] the result.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::reduce::{mean, round2};
use crate::table::{Dimension, Dimensional, GroupKey, MetricValue, Table, TableRow};

type Reducer<R> = Box<dyn Fn(&[&R]) -> MetricValue + Send + Sync>;

/// A named reducer over the rows of one group.
pub struct MetricSpec<R> {
    name: String,
    reduce: Reducer<R>,
}

impl<R> MetricSpec<R> {
    pub fn new<F>(name: impl Into<String>, reduce: F) -> Self
    where
        F: Fn(&[&R]) -> MetricValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            reduce: Box::new(reduce),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<R> std::fmt::Debug for MetricSpec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricSpec").field("name", &self.name).finish()
    }
}

/// Produces one row per distinct group key found in `rows`.
///
/// Rows lacking a value for any grouping dimension are skipped. Non-finite
/// reducer results are stored as absent.
pub fn aggregate<R: Dimensional>(
    rows: &[R],
    dims: &[Dimension],
    metrics: &[MetricSpec<R>],
) -> Result<Table> {
    let columns = metrics.iter().map(|m| m.name.clone()).collect();
    let mut table = Table::new(dims.to_vec(), columns)?;

    let mut groups: BTreeMap<GroupKey, Vec<&R>> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in rows {
        match GroupKey::of(row, dims) {
            Some(key) => groups.entry(key).or_default().push(row),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(
            skipped = skipped,
            dimensions = ?dims,
            "Skipped rows with missing group dimensions"
        );
    }

    for (key, members) in groups {
        let values = metrics
            .iter()
            .map(|m| (m.reduce)(&members[..]).filter(|v| v.is_finite()))
            .collect();
        table.insert(key, values)?;
    }

    Ok(table)
}

/// Aggregates an aggregate table again, at a coarser key.
pub fn regroup<'a>(
    table: &'a Table,
    dims: &[Dimension],
    metrics: &[MetricSpec<TableRow<'a>>],
) -> Result<Table> {
    ensure_subset(table, dims)?;
    let rows: Vec<TableRow<'a>> = table.rows().collect();
    aggregate(&rows, dims, metrics)
}

/// Averages every metric column over a coarser key, rounded to 2 decimals.
///
/// Dimensions dropped from the key (such as an offer id) are not metrics and
/// never enter the mean.
pub fn rollup_mean(table: &Table, dims: &[Dimension]) -> Result<Table> {
    let metrics: Vec<MetricSpec<TableRow<'_>>> = table
        .columns()
        .iter()
        .map(|column| {
            let name = column.clone();
            MetricSpec::new(column.clone(), move |rows: &[&TableRow<'_>]| {
                mean(rows.iter().map(|r| r.value(&name))).map(round2)
            })
        })
        .collect();
    regroup(table, dims, &metrics)
}

fn ensure_subset(table: &Table, dims: &[Dimension]) -> Result<()> {
    match dims.iter().find(|d| table.dimension_index(**d).is_none()) {
        Some(missing) => Err(Error::schema(format!(
            "cannot group by {:?}: table dimensions are {:?}",
            missing,
            table.dimensions()
        ))),
        None => Ok(()),
    }
}
