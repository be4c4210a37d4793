//! Period-over-period trends within a series.
//!
//! A series is every row sharing the same group key once the period value is
//! removed. Rows of a series are visited in ascending period order whatever
//! the table's dimension order.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::period::PeriodKey;
use crate::reduce::{ratio, round2};
use crate::table::{DimValue, Dimension, GroupKey, MetricValue, Table};

type Series = BTreeMap<Vec<DimValue>, Vec<(PeriodKey, GroupKey)>>;

fn series_of(table: &Table) -> Result<Series> {
    let period_idx = table
        .dimension_index(Dimension::Period)
        .ok_or_else(|| Error::schema("trend computation needs a period dimension"))?;

    let mut series: Series = BTreeMap::new();
    for key in table.keys() {
        let period = key.values()[period_idx]
            .as_period()
            .ok_or_else(|| Error::schema(format!("key {} has no period value", key)))?;
        let series_key: Vec<DimValue> = key
            .values()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != period_idx)
            .map(|(_, v)| v.clone())
            .collect();
        series.entry(series_key).or_default().push((period, key.clone()));
    }
    for rows in series.values_mut() {
        rows.sort_by_key(|(period, _)| *period);
    }
    Ok(series)
}

/// Adds weekly percentage change and a compounded growth index for `metric`.
///
/// `weekly_name` holds the change versus the directly preceding week
/// (percent, 2 dp); it is absent on the first period of a series and after
/// a gap. `index_name` holds the compounded index, 100 at the start of a
/// series and after a gap, then `prev * (1 + change)`, presented as percent
/// with 2 dp. The change is rounded to 2 dp before it is compounded, and the
/// index is rounded before scaling. A change from zero counts as 0.
pub fn period_growth(
    table: Table,
    metric: &str,
    weekly_name: &str,
    index_name: &str,
) -> Result<Table> {
    table.column_index(metric)?;
    let series = series_of(&table)?;

    let mut weekly: BTreeMap<GroupKey, MetricValue> = BTreeMap::new();
    let mut index: BTreeMap<GroupKey, MetricValue> = BTreeMap::new();

    for rows in series.values() {
        let mut prev: Option<(PeriodKey, f64)> = None;
        let mut compounded = 1.0;

        for (period, key) in rows {
            let value = table.value(key, metric);
            match (prev, value) {
                (Some((prev_period, prev_value)), Some(v)) if period.follows(&prev_period) => {
                    let change = round2(ratio(v - prev_value, prev_value));
                    compounded *= 1.0 + change;
                    weekly.insert(key.clone(), Some(round2(change * 100.0)));
                    index.insert(key.clone(), Some(round2(round2(compounded) * 100.0)));
                }
                (_, Some(_)) => {
                    compounded = 1.0;
                    weekly.insert(key.clone(), None);
                    index.insert(key.clone(), Some(100.0));
                }
                (_, None) => {
                    compounded = 1.0;
                    weekly.insert(key.clone(), None);
                    index.insert(key.clone(), None);
                }
            }
            prev = value.map(|v| (*period, v));
        }
    }

    table
        .with_column(weekly_name, weekly)?
        .with_column(index_name, index)
}

/// Adds the running mean of `metric` over all periods of the series up to
/// and including the current one, rounded to 2 dp.
pub fn expanding_mean(table: Table, metric: &str, out_name: &str) -> Result<Table> {
    table.column_index(metric)?;
    let series = series_of(&table)?;

    let mut out: BTreeMap<GroupKey, MetricValue> = BTreeMap::new();
    for rows in series.values() {
        let mut sum = 0.0;
        let mut count = 0usize;
        for (_, key) in rows {
            if let Some(v) = table.value(key, metric) {
                sum += v;
                count += 1;
            }
            out.insert(key.clone(), (count > 0).then(|| round2(sum / count as f64)));
        }
    }

    table.with_column(out_name, out)
}
