//! Keyed metric tables.
//!
//! A [`Table`] holds one row of metric values per [`GroupKey`]. Rows live in
//! an ordered map, so a key can appear at most once and iteration follows key
//! order (dimension by dimension, in the table's dimension order).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::period::PeriodKey;

/// A grouping dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Period,
    Country,
    Platform,
    City,
    Offer,
    User,
}

impl Dimension {
    /// Column name used when the table is published.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Period => "year_week",
            Self::Country => "country",
            Self::Platform => "platform",
            Self::City => "city",
            Self::Offer => "offer_id",
            Self::User => "user",
        }
    }
}

/// The value of one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DimValue {
    Period(PeriodKey),
    Text(String),
    Id(i64),
}

impl DimValue {
    pub fn as_period(&self) -> Option<PeriodKey> {
        match self {
            Self::Period(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for DimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Period(p) => write!(f, "{}", p),
            Self::Text(s) => f.write_str(s),
            Self::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Anything that can be grouped: exposes a value per dimension.
pub trait Dimensional {
    /// `None` when the row has no value for `dim`.
    fn dimension(&self, dim: Dimension) -> Option<DimValue>;
}

/// Ordered tuple of dimension values identifying one aggregate row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(Vec<DimValue>);

impl GroupKey {
    pub fn new(values: Vec<DimValue>) -> Self {
        Self(values)
    }

    /// Builds the key of `row` over `dims`, or `None` if any value is missing.
    pub fn of<R: Dimensional + ?Sized>(row: &R, dims: &[Dimension]) -> Option<Self> {
        dims.iter()
            .map(|d| row.dimension(*d))
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    pub fn values(&self) -> &[DimValue] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// A metric cell. `None` means absent (published as NULL).
pub type MetricValue = Option<f64>;

/// Aggregate table: dimensions, metric columns, one row per group key.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    dimensions: Vec<Dimension>,
    columns: Vec<String>,
    rows: BTreeMap<GroupKey, Vec<MetricValue>>,
}

impl Table {
    /// Creates an empty table. Column names must be unique.
    pub fn new(dimensions: Vec<Dimension>, columns: Vec<String>) -> Result<Self> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(Error::column_collision(name.clone()));
            }
        }
        Ok(Self {
            dimensions,
            columns,
            rows: BTreeMap::new(),
        })
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dimension_index(&self, dim: Dimension) -> Option<usize> {
        self.dimensions.iter().position(|d| *d == dim)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::unknown_column(name))
    }

    /// Inserts one row. Fails on a duplicate key or a wrong number of values.
    pub fn insert(&mut self, key: GroupKey, values: Vec<MetricValue>) -> Result<()> {
        if key.values().len() != self.dimensions.len() {
            return Err(Error::schema(format!(
                "key {} has {} values, table has {} dimensions",
                key,
                key.values().len(),
                self.dimensions.len()
            )));
        }
        if values.len() != self.columns.len() {
            return Err(Error::schema(format!(
                "row {} has {} values, table has {} columns",
                key,
                values.len(),
                self.columns.len()
            )));
        }
        if self.rows.contains_key(&key) {
            return Err(Error::internal(format!("duplicate group key {}", key)));
        }
        self.rows.insert(key, values);
        Ok(())
    }

    pub fn contains_key(&self, key: &GroupKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn get(&self, key: &GroupKey) -> Option<TableRow<'_>> {
        self.rows
            .get_key_value(key)
            .map(|(key, values)| TableRow {
                table: self,
                key,
                values,
            })
    }

    /// Value of `column` in the row at `key`; `None` if either is absent.
    pub fn value(&self, key: &GroupKey, column: &str) -> MetricValue {
        let idx = self.column_index(column).ok()?;
        self.rows.get(key).and_then(|values| values[idx])
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.rows.keys()
    }

    pub fn rows(&self) -> impl Iterator<Item = TableRow<'_>> {
        self.rows.iter().map(move |(key, values)| TableRow {
            table: self,
            key,
            values,
        })
    }

    /// Adds a column computed from each row.
    pub fn derive<F>(self, name: &str, f: F) -> Result<Table>
    where
        F: Fn(&TableRow<'_>) -> MetricValue,
    {
        let computed: BTreeMap<GroupKey, MetricValue> =
            self.rows().map(|row| (row.key().clone(), f(&row))).collect();
        self.with_column(name, computed)
    }

    /// Adds a column from explicit per-key values; keys without a value get `None`.
    pub fn with_column(
        mut self,
        name: &str,
        mut values: BTreeMap<GroupKey, MetricValue>,
    ) -> Result<Table> {
        if self.columns.iter().any(|c| c == name) {
            return Err(Error::column_collision(name));
        }
        self.columns.push(name.to_string());
        for (key, row) in self.rows.iter_mut() {
            row.push(values.remove(key).flatten());
        }
        Ok(self)
    }

    /// Keeps the rows for which `keep` returns true.
    pub fn retain<F>(mut self, keep: F) -> Table
    where
        F: Fn(&TableRow<'_>) -> bool,
    {
        let dropped: Vec<GroupKey> = self
            .rows()
            .filter(|row| !keep(row))
            .map(|row| row.key().clone())
            .collect();
        for key in dropped {
            self.rows.remove(&key);
        }
        self
    }
}

/// Borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct TableRow<'a> {
    table: &'a Table,
    key: &'a GroupKey,
    values: &'a [MetricValue],
}

impl<'a> TableRow<'a> {
    pub fn key(&self) -> &'a GroupKey {
        self.key
    }

    pub fn values(&self) -> &'a [MetricValue] {
        self.values
    }

    /// Value of `column`; `None` if the column is unknown or the cell is absent.
    pub fn value(&self, column: &str) -> MetricValue {
        let idx = self.table.column_index(column).ok()?;
        self.values[idx]
    }

    /// Like [`TableRow::value`] but absent cells read as zero.
    pub fn value_or_zero(&self, column: &str) -> f64 {
        self.value(column).unwrap_or(0.0)
    }
}

impl Dimensional for TableRow<'_> {
    fn dimension(&self, dim: Dimension) -> Option<DimValue> {
        let idx = self.table.dimension_index(dim)?;
        self.key.values().get(idx).cloned()
    }
}
