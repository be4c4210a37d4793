//! Core types and table transforms for the weekly metrics engine.

pub mod aggregate;
pub mod error;
pub mod io;
pub mod merge;
pub mod period;
pub mod record;
pub mod reduce;
pub mod suppress;
pub mod table;
pub mod trend;

pub use aggregate::{aggregate, regroup, rollup_mean, MetricSpec};
pub use error::{Error, Result};
pub use io::*;
pub use merge::merge;
pub use period::{bucket_events, parse_timestamp, Bucketed, MalformedCounts, PeriodKey};
pub use record::*;
pub use suppress::{suppress, Suppressed, SuppressionRule};
pub use table::*;
pub use trend::{expanding_mean, period_growth};
