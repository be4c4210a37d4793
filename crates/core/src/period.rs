//! Weekly time bucketing.
//!
//! Weeks follow the `%U` calendar convention: a week starts on Sunday and the
//! days before the first Sunday of a year form week 0, so week numbers run
//! from 0 to 53. Timestamps are expected to be normalized to UTC upstream.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::{EventRecord, WeeklyEvent};

/// A (year, week) bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    pub week: u32,
}

impl PeriodKey {
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    /// Buckets a timestamp into its Sunday-start calendar week.
    pub fn from_datetime(ts: NaiveDateTime) -> Self {
        Self::from_date(ts.date())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let day_of_year = date.ordinal0();
        let days_from_sunday = date.weekday().num_days_from_sunday();
        Self {
            year: date.year(),
            week: (day_of_year + 7 - days_from_sunday) / 7,
        }
    }

    /// First day of this week inside its year.
    ///
    /// Week 0 starts on January 1st whatever the weekday; every other week
    /// starts on a Sunday.
    pub fn week_start(&self) -> Option<NaiveDate> {
        let jan_first = NaiveDate::from_ymd_opt(self.year, 1, 1)?;
        if self.week == 0 {
            return Some(jan_first);
        }
        let to_first_sunday = (7 - jan_first.weekday().num_days_from_sunday()) % 7;
        let offset = to_first_sunday as i64 + (self.week as i64 - 1) * 7;
        jan_first.checked_add_days(chrono::Days::new(offset as u64))
    }

    /// Whether `self` is the week directly after `prev`.
    ///
    /// The last week of a year and week 0 of the next one are the two halves
    /// of one calendar week and count as consecutive.
    pub fn follows(&self, prev: &PeriodKey) -> bool {
        match (prev.week_start(), self.week_start()) {
            (Some(a), Some(b)) => {
                let days = (b - a).num_days();
                (1..=7).contains(&days)
            }
            _ => false,
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.week)
    }
}

/// Parses a source timestamp.
///
/// Accepts RFC 3339 (converted to UTC) and naive `YYYY-MM-DD HH:MM:SS[.f]`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Counts of records excluded while bucketing, by the first missing field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MalformedCounts {
    pub missing_timestamp: u64,
    pub missing_user: u64,
    pub missing_offer: u64,
}

impl MalformedCounts {
    pub fn total(&self) -> u64 {
        self.missing_timestamp + self.missing_user + self.missing_offer
    }
}

/// Output of [`bucket_events`].
#[derive(Debug, Default)]
pub struct Bucketed {
    pub events: Vec<WeeklyEvent>,
    pub malformed: MalformedCounts,
}

/// Assigns a period to every record that has a timestamp, user and offer.
///
/// Records missing any of these are dropped and counted.
pub fn bucket_events(records: Vec<EventRecord>) -> Bucketed {
    let mut out = Bucketed {
        events: Vec::with_capacity(records.len()),
        malformed: MalformedCounts::default(),
    };

    for record in records {
        let Some(ts) = record.timestamp else {
            out.malformed.missing_timestamp += 1;
            continue;
        };
        if record.user.as_deref().map_or(true, str::is_empty) {
            out.malformed.missing_user += 1;
            continue;
        }
        if record.offer_id.is_none() {
            out.malformed.missing_offer += 1;
            continue;
        }
        out.events.push(WeeklyEvent {
            period: PeriodKey::from_datetime(ts),
            record,
        });
    }

    if out.malformed.total() > 0 {
        debug!(
            kept = out.events.len(),
            missing_timestamp = out.malformed.missing_timestamp,
            missing_user = out.malformed.missing_user,
            missing_offer = out.malformed.missing_offer,
            "Excluded malformed records"
        );
    }

    out
}
