//! Raw event records as extracted from the source.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::period::{parse_timestamp, PeriodKey};
use crate::table::{DimValue, Dimension, Dimensional};

/// One observed action (a view, or a click on an offer).
///
/// Fields are optional where the extract can legitimately produce NULLs;
/// the bucketer decides which absences make a record unusable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub user: Option<String>,
    pub offer_id: Option<i64>,
    pub platform: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub clicked: bool,

    // Offer / partner measures
    pub rating: Option<f64>,
    pub low_on_cost_rating: Option<f64>,
    pub cpc: Option<f64>,
    pub cpa: Option<f64>,
    pub weight: Option<f64>,
    pub budget_spent: Option<f64>,
    pub brand_id: Option<i64>,

    // View metadata
    pub view_type: Option<String>,
    pub language: Option<String>,
}

impl EventRecord {
    /// A view of `offer_id` by `user` at `timestamp`.
    ///
    /// An unparseable timestamp leaves the field empty so the record is
    /// counted as malformed during bucketing.
    pub fn view(timestamp: &str, user: impl Into<String>, offer_id: i64) -> Self {
        Self {
            timestamp: parse_timestamp(timestamp),
            user: Some(user.into()),
            offer_id: Some(offer_id),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, country: impl Into<String>, city: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self.city = Some(city.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_clicked(mut self, clicked: bool) -> Self {
        self.clicked = clicked;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// A record that passed bucketing, paired with its week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyEvent {
    pub period: PeriodKey,
    pub record: EventRecord,
}

impl WeeklyEvent {
    /// Bucketing guarantees a user is present.
    pub fn user(&self) -> &str {
        self.record.user.as_deref().unwrap_or_default()
    }

    pub fn offer_id(&self) -> i64 {
        self.record.offer_id.unwrap_or_default()
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.record.timestamp.unwrap_or_default()
    }
}

impl Dimensional for WeeklyEvent {
    fn dimension(&self, dim: Dimension) -> Option<DimValue> {
        let text = |v: &Option<String>| v.clone().map(DimValue::Text);
        match dim {
            Dimension::Period => Some(DimValue::Period(self.period)),
            Dimension::Country => text(&self.record.country),
            Dimension::Platform => text(&self.record.platform),
            Dimension::City => text(&self.record.city),
            Dimension::Offer => self.record.offer_id.map(DimValue::Id),
            Dimension::User => text(&self.record.user),
        }
    }
}
