//! External time-series providers.
//!
//! Every provider returns observations sorted ascending by date with the
//! missing-data marker and non-finite values already removed, so metric
//! derivation never sees a sentinel.

pub mod align;
pub mod bls;
pub mod fred;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::prelude::Result;

pub use bls::BlsClient;
pub use fred::FredClient;

/// One external data point. Immutable once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }

    /// Calendar month key, `YYYY-MM`.
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// Provider-side transform applied before the series is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesTransform {
    /// Percent change from one year ago.
    PercentChangeFromYearAgo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub series_id: String,
    pub transform: Option<SeriesTransform>,
}

impl SeriesRequest {
    pub fn levels(series_id: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            transform: None,
        }
    }

    pub fn year_over_year(series_id: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            transform: Some(SeriesTransform::PercentChangeFromYearAgo),
        }
    }
}

/// Boundary to an external time-series provider.
#[async_trait]
pub trait SeriesFetcher: Send + Sync {
    /// Fetch ordered `(date, value)` pairs for one series.
    async fn fetch(&self, request: &SeriesRequest) -> Result<Vec<Observation>>;

    /// Provider name for logs and health output.
    fn name(&self) -> &'static str;
}

/// Sort ascending by date and drop non-finite values.
pub(crate) fn normalize(mut observations: Vec<Observation>) -> Vec<Observation> {
    observations.retain(|o| o.value.is_finite());
    observations.sort_by_key(|o| o.date);
    observations
}
