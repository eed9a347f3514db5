//! Composite risk state across categories.
//!
//! The read path never fails: a store error or missing row falls back to a
//! live computation, and a failed live computation yields a clearly labeled
//! unavailable category with a neutral zero score.

mod normalize;
mod placeholders;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::SignalConfig;
use crate::consts::KEY_EVENT_SIGNAL;
use crate::jobs::{compute_inflation, InflationReading, KeyEventAggregate};
use crate::narrative::template_summary;
use crate::series::SeriesFetcher;
use crate::signal::{classify_composite, CompositeRegime, ScoreScale, Signal};
use crate::store::SignalStore;

pub use normalize::{decode_label, RiskLevel, StoredInflation};
pub use placeholders::placeholder_categories;

pub const UNAVAILABLE_STATUS: &str = "Data Unavailable";

/// One category of the dashboard view. Rebuilt on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskCategory {
    pub slug: String,
    pub label: String,
    pub level: RiskLevel,
    /// Display label for the level.
    pub status: String,
    pub score: f64,
    pub summary: String,
    pub trend: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskState {
    pub regime: CompositeRegime,
    /// Clamped to the composite bound.
    pub score: f64,
    pub categories: Vec<RiskCategory>,
    pub last_updated: DateTime<Utc>,
}

impl RiskState {
    /// Sum, clamp and classify category scores.
    pub fn from_categories(categories: Vec<RiskCategory>) -> Self {
        let total: f64 = categories.iter().map(|c| c.score).sum();
        let score = ScoreScale::COMPOSITE.clamp(total);
        Self {
            regime: classify_composite(score),
            score,
            categories,
            last_updated: Utc::now(),
        }
    }

    pub fn category(&self, slug: &str) -> Option<&RiskCategory> {
        self.categories.iter().find(|c| c.slug == slug)
    }
}

fn inflation_meta(
    headline: Option<f64>,
    core: Option<f64>,
    momentum: Option<f64>,
    breakeven: Option<f64>,
) -> serde_json::Value {
    json!({
        "headline": headline,
        "core": core,
        "momentum": momentum,
        "breakeven": breakeven,
    })
}

fn inflation_category(
    level: RiskLevel,
    status: &str,
    score: f64,
    summary: String,
    trend: Vec<f64>,
    meta: serde_json::Value,
) -> RiskCategory {
    RiskCategory {
        slug: "inflation".to_string(),
        label: "Inflation".to_string(),
        level,
        status: status.to_string(),
        score,
        summary,
        trend,
        meta: Some(meta),
    }
}

/// Category from a persisted row; `None` when the row is unreadable.
pub fn category_from_signal(signal: &Signal) -> Option<RiskCategory> {
    let stored = StoredInflation::from_structured(&signal.structured)?;
    let score = stored.category_score()?;
    let level = stored.level();
    Some(inflation_category(
        level,
        level.inflation_label(),
        score,
        signal.narrative_headline.clone(),
        stored.trend.clone(),
        inflation_meta(
            stored.headline_yoy,
            stored.core_yoy,
            stored.momentum,
            stored.breakeven_5y,
        ),
    ))
}

/// Category from a live reading, narrated by the deterministic template.
pub fn category_from_reading(reading: &InflationReading) -> RiskCategory {
    let m = reading.metrics();
    let level = RiskLevel::from(m.regime);
    inflation_category(
        level,
        level.inflation_label(),
        m.score,
        template_summary(m).summary,
        reading.snapshot.history.headline_trend(),
        inflation_meta(m.headline_yoy, m.core_yoy, m.momentum, m.breakeven_5y),
    )
}

pub fn unavailable_category() -> RiskCategory {
    inflation_category(
        RiskLevel::Neutral,
        UNAVAILABLE_STATUS,
        0.0,
        "Inflation data is currently unavailable.".to_string(),
        Vec::new(),
        inflation_meta(None, None, None, None),
    )
}

/// Builds the composite view from the store, with a live fallback.
pub struct RiskStateAggregator<'a> {
    store: &'a dyn SignalStore,
    fetcher: Option<&'a dyn SeriesFetcher>,
    signal: SignalConfig,
}

impl<'a> RiskStateAggregator<'a> {
    pub fn new(store: &'a dyn SignalStore, signal: SignalConfig) -> Self {
        Self {
            store,
            fetcher: None,
            signal,
        }
    }

    /// Enable live recomputation when no usable row exists.
    pub fn with_live_fallback(mut self, fetcher: &'a dyn SeriesFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    async fn latest(&self, signal_type: &str) -> Option<Signal> {
        match self.store.latest(signal_type).await {
            Ok(row) => row,
            Err(e) => {
                warn!(target: "macro_signals::risk", signal_type, error = %e, "Store read failed");
                None
            }
        }
    }

    async fn inflation(&self) -> RiskCategory {
        if let Some(row) = self.latest(&self.signal.signal_type).await {
            match category_from_signal(&row) {
                Some(category) => {
                    debug!(
                        target: "macro_signals::risk",
                        period = %row.period,
                        "Using stored inflation signal"
                    );
                    return category;
                }
                None => warn!(
                    target: "macro_signals::risk",
                    period = %row.period,
                    "Stored inflation row unreadable, falling back"
                ),
            }
        }

        let Some(fetcher) = self.fetcher else {
            return unavailable_category();
        };
        match compute_inflation(
            fetcher,
            self.signal.momentum_method,
            self.signal.history_window,
        )
        .await
        {
            Ok(reading) => category_from_reading(&reading),
            Err(e) => {
                warn!(target: "macro_signals::risk", error = %e, "Live inflation fallback failed");
                unavailable_category()
            }
        }
    }

    async fn key_events(&self) -> Option<KeyEventAggregate> {
        let row = self.latest(KEY_EVENT_SIGNAL).await?;
        serde_json::from_value(row.structured).ok()
    }

    pub async fn risk_state(&self) -> RiskState {
        let (inflation, key_events) = tokio::join!(self.inflation(), self.key_events());
        let mut categories = vec![inflation];
        categories.extend(placeholder_categories(key_events.as_ref()));
        let state = RiskState::from_categories(categories);
        debug!(
            target: "macro_signals::risk",
            score = state.score,
            regime = %state.regime,
            "Risk state built"
        );
        state
    }
}
