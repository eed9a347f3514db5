//! Decoding stored inflation rows into category inputs.
//!
//! Stored rows come in three shapes:
//!
//! - the current `{metrics, history}` snapshot
//! - bootstrap rows, `{indicators: {core_yoy: {current, history}, ..}, derived}`
//! - a legacy flat object with the metric fields at the top level and a
//!   free-text `regime`
//!
//! Whatever the shape, the regime level is recomputed from the score. A row
//! with no score, no core input and no decodable label is unreadable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::signal::{score, InflationRegime, Polarity, ScoreScale};

/// Category-level regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Neutral,
    High,
}

impl From<Polarity> for RiskLevel {
    fn from(p: Polarity) -> Self {
        match p {
            Polarity::Negative => RiskLevel::Low,
            Polarity::Neutral => RiskLevel::Neutral,
            Polarity::Positive => RiskLevel::High,
        }
    }
}

impl From<InflationRegime> for RiskLevel {
    fn from(r: InflationRegime) -> Self {
        match r {
            InflationRegime::Disinflationary => RiskLevel::Low,
            InflationRegime::Neutral => RiskLevel::Neutral,
            InflationRegime::InflationaryPressure => RiskLevel::High,
        }
    }
}

impl RiskLevel {
    pub fn of_score(score: f64) -> Self {
        ScoreScale::CATEGORY.classify(score).into()
    }

    /// Score at the edge of this level on the category scale.
    pub fn category_score(&self) -> f64 {
        match self {
            RiskLevel::Low => -ScoreScale::CATEGORY.threshold,
            RiskLevel::Neutral => 0.0,
            RiskLevel::High => ScoreScale::CATEGORY.threshold,
        }
    }

    pub fn inflation_label(&self) -> &'static str {
        match self {
            RiskLevel::Low => InflationRegime::Disinflationary.label(),
            RiskLevel::Neutral => InflationRegime::Neutral.label(),
            RiskLevel::High => InflationRegime::InflationaryPressure.label(),
        }
    }
}

/// Strict decode of a stored regime label.
///
/// Accepts the canonical labels and the two legacy keywords; anything else
/// is `None` and the caller must not guess.
pub fn decode_label(label: &str) -> Option<RiskLevel> {
    if let Some(regime) = InflationRegime::from_label(label.trim()) {
        return Some(regime.into());
    }
    match label.trim().to_ascii_lowercase().as_str() {
        "inflation" => Some(RiskLevel::High),
        "disinflation" => Some(RiskLevel::Low),
        _ => None,
    }
}

/// Inflation inputs recovered from a stored `structured` column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredInflation {
    pub headline_yoy: Option<f64>,
    pub core_yoy: Option<f64>,
    pub momentum: Option<f64>,
    pub breakeven_5y: Option<f64>,
    pub score: Option<f64>,
    pub regime_label: Option<String>,
    pub trend: Vec<f64>,
}

fn number(v: &Value, key: &str) -> Option<f64> {
    v.get(key).and_then(Value::as_f64).filter(|f| f.is_finite())
}

fn numbers(v: Option<&Value>) -> Option<Vec<f64>> {
    v.and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_f64).collect())
}

fn text(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

impl StoredInflation {
    /// Decode a `structured` column; `None` when nothing usable is in it.
    pub fn from_structured(structured: &Value) -> Option<Self> {
        if !structured.is_object() {
            return None;
        }
        let stored = match structured.get("indicators") {
            Some(indicators) => Self::from_bootstrap(indicators, structured.get("derived")),
            None => Self::from_metrics(structured),
        };
        stored.category_score().is_some().then_some(stored)
    }

    fn from_metrics(structured: &Value) -> Self {
        let metrics = structured.get("metrics").unwrap_or(structured);
        let trend = numbers(
            structured
                .get("history")
                .and_then(|h| h.get("headlineYoY"))
                .or_else(|| structured.get("series")),
        );
        Self {
            headline_yoy: number(metrics, "headlineYoY"),
            core_yoy: number(metrics, "coreYoY"),
            momentum: number(metrics, "momentum").or_else(|| number(metrics, "coreMomentum")),
            breakeven_5y: number(metrics, "breakeven5y"),
            score: number(metrics, "score"),
            regime_label: text(metrics, "regime"),
            trend: trend.unwrap_or_default(),
        }
    }

    fn from_bootstrap(indicators: &Value, derived: Option<&Value>) -> Self {
        let current = |key: &str| indicators.get(key).and_then(|i| number(i, "current"));
        Self {
            headline_yoy: current("headline_yoy"),
            core_yoy: current("core_yoy"),
            momentum: derived.and_then(|d| number(d, "momentum")),
            breakeven_5y: current("breakeven_5y"),
            score: derived.and_then(|d| number(d, "score")),
            regime_label: derived.and_then(|d| text(d, "regime")),
            trend: numbers(indicators.get("headline_yoy").and_then(|h| h.get("history")))
                .unwrap_or_default(),
        }
    }

    fn decoded_label(&self) -> Option<RiskLevel> {
        self.regime_label.as_deref().and_then(decode_label)
    }

    /// Authoritative category score: the stored score when usable, else a
    /// recomputation from the stored inputs, else the edge score of a
    /// decodable stored label.
    pub fn category_score(&self) -> Option<f64> {
        if let Some(s) = self.score {
            return Some(ScoreScale::CATEGORY.clamp(s));
        }
        if let Some(core) = self.core_yoy {
            return Some(score(Some(core), self.momentum, self.breakeven_5y));
        }
        self.decoded_label().map(|level| level.category_score())
    }

    /// Regime level recomputed from the score.
    pub fn level(&self) -> RiskLevel {
        let decoded = self.decoded_label();
        match self.category_score() {
            Some(s) => {
                let level = RiskLevel::of_score(s);
                if let Some(stored) = decoded.filter(|d| *d != level) {
                    warn!(
                        target: "macro_signals::risk",
                        score = s,
                        stored = ?stored,
                        recomputed = ?level,
                        "Stored regime disagrees with score, using score"
                    );
                }
                level
            }
            None => RiskLevel::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_label() {
        assert_eq!(decode_label("Inflationary Pressure"), Some(RiskLevel::High));
        assert_eq!(decode_label(" Disinflationary "), Some(RiskLevel::Low));
        assert_eq!(decode_label("inflation"), Some(RiskLevel::High));
        assert_eq!(decode_label("Disinflation"), Some(RiskLevel::Low));
        assert_eq!(decode_label("Data Unavailable"), None);
        assert_eq!(decode_label("rising inflation risk"), None);
    }

    #[test]
    fn test_score_beats_stale_label() {
        let stored = StoredInflation::from_structured(&json!({
            "metrics": {"coreYoY": 2.5, "score": -1.5, "regime": "Inflationary Pressure"},
            "history": {"headlineYoY": [3.0, null, 2.9]}
        }))
        .unwrap();
        assert_eq!(stored.level(), RiskLevel::Low);
        assert_eq!(stored.trend, vec![3.0, 2.9]);
    }

    #[test]
    fn test_legacy_flat_shape_recomputes_from_inputs() {
        let stored = StoredInflation::from_structured(&json!({
            "headlineYoY": 3.1, "coreYoY": 4.6, "coreMomentum": 0.5, "breakeven5y": 2.5,
            "regime": "inflation"
        }))
        .unwrap();
        assert_eq!(stored.category_score(), Some(1.5));
        assert_eq!(stored.level(), RiskLevel::High);
    }

    #[test]
    fn test_label_only_scores_at_threshold() {
        let stored = StoredInflation::from_structured(&json!({"regime": "disinflation"})).unwrap();
        assert_eq!(stored.category_score(), Some(-1.0));
        assert_eq!(stored.level(), RiskLevel::Low);

        let stored = StoredInflation::from_structured(&json!({"regime": "inflation"})).unwrap();
        assert_eq!(stored.category_score(), Some(1.0));
        assert_eq!(stored.level(), RiskLevel::High);
    }

    #[test]
    fn test_rows_without_usable_fields_are_unreadable() {
        assert!(StoredInflation::from_structured(&json!({})).is_none());
        assert!(StoredInflation::from_structured(&json!({"regime": "hot"})).is_none());
        let headline_only = json!({"metrics": {"headlineYoY": 3.0}});
        assert!(StoredInflation::from_structured(&headline_only).is_none());
        let empty_bootstrap = json!({"indicators": {}, "derived": {}});
        assert!(StoredInflation::from_structured(&empty_bootstrap).is_none());
    }

    #[test]
    fn test_bootstrap_shape() {
        let stored = StoredInflation::from_structured(&json!({
            "indicators": {
                "core_yoy": {"current": 4.6, "history": [4.4, 4.5, 4.6]},
                "headline_yoy": {"current": 3.1, "history": [3.3, null, 3.1]},
                "breakeven_5y": {"current": null, "history": []}
            },
            "derived": {"momentum": 0.5, "score": 2.0, "regime": "Inflationary Pressure"}
        }))
        .unwrap();
        assert_eq!(stored.core_yoy, Some(4.6));
        assert_eq!(stored.headline_yoy, Some(3.1));
        assert_eq!(stored.breakeven_5y, None);
        assert_eq!(stored.momentum, Some(0.5));
        assert_eq!(stored.category_score(), Some(2.0));
        assert_eq!(stored.level(), RiskLevel::High);
        assert_eq!(stored.trend, vec![3.3, 3.1]);
    }

    #[test]
    fn test_bootstrap_shape_without_derived_score_recomputes() {
        let stored = StoredInflation::from_structured(&json!({
            "indicators": {"core_yoy": {"current": 4.6}, "breakeven_5y": {"current": 2.5}},
            "derived": {"momentum": 0.5, "score": null, "regime": "Neutral"}
        }))
        .unwrap();
        assert_eq!(stored.category_score(), Some(1.5));
        assert_eq!(stored.level(), RiskLevel::High);
    }

    #[test]
    fn test_out_of_range_score_is_clamped() {
        let stored = StoredInflation::from_structured(&json!({"score": 9.0})).unwrap();
        assert_eq!(stored.category_score(), Some(2.0));
        assert!(StoredInflation::from_structured(&json!("text")).is_none());
    }
}
