use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::scoring::{classify, score, InflationRegime};
use crate::narrative::DeepAnalysis;

/// Derived inflation metrics. Only persisted inside a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    #[serde(rename = "headlineYoY")]
    pub headline_yoy: Option<f64>,
    #[serde(rename = "coreYoY")]
    pub core_yoy: Option<f64>,
    pub momentum: Option<f64>,
    #[serde(rename = "breakeven5y")]
    pub breakeven_5y: Option<f64>,
    pub score: f64,
    pub regime: InflationRegime,
}

impl MetricSet {
    /// Score and classify raw inputs. The regime always matches the score.
    pub fn from_inputs(
        headline_yoy: Option<f64>,
        core_yoy: Option<f64>,
        momentum: Option<f64>,
        breakeven_5y: Option<f64>,
    ) -> Self {
        let score = score(core_yoy, momentum, breakeven_5y);
        Self {
            headline_yoy,
            core_yoy,
            momentum,
            breakeven_5y,
            score,
            regime: classify(score),
        }
    }

    /// Degraded-but-valid metrics when provider data is unavailable.
    pub fn unavailable() -> Self {
        Self::from_inputs(None, None, None, None)
    }

    /// Recompute score and regime from the inputs, discarding whatever the
    /// caller supplied for them.
    pub fn rescored(self) -> Self {
        Self::from_inputs(self.headline_yoy, self.core_yoy, self.momentum, self.breakeven_5y)
    }

    pub fn is_available(&self) -> bool {
        self.core_yoy.is_some()
    }

    /// SHA-256 of the serialized metrics, hex encoded.
    pub fn data_hash(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

/// Trailing history windows, most recent last, each at most N long.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryWindows {
    #[serde(rename = "headlineYoY")]
    pub headline_yoy: Vec<Option<f64>>,
    #[serde(rename = "coreYoY")]
    pub core_yoy: Vec<Option<f64>>,
    #[serde(rename = "breakeven5y")]
    pub breakeven_5y: Vec<Option<f64>>,
}

impl HistoryWindows {
    /// Headline YoY history with gaps removed, for trend charts.
    pub fn headline_trend(&self) -> Vec<f64> {
        self.headline_yoy.iter().flatten().copied().collect()
    }
}

/// The `structured` column of an inflation signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredSnapshot {
    pub metrics: MetricSet,
    #[serde(default)]
    pub history: HistoryWindows,
}

/// Uniqueness key of a persisted signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalKey {
    pub signal_type: String,
    pub period: String,
    pub prompt_version: String,
}

impl SignalKey {
    pub fn new(
        signal_type: impl Into<String>,
        period: impl Into<String>,
        prompt_version: impl Into<String>,
    ) -> Self {
        Self {
            signal_type: signal_type.into(),
            period: period.into(),
            prompt_version: prompt_version.into(),
        }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.signal_type, self.period, self.prompt_version)
    }
}

/// Persisted, append-only signal row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal_type: String,
    pub period: String,
    pub structured: serde_json::Value,
    pub narrative_headline: String,
    pub narrative_deep: Option<serde_json::Value>,
    pub model_version: String,
    pub prompt_version: String,
    pub scoring_version: String,
    #[serde(default)]
    pub data_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    pub fn key(&self) -> SignalKey {
        SignalKey::new(&self.signal_type, &self.period, &self.prompt_version)
    }

    /// Strict decode of the `structured` column as an inflation snapshot.
    pub fn inflation_snapshot(&self) -> Option<StructuredSnapshot> {
        serde_json::from_value(self.structured.clone()).ok()
    }

    /// Strict decode of the `narrative_deep` column as a six-section analysis.
    pub fn deep_analysis(&self) -> Option<DeepAnalysis> {
        self.narrative_deep
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
