//! Deterministic scoring and regime classification.
//!
//! One threshold function serves both the per-category score (clamped to
//! ±2, thresholds ±1) and the composite score (clamped to ±4, thresholds
//! ±2). Callers pick a [`ScoreScale`]; nothing is special-cased per caller.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Core YoY above this adds structural pressure.
const CORE_HIGH: f64 = 4.0;
/// Core YoY below this subtracts structural pressure.
const CORE_LOW: f64 = 2.0;
/// Momentum dead band half-width.
const MOMENTUM_BAND: f64 = 0.3;
/// Breakeven above this adds expectation pressure.
const BREAKEVEN_HIGH: f64 = 3.0;
/// Breakeven below this subtracts expectation pressure.
const BREAKEVEN_LOW: f64 = 2.0;

/// Clamp bound and classification threshold for one level of aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreScale {
    pub bound: f64,
    pub threshold: f64,
}

impl ScoreScale {
    /// Per-category scale.
    pub const CATEGORY: ScoreScale = ScoreScale {
        bound: 2.0,
        threshold: 1.0,
    };
    /// Cross-category composite scale.
    pub const COMPOSITE: ScoreScale = ScoreScale {
        bound: 4.0,
        threshold: 2.0,
    };

    /// Clamp to `[-bound, bound]`. Non-finite input maps to 0.
    pub fn clamp(&self, score: f64) -> f64 {
        if !score.is_finite() {
            return 0.0;
        }
        score.clamp(-self.bound, self.bound)
    }

    /// `score >= threshold` is positive, `score <= -threshold` negative.
    pub fn classify(&self, score: f64) -> Polarity {
        if score >= self.threshold {
            Polarity::Positive
        } else if score <= -self.threshold {
            Polarity::Negative
        } else {
            Polarity::Neutral
        }
    }
}

/// Ordinal direction of a classified score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Negative,
    Neutral,
    Positive,
}

impl Polarity {
    /// Sign of a score: strictly positive, strictly negative, or zero.
    pub fn of_sign(score: f64) -> Self {
        if score > 0.0 {
            Polarity::Positive
        } else if score < 0.0 {
            Polarity::Negative
        } else {
            Polarity::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Negative => "negative",
            Polarity::Neutral => "neutral",
            Polarity::Positive => "positive",
        }
    }
}

/// Inflation regime label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InflationRegime {
    #[serde(rename = "Disinflationary")]
    Disinflationary,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Inflationary Pressure")]
    InflationaryPressure,
}

impl InflationRegime {
    pub fn label(&self) -> &'static str {
        match self {
            InflationRegime::Disinflationary => "Disinflationary",
            InflationRegime::Neutral => "Neutral",
            InflationRegime::InflationaryPressure => "Inflationary Pressure",
        }
    }

    /// Strict decode of a canonical label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Disinflationary" => Some(InflationRegime::Disinflationary),
            "Neutral" => Some(InflationRegime::Neutral),
            "Inflationary Pressure" => Some(InflationRegime::InflationaryPressure),
            _ => None,
        }
    }
}

impl From<Polarity> for InflationRegime {
    fn from(p: Polarity) -> Self {
        match p {
            Polarity::Negative => InflationRegime::Disinflationary,
            Polarity::Neutral => InflationRegime::Neutral,
            Polarity::Positive => InflationRegime::InflationaryPressure,
        }
    }
}

impl fmt::Display for InflationRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Composite cross-category regime label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompositeRegime {
    #[serde(rename = "Defensive Bias")]
    DefensiveBias,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Expansionary Bias")]
    ExpansionaryBias,
}

impl CompositeRegime {
    pub fn label(&self) -> &'static str {
        match self {
            CompositeRegime::DefensiveBias => "Defensive Bias",
            CompositeRegime::Neutral => "Neutral",
            CompositeRegime::ExpansionaryBias => "Expansionary Bias",
        }
    }
}

impl From<Polarity> for CompositeRegime {
    fn from(p: Polarity) -> Self {
        match p {
            Polarity::Negative => CompositeRegime::DefensiveBias,
            Polarity::Neutral => CompositeRegime::Neutral,
            Polarity::Positive => CompositeRegime::ExpansionaryBias,
        }
    }
}

impl fmt::Display for CompositeRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Inflation score in `[-2, 2]`.
///
/// Missing core YoY short-circuits to 0. Missing momentum or breakeven
/// contributes nothing.
pub fn score(core_yoy: Option<f64>, momentum: Option<f64>, breakeven: Option<f64>) -> f64 {
    let Some(core) = usable(core_yoy) else {
        return 0.0;
    };

    let mut score = 0.0;

    // Structural level
    if core > CORE_HIGH {
        score += 1.0;
    }
    if core < CORE_LOW {
        score -= 1.0;
    }

    // Short-term momentum
    if let Some(m) = usable(momentum) {
        if m > MOMENTUM_BAND {
            score += 0.5;
        }
        if m < -MOMENTUM_BAND {
            score -= 0.5;
        }
    }

    // Market expectations
    if let Some(b) = usable(breakeven) {
        if b > BREAKEVEN_HIGH {
            score += 0.5;
        }
        if b < BREAKEVEN_LOW {
            score -= 0.5;
        }
    }

    ScoreScale::CATEGORY.clamp(score)
}

/// Inflation regime for a category-scale score.
pub fn classify(score: f64) -> InflationRegime {
    ScoreScale::CATEGORY.classify(score).into()
}

/// Composite regime for a composite-scale score.
pub fn classify_composite(score: f64) -> CompositeRegime {
    ScoreScale::COMPOSITE.classify(score).into()
}
