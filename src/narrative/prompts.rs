//! Deterministic prompt construction.
//!
//! Prompts are pure functions of the metrics and configuration, so the same
//! inputs always produce the same request.

use serde::{Deserialize, Serialize};

use super::config::{NarrativeConfig, Tone};
use super::schema::SummaryNarrative;
use crate::signal::{MetricSet, Polarity};

const ANALYST_INSTRUCTIONS: &str = "You are a macroeconomic analyst writing for an \
investment dashboard. \
Educational tone only. Do not give investment advice or direct portfolio recommendations. \
Respond only with JSON matching the provided schema.";

const EVALUATOR_INSTRUCTIONS: &str = "You are an editor grading dashboard copy. \
Respond only with JSON matching the provided schema.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stocks,
    Bonds,
    Gold,
    Silver,
    Oil,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Stocks,
        AssetClass::Bonds,
        AssetClass::Gold,
        AssetClass::Silver,
        AssetClass::Oil,
    ];

    /// JSON key of the section.
    pub fn key(&self) -> &'static str {
        match self {
            AssetClass::Stocks => "stocks",
            AssetClass::Bonds => "bonds",
            AssetClass::Gold => "gold",
            AssetClass::Silver => "silver",
            AssetClass::Oil => "oil",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetClass::Stocks => "Stocks",
            AssetClass::Bonds => "Bonds",
            AssetClass::Gold => "Gold",
            AssetClass::Silver => "Silver",
            AssetClass::Oil => "Oil",
        }
    }
}

/// Exact opening sentence each asset section must start with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPrefixes {
    prefixes: [String; 5],
}

impl AssetPrefixes {
    /// Direction from the score sign, strength from the tone.
    pub fn new(direction: Polarity, tone: Tone) -> Self {
        let prefixes = AssetClass::ALL.map(|asset| {
            format!(
                "{}: {} {} inflation signal.",
                asset.label(),
                tone.strength(),
                direction.as_str()
            )
        });
        Self { prefixes }
    }

    pub fn for_metrics(metrics: &MetricSet, config: &NarrativeConfig) -> Self {
        Self::new(Polarity::of_sign(metrics.score), config.tone)
    }

    pub fn get(&self, asset: AssetClass) -> &str {
        let idx = AssetClass::ALL
            .iter()
            .position(|a| *a == asset)
            .unwrap_or_default();
        &self.prefixes[idx]
    }
}

/// `3.25%` or `N/A`.
pub(crate) fn fmt_pct(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}%"),
        _ => "N/A".to_string(),
    }
}

fn data_block(metrics: &MetricSet) -> String {
    format!(
        "Data:\nHeadline CPI (YoY): {}\nCore CPI (YoY): {}\n3M Momentum: {}\n\
         5Y Breakeven: {}\nScore: {:.1}\nRegime: {}",
        fmt_pct(metrics.headline_yoy, 2),
        fmt_pct(metrics.core_yoy, 2),
        fmt_pct(metrics.momentum, 2),
        fmt_pct(metrics.breakeven_5y, 2),
        metrics.score,
        metrics.regime,
    )
}

fn style_block(config: &NarrativeConfig) -> String {
    format!(
        "Tone: {}.\nAudience: {}.\nKeep the summary under {} words.",
        config.tone,
        config.audience.description(),
        config.max_words
    )
}

pub(crate) fn summary_instructions() -> &'static str {
    ANALYST_INSTRUCTIONS
}

pub(crate) fn summary_prompt(metrics: &MetricSet, config: &NarrativeConfig) -> String {
    format!(
        "Write a concise inflation dashboard summary.\n\n{}\n\n{}\n\
         Return a short headline, a 2-3 sentence summary, and up to three key risks.",
        data_block(metrics),
        style_block(config)
    )
}

pub(crate) fn deep_analysis_prompt(
    metrics: &MetricSet,
    config: &NarrativeConfig,
    prefixes: &AssetPrefixes,
) -> String {
    let prefix_lines: Vec<String> = AssetClass::ALL
        .iter()
        .map(|a| format!("- {}: \"{}\"", a.key(), prefixes.get(*a)))
        .collect();
    format!(
        "Prepare a structured multi-asset inflation analysis.\n\n{}\n\n{}\n\n\
         Sections: drivers (what is moving inflation), one section per asset class, \
         and regimeShiftRisk (how likely the regime is to change).\n\
         Each asset section MUST begin with this exact sentence, verbatim:\n{}",
        data_block(metrics),
        style_block(config),
        prefix_lines.join("\n")
    )
}

pub(crate) fn evaluation_instructions() -> &'static str {
    EVALUATOR_INSTRUCTIONS
}

pub(crate) fn evaluation_prompt(summary: &SummaryNarrative, config: &NarrativeConfig) -> String {
    format!(
        "Score this summary from 1 (poor) to 5 (excellent) against: \
         brevity (target under {} words), \
         retail-friendliness, and actionability without giving investment advice.\n\n\
         Headline: {}\nSummary: {}\nKey risks: {}",
        config.max_words,
        summary.headline,
        summary.summary,
        summary.key_risks.join("; ")
    )
}
