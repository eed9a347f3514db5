//! Output contracts for structured generation and their validation.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::llm::OutputSchema;
use super::prompts::{AssetClass, AssetPrefixes};
use crate::{prelude::*, Error};

/// Short dashboard summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SummaryNarrative {
    pub headline: String,
    pub summary: String,
    pub key_risks: Vec<String>,
}

impl SummaryNarrative {
    pub fn word_count(&self) -> usize {
        self.summary.split_whitespace().count()
    }
}

/// Six-section multi-asset analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeepAnalysis {
    pub drivers: String,
    pub stocks: String,
    pub bonds: String,
    pub gold: String,
    pub silver: String,
    pub oil: String,
    pub regime_shift_risk: String,
}

impl DeepAnalysis {
    pub fn section(&self, asset: AssetClass) -> &str {
        match asset {
            AssetClass::Stocks => &self.stocks,
            AssetClass::Bonds => &self.bonds,
            AssetClass::Gold => &self.gold,
            AssetClass::Silver => &self.silver,
            AssetClass::Oil => &self.oil,
        }
    }

    fn sections(&self) -> [(&'static str, &str); 7] {
        [
            ("drivers", self.drivers.as_str()),
            ("stocks", self.stocks.as_str()),
            ("bonds", self.bonds.as_str()),
            ("gold", self.gold.as_str()),
            ("silver", self.silver.as_str()),
            ("oil", self.oil.as_str()),
            ("regimeShiftRisk", self.regime_shift_risk.as_str()),
        ]
    }
}

/// Self-evaluation of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Evaluation {
    /// 1 (poor) to 5 (excellent).
    pub score: u8,
    pub rationale: String,
}

fn string_prop() -> serde_json::Value {
    json!({ "type": "string" })
}

pub(crate) fn summary_schema() -> OutputSchema {
    OutputSchema {
        name: "macro_summary",
        schema: json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["headline", "summary", "keyRisks"],
            "properties": {
                "headline": string_prop(),
                "summary": string_prop(),
                "keyRisks": { "type": "array", "items": string_prop() }
            }
        }),
    }
}

pub(crate) fn deep_analysis_schema() -> OutputSchema {
    let keys = [
        "drivers",
        "stocks",
        "bonds",
        "gold",
        "silver",
        "oil",
        "regimeShiftRisk",
    ];
    let properties: serde_json::Map<String, serde_json::Value> =
        keys.iter().map(|k| (k.to_string(), string_prop())).collect();
    OutputSchema {
        name: "macro_deep_analysis",
        schema: json!({
            "type": "object",
            "additionalProperties": false,
            "required": keys,
            "properties": properties
        }),
    }
}

pub fn evaluation_schema() -> OutputSchema {
    OutputSchema {
        name: "summary_evaluation",
        schema: json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["score", "rationale"],
            "properties": {
                "score": { "type": "integer", "minimum": 1, "maximum": 5 },
                "rationale": string_prop()
            }
        }),
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::generation(format!("`{field}` is empty")));
    }
    Ok(())
}

pub fn parse_summary(text: &str) -> Result<SummaryNarrative> {
    let parsed: SummaryNarrative = serde_json::from_str(text.trim())?;
    require_text("headline", &parsed.headline)?;
    require_text("summary", &parsed.summary)?;
    Ok(parsed)
}

/// Parse a deep analysis; asset prefixes are checked separately.
pub fn parse_deep_analysis(text: &str) -> Result<DeepAnalysis> {
    let parsed: DeepAnalysis = serde_json::from_str(text.trim())?;
    for (field, value) in parsed.sections() {
        require_text(field, value)?;
    }
    Ok(parsed)
}

pub fn parse_evaluation(text: &str) -> Result<Evaluation> {
    let parsed: Evaluation = serde_json::from_str(text.trim())?;
    if !(1..=5).contains(&parsed.score) {
        return Err(Error::generation(format!(
            "evaluation score {} outside 1..=5",
            parsed.score
        )));
    }
    Ok(parsed)
}

/// Every asset section must start with its expected prefix, verbatim.
pub fn verify_prefixes(analysis: &DeepAnalysis, prefixes: &AssetPrefixes) -> Result<()> {
    for asset in AssetClass::ALL {
        let expected = prefixes.get(asset);
        if !analysis.section(asset).trim_start().starts_with(expected) {
            return Err(Error::NarrativeContractViolation {
                section: asset.key().to_string(),
                expected_prefix: expected.to_string(),
            });
        }
    }
    Ok(())
}
