//! Side-by-side narrative comparison for tuning the narrative configuration.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::narrative::{
    DeepAnalysis, EvaluatedSummary, NarrativeConfig, NarrativeOrchestrator, NarrativeOutcome,
};
use crate::signal::MetricSet;

/// Metric inputs for a comparison. Score and regime are always recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricInput {
    #[serde(rename = "headlineYoY")]
    pub headline_yoy: Option<f64>,
    #[serde(rename = "coreYoY")]
    pub core_yoy: Option<f64>,
    pub momentum: Option<f64>,
    #[serde(rename = "breakeven5y")]
    pub breakeven_5y: Option<f64>,
}

impl From<MetricInput> for MetricSet {
    fn from(input: MetricInput) -> Self {
        MetricSet::from_inputs(
            input.headline_yoy,
            input.core_yoy,
            input.momentum,
            input.breakeven_5y,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub input: MetricInput,
    #[serde(default)]
    pub config_a: NarrativeConfig,
    #[serde(default)]
    pub config_b: NarrativeConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantReport {
    pub config: NarrativeConfig,
    pub narrative: EvaluatedSummary,
    pub deep: NarrativeOutcome<DeepAnalysis>,
    pub summary_word_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub metrics: MetricSet,
    pub variant_a: VariantReport,
    pub variant_b: VariantReport,
}

async fn variant(
    narrator: &NarrativeOrchestrator,
    metrics: &MetricSet,
    config: NarrativeConfig,
) -> VariantReport {
    let bundle = narrator.generate(metrics, &config).await;
    VariantReport {
        config,
        summary_word_count: bundle.summary.summary.narrative().word_count(),
        narrative: bundle.summary,
        deep: bundle.deep,
    }
}

/// Generate both variants concurrently and return them together.
pub async fn compare_narratives(
    narrator: &NarrativeOrchestrator,
    request: &CompareRequest,
) -> CompareResponse {
    let metrics = MetricSet::from(request.input);
    let (variant_a, variant_b) = tokio::join!(
        variant(narrator, &metrics, request.config_a),
        variant(narrator, &metrics, request.config_b),
    );
    info!(
        target: "macro_signals::narrative",
        words_a = variant_a.summary_word_count,
        words_b = variant_b.summary_word_count,
        "Narrative comparison complete"
    );
    CompareResponse {
        metrics,
        variant_a,
        variant_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::{NarrativeSettings, Tone};
    use crate::tests::support::FakeGenerator;
    use std::sync::Arc;

    #[test]
    fn test_request_parses_and_ignores_supplied_score() {
        let request: CompareRequest = serde_json::from_str(
            r#"{
                "input": {
                    "coreYoY": 4.5, "momentum": 0.4, "breakeven5y": 3.2,
                    "score": -2, "regime": "Disinflationary"
                },
                "configA": {"tone": "cautious"},
                "configB": {"maxWords": 60}
            }"#,
        )
        .unwrap();
        assert_eq!(request.config_a.tone, Tone::Cautious);
        assert_eq!(request.config_b.max_words, 60);
        let metrics = MetricSet::from(request.input);
        assert_eq!(metrics.score, 2.0);
    }

    #[tokio::test]
    async fn test_compare_returns_both_variants() {
        let narrator = NarrativeOrchestrator::new(
            Arc::new(FakeGenerator::always("not json")),
            NarrativeSettings::default(),
        );
        let request = CompareRequest {
            input: MetricInput {
                core_yoy: Some(3.0),
                ..Default::default()
            },
            config_a: NarrativeConfig::default(),
            config_b: NarrativeConfig {
                tone: Tone::Constructive,
                ..Default::default()
            },
        };
        let response = compare_narratives(&narrator, &request).await;
        assert!(response.variant_a.deep.is_fallback());
        assert_eq!(response.variant_b.config.tone, Tone::Constructive);
        assert!(response.variant_a.summary_word_count > 0);
        assert!(response.variant_b.deep.narrative().stocks.starts_with("Stocks: firm neutral"));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["variantA"]["summaryWordCount"].is_u64());
    }
}
