//! Narrative generation around the deterministic metrics.
//!
//! Every public generation path returns a [`NarrativeOutcome`]: either text
//! the model produced and that passed validation, or a template built from
//! the metrics alone. Generation failures never escape this module.

mod config;
mod fallback;
mod llm;
mod prompts;
mod schema;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{prelude::*, signal::MetricSet, Error};

pub use config::{Audience, NarrativeConfig, PrefixPolicy, Tone, RETRY_MAX_WORDS};
pub use fallback::{template_deep_analysis, template_summary, HISTORICAL_HEADLINE};
pub use llm::{GenerationRequest, OpenAiClient, OutputSchema, TextGenerator};
pub use prompts::{AssetClass, AssetPrefixes};
pub use schema::{
    evaluation_schema, parse_deep_analysis, parse_evaluation, parse_summary, verify_prefixes,
    DeepAnalysis, Evaluation, SummaryNarrative,
};

/// Minimum self-evaluation score that keeps the first summary.
pub const DEFAULT_EVALUATION_THRESHOLD: u8 = 4;

/// Validated model output, or a template built from the metrics.
#[derive(Debug, Clone)]
pub enum NarrativeOutcome<T> {
    Generated(T),
    Fallback { narrative: T, reason: Error },
}

impl<T> NarrativeOutcome<T> {
    pub fn narrative(&self) -> &T {
        match self {
            NarrativeOutcome::Generated(n) => n,
            NarrativeOutcome::Fallback { narrative, .. } => narrative,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            NarrativeOutcome::Generated(n) => n,
            NarrativeOutcome::Fallback { narrative, .. } => narrative,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, NarrativeOutcome::Fallback { .. })
    }

    pub fn source(&self) -> &'static str {
        match self {
            NarrativeOutcome::Generated(_) => "generated",
            NarrativeOutcome::Fallback { .. } => "fallback",
        }
    }
}

impl<T: Serialize> Serialize for NarrativeOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("NarrativeOutcome", 3)?;
        s.serialize_field("source", self.source())?;
        s.serialize_field("narrative", self.narrative())?;
        let reason = match self {
            NarrativeOutcome::Fallback { reason, .. } => Some(reason.to_string()),
            NarrativeOutcome::Generated(_) => None,
        };
        s.serialize_field("reason", &reason)?;
        s.end()
    }
}

/// Summary after the self-evaluation step.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedSummary {
    pub summary: NarrativeOutcome<SummaryNarrative>,
    /// Evaluation of the first summary, when one was obtained.
    pub evaluation: Option<Evaluation>,
    /// Whether the single low-score regeneration was attempted.
    pub retried: bool,
}

/// Both narrative artifacts for one metric set.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeBundle {
    pub summary: EvaluatedSummary,
    pub deep: NarrativeOutcome<DeepAnalysis>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrativeSettings {
    pub temperature: f32,
    pub prefix_policy: PrefixPolicy,
    pub evaluation_threshold: u8,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            prefix_policy: PrefixPolicy::Enforce,
            evaluation_threshold: DEFAULT_EVALUATION_THRESHOLD,
        }
    }
}

/// Turns metrics into summary and deep-analysis narratives.
///
/// The generator is an explicit client object handed in at construction, so
/// tests substitute a scripted fake.
#[derive(Clone)]
pub struct NarrativeOrchestrator {
    generator: Arc<dyn TextGenerator>,
    settings: NarrativeSettings,
}

impl NarrativeOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: NarrativeSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// Model identifier for provenance.
    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub fn settings(&self) -> &NarrativeSettings {
        &self.settings
    }

    fn request(
        &self,
        instructions: &str,
        input: String,
        schema: OutputSchema,
    ) -> GenerationRequest {
        GenerationRequest {
            instructions: instructions.to_string(),
            input,
            schema: Some(schema),
            temperature: self.settings.temperature,
        }
    }

    async fn try_summary(
        &self,
        metrics: &MetricSet,
        config: &NarrativeConfig,
    ) -> Result<SummaryNarrative> {
        let request = self.request(
            prompts::summary_instructions(),
            prompts::summary_prompt(metrics, config),
            schema::summary_schema(),
        );
        let text = self.generator.generate(&request).await?;
        parse_summary(&text)
    }

    pub async fn generate_macro_summary(
        &self,
        metrics: &MetricSet,
        config: &NarrativeConfig,
    ) -> NarrativeOutcome<SummaryNarrative> {
        match self.try_summary(metrics, config).await {
            Ok(summary) => {
                debug!(
                    target: "macro_signals::narrative",
                    words = summary.word_count(),
                    "Summary generated"
                );
                NarrativeOutcome::Generated(summary)
            }
            Err(reason) => {
                warn!(
                    target: "macro_signals::narrative",
                    error = %reason,
                    "Summary generation failed, using template"
                );
                NarrativeOutcome::Fallback {
                    narrative: template_summary(metrics),
                    reason,
                }
            }
        }
    }

    /// Score a summary 1-5 on brevity, retail-friendliness and actionability.
    pub async fn evaluate_summary(
        &self,
        summary: &SummaryNarrative,
        config: &NarrativeConfig,
    ) -> Result<Evaluation> {
        let request = self.request(
            prompts::evaluation_instructions(),
            prompts::evaluation_prompt(summary, config),
            evaluation_schema(),
        );
        let text = self.generator.generate(&request).await?;
        parse_evaluation(&text)
    }

    /// Summary with at most one regeneration after a low self-evaluation.
    pub async fn generate_evaluated_summary(
        &self,
        metrics: &MetricSet,
        config: &NarrativeConfig,
    ) -> EvaluatedSummary {
        let first = self.generate_macro_summary(metrics, config).await;
        let NarrativeOutcome::Generated(ref generated) = first else {
            return EvaluatedSummary {
                summary: first,
                evaluation: None,
                retried: false,
            };
        };

        let evaluation = match self.evaluate_summary(generated, config).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(
                    target: "macro_signals::narrative",
                    error = %e,
                    "Self-evaluation failed, keeping first summary"
                );
                return EvaluatedSummary {
                    summary: first,
                    evaluation: None,
                    retried: false,
                };
            }
        };

        if evaluation.score >= self.settings.evaluation_threshold {
            return EvaluatedSummary {
                summary: first,
                evaluation: Some(evaluation),
                retried: false,
            };
        }

        info!(
            target: "macro_signals::narrative",
            score = evaluation.score,
            threshold = self.settings.evaluation_threshold,
            "Low self-evaluation, regenerating once"
        );
        let retry = self.generate_macro_summary(metrics, &config.for_retry()).await;
        let summary = if retry.is_fallback() { first } else { retry };
        EvaluatedSummary {
            summary,
            evaluation: Some(evaluation),
            retried: true,
        }
    }

    async fn try_deep_analysis(
        &self,
        metrics: &MetricSet,
        config: &NarrativeConfig,
        prefixes: &AssetPrefixes,
    ) -> Result<DeepAnalysis> {
        let request = self.request(
            prompts::summary_instructions(),
            prompts::deep_analysis_prompt(metrics, config, prefixes),
            schema::deep_analysis_schema(),
        );
        let text = self.generator.generate(&request).await?;
        let analysis = parse_deep_analysis(&text)?;
        if self.settings.prefix_policy == PrefixPolicy::Enforce {
            verify_prefixes(&analysis, prefixes)?;
        }
        Ok(analysis)
    }

    pub async fn generate_macro_deep_analysis(
        &self,
        metrics: &MetricSet,
        config: &NarrativeConfig,
    ) -> NarrativeOutcome<DeepAnalysis> {
        let prefixes = AssetPrefixes::for_metrics(metrics, config);
        match self.try_deep_analysis(metrics, config, &prefixes).await {
            Ok(analysis) => NarrativeOutcome::Generated(analysis),
            Err(reason) => {
                warn!(
                    target: "macro_signals::narrative",
                    error = %reason,
                    "Deep analysis failed, using template"
                );
                NarrativeOutcome::Fallback {
                    narrative: template_deep_analysis(metrics, config),
                    reason,
                }
            }
        }
    }

    /// Evaluated summary and deep analysis, generated concurrently.
    pub async fn generate(&self, metrics: &MetricSet, config: &NarrativeConfig) -> NarrativeBundle {
        let (summary, deep) = tokio::join!(
            self.generate_evaluated_summary(metrics, config),
            self.generate_macro_deep_analysis(metrics, config),
        );
        NarrativeBundle { summary, deep }
    }
}
