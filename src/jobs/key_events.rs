//! Daily key-events signal: three market-relevant events with an aggregate tone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::info;

use super::inflation::insert_or_skip;
use crate::consts::{KEY_EVENT_PROMPT_VERSION, KEY_EVENT_SCORING_VERSION, KEY_EVENT_SIGNAL};
use crate::gate::IdempotencyGate;
use crate::narrative::{GenerationRequest, OutputSchema, TextGenerator};
use crate::signal::{Signal, SignalKey};
use crate::store::SignalStore;
use crate::{prelude::*, Error};

/// Number of events every run must produce.
pub const EVENT_COUNT: usize = 3;

const KEY_EVENT_TEMPERATURE: f32 = 0.3;

const INSTRUCTIONS: &str = "You are a macro strategist summarizing market-moving news for an \
institutional dashboard. Respond only with JSON matching the provided schema.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactTone {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyEvent {
    pub headline: String,
    pub analysis: String,
    pub impact_tone: ImpactTone,
    /// -1 (risk negative) to +1 (risk positive)
    pub impact_score: f64,
    /// 1 to 5
    pub importance: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyEventsPayload {
    events: Vec<KeyEvent>,
}

/// Aggregate market tone of a key-events run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventTone {
    RiskOn,
    MildRiskOn,
    Neutral,
    MildRiskOff,
    RiskOff,
}

impl EventTone {
    pub fn from_average(avg: f64) -> Self {
        if avg > 0.4 {
            EventTone::RiskOn
        } else if avg > 0.1 {
            EventTone::MildRiskOn
        } else if avg < -0.4 {
            EventTone::RiskOff
        } else if avg < -0.1 {
            EventTone::MildRiskOff
        } else {
            EventTone::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventTone::RiskOn => "risk-on",
            EventTone::MildRiskOn => "mild-risk-on",
            EventTone::Neutral => "neutral",
            EventTone::MildRiskOff => "mild-risk-off",
            EventTone::RiskOff => "risk-off",
        }
    }
}

impl fmt::Display for EventTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `structured` column of a key-event signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyEventAggregate {
    pub event_count: usize,
    pub avg_impact_score: f64,
    pub tone: EventTone,
}

impl KeyEventAggregate {
    pub fn from_events(events: &[KeyEvent]) -> Self {
        let avg = if events.is_empty() {
            0.0
        } else {
            events.iter().map(|e| e.impact_score).sum::<f64>() / events.len() as f64
        };
        Self {
            event_count: events.len(),
            avg_impact_score: avg,
            tone: EventTone::from_average(avg),
        }
    }
}

fn key_events_schema() -> OutputSchema {
    OutputSchema {
        name: "key_events",
        schema: json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["events"],
            "properties": {
                "events": {
                    "type": "array",
                    "minItems": EVENT_COUNT,
                    "maxItems": EVENT_COUNT,
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": [
                            "headline", "analysis", "impact_tone", "impact_score", "importance"
                        ],
                        "properties": {
                            "headline": { "type": "string" },
                            "analysis": { "type": "string" },
                            "impact_tone": {
                                "type": "string",
                                "enum": ["positive", "neutral", "negative"]
                            },
                            "impact_score": { "type": "number", "minimum": -1, "maximum": 1 },
                            "importance": { "type": "integer", "minimum": 1, "maximum": 5 }
                        }
                    }
                }
            }
        }),
    }
}

fn key_events_prompt(now: DateTime<Utc>) -> String {
    format!(
        "Current UTC time: {}.\n\n\
         Identify the {EVENT_COUNT} most market-relevant macroeconomic or geopolitical events \
         in the last 24 hours.\n\nFor each:\n\
         - Write a concise institutional headline.\n\
         - Provide 2-4 paragraphs of analysis.\n\
         - Classify impact_tone.\n\
         - Assign impact_score (-1 to +1).\n\
         - Assign importance (1-5).",
        now.to_rfc3339()
    )
}

/// Strict parse: exactly three events with in-range scores and non-empty text.
pub fn parse_key_events(text: &str) -> Result<Vec<KeyEvent>> {
    let payload: KeyEventsPayload = serde_json::from_str(text.trim())?;
    if payload.events.len() != EVENT_COUNT {
        return Err(Error::generation(format!(
            "expected {EVENT_COUNT} events, got {}",
            payload.events.len()
        )));
    }
    for (i, event) in payload.events.iter().enumerate() {
        if event.headline.trim().is_empty() || event.analysis.trim().is_empty() {
            return Err(Error::generation(format!("event {i} has empty text")));
        }
        if !event.impact_score.is_finite() || !(-1.0..=1.0).contains(&event.impact_score) {
            return Err(Error::generation(format!(
                "event {i} impact_score {} outside [-1, 1]",
                event.impact_score
            )));
        }
        if !(1..=5).contains(&event.importance) {
            return Err(Error::generation(format!(
                "event {i} importance {} outside 1..=5",
                event.importance
            )));
        }
    }
    Ok(payload.events)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyEventsOutcome {
    pub skipped: bool,
    pub period: String,
    pub aggregate: Option<KeyEventAggregate>,
}

/// Generates and stores the daily key-events signal.
///
/// Unlike the inflation narratives there is no template fallback: a failed
/// or malformed generation is returned as an error.
pub struct KeyEventsJob<'a> {
    generator: &'a dyn TextGenerator,
    store: &'a dyn SignalStore,
    now: DateTime<Utc>,
}

impl<'a> KeyEventsJob<'a> {
    pub fn new(generator: &'a dyn TextGenerator, store: &'a dyn SignalStore) -> Self {
        Self {
            generator,
            store,
            now: Utc::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn period(&self) -> String {
        self.now.format("%Y-%m-%d").to_string()
    }

    pub async fn run(&self) -> Result<KeyEventsOutcome> {
        let period = self.period();
        let key = SignalKey::new(KEY_EVENT_SIGNAL, &period, KEY_EVENT_PROMPT_VERSION);
        if IdempotencyGate::new(self.store).check(&key).await?.is_skip() {
            return Ok(KeyEventsOutcome {
                skipped: true,
                period,
                aggregate: None,
            });
        }

        let request = GenerationRequest {
            instructions: INSTRUCTIONS.to_string(),
            input: key_events_prompt(self.now),
            schema: Some(key_events_schema()),
            temperature: KEY_EVENT_TEMPERATURE,
        };
        let text = self.generator.generate(&request).await?;
        let events = parse_key_events(&text)?;
        let aggregate = KeyEventAggregate::from_events(&events);

        let headlines: Vec<&str> = events.iter().map(|e| e.headline.trim()).collect();
        let row = Signal {
            signal_type: KEY_EVENT_SIGNAL.to_string(),
            period: period.clone(),
            structured: serde_json::to_value(aggregate)?,
            narrative_headline: headlines.join("\n"),
            narrative_deep: Some(json!({ "headlines": headlines, "events": events })),
            model_version: self.generator.model().to_string(),
            prompt_version: KEY_EVENT_PROMPT_VERSION.to_string(),
            scoring_version: KEY_EVENT_SCORING_VERSION.to_string(),
            data_hash: None,
            created_at: self.now,
        };
        let inserted = insert_or_skip(self.store, row).await?;

        info!(
            target: "macro_signals::jobs",
            period = %period,
            tone = %aggregate.tone,
            avg_impact = aggregate.avg_impact_score,
            inserted,
            "Key events run complete"
        );
        Ok(KeyEventsOutcome {
            skipped: !inserted,
            period,
            aggregate: Some(aggregate),
        })
    }
}
