//! Fakes and fixtures for the two external seams.

use async_trait::async_trait;
use chrono::{Months, NaiveDate, Utc};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::narrative::{AssetClass, AssetPrefixes, GenerationRequest, TextGenerator};
use crate::prelude::Result;
use crate::series::{Observation, SeriesFetcher, SeriesRequest};
use crate::signal::Signal;
use crate::Error;

pub(crate) fn obs(y: i32, m: u32, d: u32, v: f64) -> Observation {
    Observation::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), v)
}

/// `n` month-start observations from `year-month`, rising linearly by `step`.
pub(crate) fn monthly_levels(
    year: i32,
    month: u32,
    n: usize,
    start: f64,
    step: f64,
) -> Vec<Observation> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    (0..n)
        .map(|i| {
            let date = first.checked_add_months(Months::new(i as u32)).unwrap();
            Observation::new(date, start + step * i as f64)
        })
        .collect()
}

pub(crate) fn signal_row(signal_type: &str, period: &str, prompt_version: &str) -> Signal {
    Signal {
        signal_type: signal_type.to_string(),
        period: period.to_string(),
        structured: json!({}),
        narrative_headline: format!("{signal_type} {period}"),
        narrative_deep: None,
        model_version: "test-model".to_string(),
        prompt_version: prompt_version.to_string(),
        scoring_version: "test-scoring".to_string(),
        data_hash: None,
        created_at: Utc::now(),
    }
}

pub(crate) fn summary_json(headline: &str, summary: &str) -> String {
    json!({ "headline": headline, "summary": summary, "keyRisks": ["Sticky services prices"] })
        .to_string()
}

/// A deep analysis whose asset sections open with `prefixes`.
pub(crate) fn deep_json(prefixes: &AssetPrefixes) -> String {
    let mut v = json!({
        "drivers": "Shelter and services remain the main drivers.",
        "regimeShiftRisk": "Moderate."
    });
    for asset in AssetClass::ALL {
        let text = format!("{} Commentary for {}.", prefixes.get(asset), asset.label());
        v[asset.key()] = json!(text);
    }
    v.to_string()
}

pub(crate) fn key_events_json(scores: &[f64]) -> String {
    let events: Vec<_> = scores
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let tone = if *s > 0.0 {
                "positive"
            } else if *s < 0.0 {
                "negative"
            } else {
                "neutral"
            };
            json!({
                "headline": format!("Event {i}"),
                "analysis": "Markets reacted.",
                "impact_tone": tone,
                "impact_score": s,
                "importance": 3
            })
        })
        .collect();
    json!({ "events": events }).to_string()
}

/// Serves canned series by id; unknown ids fail as unavailable.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    series: HashMap<String, Vec<Observation>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_series(mut self, series_id: &str, observations: Vec<Observation>) -> Self {
        self.series.insert(series_id.to_string(), observations);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeriesFetcher for FakeFetcher {
    async fn fetch(&self, request: &SeriesRequest) -> Result<Vec<Observation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.series
            .get(&request.series_id)
            .cloned()
            .ok_or_else(|| Error::DataUnavailable(format!("no fixture for {}", request.series_id)))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
struct GeneratorState {
    script: VecDeque<Result<String>>,
    by_schema: HashMap<&'static str, String>,
    fallback: Option<Result<String>>,
    requests: Vec<GenerationRequest>,
}

/// Scripted text generator. Clones share state so tests can inspect calls.
#[derive(Clone, Default)]
pub(crate) struct FakeGenerator {
    state: Arc<Mutex<GeneratorState>>,
}

impl FakeGenerator {
    fn with_state(state: GeneratorState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Same reply to every call.
    pub(crate) fn always(text: impl Into<String>) -> Self {
        Self::with_state(GeneratorState {
            fallback: Some(Ok(text.into())),
            ..Default::default()
        })
    }

    /// Every call fails.
    pub(crate) fn failing() -> Self {
        Self::with_state(GeneratorState {
            fallback: Some(Err(Error::generation("provider down"))),
            ..Default::default()
        })
    }

    /// Replies in order; calls past the script fail.
    pub(crate) fn scripted(replies: Vec<Result<String>>) -> Self {
        Self::with_state(GeneratorState {
            script: replies.into(),
            ..Default::default()
        })
    }

    /// Reply chosen by the request's output schema name.
    pub(crate) fn by_schema(replies: Vec<(&'static str, String)>) -> Self {
        Self::with_state(GeneratorState {
            by_schema: replies.into_iter().collect(),
            ..Default::default()
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        if let Some(reply) = state.script.pop_front() {
            return reply;
        }
        if let Some(reply) = request
            .schema
            .as_ref()
            .and_then(|s| state.by_schema.get(s.name))
        {
            return Ok(reply.clone());
        }
        state
            .fallback
            .clone()
            .unwrap_or_else(|| Err(Error::generation("script exhausted")))
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}
