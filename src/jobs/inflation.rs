//! Monthly inflation signal: fetch, derive, score, gate, narrate, store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SignalConfig;
use crate::consts::{FRED_BREAKEVEN_5Y, FRED_CORE_CPI, FRED_HEADLINE_CPI};
use crate::gate::IdempotencyGate;
use crate::narrative::{NarrativeConfig, NarrativeOrchestrator};
use crate::series::align::{align_levels, lookup_monthly, monthly_average};
use crate::series::{Observation, SeriesFetcher, SeriesRequest};
use crate::signal::derive::{latest_window, momentum_annualized, momentum_simple, yoy_series};
use crate::signal::{
    HistoryWindows, InflationRegime, MetricSet, Signal, SignalKey, StructuredSnapshot,
};
use crate::store::SignalStore;
use crate::{prelude::*, Error};

/// How the 3-month momentum input is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentumMethod {
    /// Compounded 3-month change of core CPI levels.
    #[default]
    Annualized,
    /// Difference between the latest core YoY and the one three months back.
    Simple,
}

impl MomentumMethod {
    /// Momentum at index `i` of the aligned core series.
    pub fn at(&self, core_levels: &[f64], core_yoy: &[Option<f64>], i: usize) -> Option<f64> {
        match self {
            MomentumMethod::Annualized => momentum_annualized(core_levels, i),
            MomentumMethod::Simple => {
                let upto = core_yoy.get(..=i)?;
                let contiguous: Vec<f64> = upto.iter().rev().map_while(|v| *v).collect();
                let ordered: Vec<f64> = contiguous.into_iter().rev().collect();
                momentum_simple(&ordered)
            }
        }
    }
}

/// Raw provider series for one inflation computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InflationSeries {
    pub headline: Vec<Observation>,
    pub core: Vec<Observation>,
    /// Daily breakeven; empty when the provider failed.
    pub breakeven: Vec<Observation>,
}

/// Metrics and history for the latest available month.
#[derive(Debug, Clone, PartialEq)]
pub struct InflationReading {
    /// `YYYY-MM`
    pub period: String,
    pub snapshot: StructuredSnapshot,
}

impl InflationReading {
    pub fn metrics(&self) -> &MetricSet {
        &self.snapshot.metrics
    }
}

fn unavailable(series: &str, e: Error) -> Error {
    match e {
        Error::DataUnavailable(_) => e,
        other => Error::DataUnavailable(format!("{series}: {other}")),
    }
}

/// Fetch headline, core and breakeven concurrently.
///
/// Headline or core failure is `DataUnavailable`; a breakeven failure only
/// drops that input.
pub async fn fetch_inflation_series(fetcher: &dyn SeriesFetcher) -> Result<InflationSeries> {
    let headline_req = SeriesRequest::levels(FRED_HEADLINE_CPI);
    let core_req = SeriesRequest::levels(FRED_CORE_CPI);
    let breakeven_req = SeriesRequest::levels(FRED_BREAKEVEN_5Y);

    let (headline, core, breakeven) = tokio::join!(
        fetcher.fetch(&headline_req),
        fetcher.fetch(&core_req),
        fetcher.fetch(&breakeven_req),
    );

    let headline = headline.map_err(|e| unavailable(FRED_HEADLINE_CPI, e))?;
    let core = core.map_err(|e| unavailable(FRED_CORE_CPI, e))?;
    let breakeven = breakeven.unwrap_or_else(|e| {
        warn!(
            target: "macro_signals::series",
            error = %e,
            "Breakeven unavailable, scoring without it"
        );
        Vec::new()
    });

    Ok(InflationSeries {
        headline,
        core,
        breakeven,
    })
}

/// Derive the latest reading from raw series. Pure.
pub fn derive_reading(
    series: &InflationSeries,
    method: MomentumMethod,
    window: usize,
) -> Result<InflationReading> {
    let aligned = align_levels(&series.headline, &series.core);
    let Some(&last_date) = aligned.dates.last() else {
        return Err(Error::DataUnavailable(
            "no overlapping headline/core observations".into(),
        ));
    };
    let last = aligned.len() - 1;

    let headline_yoy = yoy_series(&aligned.headline);
    let core_yoy = yoy_series(&aligned.core);
    let breakeven_monthly = lookup_monthly(&aligned.dates, &monthly_average(&series.breakeven));

    let metrics = MetricSet::from_inputs(
        headline_yoy[last],
        core_yoy[last],
        method.at(&aligned.core, &core_yoy, last),
        series.breakeven.last().map(|o| o.value),
    );

    Ok(InflationReading {
        period: last_date.format("%Y-%m").to_string(),
        snapshot: StructuredSnapshot {
            metrics,
            history: HistoryWindows {
                headline_yoy: latest_window(&headline_yoy, window),
                core_yoy: latest_window(&core_yoy, window),
                breakeven_5y: latest_window(&breakeven_monthly, window),
            },
        },
    })
}

/// Fetch and derive in one step; used by the batch job and the live fallback.
pub async fn compute_inflation(
    fetcher: &dyn SeriesFetcher,
    method: MomentumMethod,
    window: usize,
) -> Result<InflationReading> {
    let series = fetch_inflation_series(fetcher).await?;
    derive_reading(&series, method, window)
}

/// Result of one batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub skipped: bool,
    pub period: String,
    pub score: f64,
    pub regime: InflationRegime,
}

/// Builds an append-only row from a snapshot and its narratives.
pub(crate) fn build_signal(
    signal: &SignalConfig,
    model_version: &str,
    period: &str,
    snapshot: &StructuredSnapshot,
    narrative_headline: String,
    narrative_deep: Option<serde_json::Value>,
) -> Result<Signal> {
    Ok(Signal {
        signal_type: signal.signal_type.clone(),
        period: period.to_string(),
        structured: serde_json::to_value(snapshot)?,
        narrative_headline,
        narrative_deep,
        model_version: model_version.to_string(),
        prompt_version: signal.prompt_version.clone(),
        scoring_version: signal.scoring_version.clone(),
        data_hash: Some(snapshot.metrics.data_hash()),
        created_at: Utc::now(),
    })
}

/// Insert, treating a uniqueness conflict as "already generated".
///
/// Returns `true` when the row was written.
pub(crate) async fn insert_or_skip(store: &dyn SignalStore, signal: Signal) -> Result<bool> {
    let key = signal.key();
    match store.insert(signal).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_conflict() => {
            info!(target: "macro_signals::jobs", key = %key, "Insert conflict, treating as skip");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// The batch entry point.
pub struct InflationJob<'a> {
    fetcher: &'a dyn SeriesFetcher,
    store: &'a dyn SignalStore,
    narrator: &'a NarrativeOrchestrator,
    signal: SignalConfig,
    narrative: NarrativeConfig,
}

impl<'a> InflationJob<'a> {
    pub fn new(
        fetcher: &'a dyn SeriesFetcher,
        store: &'a dyn SignalStore,
        narrator: &'a NarrativeOrchestrator,
        signal: SignalConfig,
        narrative: NarrativeConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            narrator,
            signal,
            narrative,
        }
    }

    pub async fn run(&self) -> Result<JobOutcome> {
        let reading = compute_inflation(
            self.fetcher,
            self.signal.momentum_method,
            self.signal.history_window,
        )
        .await?;
        let metrics = *reading.metrics();
        let outcome = |skipped| JobOutcome {
            skipped,
            period: reading.period.clone(),
            score: metrics.score,
            regime: metrics.regime,
        };

        let key = SignalKey::new(
            &self.signal.signal_type,
            &reading.period,
            &self.signal.prompt_version,
        );
        if IdempotencyGate::new(self.store).check(&key).await?.is_skip() {
            return Ok(outcome(true));
        }

        let bundle = self.narrator.generate(&metrics, &self.narrative).await;
        let headline = bundle.summary.summary.narrative().headline.clone();
        let deep = serde_json::to_value(bundle.deep.narrative())?;

        let row = build_signal(
            &self.signal,
            self.narrator.model(),
            &reading.period,
            &reading.snapshot,
            headline,
            Some(deep),
        )?;
        let inserted = insert_or_skip(self.store, row).await?;

        info!(
            target: "macro_signals::jobs",
            period = %reading.period,
            score = metrics.score,
            regime = %metrics.regime,
            summary_source = bundle.summary.summary.source(),
            deep_source = bundle.deep.source(),
            inserted,
            "Inflation signal run complete"
        );
        Ok(outcome(!inserted))
    }
}
