//! Historical backfill of monthly inflation signals.
//!
//! Walks every aligned month of BLS headline/core CPI levels, scores it,
//! and writes one row per period through the idempotency gate. Narratives are
//! generated only for recent periods; older rows get a fixed placeholder
//! headline. Per-period failures are logged and counted, never fatal.

use chrono::{Months, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::inflation::{build_signal, insert_or_skip};
use crate::config::{BackfillConfig, SignalConfig};
use crate::consts::{BLS_CORE_CPI, BLS_HEADLINE_CPI, FRED_BREAKEVEN_5Y};
use crate::gate::IdempotencyGate;
use crate::narrative::{NarrativeConfig, NarrativeOrchestrator, HISTORICAL_HEADLINE};
use crate::series::align::{align_levels, lookup_monthly, monthly_average, AlignedLevels};
use crate::series::{SeriesFetcher, SeriesRequest};
use crate::signal::derive::{history_window, yoy_series};
use crate::signal::{HistoryWindows, MetricSet, SignalKey, StructuredSnapshot};
use crate::store::SignalStore;
use crate::{prelude::*, Error};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum PeriodResult {
    Inserted,
    Skipped,
}

/// Derived per-index inputs shared by every period.
struct History {
    aligned: AlignedLevels,
    headline_yoy: Vec<Option<f64>>,
    core_yoy: Vec<Option<f64>>,
    breakeven: Vec<Option<f64>>,
}

pub struct BackfillJob<'a> {
    levels: &'a dyn SeriesFetcher,
    breakeven: &'a dyn SeriesFetcher,
    store: &'a dyn SignalStore,
    narrator: &'a NarrativeOrchestrator,
    signal: SignalConfig,
    narrative: NarrativeConfig,
    config: BackfillConfig,
    today: NaiveDate,
}

impl<'a> BackfillJob<'a> {
    /// `levels` serves BLS CPI levels, `breakeven` the daily breakeven series.
    pub fn new(
        levels: &'a dyn SeriesFetcher,
        breakeven: &'a dyn SeriesFetcher,
        store: &'a dyn SignalStore,
        narrator: &'a NarrativeOrchestrator,
        signal: SignalConfig,
        narrative: NarrativeConfig,
        config: BackfillConfig,
    ) -> Self {
        Self {
            levels,
            breakeven,
            store,
            narrator,
            signal,
            narrative,
            config,
            today: Utc::now().date_naive(),
        }
    }

    /// Fix the reference date used for the narrative cutoffs.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn cutoff(&self, months: u32) -> NaiveDate {
        self.today
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN)
    }

    async fn load_history(&self) -> Result<History> {
        let headline_req = SeriesRequest::levels(BLS_HEADLINE_CPI);
        let core_req = SeriesRequest::levels(BLS_CORE_CPI);
        let breakeven_req = SeriesRequest::levels(FRED_BREAKEVEN_5Y);
        let (headline, core, breakeven) = tokio::join!(
            self.levels.fetch(&headline_req),
            self.levels.fetch(&core_req),
            self.breakeven.fetch(&breakeven_req),
        );
        let headline = headline?;
        let core = core?;
        let breakeven = breakeven.unwrap_or_else(|e| {
            warn!(target: "macro_signals::jobs", error = %e, "Breakeven unavailable for backfill");
            Vec::new()
        });

        let aligned = align_levels(&headline, &core);
        if aligned.is_empty() {
            return Err(Error::DataUnavailable(
                "no overlapping headline/core history".into(),
            ));
        }
        info!(
            target: "macro_signals::jobs",
            months = aligned.len(),
            breakeven_days = breakeven.len(),
            "Backfill history loaded"
        );
        Ok(History {
            headline_yoy: yoy_series(&aligned.headline),
            core_yoy: yoy_series(&aligned.core),
            breakeven: lookup_monthly(&aligned.dates, &monthly_average(&breakeven)),
            aligned,
        })
    }

    pub async fn run(&self) -> Result<BackfillReport> {
        let history = self.load_history().await?;
        let summary_cutoff = self.cutoff(self.config.summary_years.saturating_mul(12));
        let deep_cutoff = self.cutoff(self.config.deep_months);
        let mut report = BackfillReport::default();

        for i in 0..history.aligned.len() {
            let (Some(headline_yoy), Some(core_yoy)) =
                (history.headline_yoy[i], history.core_yoy[i])
            else {
                continue;
            };
            let date = history.aligned.dates[i];
            let period = date.format("%Y-%m").to_string();

            let metrics = MetricSet::from_inputs(
                Some(headline_yoy),
                Some(core_yoy),
                self.signal.momentum_method.at(&history.aligned.core, &history.core_yoy, i),
                history.breakeven[i],
            );
            let snapshot = StructuredSnapshot {
                metrics,
                history: window_at(&history, i, self.signal.history_window),
            };

            let result = self
                .process_period(
                    &period,
                    &snapshot,
                    date >= summary_cutoff,
                    date >= deep_cutoff,
                )
                .await;
            match result {
                Ok(PeriodResult::Inserted) => report.inserted += 1,
                Ok(PeriodResult::Skipped) => report.skipped += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        target: "macro_signals::jobs",
                        period = %period,
                        error = %e,
                        "Backfill period failed"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            target: "macro_signals::jobs",
            inserted = report.inserted,
            skipped = report.skipped,
            failed = report.failed,
            "Backfill complete"
        );
        Ok(report)
    }

    async fn process_period(
        &self,
        period: &str,
        snapshot: &StructuredSnapshot,
        with_summary: bool,
        with_deep: bool,
    ) -> Result<PeriodResult> {
        let key = SignalKey::new(&self.signal.signal_type, period, &self.signal.prompt_version);
        if IdempotencyGate::new(self.store).check(&key).await?.is_skip() {
            return Ok(PeriodResult::Skipped);
        }

        let metrics = &snapshot.metrics;
        let headline = if with_summary {
            let summary = self.narrator.generate_macro_summary(metrics, &self.narrative).await;
            self.pause().await;
            summary.into_inner().headline
        } else {
            HISTORICAL_HEADLINE.to_string()
        };
        let deep = if with_deep {
            let deep = self
                .narrator
                .generate_macro_deep_analysis(metrics, &self.narrative)
                .await;
            self.pause().await;
            Some(serde_json::to_value(deep.narrative())?)
        } else {
            None
        };

        let row = build_signal(
            &self.signal,
            self.narrator.model(),
            period,
            snapshot,
            headline,
            deep,
        )?;
        debug!(
            target: "macro_signals::jobs",
            period,
            score = metrics.score,
            "Inserting backfill row"
        );
        Ok(if insert_or_skip(self.store, row).await? {
            PeriodResult::Inserted
        } else {
            PeriodResult::Skipped
        })
    }

    async fn pause(&self) {
        let delay = self.config.llm_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn window_at(history: &History, i: usize, n: usize) -> HistoryWindows {
    HistoryWindows {
        headline_yoy: history_window(&history.headline_yoy, i, n),
        core_yoy: history_window(&history.core_yoy, i, n),
        breakeven_5y: history_window(&history.breakeven, i, n),
    }
}
