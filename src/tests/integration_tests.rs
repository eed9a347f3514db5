//! Pipeline-level tests across series, scoring, gate, narrative and store.
//!
//! - Batch idempotency and conflict-as-skip
//! - Template fallbacks on the write path
//! - Backfill cutoffs and skip-and-continue
//! - Risk aggregation never failing

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use serde_json::json;
    use std::sync::Arc;

    use crate::config::{BackfillConfig, SignalConfig};
    use crate::consts::{
        BLS_CORE_CPI, BLS_HEADLINE_CPI, FRED_BREAKEVEN_5Y, FRED_CORE_CPI, FRED_HEADLINE_CPI,
        KEY_EVENT_SIGNAL,
    };
    use crate::jobs::{
        derive_reading, BackfillJob, InflationJob, InflationSeries, KeyEventsJob, MomentumMethod,
    };
    use crate::narrative::{
        AssetClass, AssetPrefixes, NarrativeConfig, NarrativeOrchestrator, NarrativeSettings,
        HISTORICAL_HEADLINE,
    };
    use crate::risk::{RiskLevel, RiskStateAggregator, UNAVAILABLE_STATUS};
    use crate::signal::{CompositeRegime, Signal};
    use crate::store::{JsonlSignalStore, MemorySignalStore, SignalStore, StoreError};
    use crate::tests::support::{
        deep_json, key_events_json, monthly_levels, obs, summary_json, FakeFetcher, FakeGenerator,
    };
    use crate::Error;

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn fred_series() -> InflationSeries {
        InflationSeries {
            headline: monthly_levels(2022, 1, 30, 300.0, 1.5),
            core: monthly_levels(2022, 1, 30, 300.0, 1.2),
            breakeven: vec![obs(2024, 6, 3, 2.31), obs(2024, 6, 4, 2.35)],
        }
    }

    fn fred_fetcher() -> FakeFetcher {
        let s = fred_series();
        FakeFetcher::new()
            .with_series(FRED_HEADLINE_CPI, s.headline)
            .with_series(FRED_CORE_CPI, s.core)
            .with_series(FRED_BREAKEVEN_5Y, s.breakeven)
    }

    fn healthy_generator() -> FakeGenerator {
        let reading = derive_reading(&fred_series(), MomentumMethod::Annualized, 24).unwrap();
        let prefixes = AssetPrefixes::for_metrics(reading.metrics(), &NarrativeConfig::default());
        FakeGenerator::by_schema(vec![
            ("macro_summary", summary_json("Core inflation cools", "Prices are easing.")),
            ("summary_evaluation", r#"{"score":5,"rationale":"clear"}"#.to_string()),
            ("macro_deep_analysis", deep_json(&prefixes)),
        ])
    }

    fn narrator(generator: FakeGenerator) -> NarrativeOrchestrator {
        NarrativeOrchestrator::new(Arc::new(generator), NarrativeSettings::default())
    }

    /// Passes every gate check, as a concurrent writer would see it.
    struct RacyStore(MemorySignalStore);

    #[async_trait]
    impl SignalStore for RacyStore {
        async fn find(
            &self,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> Result<Option<Signal>, StoreError> {
            Ok(None)
        }
        async fn insert(&self, signal: Signal) -> Result<(), StoreError> {
            self.0.insert(signal).await
        }
        async fn latest(&self, signal_type: &str) -> Result<Option<Signal>, StoreError> {
            self.0.latest(signal_type).await
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SignalStore for BrokenStore {
        async fn find(
            &self,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> Result<Option<Signal>, StoreError> {
            Err(StoreError::Io("disk gone".into()))
        }
        async fn insert(&self, _: Signal) -> Result<(), StoreError> {
            Err(StoreError::Io("disk gone".into()))
        }
        async fn latest(&self, _: &str) -> Result<Option<Signal>, StoreError> {
            Err(StoreError::Io("disk gone".into()))
        }
    }

    /// Rejects inserts for one period.
    struct FlakyStore {
        inner: MemorySignalStore,
        bad_period: &'static str,
    }

    #[async_trait]
    impl SignalStore for FlakyStore {
        async fn find(
            &self,
            t: &str,
            p: &str,
            v: Option<&str>,
        ) -> Result<Option<Signal>, StoreError> {
            self.inner.find(t, p, v).await
        }
        async fn insert(&self, signal: Signal) -> Result<(), StoreError> {
            if signal.period == self.bad_period {
                return Err(StoreError::Io("write failed".into()));
            }
            self.inner.insert(signal).await
        }
        async fn latest(&self, signal_type: &str) -> Result<Option<Signal>, StoreError> {
            self.inner.latest(signal_type).await
        }
    }

    // =========================================================================
    // Batch entry point
    // =========================================================================

    #[tokio::test]
    async fn test_batch_runs_once_per_period() {
        let fetcher = fred_fetcher();
        let store = MemorySignalStore::new();
        let generator = healthy_generator();
        let narrator = narrator(generator.clone());
        let job = InflationJob::new(
            &fetcher,
            &store,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
        );

        let first = job.run().await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.period, "2024-06");
        assert_eq!(store.len(), 1);
        let calls_after_first = generator.calls();
        assert_eq!(calls_after_first, 3);

        let second = job.run().await.unwrap();
        assert!(second.skipped);
        assert_eq!(store.len(), 1);
        assert_eq!(generator.calls(), calls_after_first);

        let row = &store.rows()[0];
        assert_eq!(row.narrative_headline, "Core inflation cools");
        assert_eq!(row.prompt_version, "inflation-v3.0");
        assert_eq!(row.scoring_version, "inflation-v2.2");
        assert_eq!(row.model_version, "fake-model");
        let snapshot = row.inflation_snapshot().unwrap();
        assert_eq!(snapshot.metrics.breakeven_5y, Some(2.35));
        assert!(snapshot.history.core_yoy.len() <= 24);
        assert_eq!(row.data_hash.as_deref(), Some(snapshot.metrics.data_hash().as_str()));
        assert!(row.deep_analysis().is_some());
    }

    #[tokio::test]
    async fn test_new_prompt_version_generates_again() {
        let fetcher = fred_fetcher();
        let store = MemorySignalStore::new();
        let narrator = narrator(healthy_generator());
        InflationJob::new(
            &fetcher,
            &store,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
        )
        .run()
        .await
        .unwrap();

        let bumped = SignalConfig {
            prompt_version: "inflation-v3.1".into(),
            ..Default::default()
        };
        let outcome = InflationJob::new(
            &fetcher,
            &store,
            &narrator,
            bumped,
            NarrativeConfig::default(),
        )
        .run()
        .await
        .unwrap();
        assert!(!outcome.skipped);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_conflict_is_skip() {
        let fetcher = fred_fetcher();
        let store = RacyStore(MemorySignalStore::new());
        let narrator = narrator(healthy_generator());
        let job = InflationJob::new(
            &fetcher,
            &store,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
        );

        assert!(!job.run().await.unwrap().skipped);
        let second = job.run().await.unwrap();
        assert!(second.skipped);
        assert_eq!(store.0.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_with_failing_generator_stores_templates() {
        let fetcher = fred_fetcher();
        let store = MemorySignalStore::new();
        let narrator = narrator(FakeGenerator::failing());
        let job = InflationJob::new(
            &fetcher,
            &store,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
        );

        let outcome = job.run().await.unwrap();
        assert!(!outcome.skipped);
        let row = &store.rows()[0];
        assert!(row.narrative_headline.starts_with("Inflation regime:"));
        let deep = row.deep_analysis().unwrap();
        for asset in AssetClass::ALL {
            assert!(!deep.section(asset).is_empty());
        }
    }

    #[tokio::test]
    async fn test_batch_without_core_series_is_unavailable() {
        let fetcher = FakeFetcher::new()
            .with_series(FRED_HEADLINE_CPI, monthly_levels(2022, 1, 30, 300.0, 1.5));
        let store = MemorySignalStore::new();
        let narrator = narrator(healthy_generator());
        let job = InflationJob::new(
            &fetcher,
            &store,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
        );

        assert!(matches!(job.run().await, Err(Error::DataUnavailable(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_batch_tolerates_missing_breakeven() {
        let s = fred_series();
        let fetcher = FakeFetcher::new()
            .with_series(FRED_HEADLINE_CPI, s.headline)
            .with_series(FRED_CORE_CPI, s.core);
        let store = MemorySignalStore::new();
        let narrator = narrator(FakeGenerator::failing());
        let job = InflationJob::new(
            &fetcher,
            &store,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
        );

        job.run().await.unwrap();
        let snapshot = store.rows()[0].inflation_snapshot().unwrap();
        assert!(snapshot.metrics.breakeven_5y.is_none());
        assert!(snapshot.history.breakeven_5y.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_batch_persists_to_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.jsonl");
        let fetcher = fred_fetcher();
        let narrator = narrator(healthy_generator());
        {
            let store = JsonlSignalStore::open(&path).await.unwrap();
            InflationJob::new(
                &fetcher,
                &store,
                &narrator,
                SignalConfig::default(),
                NarrativeConfig::default(),
            )
            .run()
            .await
            .unwrap();
        }
        let reopened = JsonlSignalStore::open(&path).await.unwrap();
        let outcome = InflationJob::new(
            &fetcher,
            &reopened,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
        )
        .run()
        .await
        .unwrap();
        assert!(outcome.skipped);
        let latest = reopened.latest("inflation").await.unwrap().unwrap();
        assert_eq!(latest.period, "2024-06");
    }

    // =========================================================================
    // Backfill
    // =========================================================================

    fn bls_fetcher() -> FakeFetcher {
        FakeFetcher::new()
            .with_series(BLS_HEADLINE_CPI, monthly_levels(2021, 1, 40, 260.0, 1.0))
            .with_series(BLS_CORE_CPI, monthly_levels(2021, 1, 40, 270.0, 0.9))
    }

    fn backfill_config() -> BackfillConfig {
        BackfillConfig {
            start_year: 2021,
            summary_years: 1,
            deep_months: 6,
            llm_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_backfill_inserts_scored_months_and_respects_cutoffs() {
        let levels = bls_fetcher();
        let breakeven =
            FakeFetcher::new().with_series(FRED_BREAKEVEN_5Y, vec![obs(2023, 12, 1, 2.2)]);
        let store = MemorySignalStore::new();
        let generator = FakeGenerator::failing();
        let narrator = narrator(generator.clone());
        let today = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();

        let job = BackfillJob::new(
            &levels,
            &breakeven,
            &store,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
            backfill_config(),
        )
        .with_today(today);

        let report = job.run().await.unwrap();
        // 40 aligned months, the first 12 have no YoY.
        assert_eq!(report.inserted, 28);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failed, 0);

        let rows = store.rows();
        let old = rows.iter().find(|r| r.period == "2022-01").unwrap();
        assert_eq!(old.narrative_headline, HISTORICAL_HEADLINE);
        assert!(old.narrative_deep.is_none());

        // Summary cutoff 2023-04-15, deep cutoff 2023-10-15.
        let mid = rows.iter().find(|r| r.period == "2023-06").unwrap();
        assert_ne!(mid.narrative_headline, HISTORICAL_HEADLINE);
        assert!(mid.narrative_deep.is_none());

        let recent = rows.iter().find(|r| r.period == "2023-12").unwrap();
        assert!(recent.deep_analysis().is_some());
        let snapshot = recent.inflation_snapshot().unwrap();
        assert_eq!(snapshot.metrics.breakeven_5y, Some(2.2));

        let again = job.run().await.unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.skipped, 28);
    }

    #[tokio::test]
    async fn test_backfill_continues_past_failed_period() {
        let levels = bls_fetcher();
        let breakeven = FakeFetcher::new();
        let store = FlakyStore {
            inner: MemorySignalStore::new(),
            bad_period: "2023-02",
        };
        let narrator = narrator(FakeGenerator::failing());
        let report = BackfillJob::new(
            &levels,
            &breakeven,
            &store,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
            backfill_config(),
        )
        .with_today(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
        .run()
        .await
        .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 27);
        assert_eq!(store.inner.len(), 27);
    }

    // =========================================================================
    // Risk aggregation
    // =========================================================================

    #[tokio::test]
    async fn test_aggregator_uses_stored_signal() {
        let fetcher = fred_fetcher();
        let store = MemorySignalStore::new();
        let narrator = narrator(healthy_generator());
        InflationJob::new(
            &fetcher,
            &store,
            &narrator,
            SignalConfig::default(),
            NarrativeConfig::default(),
        )
        .run()
        .await
        .unwrap();
        let stored = store.rows()[0].inflation_snapshot().unwrap();

        let empty = FakeFetcher::new();
        let state = RiskStateAggregator::new(&store, SignalConfig::default())
            .with_live_fallback(&empty)
            .risk_state()
            .await;
        assert_eq!(empty.calls(), 0);

        let inflation = state.category("inflation").unwrap();
        assert_eq!(inflation.score, stored.metrics.score);
        assert_eq!(inflation.summary, "Core inflation cools");
        assert_eq!(state.categories.len(), 5);
        assert!(state.score >= -4.0 && state.score <= 4.0);
    }

    #[tokio::test]
    async fn test_aggregator_recomputes_stale_regime() {
        let store = MemorySignalStore::new();
        let mut row = crate::tests::support::signal_row("inflation", "2019-03", "v1");
        row.structured = json!({
            "headlineYoY": 1.9, "coreYoY": 2.0, "coreMomentum": null, "breakeven5y": null,
            "score": 2.0, "regime": "disinflation"
        });
        store.insert(row).await.unwrap();

        let state = RiskStateAggregator::new(&store, SignalConfig::default()).risk_state().await;
        let inflation = state.category("inflation").unwrap();
        assert_eq!(inflation.level, RiskLevel::High);
        assert_eq!(inflation.status, "Inflationary Pressure");
        // 2 + (1 - 1 - 1 + 0) = 1
        assert_eq!(state.score, 1.0);
        assert_eq!(state.regime, CompositeRegime::Neutral);
    }

    #[tokio::test]
    async fn test_aggregator_reads_bootstrap_rows() {
        let store = MemorySignalStore::new();
        let mut row = crate::tests::support::signal_row("inflation", "2008-07", "v1");
        row.structured = json!({
            "indicators": {
                "core_yoy": {"current": 4.6, "history": [4.4, 4.6]},
                "headline_yoy": {"current": 5.6, "history": [5.0, 5.6]},
                "breakeven_5y": {"current": 2.4, "history": [2.3, 2.4]}
            },
            "derived": {"momentum": 0.5, "score": 2.0, "regime": "Inflationary Pressure"}
        });
        store.insert(row).await.unwrap();

        let empty = FakeFetcher::new();
        let state = RiskStateAggregator::new(&store, SignalConfig::default())
            .with_live_fallback(&empty)
            .risk_state()
            .await;
        assert_eq!(empty.calls(), 0);

        let inflation = state.category("inflation").unwrap();
        assert_eq!(inflation.score, 2.0);
        assert_eq!(inflation.level, RiskLevel::High);
        assert_eq!(inflation.status, "Inflationary Pressure");
        assert_eq!(inflation.trend, vec![5.0, 5.6]);
        assert_eq!(inflation.meta.as_ref().unwrap()["core"], 4.6);
        assert_eq!(state.score, 1.0);
    }

    #[tokio::test]
    async fn test_aggregator_falls_back_past_unreadable_row() {
        let store = MemorySignalStore::new();
        let mut row = crate::tests::support::signal_row("inflation", "2024-05", "v1");
        row.structured = json!({});
        store.insert(row).await.unwrap();

        let fetcher = fred_fetcher();
        let state = RiskStateAggregator::new(&store, SignalConfig::default())
            .with_live_fallback(&fetcher)
            .risk_state()
            .await;
        assert!(fetcher.calls() > 0);
        let inflation = state.category("inflation").unwrap();
        assert_ne!(inflation.status, UNAVAILABLE_STATUS);
        assert!(!inflation.trend.is_empty());

        let state = RiskStateAggregator::new(&store, SignalConfig::default()).risk_state().await;
        let inflation = state.category("inflation").unwrap();
        assert_eq!(inflation.status, UNAVAILABLE_STATUS);
        assert_eq!(inflation.score, 0.0);
    }

    #[tokio::test]
    async fn test_aggregator_label_only_row_scores_at_threshold() {
        let store = MemorySignalStore::new();
        let mut row = crate::tests::support::signal_row("inflation", "2015-01", "v1");
        row.structured = json!({"regime": "inflation"});
        store.insert(row).await.unwrap();

        let state = RiskStateAggregator::new(&store, SignalConfig::default()).risk_state().await;
        let inflation = state.category("inflation").unwrap();
        assert_eq!(inflation.level, RiskLevel::High);
        assert_eq!(inflation.score, 1.0);
        // 1 + (1 - 1 - 1 + 0) = 0
        assert_eq!(state.score, 0.0);
    }

    #[tokio::test]
    async fn test_aggregator_live_fallback_when_store_empty() {
        let store = MemorySignalStore::new();
        let fetcher = fred_fetcher();
        let state = RiskStateAggregator::new(&store, SignalConfig::default())
            .with_live_fallback(&fetcher)
            .risk_state()
            .await;
        let inflation = state.category("inflation").unwrap();
        assert_ne!(inflation.status, UNAVAILABLE_STATUS);
        assert!(!inflation.trend.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_aggregator_never_fails() {
        let fetcher = FakeFetcher::new();
        let state = RiskStateAggregator::new(&BrokenStore, SignalConfig::default())
            .with_live_fallback(&fetcher)
            .risk_state()
            .await;
        let inflation = state.category("inflation").unwrap();
        assert_eq!(inflation.status, UNAVAILABLE_STATUS);
        assert_eq!(inflation.score, 0.0);
        assert_eq!(state.score, -1.0);
        assert_eq!(state.regime, CompositeRegime::Neutral);
    }

    #[tokio::test]
    async fn test_aggregator_attaches_key_event_meta() {
        let store = MemorySignalStore::new();
        let generator = FakeGenerator::always(key_events_json(&[-0.5, -0.6, -0.2]));
        KeyEventsJob::new(&generator, &store)
            .at(Utc::now())
            .run()
            .await
            .unwrap();
        assert!(store.latest(KEY_EVENT_SIGNAL).await.unwrap().is_some());

        let state = RiskStateAggregator::new(&store, SignalConfig::default()).risk_state().await;
        let events = state.category("geopolitics").unwrap();
        assert_eq!(events.score, 0.0);
        assert_eq!(events.meta.as_ref().unwrap()["tone"], "risk-off");
    }
}
