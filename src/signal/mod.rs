//! Deterministic signal derivation: metrics, scores, regimes.

pub mod derive;
pub mod scoring;
mod types;

pub use scoring::{
    classify, classify_composite, score, CompositeRegime, InflationRegime, Polarity, ScoreScale,
};
pub use types::{HistoryWindows, MetricSet, Signal, SignalKey, StructuredSnapshot};
