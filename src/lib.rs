#![deny(unreachable_pub)]

// Core modules
pub mod consts;
mod errors;
mod prelude;
mod req;

// Shared utilities
pub mod serde_utils;

// Feature modules
pub mod config;
pub mod gate;
pub mod health;
pub mod jobs;
pub mod logging;
pub mod narrative;
pub mod risk;
pub mod series;
pub mod signal;
pub mod store;

#[cfg(test)]
mod tests;

// Re-exports
pub use config::{AppConfig, ConfigError, Credentials};
pub use errors::{Error, HttpErrorKind};
pub use gate::{GateDecision, IdempotencyGate};
pub use health::{check_health, HealthReport, HealthStatus};
pub use jobs::{
    compare_narratives, BackfillJob, BackfillReport, CompareRequest, CompareResponse,
    InflationJob, JobOutcome, KeyEventsJob, KeyEventsOutcome, MomentumMethod,
};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use narrative::{NarrativeConfig, NarrativeOrchestrator, NarrativeOutcome, TextGenerator};
pub use risk::{RiskState, RiskStateAggregator};
pub use series::{BlsClient, FredClient, Observation, SeriesFetcher, SeriesRequest};
pub use signal::{CompositeRegime, InflationRegime, MetricSet, Signal, SignalKey};
pub use store::{JsonlSignalStore, MemorySignalStore, SignalStore, StoreError};
