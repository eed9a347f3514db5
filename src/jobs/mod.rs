//! Write-path entry points.

mod backfill;
mod compare;
mod inflation;
mod key_events;

pub use backfill::{BackfillJob, BackfillReport};
pub use compare::{compare_narratives, CompareRequest, CompareResponse, MetricInput, VariantReport};
pub use inflation::{
    compute_inflation, derive_reading, fetch_inflation_series, InflationJob, InflationReading,
    InflationSeries, JobOutcome, MomentumMethod,
};
pub use key_events::{
    parse_key_events, EventTone, ImpactTone, KeyEvent, KeyEventAggregate, KeyEventsJob,
    KeyEventsOutcome, EVENT_COUNT,
};
