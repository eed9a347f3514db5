//! Dependency health probe.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::warn;

use crate::consts::{FRED_HEADLINE_CPI, INFLATION_SIGNAL};
use crate::series::{SeriesFetcher, SeriesRequest};
use crate::store::SignalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    /// Reachable but returned no data.
    Empty,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Services {
    pub store: ServiceStatus,
    pub series: ServiceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub services: Services,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl Services {
    /// `down` when nothing works, `degraded` when anything is off.
    pub fn overall(&self) -> HealthStatus {
        match (self.store, self.series) {
            (ServiceStatus::Ok, ServiceStatus::Ok) => HealthStatus::Ok,
            (ServiceStatus::Error, ServiceStatus::Error) => HealthStatus::Down,
            _ => HealthStatus::Degraded,
        }
    }
}

/// Probe the store and the series provider concurrently. Never fails.
pub async fn check_health(store: &dyn SignalStore, fetcher: &dyn SeriesFetcher) -> HealthReport {
    let started = Instant::now();
    let request = SeriesRequest::year_over_year(FRED_HEADLINE_CPI);

    let (store_result, series_result) =
        tokio::join!(store.latest(INFLATION_SIGNAL), fetcher.fetch(&request));

    let store_status = match store_result {
        Ok(_) => ServiceStatus::Ok,
        Err(e) => {
            warn!(target: "macro_signals::store", error = %e, "Health probe: store failed");
            ServiceStatus::Error
        }
    };
    let series_status = match series_result {
        Ok(obs) if obs.is_empty() => ServiceStatus::Empty,
        Ok(_) => ServiceStatus::Ok,
        Err(e) => {
            warn!(
                target: "macro_signals::series",
                provider = fetcher.name(),
                error = %e,
                "Health probe: series failed"
            );
            ServiceStatus::Error
        }
    };

    let services = Services {
        store: store_status,
        series: series_status,
    };
    HealthReport {
        status: services.overall(),
        services,
        latency_ms: started.elapsed().as_millis() as u64,
        timestamp: Utc::now(),
    }
}
