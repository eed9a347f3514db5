use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{normalize, Observation, SeriesFetcher, SeriesRequest, SeriesTransform};
use crate::{prelude::*, req::HttpClient, serde_utils::de_optional_value, Error};

const OBSERVATIONS_PATH: &str = "/fred/series/observations";

#[derive(Serialize, Debug)]
struct ObservationsQuery<'a> {
    series_id: &'a str,
    api_key: &'a str,
    file_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    units: Option<&'static str>,
}

#[derive(Deserialize, Debug)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Deserialize, Debug)]
struct RawObservation {
    date: String,
    #[serde(deserialize_with = "de_optional_value")]
    value: Option<f64>,
}

/// Client for the FRED observations endpoint.
#[derive(Debug, Clone)]
pub struct FredClient {
    http_client: HttpClient,
    api_key: String,
}

impl FredClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(base_url, timeout, max_retries)?,
            api_key: api_key.into(),
        })
    }

    fn units(transform: Option<SeriesTransform>) -> Option<&'static str> {
        match transform {
            Some(SeriesTransform::PercentChangeFromYearAgo) => Some("pc1"),
            None => None,
        }
    }
}

/// Decode a FRED observations payload, dropping missing markers.
pub(crate) fn parse_observations(body: &str) -> Result<Vec<Observation>> {
    let response: ObservationsResponse = serde_json::from_str(body)?;
    let observations = response
        .observations
        .into_iter()
        .filter_map(|raw| {
            let value = raw.value?;
            let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d").ok()?;
            Some(Observation::new(date, value))
        })
        .collect();
    Ok(normalize(observations))
}

#[async_trait]
impl SeriesFetcher for FredClient {
    async fn fetch(&self, request: &SeriesRequest) -> Result<Vec<Observation>> {
        let query = ObservationsQuery {
            series_id: &request.series_id,
            api_key: &self.api_key,
            file_type: "json",
            units: Self::units(request.transform),
        };
        let body = self.http_client.get(OBSERVATIONS_PATH, &query).await?;
        let observations = parse_observations(&body).map_err(|e| {
            Error::DataUnavailable(format!("FRED {}: {e}", request.series_id))
        })?;
        debug!(
            target: "macro_signals::series",
            series = %request.series_id,
            count = observations.len(),
            "Fetched FRED series"
        );
        Ok(observations)
    }

    fn name(&self) -> &'static str {
        "fred"
    }
}
