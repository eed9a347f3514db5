use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{normalize, Observation, SeriesFetcher, SeriesRequest};
use crate::{prelude::*, req::HttpClient, serde_utils::parse_value, Error};

const TIMESERIES_PATH: &str = "/publicAPI/v2/timeseries/data/";
const REQUEST_SUCCEEDED: &str = "REQUEST_SUCCEEDED";
/// Annual average pseudo-period.
const ANNUAL_PERIOD: &str = "M13";
/// The v2 API caps a single request at this many years.
const CHUNK_YEARS: i32 = 10;

#[derive(Serialize, Debug)]
struct TimeseriesRequest<'a> {
    seriesid: [&'a str; 1],
    startyear: String,
    endyear: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    registrationkey: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct TimeseriesResponse {
    #[serde(rename = "status")]
    status: String,
    results: Option<TimeseriesResults>,
}

#[derive(Deserialize, Debug)]
struct TimeseriesResults {
    #[serde(default)]
    series: Vec<SeriesData>,
}

#[derive(Deserialize, Debug)]
struct SeriesData {
    #[serde(default)]
    data: Vec<DataPoint>,
}

#[derive(Deserialize, Debug)]
struct DataPoint {
    year: String,
    period: String,
    value: String,
}

/// Client for the BLS v2 timeseries endpoint. Returns index levels only.
#[derive(Debug, Clone)]
pub struct BlsClient {
    http_client: HttpClient,
    api_key: Option<String>,
    start_year: i32,
}

impl BlsClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        start_year: i32,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(base_url, timeout, max_retries)?,
            api_key,
            start_year,
        })
    }

    /// Fetch one inclusive year range.
    pub async fn fetch_range(
        &self,
        series_id: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<Observation>> {
        let request = TimeseriesRequest {
            seriesid: [series_id],
            startyear: start_year.to_string(),
            endyear: end_year.to_string(),
            registrationkey: self.api_key.as_deref(),
        };
        let body = self
            .http_client
            .post_json(TIMESERIES_PATH, &request, None)
            .await?;
        parse_timeseries(&body)
    }
}

/// Inclusive `(start, end)` year windows covering `start..=end`.
pub(crate) fn year_chunks(start: i32, end: i32) -> Vec<(i32, i32)> {
    let mut chunks = Vec::new();
    let mut year = start;
    while year <= end {
        let chunk_end = (year + CHUNK_YEARS - 1).min(end);
        chunks.push((year, chunk_end));
        year += CHUNK_YEARS;
    }
    chunks
}

/// Decode a BLS payload. A non-success status yields an empty series.
pub(crate) fn parse_timeseries(body: &str) -> Result<Vec<Observation>> {
    let response: TimeseriesResponse = serde_json::from_str(body)?;
    if response.status != REQUEST_SUCCEEDED {
        warn!(
            target: "macro_signals::series",
            status = %response.status,
            "BLS request did not succeed"
        );
        return Ok(Vec::new());
    }
    let Some(series) = response.results.and_then(|r| r.series.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let observations = series
        .data
        .into_iter()
        .filter(|d| d.period != ANNUAL_PERIOD)
        .filter_map(|d| {
            let year: i32 = d.year.parse().ok()?;
            let month: u32 = d.period.strip_prefix('M')?.parse().ok()?;
            let date = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(Observation::new(date, parse_value(&d.value)?))
        })
        .collect();
    Ok(normalize(observations))
}

#[async_trait]
impl SeriesFetcher for BlsClient {
    /// Full history from the configured start year, fetched in 10-year chunks.
    async fn fetch(&self, request: &SeriesRequest) -> Result<Vec<Observation>> {
        if request.transform.is_some() {
            return Err(Error::DataUnavailable(format!(
                "BLS does not support transforms ({})",
                request.series_id
            )));
        }
        let end_year = Utc::now().year();
        let mut results = Vec::new();
        for (start, end) in year_chunks(self.start_year, end_year) {
            debug!(
                target: "macro_signals::series",
                series = %request.series_id,
                start,
                end,
                "Fetching BLS chunk"
            );
            results.extend(self.fetch_range(&request.series_id, start, end).await?);
        }
        let mut observations = normalize(results);
        observations.dedup_by_key(|o| o.date);
        Ok(observations)
    }

    fn name(&self) -> &'static str {
        "bls"
    }
}
