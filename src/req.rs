use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use crate::{prelude::*, Error};

/// HTTP status codes that indicate transient server errors (retryable)
const RETRYABLE_STATUS_CODES: &[u16] = &[502, 503, 504];

/// Initial backoff delay in milliseconds (doubles with each retry)
const INITIAL_BACKOFF_MS: u64 = 250;

/// Upper bound on a single backoff delay
const MAX_BACKOFF_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) max_retries: u32,
}

/// Delay before retry number `attempt + 1`, capped at `MAX_BACKOFF_MS`.
fn backoff(attempt: u32) -> Duration {
    let ms = 2u64
        .checked_pow(attempt)
        .and_then(|factor| INITIAL_BACKOFF_MS.checked_mul(factor))
        .map_or(MAX_BACKOFF_MS, |ms| ms.min(MAX_BACKOFF_MS));
    Duration::from_millis(ms)
}

async fn parse_response(response: Response) -> Result<String> {
    let status_code = response.status().as_u16();
    let text = response.text().await?;

    if status_code < 400 {
        return Ok(text);
    }
    if (400..500).contains(&status_code) {
        return Err(Error::client_error(status_code, text));
    }
    Err(Error::server_error(status_code, text))
}

impl HttpClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub(crate) fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    /// Send a GET request with query parameters.
    pub(crate) async fn get<Q: Serialize + ?Sized>(
        &self,
        url_path: &str,
        query: &Q,
    ) -> Result<String> {
        let full_url = format!("{}{url_path}", self.base_url);
        self.send_with_retry(url_path, || self.client.get(&full_url).query(query))
            .await
    }

    /// Send a POST request with a JSON body and optional bearer token.
    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        url_path: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<String> {
        let full_url = format!("{}{url_path}", self.base_url);
        self.send_with_retry(url_path, || {
            let builder = self.client.post(&full_url).json(body);
            match bearer {
                Some(token) => builder.bearer_auth(token),
                None => builder,
            }
        })
        .await
    }

    /// Execute with automatic retry for transient server errors (502, 503, 504).
    ///
    /// Uses exponential backoff: 250ms, 500ms, ... capped at 30s, and never
    /// more than `max_retries` extra attempts. Timeouts are not retried.
    async fn send_with_retry<F>(&self, url_path: &str, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let response = build().send().await?;
            let status = response.status().as_u16();

            if RETRYABLE_STATUS_CODES.contains(&status) && attempt < self.max_retries {
                let backoff = backoff(attempt);
                warn!(
                    status = status,
                    attempt = attempt + 1,
                    max_attempts = self.max_retries + 1,
                    backoff_ms = backoff.as_millis(),
                    url = %url_path,
                    "Retryable HTTP error, backing off"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
                continue;
            }

            return parse_response(response).await;
        }
    }
}
