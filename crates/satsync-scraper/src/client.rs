//! HTTP client for the Saturn catalog search endpoint.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS};
use reqwest::Client;

use crate::error::ScraperError;
use crate::retry::retry_linear;

/// HTTP client for the Saturn storefront.
///
/// Sends a fixed browser-like header profile (the storefront serves an
/// empty shell to obvious bots), enforces a politeness delay before every
/// request, and retries transient failures with linear backoff. HTTP 429 and
/// network errors are retried; other non-2xx statuses are reported to the
/// caller, which may try an alternate search query instead.
pub struct SaturnClient {
    client: Client,
    base_url: String,
    request_delay_ms: u64,
    max_retries: u32,
    rate_limit_unit_secs: u64,
    network_unit_secs: u64,
}

impl SaturnClient {
    /// Creates a `SaturnClient` with configured timeout, headers, politeness
    /// delay, and retry policy.
    ///
    /// `request_delay_ms` is a hard floor applied before **every** request,
    /// including retries — it is the primary defence against upstream
    /// blocking and must not be treated as optional.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ScraperError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        request_delay_ms: u64,
        max_retries: u32,
        rate_limit_unit_secs: u64,
        network_unit_secs: u64,
    ) -> Result<Self, ScraperError> {
        reqwest::Url::parse(base_url).map_err(|e| ScraperError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ru-RU,ru;q=0.8,en-US;q=0.5,en;q=0.3"),
        );
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            request_delay_ms,
            max_retries,
            rate_limit_unit_secs,
            network_unit_secs,
        })
    }

    /// Builds the catalog search URL for one query string.
    ///
    /// The endpoint searches both product names and article codes
    /// (`sp[name]=1&sp[artikul]=1`).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] if the configured base URL
    /// cannot be combined into a valid search URL.
    pub fn search_url(&self, query: &str) -> Result<String, ScraperError> {
        let base = format!("{}/catalog/", self.base_url);
        let mut url = reqwest::Url::parse(&base).map_err(|e| ScraperError::InvalidBaseUrl {
            base_url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        url.query_pairs_mut()
            .append_pair("sp[name]", "1")
            .append_pair("sp[artikul]", "1")
            .append_pair("search", "")
            .append_pair("s", query);

        Ok(url.to_string())
    }

    /// Resolves an href from a results page against the storefront base URL.
    #[must_use]
    pub fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_owned()
        } else if href.starts_with('/') {
            format!("{}{href}", self.base_url)
        } else {
            format!("{}/{href}", self.base_url)
        }
    }

    /// Fetches one page, returning the response body.
    ///
    /// Sleeps the politeness delay first, then issues the request. HTTP 429
    /// and network failures are retried with linear backoff up to the
    /// configured bound; any other non-2xx status is returned as
    /// [`ScraperError::UnexpectedStatus`] without in-call retry.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`] — HTTP 429 after all retries exhausted.
    /// - [`ScraperError::UnexpectedStatus`] — any other non-2xx status.
    /// - [`ScraperError::Http`] — network failure after all retries exhausted.
    pub async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        retry_linear(
            self.max_retries,
            self.rate_limit_unit_secs,
            self.network_unit_secs,
            || {
                let url = url.to_owned();
                async move {
                    if self.request_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.request_delay_ms)).await;
                    }

                    let response = self.client.get(&url).send().await?;
                    let status = response.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        return Err(ScraperError::RateLimited { url });
                    }

                    if !status.is_success() {
                        return Err(ScraperError::UnexpectedStatus {
                            status: status.as_u16(),
                            url,
                        });
                    }

                    Ok(response.text().await?)
                }
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
