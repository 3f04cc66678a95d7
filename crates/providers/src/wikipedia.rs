//! Wikipedia client: MediaWiki search returning the best hit's intro.

use std::time::Duration;

use anvil_core::error::ProviderError;
use anvil_core::provider::WikiClient;
use async_trait::async_trait;
use tracing::debug;

use crate::transport_error;

pub struct WikipediaClient {
    api_url: String,
    client: reqwest::Client,
}

impl WikipediaClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("anvil/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            api_url: api_url.into(),
            client,
        })
    }
}

/// Pull `"{title}: {extract}"` out of a `generator=search` response.
fn summarize(body: &serde_json::Value) -> Option<String> {
    let pages = body["query"]["pages"].as_object()?;
    // Pages are keyed by id; the search rank is in "index".
    let best = pages
        .values()
        .min_by_key(|p| p["index"].as_u64().unwrap_or(u64::MAX))?;
    let title = best["title"].as_str().unwrap_or_default();
    let extract = best["extract"].as_str().unwrap_or_default().trim();
    if extract.is_empty() {
        return None;
    }
    Some(format!("{title}: {extract}"))
}

#[async_trait]
impl WikiClient for WikipediaClient {
    async fn search(&self, query: &str) -> Result<String, ProviderError> {
        debug!(query = %query, "Wikipedia search");
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", "1"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status_code: status,
                message,
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        Ok(summarize(&body).unwrap_or_else(|| format!("No results found for '{query}'.")))
    }
}
