// Web search backend used by the gatherers, social listening and deep scans.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// General web results.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// News results.
    async fn news(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

/// News then web results for the same query. A failing half is logged and skipped.
pub async fn hybrid_search(
    backend: &dyn SearchBackend,
    query: &str,
    per_kind: usize,
) -> Vec<SearchHit> {
    let (news, web) = tokio::join!(
        backend.news(query, per_kind),
        backend.search(query, per_kind)
    );
    let mut hits = Vec::new();
    for (kind, result) in [("news", news), ("web", web)] {
        match result {
            Ok(found) => hits.extend(found),
            Err(e) => tracing::warn!(query, kind, error = %e, "Hybrid search half failed"),
        }
    }
    hits
}

// ---------------------------------------------------------------------------
// Serper
// ---------------------------------------------------------------------------

const SERPER_BASE_URL: &str = "https://google.serper.dev";

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
    #[serde(default)]
    news: Vec<SerperResult>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl From<SerperResult> for SearchHit {
    fn from(r: SerperResult) -> Self {
        SearchHit {
            url: r.link,
            title: r.title,
            snippet: r.snippet,
        }
    }
}

/// Serper (Google Search) backend.
pub struct SerperSearch {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl SerperSearch {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: SERPER_BASE_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn post(&self, endpoint: &str, query: &str, max_results: usize) -> Result<SerperResponse> {
        let body = serde_json::json!({
            "q": query,
            "num": max_results,
        });

        let resp = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Serper API request failed")?
            .error_for_status()
            .context("Serper API returned an error status")?;

        resp.json()
            .await
            .context("Failed to parse Serper response")
    }
}

#[async_trait]
impl SearchBackend for SerperSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        info!(query, max_results, "Serper search");
        let data = self.post("search", query, max_results).await?;
        let hits: Vec<SearchHit> = data
            .organic
            .into_iter()
            .take(max_results)
            .map(SearchHit::from)
            .collect();
        info!(query, count = hits.len(), "Serper search complete");
        Ok(hits)
    }

    async fn news(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        info!(query, max_results, "Serper news search");
        let data = self.post("news", query, max_results).await?;
        let hits: Vec<SearchHit> = data
            .news
            .into_iter()
            .take(max_results)
            .map(SearchHit::from)
            .collect();
        info!(query, count = hits.len(), "Serper news search complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serper_payload_maps_to_hits() {
        let raw = r#"{
            "organic": [{"link": "https://a.example", "title": "A", "snippet": "first"}],
            "news": [{"link": "https://n.example", "title": "N"}]
        }"#;
        let data: SerperResponse = serde_json::from_str(raw).unwrap();
        let web: Vec<SearchHit> = data.organic.into_iter().map(SearchHit::from).collect();
        let news: Vec<SearchHit> = data.news.into_iter().map(SearchHit::from).collect();
        assert_eq!(web[0].url, "https://a.example");
        assert_eq!(news[0].snippet, "");
    }
}
