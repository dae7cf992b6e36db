use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use sentinel_common::{Evidence, EvidenceCategory};

use super::text::boolean_and_query;
use super::EvidenceGatherer;

const NEWS_API_URL: &str = "https://newsapi.org/v2/everything";
const LOOKBACK_DAYS: i64 = 7;
const TOP_ARTICLES: usize = 5;
const MEDIA_CONFIDENCE: f32 = 0.9;

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

/// Cross-references the claim against recent news coverage (NewsAPI).
pub struct MediaGatherer {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl MediaGatherer {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: NEWS_API_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn fetch(&self, api_key: &str, query: &str) -> Result<Vec<Evidence>> {
        let from = (Utc::now() - chrono::Duration::days(LOOKBACK_DAYS))
            .format("%Y-%m-%d")
            .to_string();

        let data: NewsApiResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("from", from.as_str()),
                ("sortBy", "relevance"),
                ("language", "en"),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .context("NewsAPI request failed")?
            .json()
            .await
            .context("Failed to parse NewsAPI response")?;

        Ok(articles_to_evidence(data))
    }
}

fn articles_to_evidence(data: NewsApiResponse) -> Vec<Evidence> {
    if data.status != "ok" {
        return Vec::new();
    }
    data.articles
        .into_iter()
        .filter_map(|a| {
            let url = a.url?;
            Some(
                Evidence::hit(
                    EvidenceCategory::Media,
                    url,
                    a.title.unwrap_or_default(),
                    a.description.unwrap_or_default(),
                    MEDIA_CONFIDENCE,
                )
                .with_published(a.published_at),
            )
        })
        .take(TOP_ARTICLES)
        .collect()
}

#[async_trait]
impl EvidenceGatherer for MediaGatherer {
    fn category(&self) -> EvidenceCategory {
        EvidenceCategory::Media
    }

    async fn gather(&self, query: &str) -> Vec<Evidence> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("NEWS_API_KEY not set, skipping media cross-reference");
            return Vec::new();
        };
        let boolean = boolean_and_query(query);
        if boolean.is_empty() {
            return Vec::new();
        }
        match self.fetch(api_key, &boolean).await {
            Ok(evidence) => {
                info!(query = %boolean, found = evidence.len(), "Media cross-reference complete");
                evidence
            }
            Err(e) => {
                warn!(query = %boolean, error = %e, "Media cross-reference failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_articles_become_media_evidence() {
        let raw = r#"{
            "status": "ok",
            "articles": [
                {"url": "https://a.example/1", "title": "One", "description": "d", "publishedAt": "2026-10-10T08:00:00Z"},
                {"url": null, "title": "No link"},
                {"url": "https://a.example/2", "title": "Two"},
                {"url": "https://a.example/3", "title": "Three"},
                {"url": "https://a.example/4", "title": "Four"},
                {"url": "https://a.example/5", "title": "Five"},
                {"url": "https://a.example/6", "title": "Six"}
            ]
        }"#;
        let evidence = articles_to_evidence(serde_json::from_str(raw).unwrap());
        assert_eq!(evidence.len(), 5);
        assert_eq!(evidence[0].confidence, 0.9);
        assert!(evidence[0].published_date.is_some());
        assert_eq!(evidence[1].title, "Two");
    }

    #[test]
    fn error_status_yields_nothing() {
        let raw = r#"{"status": "error", "code": "apiKeyInvalid"}"#;
        assert!(articles_to_evidence(serde_json::from_str(raw).unwrap()).is_empty());
    }

    #[tokio::test]
    async fn missing_key_skips_the_request() {
        let gatherer = MediaGatherer::new(None);
        assert!(gatherer.gather("flood in chennai").await.is_empty());
    }
}
