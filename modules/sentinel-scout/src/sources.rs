// Signal sources polled during discovery.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use sentinel_common::RawSignal;

use crate::search::SearchBackend;

const FEED_MAX_AGE_HOURS: i64 = 48;
const SOCIAL_RESULTS_PER_QUERY: usize = 5;
const SOCIAL_SOURCE_NAME: &str = "Social Signal";

#[async_trait]
pub trait SignalSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<RawSignal>>;
}

// ---------------------------------------------------------------------------
// RSS / Atom
// ---------------------------------------------------------------------------

pub struct FeedSource {
    url: String,
    client: reqwest::Client,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }
}

/// Parse an RSS/Atom document into signals, dropping entries older than 48h.
pub fn parse_feed(bytes: &[u8], feed_url: &str) -> Result<Vec<RawSignal>> {
    let feed = feed_rs::parser::parse(bytes).context("Failed to parse RSS/Atom feed")?;
    let cutoff = Utc::now() - chrono::Duration::hours(FEED_MAX_AGE_HOURS);

    let source_name = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            url::Url::parse(feed_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        })
        .unwrap_or_else(|| feed_url.to_string());

    let signals = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc));
            if matches!(published_at, Some(date) if date < cutoff) {
                return None;
            }

            let title = entry.title.map(|t| t.content)?;
            let description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            Some(RawSignal {
                title,
                description,
                url,
                source_name: source_name.clone(),
                published_at,
            })
        })
        .collect();

    Ok(signals)
}

#[async_trait]
impl SignalSource for FeedSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<RawSignal>> {
        let bytes = self
            .client
            .get(&self.url)
            .header("User-Agent", "sentinel-scout/0.1")
            .send()
            .await
            .context("Feed fetch failed")?
            .bytes()
            .await
            .context("Failed to read feed body")?;

        let signals = parse_feed(&bytes[..], &self.url)?;
        info!(feed_url = %self.url, items = signals.len(), "Feed parsed");
        Ok(signals)
    }
}

// ---------------------------------------------------------------------------
// Social listening
// ---------------------------------------------------------------------------

/// Runs a fixed set of search queries that surface rumors spreading on
/// social platforms.
pub struct SearchSignalSource {
    search: Arc<dyn SearchBackend>,
    queries: Vec<String>,
}

impl SearchSignalSource {
    pub fn new(search: Arc<dyn SearchBackend>, queries: Vec<String>) -> Self {
        Self { search, queries }
    }
}

#[async_trait]
impl SignalSource for SearchSignalSource {
    fn name(&self) -> &str {
        "social-listening"
    }

    async fn fetch(&self) -> Result<Vec<RawSignal>> {
        let results = join_all(
            self.queries
                .iter()
                .map(|q| self.search.search(q, SOCIAL_RESULTS_PER_QUERY)),
        )
        .await;

        let mut signals = Vec::new();
        for (query, result) in self.queries.iter().zip(results) {
            match result {
                Ok(hits) => signals.extend(hits.into_iter().map(|hit| RawSignal {
                    title: hit.title,
                    description: hit.snippet,
                    url: hit.url,
                    source_name: SOCIAL_SOURCE_NAME.to_string(),
                    published_at: None,
                })),
                Err(e) => warn!(query = %query, error = %e, "Social listening query failed"),
            }
        }
        info!(queries = self.queries.len(), items = signals.len(), "Social listening complete");
        Ok(signals)
    }
}
