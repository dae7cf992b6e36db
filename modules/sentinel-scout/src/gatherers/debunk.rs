use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use sentinel_common::{Evidence, EvidenceCategory};

use super::text::{jaccard_similarity, site_restricted};
use super::EvidenceGatherer;
use crate::search::SearchBackend;

const MAX_RESULTS: usize = 10;
const SIMILARITY_THRESHOLD: f32 = 0.2;

/// Searches fact-check archives for an article about the same claim.
pub struct DebunkGatherer {
    search: Arc<dyn SearchBackend>,
    domains: Vec<String>,
}

impl DebunkGatherer {
    pub fn new(search: Arc<dyn SearchBackend>, domains: Vec<String>) -> Self {
        Self { search, domains }
    }
}

#[async_trait]
impl EvidenceGatherer for DebunkGatherer {
    fn category(&self) -> EvidenceCategory {
        EvidenceCategory::Debunk
    }

    async fn gather(&self, query: &str) -> Vec<Evidence> {
        if self.domains.is_empty() {
            return Vec::new();
        }
        let hits = match self
            .search
            .search(&site_restricted(query, &self.domains), MAX_RESULTS)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query, error = %e, "Fact-check archive search failed");
                return Vec::new();
            }
        };

        let evidence: Vec<Evidence> = hits
            .into_iter()
            .filter_map(|hit| {
                let similarity = jaccard_similarity(query, &hit.title);
                (similarity >= SIMILARITY_THRESHOLD).then(|| {
                    let snippet = if hit.snippet.is_empty() {
                        "Fact-check article matched the claim.".to_string()
                    } else {
                        hit.snippet
                    };
                    Evidence::hit(EvidenceCategory::Debunk, hit.url, hit.title, snippet, similarity)
                })
            })
            .collect();

        info!(query, found = evidence.len(), "Fact-check archives checked");
        evidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchHit;
    use crate::testing::MockSearch;

    #[tokio::test]
    async fn similar_titles_pass_threshold() {
        let search = MockSearch::new().on_search(
            "video shows dam burst site:boomlive.in",
            vec![
                SearchHit {
                    url: "https://boomlive.in/fc-1".into(),
                    title: "Fact Check: video shows dam burst".into(),
                    snippet: String::new(),
                },
                SearchHit {
                    url: "https://boomlive.in/other".into(),
                    title: "Election results explained".into(),
                    snippet: String::new(),
                },
            ],
        );
        let gatherer = DebunkGatherer::new(Arc::new(search), vec!["boomlive.in".into()]);
        let evidence = gatherer.gather("video shows dam burst").await;
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].source_url, "https://boomlive.in/fc-1");
        assert!(evidence[0].confidence >= 0.2);
        assert_eq!(evidence[0].snippet, "Fact-check article matched the claim.");
    }
}
