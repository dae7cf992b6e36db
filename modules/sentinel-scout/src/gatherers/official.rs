use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use sentinel_common::{Evidence, EvidenceCategory};

use super::text::{keyword_overlap_score, keywords, site_restricted};
use super::EvidenceGatherer;
use crate::search::SearchBackend;

const MAX_RESULTS: usize = 10;
const MIN_SCORE: f32 = 0.6;

/// Looks for the claim on government and agency domains.
pub struct OfficialGatherer {
    search: Arc<dyn SearchBackend>,
    domains: Vec<String>,
}

impl OfficialGatherer {
    pub fn new(search: Arc<dyn SearchBackend>, domains: Vec<String>) -> Self {
        Self { search, domains }
    }
}

#[async_trait]
impl EvidenceGatherer for OfficialGatherer {
    fn category(&self) -> EvidenceCategory {
        EvidenceCategory::Official
    }

    async fn gather(&self, query: &str) -> Vec<Evidence> {
        if self.domains.is_empty() {
            return Vec::new();
        }
        let claim_keywords = keywords(query);
        let hits = match self
            .search
            .search(&site_restricted(query, &self.domains), MAX_RESULTS)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query, error = %e, "Official source search failed");
                return Vec::new();
            }
        };

        let evidence: Vec<Evidence> = hits
            .into_iter()
            .filter_map(|hit| {
                let score =
                    keyword_overlap_score(&claim_keywords, &format!("{} {}", hit.title, hit.snippet));
                (score > MIN_SCORE).then(|| {
                    Evidence::hit(EvidenceCategory::Official, hit.url, hit.title, hit.snippet, score)
                })
            })
            .collect();

        info!(query, found = evidence.len(), "Official sources checked");

        if evidence.is_empty() {
            // Searched, nothing on record.
            return vec![Evidence::negative_marker(
                EvidenceCategory::Official,
                "",
                "No matching statement found on official domains.",
            )];
        }
        evidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchHit;
    use crate::testing::MockSearch;

    fn gatherer(search: MockSearch) -> OfficialGatherer {
        OfficialGatherer::new(Arc::new(search), vec!["pib.gov.in".into()])
    }

    #[tokio::test]
    async fn matching_release_is_kept() {
        let search = MockSearch::new().on_search(
            "bridge collapse andheri site:pib.gov.in",
            vec![SearchHit {
                url: "https://pib.gov.in/1".into(),
                title: "Andheri bridge collapse: rescue underway".into(),
                snippet: String::new(),
            }],
        );
        let evidence = gatherer(search).gather("bridge collapse andheri").await;
        assert_eq!(evidence.len(), 1);
        assert!(evidence[0].is_substantive());
        assert_eq!(evidence[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn nothing_matching_yields_negative_marker() {
        let search = MockSearch::new().on_search(
            "bridge collapse andheri site:pib.gov.in",
            vec![SearchHit {
                url: "https://pib.gov.in/2".into(),
                title: "Cabinet approves budget".into(),
                snippet: String::new(),
            }],
        );
        let evidence = gatherer(search).gather("bridge collapse andheri").await;
        assert_eq!(evidence.len(), 1);
        assert!(!evidence[0].is_substantive());
    }

    #[tokio::test]
    async fn search_failure_is_empty() {
        let evidence = gatherer(MockSearch::new().failing()).gather("anything").await;
        assert!(evidence.is_empty());
    }
}
