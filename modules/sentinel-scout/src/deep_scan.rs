//! Per-crisis deep-scan unit dispatched by the deep-gathering scheduler.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use sentinel_store::{CandidateStore, StoreError};

use crate::conclusion::ConclusionOutcome;
use crate::extraction::ClaimExtractor;
use crate::search::{hybrid_search, SearchBackend};
use crate::verification::{ClaimRequest, Verifier};

const RESULTS_PER_KIND: usize = 3;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeepScanReport {
    pub crisis_id: Option<Uuid>,
    pub queries: Vec<String>,
    pub hits: usize,
    pub claims_extracted: usize,
    pub claims_known: usize,
    pub claims_verified: usize,
    pub conclusion: Option<ConclusionOutcome>,
}

impl DeepScanReport {
    /// True when the crisis vanished before the scan started.
    pub fn skipped(&self) -> bool {
        self.crisis_id.is_none()
    }
}

/// The two queries run per crisis: its keywords and a hoax variant.
pub fn scan_queries(keywords: &str) -> Vec<String> {
    let keywords = keywords.trim();
    vec![keywords.to_string(), format!("{keywords} viral hoax")]
}

#[derive(Clone)]
pub struct DeepScanner {
    store: Arc<dyn CandidateStore>,
    search: Arc<dyn SearchBackend>,
    extractor: ClaimExtractor,
    verifier: Verifier,
}

impl DeepScanner {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        search: Arc<dyn SearchBackend>,
        extractor: ClaimExtractor,
        verifier: Verifier,
    ) -> Self {
        Self {
            store,
            search,
            extractor,
            verifier,
        }
    }

    /// Search, extract and verify new claims for one crisis, then re-aggregate
    /// its verdict once. A crisis deleted before the scan starts is a no-op.
    pub async fn scan(&self, crisis_id: Uuid) -> Result<DeepScanReport, StoreError> {
        let Some(crisis) = self.store.get_crisis(crisis_id).await? else {
            debug!(%crisis_id, "Crisis gone before deep scan");
            return Ok(DeepScanReport::default());
        };

        let mut report = DeepScanReport {
            crisis_id: Some(crisis.id),
            queries: scan_queries(&crisis.keywords),
            ..Default::default()
        };

        info!(crisis = %crisis.name, %crisis_id, "Deep scan started");

        for query in report.queries.clone() {
            let hits = hybrid_search(self.search.as_ref(), &query, RESULTS_PER_KIND).await;
            report.hits += hits.len();

            for hit in hits {
                let claims = self
                    .extractor
                    .extract(&format!("{} {}", hit.title, hit.snippet))
                    .await;
                report.claims_extracted += claims.len();

                for claim in claims {
                    if self.store.get_timeline_item_by_claim(&claim.text).await?.is_some() {
                        report.claims_known += 1;
                        continue;
                    }
                    let request = ClaimRequest::new(claim.text)
                        .located(Some(claim.location))
                        .for_crisis(crisis_id);
                    match self.verifier.verify(request).await {
                        Ok(_) => report.claims_verified += 1,
                        Err(e) => warn!(%crisis_id, error = %e, "Deep-scan verification failed"),
                    }
                }
            }
        }

        report.conclusion = Some(self.verifier.conclusions().conclude(crisis_id).await?);

        info!(
            crisis = %crisis.name,
            hits = report.hits,
            extracted = report.claims_extracted,
            verified = report.claims_verified,
            "Deep scan finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_include_hoax_variant() {
        assert_eq!(
            scan_queries(" Mumbai flood "),
            vec!["Mumbai flood".to_string(), "Mumbai flood viral hoax".to_string()]
        );
    }
}
