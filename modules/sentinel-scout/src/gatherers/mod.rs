// Evidence gatherers: one per evidence category.
//
// A gatherer never fails. Network errors, bad payloads and empty results all
// come back as an empty Vec, logged inside the gatherer.

pub mod debunk;
pub mod media;
pub mod official;
pub mod text;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use sentinel_common::{Evidence, EvidenceCategory};

pub use debunk::DebunkGatherer;
pub use media::MediaGatherer;
pub use official::OfficialGatherer;

#[async_trait]
pub trait EvidenceGatherer: Send + Sync {
    fn category(&self) -> EvidenceCategory;

    async fn gather(&self, query: &str) -> Vec<Evidence>;
}

/// The three gatherers a verification run fans out to.
#[derive(Clone)]
pub struct GathererSet {
    pub official: Arc<dyn EvidenceGatherer>,
    pub media: Arc<dyn EvidenceGatherer>,
    pub debunk: Arc<dyn EvidenceGatherer>,
}

impl GathererSet {
    pub fn new(
        official: Arc<dyn EvidenceGatherer>,
        media: Arc<dyn EvidenceGatherer>,
        debunk: Arc<dyn EvidenceGatherer>,
    ) -> Self {
        Self {
            official,
            media,
            debunk,
        }
    }

    pub fn get(&self, category: EvidenceCategory) -> &Arc<dyn EvidenceGatherer> {
        match category {
            EvidenceCategory::Official => &self.official,
            EvidenceCategory::Media => &self.media,
            EvidenceCategory::Debunk => &self.debunk,
        }
    }
}

/// Run one gatherer under `timeout`; a timeout degrades to no evidence.
pub async fn gather_within(
    gatherer: &dyn EvidenceGatherer,
    query: &str,
    timeout: Duration,
) -> Vec<Evidence> {
    let category = gatherer.category();
    match tokio::time::timeout(timeout, gatherer.gather(query)).await {
        Ok(mut evidence) => {
            for item in evidence.iter_mut() {
                item.category = category;
            }
            evidence
        }
        Err(_) => {
            warn!(%category, query, timeout_secs = timeout.as_secs(), "Gatherer timed out");
            Vec::new()
        }
    }
}
