use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use sentinel_common::{CrisisVerdict, TimelineItem, VerificationStatus};
use sentinel_oracle::{infer, Oracle};
use sentinel_store::{CandidateStore, StoreError};

use crate::shapes::CrisisConclusion;

const CONCLUSION_SYSTEM: &str = "You write the master verdict for a crisis \
narrative from its individually checked claims. Choose exactly one of \
CATASTROPHIC EMERGENCY (real, ongoing danger), LETHAL MISINFORMATION \
(a dangerous false narrative), CONFIRMED SITUATION (real but contained), \
DEVELOPING NARRATIVE (not enough settled claims yet). Write a short public \
summary suitable for a warning banner.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConclusionOutcome {
    Updated(CrisisVerdict),
    NoClaims,
    CrisisMissing,
    /// Oracle failed; the crisis row was left unchanged.
    OracleFailed,
}

/// Re-aggregates all timeline items under a crisis into its master verdict.
/// Last write wins; safe to call repeatedly for the same crisis.
#[derive(Clone)]
pub struct ConclusionSynthesizer {
    store: Arc<dyn CandidateStore>,
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
}

impl ConclusionSynthesizer {
    pub fn new(store: Arc<dyn CandidateStore>, oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self {
            store,
            oracle,
            timeout,
        }
    }

    pub async fn conclude(&self, crisis_id: Uuid) -> Result<ConclusionOutcome, StoreError> {
        let items = self.store.timeline_items_for_crisis(crisis_id).await?;
        if items.is_empty() {
            debug!(%crisis_id, "No claims to conclude");
            return Ok(ConclusionOutcome::NoClaims);
        }
        let Some(crisis) = self.store.get_crisis(crisis_id).await? else {
            return Ok(ConclusionOutcome::CrisisMissing);
        };

        let prompt = format!(
            "CRISIS: {}\nLOCATION: {}\nDESCRIPTION: {}\n\n{}",
            crisis.name,
            crisis.location,
            crisis.description,
            claims_digest(&items)
        );

        let conclusion = match infer::<CrisisConclusion>(
            self.oracle.as_ref(),
            self.timeout,
            CONCLUSION_SYSTEM,
            prompt,
        )
        .await
        {
            Ok(c) => c,
            Err(e) => {
                warn!(%crisis_id, error = %e, "Crisis conclusion failed, verdict unchanged");
                return Ok(ConclusionOutcome::OracleFailed);
            }
        };

        let verdict = CrisisVerdict::from(conclusion.verdict);
        if !self
            .store
            .update_crisis_verdict(crisis_id, verdict, &conclusion.summary)
            .await?
        {
            return Ok(ConclusionOutcome::CrisisMissing);
        }

        info!(%crisis_id, crisis = %crisis.name, %verdict, claims = items.len(), "Crisis verdict updated");
        Ok(ConclusionOutcome::Updated(verdict))
    }
}

fn claims_digest(items: &[TimelineItem]) -> String {
    let group = |status: VerificationStatus| {
        let lines: Vec<String> = items
            .iter()
            .filter(|i| i.status == status)
            .map(|i| format!("- {}", i.claim_text))
            .collect();
        if lines.is_empty() {
            "- none".to_string()
        } else {
            lines.join("\n")
        }
    };
    format!(
        "VERIFIED CLAIMS:\n{}\n\nDEBUNKED CLAIMS:\n{}\n\nUNCONFIRMED CLAIMS:\n{}",
        group(VerificationStatus::Verified),
        group(VerificationStatus::Debunked),
        group(VerificationStatus::Unconfirmed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(text: &str, status: VerificationStatus) -> TimelineItem {
        TimelineItem {
            id: Uuid::new_v4(),
            crisis_id: None,
            claim_text: text.into(),
            status,
            summary: String::new(),
            location: None,
            sources: vec![],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn digest_partitions_by_status() {
        let digest = claims_digest(&[
            item("bridge closed", VerificationStatus::Verified),
            item("army deployed", VerificationStatus::Verified),
            item("bridge fell", VerificationStatus::Debunked),
        ]);
        let verified = digest.split("DEBUNKED").next().unwrap();
        assert!(verified.contains("- bridge closed"));
        assert!(verified.contains("- army deployed"));
        assert!(digest.contains("DEBUNKED CLAIMS:\n- bridge fell"));
        assert!(digest.contains("UNCONFIRMED CLAIMS:\n- none"));
    }
}
