//! Age-based retention sweeps, run after each deep-gathering phase.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use sentinel_common::ScannerSettings;
use sentinel_store::CandidateStore;

use crate::types::SweepReport;

#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub crisis_max_age: Duration,
    pub unconfirmed_max_age: Duration,
    pub adhoc_max_age: Duration,
}

impl RetentionPolicy {
    pub fn from_settings(settings: &ScannerSettings) -> Self {
        Self {
            crisis_max_age: settings.crisis_retention,
            unconfirmed_max_age: settings.unconfirmed_retention,
            adhoc_max_age: settings.adhoc_retention,
        }
    }
}

fn cutoff(now: DateTime<Utc>, age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Run all three sweeps. A failing sweep is logged and counted as zero.
pub async fn sweep(
    store: &dyn CandidateStore,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> SweepReport {
    let crises = match store
        .delete_crises_older_than(cutoff(now, policy.crisis_max_age))
        .await
    {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Crisis retention sweep failed");
            0
        }
    };

    let unconfirmed_items = match store
        .delete_stale_unconfirmed(cutoff(now, policy.unconfirmed_max_age))
        .await
    {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Unconfirmed item sweep failed");
            0
        }
    };

    let adhoc_analyses = match store
        .delete_adhoc_older_than(cutoff(now, policy.adhoc_max_age))
        .await
    {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Ad hoc analysis sweep failed");
            0
        }
    };

    let report = SweepReport {
        crises,
        unconfirmed_items,
        adhoc_analyses,
    };
    if report != SweepReport::default() {
        info!(%report, "Retention sweep");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_common::VerificationStatus;
    use sentinel_scout::testing::{crisis_fixture, timeline_fixture};
    use sentinel_store::MemoryStore;

    #[tokio::test]
    async fn old_rows_are_removed_and_fresh_rows_survive() {
        let store = MemoryStore::new();
        let old = crisis_fixture("Old flood", 80, chrono::Duration::days(4));
        let fresh = crisis_fixture("Fresh flood", 80, chrono::Duration::hours(2));
        store.insert_crisis(old.clone());
        store.insert_crisis(fresh.clone());
        store.insert_timeline_item(timeline_fixture(
            Some(old.id),
            "old claim",
            VerificationStatus::Verified,
            chrono::Duration::days(4),
        ));
        store.insert_timeline_item(timeline_fixture(
            None,
            "stale rumor",
            VerificationStatus::Unconfirmed,
            chrono::Duration::hours(50),
        ));
        store.insert_timeline_item(timeline_fixture(
            None,
            "stale but settled",
            VerificationStatus::Debunked,
            chrono::Duration::hours(50),
        ));

        let policy = RetentionPolicy::from_settings(&ScannerSettings::default());
        let report = sweep(&store, &policy, Utc::now()).await;

        assert_eq!(report.crises, 1);
        assert_eq!(report.unconfirmed_items, 1);
        assert_eq!(store.crisis_count(), 1);
        assert!(store.get_crisis(fresh.id).await.unwrap().is_some());
        // cascaded item gone, settled standalone item kept
        assert_eq!(store.timeline_count(), 1);
    }

    #[test]
    fn absurd_ages_do_not_overflow() {
        let now = Utc::now();
        assert_eq!(cutoff(now, Duration::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(cutoff(now, Duration::from_secs(60)), now - chrono::Duration::seconds(60));
    }
}
