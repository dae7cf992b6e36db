// The Candidate Store: the only shared mutable resource in the engine.
//
// MemoryStore backs tests and database-less runs; PgStore is production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use sentinel_common::{
    AdhocAnalysis, AnalysisStatus, Crisis, CrisisVerdict, NewCrisis, NewNotification,
    NewTimelineItem, Notification, TimelineItem, Verdict,
};

use crate::error::Result;

#[async_trait]
pub trait CandidateStore: Send + Sync {
    // --- Crises ---

    async fn create_crisis(&self, crisis: NewCrisis) -> Result<Crisis>;

    async fn get_crisis(&self, id: Uuid) -> Result<Option<Crisis>>;

    /// Highest severity first, newest first among equal severities.
    async fn list_crises(&self, limit: usize) -> Result<Vec<Crisis>>;

    /// First tracked crisis whose name contains, or is contained by, `name`
    /// (case-insensitive).
    async fn find_crisis_by_fuzzy_name(&self, name: &str) -> Result<Option<Crisis>>;

    /// Overwrite only the verdict fields. Returns false when the crisis is gone.
    async fn update_crisis_verdict(
        &self,
        id: Uuid,
        verdict: CrisisVerdict,
        summary: &str,
    ) -> Result<bool>;

    /// Delete a crisis and every timeline item under it.
    async fn delete_crisis(&self, id: Uuid) -> Result<bool>;

    async fn delete_crises_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    // --- Timeline ---

    /// Insert a timeline item, or return the existing row with the same claim text.
    async fn create_timeline_item(&self, item: NewTimelineItem) -> Result<TimelineItem>;

    async fn get_timeline_item(&self, id: Uuid) -> Result<Option<TimelineItem>>;

    async fn get_timeline_item_by_claim(&self, claim_text: &str) -> Result<Option<TimelineItem>>;

    async fn timeline_items_for_crisis(&self, crisis_id: Uuid) -> Result<Vec<TimelineItem>>;

    /// Overwrite status, summary and sources in place. Returns false when the item is gone.
    async fn update_timeline_item(&self, id: Uuid, verdict: &Verdict) -> Result<bool>;

    /// Oldest UNCONFIRMED items first.
    async fn unconfirmed_timeline_items(&self, limit: usize) -> Result<Vec<TimelineItem>>;

    async fn delete_stale_unconfirmed(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    // --- Ad hoc analyses ---

    async fn create_adhoc_analysis(&self, query_text: &str) -> Result<AdhocAnalysis>;

    async fn get_adhoc_analysis(&self, id: Uuid) -> Result<Option<AdhocAnalysis>>;

    async fn update_adhoc_analysis(
        &self,
        id: Uuid,
        status: AnalysisStatus,
        verdict: Option<&Verdict>,
    ) -> Result<bool>;

    async fn delete_adhoc_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    // --- Notifications ---

    async fn create_notification(&self, notification: NewNotification) -> Result<Notification>;

    async fn latest_notification(&self) -> Result<Option<Notification>>;
}
