use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use sentinel_common::{
    AdhocAnalysis, AnalysisStatus, Crisis, CrisisVerdict, NewCrisis, NewNotification,
    NewTimelineItem, Notification, TimelineItem, Verdict, VerificationStatus,
    INITIAL_VERDICT_SUMMARY,
};

use crate::error::Result;
use crate::traits::CandidateStore;

#[derive(Default)]
struct Tables {
    crises: Vec<Crisis>,
    timeline: Vec<TimelineItem>,
    adhoc: Vec<AdhocAnalysis>,
    notifications: Vec<Notification>,
}

/// In-process store. Rows live in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn crisis_count(&self) -> usize {
        self.lock().crises.len()
    }

    pub fn timeline_count(&self) -> usize {
        self.lock().timeline.len()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    /// Insert a fully-formed crisis, e.g. one with a backdated `created_at`.
    pub fn insert_crisis(&self, crisis: Crisis) {
        self.lock().crises.push(crisis);
    }

    /// Insert a fully-formed timeline item without the claim uniqueness check.
    pub fn insert_timeline_item(&self, item: TimelineItem) {
        self.lock().timeline.push(item);
    }

    pub fn insert_adhoc_analysis(&self, analysis: AdhocAnalysis) {
        self.lock().adhoc.push(analysis);
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn create_crisis(&self, crisis: NewCrisis) -> Result<Crisis> {
        let now = Utc::now();
        let row = Crisis {
            id: Uuid::new_v4(),
            name: crisis.name,
            description: crisis.description,
            keywords: crisis.keywords,
            severity: crisis.severity,
            location: crisis.location,
            verdict_status: CrisisVerdict::Pending,
            verdict_summary: Some(INITIAL_VERDICT_SUMMARY.to_string()),
            created_at: now,
            updated_at: now,
        };
        self.lock().crises.push(row.clone());
        Ok(row)
    }

    async fn get_crisis(&self, id: Uuid) -> Result<Option<Crisis>> {
        Ok(self.lock().crises.iter().find(|c| c.id == id).cloned())
    }

    async fn list_crises(&self, limit: usize) -> Result<Vec<Crisis>> {
        let mut crises = self.lock().crises.clone();
        crises.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        crises.truncate(limit);
        Ok(crises)
    }

    async fn find_crisis_by_fuzzy_name(&self, name: &str) -> Result<Option<Crisis>> {
        Ok(self
            .lock()
            .crises
            .iter()
            .find(|c| c.name_matches(name))
            .cloned())
    }

    async fn update_crisis_verdict(
        &self,
        id: Uuid,
        verdict: CrisisVerdict,
        summary: &str,
    ) -> Result<bool> {
        let mut tables = self.lock();
        match tables.crises.iter_mut().find(|c| c.id == id) {
            Some(crisis) => {
                crisis.verdict_status = verdict;
                crisis.verdict_summary = Some(summary.to_string());
                crisis.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_crisis(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.lock();
        let before = tables.crises.len();
        tables.crises.retain(|c| c.id != id);
        let removed = tables.crises.len() < before;
        if removed {
            tables.timeline.retain(|t| t.crisis_id != Some(id));
            for n in tables.notifications.iter_mut() {
                if n.crisis_id == Some(id) {
                    n.crisis_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn delete_crises_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let expired: Vec<Uuid> = self
            .lock()
            .crises
            .iter()
            .filter(|c| c.created_at < cutoff)
            .map(|c| c.id)
            .collect();
        let mut deleted = 0;
        for id in expired {
            if self.delete_crisis(id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn create_timeline_item(&self, item: NewTimelineItem) -> Result<TimelineItem> {
        let mut tables = self.lock();
        if let Some(existing) = tables
            .timeline
            .iter()
            .find(|t| t.claim_text == item.claim_text)
        {
            return Ok(existing.clone());
        }
        let row = TimelineItem {
            id: Uuid::new_v4(),
            crisis_id: item.crisis_id,
            claim_text: item.claim_text,
            status: item.status,
            summary: item.summary,
            location: item.location,
            sources: item.sources,
            timestamp: Utc::now(),
        };
        tables.timeline.push(row.clone());
        Ok(row)
    }

    async fn get_timeline_item(&self, id: Uuid) -> Result<Option<TimelineItem>> {
        Ok(self.lock().timeline.iter().find(|t| t.id == id).cloned())
    }

    async fn get_timeline_item_by_claim(&self, claim_text: &str) -> Result<Option<TimelineItem>> {
        Ok(self
            .lock()
            .timeline
            .iter()
            .find(|t| t.claim_text == claim_text)
            .cloned())
    }

    async fn timeline_items_for_crisis(&self, crisis_id: Uuid) -> Result<Vec<TimelineItem>> {
        let mut items: Vec<TimelineItem> = self
            .lock()
            .timeline
            .iter()
            .filter(|t| t.crisis_id == Some(crisis_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(items)
    }

    async fn update_timeline_item(&self, id: Uuid, verdict: &Verdict) -> Result<bool> {
        let mut tables = self.lock();
        match tables.timeline.iter_mut().find(|t| t.id == id) {
            Some(item) => {
                item.status = verdict.status;
                item.summary = verdict.summary.clone();
                item.sources = verdict.sources.clone();
                item.timestamp = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn unconfirmed_timeline_items(&self, limit: usize) -> Result<Vec<TimelineItem>> {
        let mut items: Vec<TimelineItem> = self
            .lock()
            .timeline
            .iter()
            .filter(|t| t.status == VerificationStatus::Unconfirmed)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        items.truncate(limit);
        Ok(items)
    }

    async fn delete_stale_unconfirmed(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.lock();
        let before = tables.timeline.len();
        tables
            .timeline
            .retain(|t| !(t.status == VerificationStatus::Unconfirmed && t.timestamp < cutoff));
        Ok((before - tables.timeline.len()) as u64)
    }

    async fn create_adhoc_analysis(&self, query_text: &str) -> Result<AdhocAnalysis> {
        let row = AdhocAnalysis {
            id: Uuid::new_v4(),
            query_text: query_text.to_string(),
            status: AnalysisStatus::Pending,
            verdict_status: None,
            verdict_summary: None,
            verdict_sources: None,
            created_at: Utc::now(),
        };
        self.lock().adhoc.push(row.clone());
        Ok(row)
    }

    async fn get_adhoc_analysis(&self, id: Uuid) -> Result<Option<AdhocAnalysis>> {
        Ok(self.lock().adhoc.iter().find(|a| a.id == id).cloned())
    }

    async fn update_adhoc_analysis(
        &self,
        id: Uuid,
        status: AnalysisStatus,
        verdict: Option<&Verdict>,
    ) -> Result<bool> {
        let mut tables = self.lock();
        match tables.adhoc.iter_mut().find(|a| a.id == id) {
            Some(analysis) => {
                analysis.status = status;
                if let Some(v) = verdict {
                    analysis.verdict_status = Some(v.status);
                    analysis.verdict_summary = Some(v.summary.clone());
                    analysis.verdict_sources = Some(v.sources.clone());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_adhoc_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.lock();
        let before = tables.adhoc.len();
        tables.adhoc.retain(|a| a.created_at >= cutoff);
        Ok((before - tables.adhoc.len()) as u64)
    }

    async fn create_notification(&self, notification: NewNotification) -> Result<Notification> {
        let row = Notification {
            id: Uuid::new_v4(),
            content: notification.content,
            notification_type: notification.notification_type,
            crisis_id: notification.crisis_id,
            created_at: Utc::now(),
        };
        self.lock().notifications.push(row.clone());
        Ok(row)
    }

    async fn latest_notification(&self) -> Result<Option<Notification>> {
        Ok(self.lock().notifications.last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sentinel_common::{NotificationType, SourceRef};

    fn claim(crisis_id: Option<Uuid>, text: &str) -> NewTimelineItem {
        NewTimelineItem::from_verdict(crisis_id, text, None, &Verdict::unconfirmed_fallback())
    }

    #[tokio::test]
    async fn duplicate_claim_returns_existing_row() {
        let store = MemoryStore::new();
        let first = store
            .create_timeline_item(claim(None, "Dam breached near Pune"))
            .await
            .unwrap();
        let second = store
            .create_timeline_item(claim(None, "Dam breached near Pune"))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.timeline_count(), 1);
    }

    #[tokio::test]
    async fn deleting_crisis_cascades_to_its_items() {
        let store = MemoryStore::new();
        let keep = store
            .create_crisis(NewCrisis::new("Keep", "", "", 50, None))
            .await
            .unwrap();
        let drop = store
            .create_crisis(NewCrisis::new("Drop", "", "", 50, None))
            .await
            .unwrap();
        store.create_timeline_item(claim(Some(keep.id), "a")).await.unwrap();
        store.create_timeline_item(claim(Some(drop.id), "b")).await.unwrap();
        store.create_timeline_item(claim(None, "c")).await.unwrap();

        assert!(store.delete_crisis(drop.id).await.unwrap());
        assert!(!store.delete_crisis(drop.id).await.unwrap());
        assert_eq!(store.timeline_count(), 2);
        assert!(store.get_timeline_item_by_claim("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn crises_are_listed_by_severity_then_recency() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (name, severity, age) in [("old-high", 90, 10), ("low", 20, 0), ("new-high", 90, 1)] {
            let created = now - Duration::minutes(age);
            store.insert_crisis(Crisis {
                id: Uuid::new_v4(),
                name: name.into(),
                description: String::new(),
                keywords: String::new(),
                severity,
                location: "X".into(),
                verdict_status: CrisisVerdict::Pending,
                verdict_summary: None,
                created_at: created,
                updated_at: created,
            });
        }
        let names: Vec<String> = store
            .list_crises(10)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["new-high", "old-high", "low"]);
        assert_eq!(store.list_crises(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn verdict_update_leaves_other_fields_alone() {
        let store = MemoryStore::new();
        let crisis = store
            .create_crisis(NewCrisis::new("Gas leak", "desc", "gas,leak", 77, Some("Vizag".into())))
            .await
            .unwrap();
        assert!(store
            .update_crisis_verdict(crisis.id, CrisisVerdict::ConfirmedSituation, "confirmed")
            .await
            .unwrap());
        let after = store.get_crisis(crisis.id).await.unwrap().unwrap();
        assert_eq!(after.verdict_status, CrisisVerdict::ConfirmedSituation);
        assert_eq!(after.verdict_summary.as_deref(), Some("confirmed"));
        assert_eq!(after.name, crisis.name);
        assert_eq!(after.severity, 77);
        assert_eq!(after.location, "Vizag");
        assert!(!store
            .update_crisis_verdict(Uuid::new_v4(), CrisisVerdict::Pending, "x")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn stale_sweep_only_touches_unconfirmed_items() {
        let store = MemoryStore::new();
        let old = Utc::now() - Duration::hours(72);
        for (text, status) in [
            ("old unconfirmed", VerificationStatus::Unconfirmed),
            ("old verified", VerificationStatus::Verified),
        ] {
            store.insert_timeline_item(TimelineItem {
                id: Uuid::new_v4(),
                crisis_id: None,
                claim_text: text.into(),
                status,
                summary: String::new(),
                location: None,
                sources: vec![],
                timestamp: old,
            });
        }
        store.create_timeline_item(claim(None, "fresh")).await.unwrap();

        let cutoff = Utc::now() - Duration::hours(48);
        assert_eq!(store.delete_stale_unconfirmed(cutoff).await.unwrap(), 1);
        assert!(store.get_timeline_item_by_claim("old verified").await.unwrap().is_some());
        assert!(store.get_timeline_item_by_claim("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn adhoc_analysis_records_verdict() {
        let store = MemoryStore::new();
        let analysis = store.create_adhoc_analysis("Is the bridge closed?").await.unwrap();
        assert_eq!(analysis.status, AnalysisStatus::Pending);

        let verdict = Verdict {
            status: VerificationStatus::Verified,
            summary: "Closed for repairs".into(),
            sources: vec![SourceRef {
                url: "https://city.gov/notice".into(),
                source_name: "City".into(),
                kind: "official".into(),
                date_published: None,
            }],
        };
        store
            .update_adhoc_analysis(analysis.id, AnalysisStatus::Completed, Some(&verdict))
            .await
            .unwrap();
        let after = store.get_adhoc_analysis(analysis.id).await.unwrap().unwrap();
        assert_eq!(after.status, AnalysisStatus::Completed);
        assert_eq!(after.verdict_status, Some(VerificationStatus::Verified));
        assert_eq!(after.verdict_sources.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn latest_notification_is_the_newest() {
        let store = MemoryStore::new();
        assert!(store.latest_notification().await.unwrap().is_none());
        for content in ["first", "second"] {
            store
                .create_notification(NewNotification {
                    content: content.into(),
                    notification_type: NotificationType::CatastrophicAlert,
                    crisis_id: None,
                })
                .await
                .unwrap();
        }
        assert_eq!(store.latest_notification().await.unwrap().unwrap().content, "second");
    }
}
