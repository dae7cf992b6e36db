// Alert policy and the pluggable notification sink.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use sentinel_common::{Crisis, NewNotification, NotificationType};
use sentinel_store::CandidateStore;

const FIRST_CYCLE_TOP: usize = 3;

#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn emit(
        &self,
        content: &str,
        notification_type: NotificationType,
        crisis_id: Option<Uuid>,
    ) -> anyhow::Result<()>;
}

/// Writes notifications to the candidate store.
pub struct StoreEmitter {
    store: Arc<dyn CandidateStore>,
}

impl StoreEmitter {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl NotificationEmitter for StoreEmitter {
    async fn emit(
        &self,
        content: &str,
        notification_type: NotificationType,
        crisis_id: Option<Uuid>,
    ) -> anyhow::Result<()> {
        self.store
            .create_notification(NewNotification {
                content: content.to_string(),
                notification_type,
                crisis_id,
            })
            .await?;
        Ok(())
    }
}

/// Notifications owed for the crises a discovery pass just created.
///
/// The first cycle of the process gets one summary naming the top three by
/// severity; later cycles get one alert per qualifying crisis.
pub fn alerts_for(new_crises: &[Crisis], first_cycle: bool, threshold: i32) -> Vec<NewNotification> {
    let mut severe: Vec<&Crisis> = new_crises.iter().filter(|c| c.severity >= threshold).collect();
    if severe.is_empty() {
        return Vec::new();
    }

    if first_cycle {
        severe.sort_by(|a, b| b.severity.cmp(&a.severity));
        let names = severe
            .iter()
            .take(FIRST_CYCLE_TOP)
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return vec![NewNotification {
            content: format!(
                "SYSTEM ONLINE: Initial scan complete. Detected {} active threats. Top priority: {names}.",
                severe.len()
            ),
            notification_type: NotificationType::CatastrophicAlert,
            crisis_id: None,
        }];
    }

    severe
        .into_iter()
        .map(|c| NewNotification {
            content: format!(
                "NEW THREAT DETECTED: {} (Severity: {}) detected in {}.",
                c.name, c.severity, c.location
            ),
            notification_type: NotificationType::CatastrophicAlert,
            crisis_id: Some(c.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_scout::testing::crisis_fixture;
    use sentinel_store::MemoryStore;

    fn batch() -> Vec<Crisis> {
        let hour = chrono::Duration::hours(1);
        vec![
            crisis_fixture("Minor rumor", 40, hour),
            crisis_fixture("Dam burst", 80, hour),
            crisis_fixture("Gas leak", 97, hour),
            crisis_fixture("Bridge collapse", 75, hour),
            crisis_fixture("Riot video", 90, hour),
        ]
    }

    #[test]
    fn first_cycle_summarises_top_three() {
        let alerts = alerts_for(&batch(), true, 75);
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].content,
            "SYSTEM ONLINE: Initial scan complete. Detected 4 active threats. Top priority: Gas leak, Riot video, Dam burst."
        );
        assert_eq!(alerts[0].crisis_id, None);
    }

    #[test]
    fn later_cycles_alert_per_crisis() {
        let crises = batch();
        let alerts = alerts_for(&crises, false, 75);
        assert_eq!(alerts.len(), 4);
        assert_eq!(
            alerts[0].content,
            "NEW THREAT DETECTED: Dam burst (Severity: 80) detected in Mumbai."
        );
        assert_eq!(alerts[0].crisis_id, Some(crises[1].id));
        assert!(alerts
            .iter()
            .all(|a| a.notification_type == NotificationType::CatastrophicAlert));
    }

    #[test]
    fn nothing_severe_means_silence() {
        let quiet = vec![crisis_fixture("Minor rumor", 40, chrono::Duration::hours(1))];
        assert!(alerts_for(&quiet, true, 75).is_empty());
        assert!(alerts_for(&quiet, false, 75).is_empty());
    }

    #[tokio::test]
    async fn store_emitter_persists() {
        let store = Arc::new(MemoryStore::new());
        let emitter = StoreEmitter::new(store.clone());
        emitter
            .emit("hello", NotificationType::MisinfoAlert, None)
            .await
            .unwrap();

        let latest = store.latest_notification().await.unwrap().unwrap();
        assert_eq!(latest.content, "hello");
        assert_eq!(latest.notification_type, NotificationType::MisinfoAlert);
    }
}
