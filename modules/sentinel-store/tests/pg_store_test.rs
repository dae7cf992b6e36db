//! Postgres candidate store integration tests.
//!
//! **Requires:** Docker. Run with `--features test-utils`.

#![cfg(feature = "test-utils")]

use chrono::{Duration, Utc};
use sentinel_common::{
    AnalysisStatus, CrisisVerdict, NewCrisis, NewNotification, NewTimelineItem,
    NotificationType, SourceRef, Verdict, VerificationStatus,
};
use sentinel_store::testutil::postgres_container;
use sentinel_store::CandidateStore;

fn verdict(status: VerificationStatus) -> Verdict {
    Verdict {
        status,
        summary: "summary".into(),
        sources: vec![SourceRef {
            url: "https://pib.gov.in/release".into(),
            source_name: "PIB".into(),
            kind: "official".into(),
            date_published: Some("2026-10-01".into()),
        }],
    }
}

#[tokio::test]
async fn claim_upsert_returns_existing_row() {
    let (_container, store) = postgres_container().await;
    let crisis = store
        .create_crisis(NewCrisis::new("Chemical leak", "desc", "chemical,leak", 91, None))
        .await
        .unwrap();

    let item = NewTimelineItem::from_verdict(
        Some(crisis.id),
        "Chlorine leak at the port",
        Some("Vizag".into()),
        &verdict(VerificationStatus::Verified),
    );
    let first = store.create_timeline_item(item.clone()).await.unwrap();
    let second = store.create_timeline_item(item).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.sources.len(), 1);
    assert_eq!(store.timeline_items_for_crisis(crisis.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn crisis_delete_cascades_and_fuzzy_lookup_matches_both_ways() {
    let (_container, store) = postgres_container().await;
    let crisis = store
        .create_crisis(NewCrisis::new("Flood in Chennai", "", "", 60, Some("Chennai".into())))
        .await
        .unwrap();
    assert_eq!(crisis.verdict_status, CrisisVerdict::Pending);

    assert!(store.find_crisis_by_fuzzy_name("flood").await.unwrap().is_some());
    assert!(store
        .find_crisis_by_fuzzy_name("Flood in Chennai worsens")
        .await
        .unwrap()
        .is_some());
    assert!(store.find_crisis_by_fuzzy_name("Earthquake").await.unwrap().is_none());

    store
        .create_timeline_item(NewTimelineItem::from_verdict(
            Some(crisis.id),
            "Water entered the airport",
            None,
            &Verdict::unconfirmed_fallback(),
        ))
        .await
        .unwrap();
    store
        .create_notification(NewNotification {
            content: "alert".into(),
            notification_type: NotificationType::CatastrophicAlert,
            crisis_id: Some(crisis.id),
        })
        .await
        .unwrap();

    assert!(store.delete_crisis(crisis.id).await.unwrap());
    assert!(store
        .get_timeline_item_by_claim("Water entered the airport")
        .await
        .unwrap()
        .is_none());
    let latest = store.latest_notification().await.unwrap().unwrap();
    assert_eq!(latest.crisis_id, None);
}

#[tokio::test]
async fn verdict_updates_and_sweeps() {
    let (_container, store) = postgres_container().await;
    let crisis = store
        .create_crisis(NewCrisis::new("Bridge collapse", "d", "bridge", 95, None))
        .await
        .unwrap();
    assert!(store
        .update_crisis_verdict(crisis.id, CrisisVerdict::CatastrophicEmergency, "Confirmed")
        .await
        .unwrap());
    let after = store.get_crisis(crisis.id).await.unwrap().unwrap();
    assert_eq!(after.verdict_status, CrisisVerdict::CatastrophicEmergency);
    assert_eq!(after.severity, 95);

    let item = store
        .create_timeline_item(NewTimelineItem::from_verdict(
            None,
            "Bridge closed to traffic",
            None,
            &Verdict::unconfirmed_fallback(),
        ))
        .await
        .unwrap();
    assert_eq!(store.unconfirmed_timeline_items(10).await.unwrap().len(), 1);
    assert!(store
        .update_timeline_item(item.id, &verdict(VerificationStatus::Debunked))
        .await
        .unwrap());
    assert!(store.unconfirmed_timeline_items(10).await.unwrap().is_empty());

    let analysis = store.create_adhoc_analysis("Is the bridge down?").await.unwrap();
    store
        .update_adhoc_analysis(analysis.id, AnalysisStatus::Failed, None)
        .await
        .unwrap();
    let analysis = store.get_adhoc_analysis(analysis.id).await.unwrap().unwrap();
    assert_eq!(analysis.status, AnalysisStatus::Failed);
    assert!(analysis.verdict_status.is_none());

    let future = Utc::now() + Duration::hours(1);
    assert_eq!(store.delete_adhoc_older_than(future).await.unwrap(), 1);
    assert_eq!(store.delete_crises_older_than(future).await.unwrap(), 1);
    assert_eq!(store.delete_stale_unconfirmed(future).await.unwrap(), 0);
}
