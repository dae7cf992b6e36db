use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use sentinel_common::{CrisisVerdict, VerificationStatus};
use sentinel_scout::conclusion::ConclusionOutcome;
use sentinel_scout::testing::{crisis_fixture, timeline_fixture, MockOracle};
use sentinel_scout::ConclusionSynthesizer;
use sentinel_store::{CandidateStore, MemoryStore};

fn seeded() -> (Arc<MemoryStore>, sentinel_common::Crisis) {
    let store = Arc::new(MemoryStore::new());
    let crisis = crisis_fixture("Mumbai flood", 92, chrono::Duration::hours(2));
    store.insert_crisis(crisis.clone());
    let hour = chrono::Duration::hours(1);
    for (claim, status) in [
        ("Local trains suspended", VerificationStatus::Verified),
        ("Schools shut in Andheri", VerificationStatus::Verified),
        ("Dam gates opened at midnight", VerificationStatus::Debunked),
    ] {
        store.insert_timeline_item(timeline_fixture(Some(crisis.id), claim, status, hour));
    }
    (store, crisis)
}

#[tokio::test]
async fn one_oracle_call_overwrites_only_verdict_fields() {
    let (store, crisis) = seeded();
    let oracle = Arc::new(MockOracle::new().on(
        "CrisisConclusion",
        json!({ "verdict": "CATASTROPHIC EMERGENCY", "summary": "Severe flooding confirmed." }),
    ));
    let synthesizer = ConclusionSynthesizer::new(store.clone(), oracle.clone(), Duration::from_secs(5));

    let outcome = synthesizer.conclude(crisis.id).await.unwrap();

    assert_eq!(outcome, ConclusionOutcome::Updated(CrisisVerdict::CatastrophicEmergency));
    assert_eq!(oracle.calls("CrisisConclusion"), 1);

    let prompt = &oracle.requests()[0].prompt;
    assert!(prompt.contains("Local trains suspended"));
    assert!(prompt.contains("Dam gates opened at midnight"));

    let updated = store.get_crisis(crisis.id).await.unwrap().unwrap();
    assert_eq!(updated.verdict_status, CrisisVerdict::CatastrophicEmergency);
    assert_eq!(updated.verdict_summary.as_deref(), Some("Severe flooding confirmed."));
    assert_eq!(updated.name, crisis.name);
    assert_eq!(updated.description, crisis.description);
    assert_eq!(updated.keywords, crisis.keywords);
    assert_eq!(updated.severity, crisis.severity);
    assert_eq!(updated.location, crisis.location);
    assert_eq!(updated.created_at, crisis.created_at);
}

#[tokio::test]
async fn oracle_failure_leaves_crisis_untouched() {
    let (store, crisis) = seeded();
    let oracle = Arc::new(MockOracle::new().failing("CrisisConclusion"));
    let synthesizer = ConclusionSynthesizer::new(store.clone(), oracle, Duration::from_secs(5));

    let outcome = synthesizer.conclude(crisis.id).await.unwrap();

    assert_eq!(outcome, ConclusionOutcome::OracleFailed);
    let unchanged = store.get_crisis(crisis.id).await.unwrap().unwrap();
    assert_eq!(unchanged, crisis);
}

#[tokio::test]
async fn crisis_without_claims_is_not_sent_to_oracle() {
    let store = Arc::new(MemoryStore::new());
    let crisis = crisis_fixture("Quiet rumor", 40, chrono::Duration::hours(1));
    store.insert_crisis(crisis.clone());
    let oracle = Arc::new(MockOracle::new());
    let synthesizer = ConclusionSynthesizer::new(store, oracle.clone(), Duration::from_secs(5));

    assert_eq!(synthesizer.conclude(crisis.id).await.unwrap(), ConclusionOutcome::NoClaims);
    assert_eq!(synthesizer.conclude(Uuid::new_v4()).await.unwrap(), ConclusionOutcome::NoClaims);
    assert!(oracle.requests().is_empty());
}
