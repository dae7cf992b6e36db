//! Discovery phase against mock sources and a scripted oracle.

use std::sync::Arc;

use serde_json::json;
use tokio_util::task::TaskTracker;

use sentinel_common::{ScannerSettings, VerificationStatus, UNKNOWN_LOCATION};
use sentinel_scout::testing::{
    crisis_fixture, signal, test_settings, MockGatherers, MockOracle, MockSource,
};
use sentinel_scout::{Discovery, SignalSource, Verifier};
use sentinel_store::{CandidateStore, MemoryStore};

struct Harness {
    store: Arc<MemoryStore>,
    oracle: Arc<MockOracle>,
    gatherers: MockGatherers,
    tracker: TaskTracker,
}

impl Harness {
    fn new(oracle: MockOracle) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            oracle: Arc::new(oracle),
            gatherers: MockGatherers::empty(),
            tracker: TaskTracker::new(),
        }
    }

    fn discovery(&self, sources: Vec<Arc<dyn SignalSource>>, settings: &ScannerSettings) -> Discovery {
        let verifier = Verifier::new(
            self.store.clone(),
            self.oracle.clone(),
            self.gatherers.set(),
            settings,
        );
        Discovery::new(
            self.store.clone(),
            self.oracle.clone(),
            sources,
            verifier,
            self.tracker.clone(),
            settings,
        )
        .unwrap()
    }

    async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

fn scripted_oracle() -> MockOracle {
    MockOracle::new()
        .on(
            "ThreatAssessment",
            json!({ "crises": [
                {
                    "name": "Assam Floods",
                    "description": "Brahmaputra breaches embankments near Guwahati",
                    "keywords": "",
                    "severity": 140,
                    "location": null
                },
                {
                    "name": "",
                    "description": "nameless",
                    "keywords": "x",
                    "severity": 50,
                    "location": "Delhi"
                },
                {
                    "name": "andheri bridge",
                    "description": "Bridge collapse rumor resurfaces",
                    "keywords": "andheri bridge",
                    "severity": 80,
                    "location": "Mumbai"
                }
            ]}),
        )
        .on(
            "ClaimVerdict",
            json!({ "status": "UNCONFIRMED", "summary": "No confirmation yet.", "sources": [] }),
        )
        .on(
            "CrisisConclusion",
            json!({ "verdict": "DEVELOPING NARRATIVE", "summary": "Reports still coming in." }),
        )
        .failing("BroadenedQuery")
}

fn wire() -> Arc<dyn SignalSource> {
    Arc::new(MockSource::new(
        "wire",
        vec![
            signal("Flood waters rise in Assam", "<b>Embankments</b> breached", "https://wire.example/assam/"),
            signal("Flood waters rise in Assam (update)", "", "https://wire.example/assam#live"),
            signal("Cricket: India win series", "Sports roundup", "https://wire.example/cricket"),
            signal("Andheri bridge collapse video is old", "Fact check", "https://wire.example/andheri"),
        ],
    ))
}

#[tokio::test]
async fn new_threats_become_seeded_crises() {
    let harness = Harness::new(scripted_oracle());
    harness.store.insert_crisis(crisis_fixture(
        "Andheri Bridge Collapse",
        85,
        chrono::Duration::hours(5),
    ));
    let discovery = harness.discovery(
        vec![wire(), Arc::new(MockSource::failing("broken"))],
        &test_settings(),
    );

    let report = discovery.run().await.unwrap();
    harness.drain().await;

    assert_eq!(report.raw_signals, 4);
    assert_eq!(report.unique_signals, 3);
    assert_eq!(report.relevant_signals, 2);
    assert_eq!(report.proposed, 3);
    assert_eq!(report.duplicates_skipped, 1);
    assert_eq!(report.new_crises.len(), 1);

    let crisis = &report.new_crises[0];
    assert_eq!(crisis.name, "Assam Floods");
    assert_eq!(crisis.severity, 100);
    assert_eq!(crisis.location, UNKNOWN_LOCATION);
    assert_eq!(crisis.keywords, "Assam Floods");
    assert_eq!(harness.store.crisis_count(), 2);

    let items = harness.store.timeline_items_for_crisis(crisis.id).await.unwrap();
    let claims: Vec<&str> = items.iter().map(|i| i.claim_text.as_str()).collect();
    assert!(claims.contains(&"Signal Detected: Assam Floods"));
    assert!(claims.contains(&"Brahmaputra breaches embankments near Guwahati"));
    assert!(items.iter().all(|i| i.status == VerificationStatus::Unconfirmed));

    let seed = items
        .iter()
        .find(|i| i.claim_text.starts_with("Signal Detected"))
        .unwrap();
    assert_eq!(seed.sources[0].source_name, "Sentinel Watchdog");
    assert_eq!(seed.sources[0].url, "#");

    // the detached run re-aggregated the new crisis
    assert!(harness.oracle.calls("CrisisConclusion") >= 1);
}

#[tokio::test]
async fn digest_only_carries_relevant_signals() {
    let harness = Harness::new(scripted_oracle());
    let discovery = harness.discovery(vec![wire()], &test_settings());

    discovery.run().await.unwrap();
    harness.drain().await;

    let request = harness
        .oracle
        .requests()
        .into_iter()
        .find(|r| r.shape == "ThreatAssessment")
        .unwrap();
    assert!(request
        .prompt
        .contains("- Flood waters rise in Assam (Test Wire): Embankments breached..."));
    assert!(!request.prompt.contains("Cricket"));
}

#[tokio::test]
async fn relevant_signals_are_capped() {
    let harness = Harness::new(MockOracle::new().on("ThreatAssessment", json!({ "crises": [] })));
    let signals = (0..6)
        .map(|i| signal(&format!("Flood alert {i}"), "", &format!("https://wire.example/{i}")))
        .collect();
    let settings = ScannerSettings {
        discovery_cap: 2,
        ..test_settings()
    };
    let discovery = harness.discovery(vec![Arc::new(MockSource::new("wire", signals))], &settings);

    let report = discovery.run().await.unwrap();

    assert_eq!(report.relevant_signals, 6);
    let prompt = &harness.oracle.requests()[0].prompt;
    assert_eq!(prompt.matches("- Flood alert").count(), 2);
}

#[tokio::test]
async fn oracle_failure_creates_nothing() {
    let harness = Harness::new(MockOracle::new().failing("ThreatAssessment"));
    let discovery = harness.discovery(vec![wire()], &test_settings());

    let report = discovery.run().await.unwrap();

    assert!(report.new_crises.is_empty());
    assert_eq!(harness.store.crisis_count(), 0);
}

#[tokio::test]
async fn nothing_relevant_skips_the_oracle() {
    let harness = Harness::new(MockOracle::new());
    let discovery = harness.discovery(
        vec![Arc::new(MockSource::new(
            "wire",
            vec![signal("Markets close higher", "", "https://wire.example/m")],
        ))],
        &test_settings(),
    );

    let report = discovery.run().await.unwrap();

    assert_eq!(report.relevant_signals, 0);
    assert!(harness.oracle.requests().is_empty());
}
