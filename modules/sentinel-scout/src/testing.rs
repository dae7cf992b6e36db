// Test mocks for the scout pipeline.
//
// One mock per trait boundary:
// - MockOracle (Oracle): canned JSON per output shape
// - MockGatherer (EvidenceGatherer): canned evidence, optional delay
// - MockSearch (SearchBackend): query → hits, Err for unregistered queries
// - MockSource (SignalSource): fixed signals or a failure
// - FailingStore (CandidateStore): MemoryStore whose verdict writes fail
//
// Plus fixtures for crises, timeline items and fast scanner settings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use sentinel_common::{
    AdhocAnalysis, AnalysisStatus, Crisis, CrisisVerdict, Evidence, EvidenceCategory, NewCrisis,
    NewNotification, NewTimelineItem, Notification, RawSignal, ScannerSettings, TimelineItem,
    Verdict, VerificationStatus,
};
use sentinel_oracle::{InferRequest, Oracle, OracleError};
use sentinel_store::{CandidateStore, MemoryStore, StoreError};

use crate::gatherers::{EvidenceGatherer, GathererSet};
use crate::search::{SearchBackend, SearchHit};
use crate::sources::SignalSource;

// ---------------------------------------------------------------------------
// MockOracle
// ---------------------------------------------------------------------------

type Responder = Box<dyn Fn(&InferRequest) -> Result<Value, OracleError> + Send + Sync>;

/// Shape-keyed oracle. Unscripted shapes return `Err`.
/// Builder pattern: `.on()`, `.on_fn()`, `.failing()`.
pub struct MockOracle {
    responders: HashMap<String, Responder>,
    requests: Mutex<Vec<InferRequest>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            responders: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn on(self, shape: &str, reply: Value) -> Self {
        self.on_fn(shape, move |_| Ok(reply.clone()))
    }

    pub fn on_fn<F>(mut self, shape: &str, f: F) -> Self
    where
        F: Fn(&InferRequest) -> Result<Value, OracleError> + Send + Sync + 'static,
    {
        self.responders.insert(shape.to_string(), Box::new(f));
        self
    }

    pub fn failing(self, shape: &str) -> Self {
        self.on_fn(shape, |_| Err(OracleError::Network("scripted failure".into())))
    }

    /// Number of requests made for `shape`.
    pub fn calls(&self, shape: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.shape == shape)
            .count()
    }

    pub fn requests(&self) -> Vec<InferRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn infer(&self, request: &InferRequest) -> Result<Value, OracleError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.responders.get(&request.shape) {
            Some(respond) => respond(request),
            None => Err(OracleError::Config(format!(
                "MockOracle: no reply scripted for {}",
                request.shape
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockGatherer
// ---------------------------------------------------------------------------

/// Canned gatherer. Per-query results take precedence over the default.
pub struct MockGatherer {
    category: EvidenceCategory,
    default: Vec<Evidence>,
    by_query: HashMap<String, Vec<Evidence>>,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl MockGatherer {
    pub fn new(category: EvidenceCategory) -> Self {
        Self {
            category,
            default: Vec::new(),
            by_query: HashMap::new(),
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(mut self, evidence: Vec<Evidence>) -> Self {
        self.default = evidence;
        self
    }

    pub fn on_query(mut self, query: &str, evidence: Vec<Evidence>) -> Self {
        self.by_query.insert(query.to_string(), evidence);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvidenceGatherer for MockGatherer {
    fn category(&self) -> EvidenceCategory {
        self.category
    }

    async fn gather(&self, query: &str) -> Vec<Evidence> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.by_query
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// The three mock gatherers of a run, kept for call assertions.
pub struct MockGatherers {
    pub official: Arc<MockGatherer>,
    pub media: Arc<MockGatherer>,
    pub debunk: Arc<MockGatherer>,
}

impl MockGatherers {
    /// All three return nothing.
    pub fn empty() -> Self {
        Self::new(
            MockGatherer::new(EvidenceCategory::Official),
            MockGatherer::new(EvidenceCategory::Media),
            MockGatherer::new(EvidenceCategory::Debunk),
        )
    }

    pub fn new(official: MockGatherer, media: MockGatherer, debunk: MockGatherer) -> Self {
        Self {
            official: Arc::new(official),
            media: Arc::new(media),
            debunk: Arc::new(debunk),
        }
    }

    pub fn set(&self) -> GathererSet {
        GathererSet::new(self.official.clone(), self.media.clone(), self.debunk.clone())
    }

    pub fn total_calls(&self) -> usize {
        self.official.calls() + self.media.calls() + self.debunk.calls()
    }
}

// ---------------------------------------------------------------------------
// MockSearch
// ---------------------------------------------------------------------------

/// Query-keyed search backend. Returns `Err` for unregistered queries.
/// Builder pattern: `.on_search()`, `.on_news()`, `.failing()`, `.with_delay()`.
pub struct MockSearch {
    web: HashMap<String, Vec<SearchHit>>,
    news: HashMap<String, Vec<SearchHit>>,
    fail_all: bool,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            web: HashMap::new(),
            news: HashMap::new(),
            fail_all: false,
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn on_search(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.web.insert(query.to_string(), hits);
        self
    }

    pub fn on_news(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.news.insert(query.to_string(), hits);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn stall(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Every query received, web and news alike, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn lookup(
        &self,
        table: &HashMap<String, Vec<SearchHit>>,
        kind: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail_all {
            bail!("MockSearch: scripted failure");
        }
        match table.get(query) {
            Some(hits) => Ok(hits.iter().take(max_results).cloned().collect()),
            None => bail!("MockSearch: no {kind} results registered for {query}"),
        }
    }
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for MockSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.stall().await;
        self.lookup(&self.web, "web", query, max_results)
    }

    async fn news(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.stall().await;
        self.lookup(&self.news, "news", query, max_results)
    }
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

pub struct MockSource {
    name: String,
    signals: Option<Vec<RawSignal>>,
    delay: Option<Duration>,
}

impl MockSource {
    pub fn new(name: &str, signals: Vec<RawSignal>) -> Self {
        Self {
            name: name.to_string(),
            signals: Some(signals),
            delay: None,
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            signals: None,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SignalSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawSignal>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.signals {
            Some(signals) => Ok(signals.clone()),
            None => bail!("MockSource {}: scripted failure", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

/// MemoryStore whose timeline writes and ad hoc completions fail.
/// Everything else is delegated.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn refuse<T>(what: &str) -> Result<T, StoreError> {
        Err(StoreError::Unavailable(format!("FailingStore refuses {what}")))
    }
}

#[async_trait]
impl CandidateStore for FailingStore {
    async fn create_crisis(&self, crisis: NewCrisis) -> Result<Crisis, StoreError> {
        self.inner.create_crisis(crisis).await
    }

    async fn get_crisis(&self, id: Uuid) -> Result<Option<Crisis>, StoreError> {
        self.inner.get_crisis(id).await
    }

    async fn list_crises(&self, limit: usize) -> Result<Vec<Crisis>, StoreError> {
        self.inner.list_crises(limit).await
    }

    async fn find_crisis_by_fuzzy_name(&self, name: &str) -> Result<Option<Crisis>, StoreError> {
        self.inner.find_crisis_by_fuzzy_name(name).await
    }

    async fn update_crisis_verdict(
        &self,
        id: Uuid,
        verdict: CrisisVerdict,
        summary: &str,
    ) -> Result<bool, StoreError> {
        self.inner.update_crisis_verdict(id, verdict, summary).await
    }

    async fn delete_crisis(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_crisis(id).await
    }

    async fn delete_crises_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.delete_crises_older_than(cutoff).await
    }

    async fn create_timeline_item(&self, _item: NewTimelineItem) -> Result<TimelineItem, StoreError> {
        Self::refuse("create_timeline_item")
    }

    async fn get_timeline_item(&self, id: Uuid) -> Result<Option<TimelineItem>, StoreError> {
        self.inner.get_timeline_item(id).await
    }

    async fn get_timeline_item_by_claim(
        &self,
        claim_text: &str,
    ) -> Result<Option<TimelineItem>, StoreError> {
        self.inner.get_timeline_item_by_claim(claim_text).await
    }

    async fn timeline_items_for_crisis(
        &self,
        crisis_id: Uuid,
    ) -> Result<Vec<TimelineItem>, StoreError> {
        self.inner.timeline_items_for_crisis(crisis_id).await
    }

    async fn update_timeline_item(&self, _id: Uuid, _verdict: &Verdict) -> Result<bool, StoreError> {
        Self::refuse("update_timeline_item")
    }

    async fn unconfirmed_timeline_items(&self, limit: usize) -> Result<Vec<TimelineItem>, StoreError> {
        self.inner.unconfirmed_timeline_items(limit).await
    }

    async fn delete_stale_unconfirmed(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.delete_stale_unconfirmed(cutoff).await
    }

    async fn create_adhoc_analysis(&self, query_text: &str) -> Result<AdhocAnalysis, StoreError> {
        self.inner.create_adhoc_analysis(query_text).await
    }

    async fn get_adhoc_analysis(&self, id: Uuid) -> Result<Option<AdhocAnalysis>, StoreError> {
        self.inner.get_adhoc_analysis(id).await
    }

    async fn update_adhoc_analysis(
        &self,
        id: Uuid,
        status: AnalysisStatus,
        verdict: Option<&Verdict>,
    ) -> Result<bool, StoreError> {
        if status == AnalysisStatus::Completed {
            return Self::refuse("update_adhoc_analysis(COMPLETED)");
        }
        self.inner.update_adhoc_analysis(id, status, verdict).await
    }

    async fn delete_adhoc_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.delete_adhoc_older_than(cutoff).await
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, StoreError> {
        self.inner.create_notification(notification).await
    }

    async fn latest_notification(&self) -> Result<Option<Notification>, StoreError> {
        self.inner.latest_notification().await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Settings with second-scale timeouts so paused-clock tests stay readable.
pub fn test_settings() -> ScannerSettings {
    ScannerSettings {
        gather_timeout: Duration::from_secs(20),
        oracle_timeout: Duration::from_secs(30),
        source_timeout: Duration::from_secs(30),
        relevance_keywords: vec!["flood".into(), "hoax".into(), "collapse".into(), "leak".into()],
        ..ScannerSettings::default()
    }
}

/// A crisis row with the given age, ready for `MemoryStore::insert_crisis`.
pub fn crisis_fixture(name: &str, severity: i32, age: chrono::Duration) -> Crisis {
    let at = Utc::now() - age;
    Crisis {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: format!("{name} reported"),
        keywords: name.to_string(),
        severity,
        location: "Mumbai".to_string(),
        verdict_status: CrisisVerdict::Pending,
        verdict_summary: None,
        created_at: at,
        updated_at: at,
    }
}

pub fn timeline_fixture(
    crisis_id: Option<Uuid>,
    claim: &str,
    status: VerificationStatus,
    age: chrono::Duration,
) -> TimelineItem {
    TimelineItem {
        id: Uuid::new_v4(),
        crisis_id,
        claim_text: claim.to_string(),
        status,
        summary: format!("{status} summary"),
        location: Some("Mumbai".to_string()),
        sources: Vec::new(),
        timestamp: Utc::now() - age,
    }
}

pub fn signal(title: &str, description: &str, url: &str) -> RawSignal {
    RawSignal {
        title: title.to_string(),
        description: description.to_string(),
        url: url.to_string(),
        source_name: "Test Wire".to_string(),
        published_at: Some(Utc::now()),
    }
}

pub fn hit(category: EvidenceCategory, title: &str) -> Evidence {
    Evidence::hit(
        category,
        format!("https://{category}.example/{}", title.replace(' ', "-")),
        title,
        format!("{title} (snippet)"),
        0.9,
    )
}
