// Per-claim verification: gather from three independent sources, check
// sufficiency, broaden the query once if nothing turned up, then ask the
// oracle for a verdict and persist it against the associated target.

pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use sentinel_common::{
    AnalysisStatus, Evidence, EvidenceCategory, NewTimelineItem, ScannerSettings, Verdict,
};
use sentinel_oracle::{infer, Oracle};
use sentinel_store::{CandidateStore, StoreError};

use crate::conclusion::ConclusionSynthesizer;
use crate::fanout::fan_out;
use crate::gatherers::{gather_within, GathererSet};
use crate::shapes::{BroadenedQuery, ClaimVerdict};
use state::{assess, transition, RunStatus, Step, StepOutput, VerificationRun};

const REFINE_SYSTEM: &str = "You rewrite fact-checking search queries. \
Strip numbers, dates, times and other specifics. Keep the core event phrase \
and the place. Return a single short query.";

const VERDICT_SYSTEM: &str = "You are the chief verification officer of a \
crisis misinformation desk. Judge the claim using ONLY the evidence provided.\n\
- VERIFIED only if official sources confirm it.\n\
- DEBUNKED if official sources deny it or a fact-check refutes it.\n\
- UNCONFIRMED if the evidence is weak, missing or conflicting.\n\
Cite the sources you relied on.";

/// Where a run's verdict is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    Adhoc(Uuid),
    TimelineItem(Uuid),
    Crisis(Uuid),
    None,
}

impl Association {
    /// Pick the single target by priority: ad hoc > timeline item > crisis.
    pub fn from_targets(
        adhoc_id: Option<Uuid>,
        timeline_item_id: Option<Uuid>,
        crisis_id: Option<Uuid>,
    ) -> Self {
        match (adhoc_id, timeline_item_id, crisis_id) {
            (Some(id), _, _) => Association::Adhoc(id),
            (None, Some(id), _) => Association::TimelineItem(id),
            (None, None, Some(id)) => Association::Crisis(id),
            (None, None, None) => Association::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub claim_text: String,
    pub location: Option<String>,
    pub association: Association,
}

impl ClaimRequest {
    pub fn new(claim_text: impl Into<String>) -> Self {
        Self {
            claim_text: claim_text.into(),
            location: None,
            association: Association::None,
        }
    }

    pub fn located(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn for_crisis(mut self, crisis_id: Uuid) -> Self {
        self.association = Association::Crisis(crisis_id);
        self
    }

    pub fn for_timeline_item(mut self, item_id: Uuid) -> Self {
        self.association = Association::TimelineItem(item_id);
        self
    }

    pub fn for_adhoc(mut self, analysis_id: Uuid) -> Self {
        self.association = Association::Adhoc(analysis_id);
        self
    }
}

/// What happened to the verdict after synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Adhoc(Uuid),
    TimelineItem(Uuid),
    /// The associated target no longer exists.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub claim_text: String,
    pub final_query: String,
    pub verdict: Verdict,
    pub retries: u32,
    pub gather_calls: u32,
    pub persisted: Persisted,
}

#[derive(Clone)]
pub struct Verifier {
    store: Arc<dyn CandidateStore>,
    oracle: Arc<dyn Oracle>,
    gatherers: GathererSet,
    conclusions: ConclusionSynthesizer,
    max_retries: u32,
    gather_timeout: Duration,
    oracle_timeout: Duration,
}

impl Verifier {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        oracle: Arc<dyn Oracle>,
        gatherers: GathererSet,
        settings: &ScannerSettings,
    ) -> Self {
        Self {
            conclusions: ConclusionSynthesizer::new(
                store.clone(),
                oracle.clone(),
                settings.oracle_timeout,
            ),
            store,
            oracle,
            gatherers,
            max_retries: settings.max_verification_retries,
            gather_timeout: settings.gather_timeout,
            oracle_timeout: settings.oracle_timeout,
        }
    }

    pub fn conclusions(&self) -> &ConclusionSynthesizer {
        &self.conclusions
    }

    /// Run the state machine to completion and persist the verdict.
    ///
    /// Gatherer and oracle failures are absorbed; only store errors surface.
    /// A crisis-associated run whose crisis is gone does no work and persists
    /// nothing.
    pub async fn verify(&self, request: ClaimRequest) -> Result<VerificationReport, StoreError> {
        if let Association::Crisis(crisis_id) = request.association {
            if self.store.get_crisis(crisis_id).await?.is_none() {
                debug!(%crisis_id, claim = %request.claim_text, "Crisis gone, skipping verification");
                return Ok(VerificationReport {
                    claim_text: request.claim_text.clone(),
                    final_query: request.claim_text,
                    verdict: Verdict::unconfirmed_fallback(),
                    retries: 0,
                    gather_calls: 0,
                    persisted: Persisted::Skipped,
                });
            }
        }

        let (run, gather_calls) = self.execute(&request).await;
        let verdict = run.verdict.clone().unwrap_or_else(Verdict::unconfirmed_fallback);

        info!(
            claim = %request.claim_text,
            status = %verdict.status,
            retries = run.retry_count,
            gather_calls,
            "Verification complete"
        );

        let persisted = match self.persist(&request, &verdict).await {
            Ok(p) => p,
            Err(e) => {
                if let Association::Adhoc(id) = request.association {
                    self.mark_failed(id).await;
                }
                return Err(e);
            }
        };

        Ok(VerificationReport {
            claim_text: run.claim_text,
            final_query: run.current_query,
            verdict,
            retries: run.retry_count,
            gather_calls,
            persisted,
        })
    }

    /// Create an ad hoc analysis for `query`, verify it, and record the outcome.
    pub async fn verify_adhoc(
        &self,
        query: &str,
        location: Option<String>,
    ) -> Result<(Uuid, VerificationReport), StoreError> {
        let analysis = self.store.create_adhoc_analysis(query).await?;
        if let Err(e) = self
            .store
            .update_adhoc_analysis(analysis.id, AnalysisStatus::Processing, None)
            .await
        {
            self.mark_failed(analysis.id).await;
            return Err(e);
        }

        let report = self
            .verify(ClaimRequest::new(query).located(location).for_adhoc(analysis.id))
            .await?;
        Ok((analysis.id, report))
    }

    async fn mark_failed(&self, analysis_id: Uuid) {
        if let Err(e) = self
            .store
            .update_adhoc_analysis(analysis_id, AnalysisStatus::Failed, None)
            .await
        {
            warn!(%analysis_id, error = %e, "Failed to mark ad hoc analysis as FAILED");
        }
    }

    /// Drive the frontier until it empties. Returns the finished run and the
    /// number of gatherer invocations made.
    async fn execute(&self, request: &ClaimRequest) -> (VerificationRun, u32) {
        let mut run = VerificationRun::new(&request.claim_text, request.location.clone());
        let mut frontier = vec![Step::Start];
        let mut gather_calls = 0u32;

        while !frontier.is_empty() {
            gather_calls += frontier
                .iter()
                .filter(|s| matches!(s, Step::Gather(_)))
                .count() as u32;
            if let Some(step) = frontier.first() {
                run.status = RunStatus::from(*step);
            }

            let outputs = fan_out(frontier.iter().copied(), |step| self.step(step, &run)).await;
            for output in outputs {
                run.apply(output);
            }

            let mut next: Vec<Step> = Vec::new();
            for step in &frontier {
                for s in transition(*step, run.last_assessment) {
                    if !next.contains(&s) {
                        next.push(s);
                    }
                }
            }
            frontier = next;
        }

        run.status = RunStatus::Done;
        (run, gather_calls)
    }

    async fn step(&self, step: Step, run: &VerificationRun) -> StepOutput {
        match step {
            Step::Start | Step::Done => StepOutput::Nothing,
            Step::Gather(category) => {
                let gatherer = self.gatherers.get(category);
                let evidence =
                    gather_within(gatherer.as_ref(), &run.current_query, self.gather_timeout).await;
                debug!(%category, query = %run.current_query, found = evidence.len(), "Gathered");
                StepOutput::Evidence(category, evidence)
            }
            Step::Assess => {
                StepOutput::Assessed(assess(&run.evidence, run.retry_count, self.max_retries))
            }
            Step::Refine => StepOutput::Refined(self.broaden(&run.current_query).await),
            Step::Synthesize => StepOutput::Verdict(self.synthesize(run).await),
        }
    }

    async fn broaden(&self, query: &str) -> Option<String> {
        let prompt = format!("Original query: \"{query}\"\nReturn the broadened query.");
        match infer::<BroadenedQuery>(self.oracle.as_ref(), self.oracle_timeout, REFINE_SYSTEM, prompt)
            .await
        {
            Ok(b) => {
                info!(from = query, to = %b.query, "Query broadened");
                Some(b.query)
            }
            Err(e) => {
                warn!(query, error = %e, "Query refinement failed, keeping query");
                None
            }
        }
    }

    async fn synthesize(&self, run: &VerificationRun) -> Verdict {
        let prompt = verdict_prompt(run);
        match infer::<ClaimVerdict>(self.oracle.as_ref(), self.oracle_timeout, VERDICT_SYSTEM, prompt)
            .await
        {
            Ok(v) => v.into(),
            Err(e) => {
                warn!(claim = %run.claim_text, error = %e, "Verdict synthesis failed, defaulting to UNCONFIRMED");
                Verdict::unconfirmed_fallback()
            }
        }
    }

    async fn persist(
        &self,
        request: &ClaimRequest,
        verdict: &Verdict,
    ) -> Result<Persisted, StoreError> {
        match request.association {
            Association::Adhoc(id) => {
                let found = self
                    .store
                    .update_adhoc_analysis(id, AnalysisStatus::Completed, Some(verdict))
                    .await?;
                Ok(if found { Persisted::Adhoc(id) } else { Persisted::Skipped })
            }
            Association::TimelineItem(id) => {
                if self.store.update_timeline_item(id, verdict).await? {
                    Ok(Persisted::TimelineItem(id))
                } else {
                    debug!(item_id = %id, "Timeline item gone, verdict dropped");
                    Ok(Persisted::Skipped)
                }
            }
            Association::Crisis(crisis_id) => {
                if self.store.get_crisis(crisis_id).await?.is_none() {
                    debug!(%crisis_id, claim = %request.claim_text, "Crisis removed mid-run, verdict dropped");
                    return Ok(Persisted::Skipped);
                }
                let item = self
                    .store
                    .create_timeline_item(NewTimelineItem::from_verdict(
                        Some(crisis_id),
                        &request.claim_text,
                        request.location.clone(),
                        verdict,
                    ))
                    .await?;
                self.conclusions.conclude(crisis_id).await?;
                Ok(Persisted::TimelineItem(item.id))
            }
            Association::None => {
                let item = self
                    .store
                    .create_timeline_item(NewTimelineItem::from_verdict(
                        None,
                        &request.claim_text,
                        request.location.clone(),
                        verdict,
                    ))
                    .await?;
                Ok(Persisted::TimelineItem(item.id))
            }
        }
    }
}

fn format_evidence(items: &[Evidence]) -> String {
    if items.is_empty() {
        return "None".to_string();
    }
    items
        .iter()
        .map(|e| {
            if e.is_substantive() {
                format!(
                    "- {} ({}) [confidence {:.2}]: {}",
                    e.title, e.source_url, e.confidence, e.snippet
                )
            } else {
                format!("- No result: {}", e.title)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn verdict_prompt(run: &VerificationRun) -> String {
    let location = run.location.as_deref().unwrap_or("Unknown");
    let sections = EvidenceCategory::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{}. {}:\n{}",
                i + 1,
                c.label(),
                format_evidence(run.evidence_for(*c))
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("CLAIM: \"{}\"\nLOCATION: {location}\n\nEVIDENCE:\n{sections}", run.claim_text)
}
