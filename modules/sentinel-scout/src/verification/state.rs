//! Typed states and the pure transition function for one verification run.
//!
//! ```text
//! Start ─► Gather(official) ┐
//!          Gather(media)    ├─► Assess ─► Refine ─► Gather × 3 ...
//!          Gather(debunk)   ┘          └► Synthesize ─► Done
//! ```

use std::collections::BTreeMap;

use sentinel_common::{Evidence, EvidenceCategory, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Start,
    Gather(EvidenceCategory),
    Assess,
    Refine,
    Synthesize,
    Done,
}

/// Result of the sufficiency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// At least one substantive evidence item.
    Sufficient,
    /// Nothing substantive; a refinement round is still available.
    Insufficient,
    /// Nothing substantive and the retry budget is spent.
    Exhausted,
}

/// Next steps after `step` completes. Parallel gathers all lead to the same
/// `Assess`; the executor de-duplicates the frontier so it runs once.
pub fn transition(step: Step, assessment: Option<Assessment>) -> Vec<Step> {
    match step {
        Step::Start | Step::Refine => EvidenceCategory::ALL
            .iter()
            .map(|c| Step::Gather(*c))
            .collect(),
        Step::Gather(_) => vec![Step::Assess],
        Step::Assess => match assessment {
            Some(Assessment::Insufficient) => vec![Step::Refine],
            _ => vec![Step::Synthesize],
        },
        Step::Synthesize => vec![Step::Done],
        Step::Done => Vec::new(),
    }
}

/// Count substantive items and decide whether another gather round is due.
pub fn assess(
    evidence: &BTreeMap<EvidenceCategory, Vec<Evidence>>,
    retry_count: u32,
    max_retries: u32,
) -> Assessment {
    let substantive: usize = evidence
        .values()
        .map(|items| items.iter().filter(|e| e.is_substantive()).count())
        .sum();
    if substantive > 0 {
        Assessment::Sufficient
    } else if retry_count < max_retries {
        Assessment::Insufficient
    } else {
        Assessment::Exhausted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Gathering,
    Assessing,
    Refining,
    Synthesizing,
    Done,
}

impl From<Step> for RunStatus {
    fn from(step: Step) -> Self {
        match step {
            Step::Start => RunStatus::Pending,
            Step::Gather(_) => RunStatus::Gathering,
            Step::Assess => RunStatus::Assessing,
            Step::Refine => RunStatus::Refining,
            Step::Synthesize => RunStatus::Synthesizing,
            Step::Done => RunStatus::Done,
        }
    }
}

/// What executing a single step produced.
#[derive(Debug, Clone)]
pub enum StepOutput {
    Evidence(EvidenceCategory, Vec<Evidence>),
    Assessed(Assessment),
    /// Broadened query, or `None` when the oracle could not produce one.
    Refined(Option<String>),
    Verdict(Verdict),
    Nothing,
}

/// Ephemeral state of one verification run. Never persisted.
#[derive(Debug, Clone)]
pub struct VerificationRun {
    pub claim_text: String,
    pub current_query: String,
    pub location: Option<String>,
    pub evidence: BTreeMap<EvidenceCategory, Vec<Evidence>>,
    pub retry_count: u32,
    pub status: RunStatus,
    pub last_assessment: Option<Assessment>,
    pub verdict: Option<Verdict>,
}

impl VerificationRun {
    pub fn new(claim_text: impl Into<String>, location: Option<String>) -> Self {
        let claim_text = claim_text.into();
        Self {
            current_query: claim_text.clone(),
            claim_text,
            location,
            evidence: BTreeMap::new(),
            retry_count: 0,
            status: RunStatus::Pending,
            last_assessment: None,
            verdict: None,
        }
    }

    pub fn apply(&mut self, output: StepOutput) {
        match output {
            StepOutput::Evidence(category, items) => {
                self.evidence.insert(category, items);
            }
            StepOutput::Assessed(assessment) => {
                self.last_assessment = Some(assessment);
            }
            StepOutput::Refined(query) => {
                self.retry_count += 1;
                self.evidence.clear();
                if let Some(q) = query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()) {
                    self.current_query = q;
                }
            }
            StepOutput::Verdict(verdict) => {
                self.verdict = Some(verdict);
            }
            StepOutput::Nothing => {}
        }
    }

    pub fn evidence_for(&self, category: EvidenceCategory) -> &[Evidence] {
        self.evidence
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> Evidence {
        Evidence::negative_marker(
            EvidenceCategory::Official,
            "https://gov.example",
            "Gov Report: No floods detected.",
        )
    }

    #[test]
    fn start_and_refine_fan_out_to_all_gatherers() {
        for step in [Step::Start, Step::Refine] {
            let next = transition(step, None);
            assert_eq!(next.len(), 3);
            for c in EvidenceCategory::ALL {
                assert!(next.contains(&Step::Gather(c)));
            }
        }
    }

    #[test]
    fn assess_branches_on_assessment() {
        assert_eq!(
            transition(Step::Assess, Some(Assessment::Insufficient)),
            vec![Step::Refine]
        );
        assert_eq!(
            transition(Step::Assess, Some(Assessment::Exhausted)),
            vec![Step::Synthesize]
        );
        assert_eq!(
            transition(Step::Assess, Some(Assessment::Sufficient)),
            vec![Step::Synthesize]
        );
        assert_eq!(transition(Step::Synthesize, None), vec![Step::Done]);
        assert!(transition(Step::Done, None).is_empty());
    }

    #[test]
    fn negative_markers_are_not_substantive() {
        let mut evidence = BTreeMap::new();
        evidence.insert(EvidenceCategory::Official, vec![marker()]);
        evidence.insert(EvidenceCategory::Media, vec![]);
        assert_eq!(assess(&evidence, 0, 1), Assessment::Insufficient);
        assert_eq!(assess(&evidence, 1, 1), Assessment::Exhausted);

        evidence.insert(
            EvidenceCategory::Media,
            vec![Evidence::hit(EvidenceCategory::Media, "u", "t", "s", 0.9)],
        );
        assert_eq!(assess(&evidence, 0, 1), Assessment::Sufficient);
    }

    #[test]
    fn zero_retry_budget_never_refines() {
        assert_eq!(assess(&BTreeMap::new(), 0, 0), Assessment::Exhausted);
    }

    #[test]
    fn refinement_clears_evidence_and_always_counts() {
        let mut run = VerificationRun::new("Flood reported in Downtown at 4pm", None);
        run.apply(StepOutput::Evidence(EvidenceCategory::Official, vec![marker()]));

        run.apply(StepOutput::Refined(None));
        assert_eq!(run.retry_count, 1);
        assert!(run.evidence.is_empty());
        assert_eq!(run.current_query, "Flood reported in Downtown at 4pm");

        run.apply(StepOutput::Refined(Some("   ".into())));
        assert_eq!(run.current_query, "Flood reported in Downtown at 4pm");

        run.apply(StepOutput::Refined(Some("flood downtown".into())));
        assert_eq!(run.retry_count, 3);
        assert_eq!(run.current_query, "flood downtown");
    }
}
