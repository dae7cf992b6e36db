//! Structured outputs requested from the reasoning oracle.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use sentinel_common::{CrisisVerdict, SourceRef, Verdict, VerificationStatus};

/// A broadened search query produced during refinement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BroadenedQuery {
    /// Core event phrase with numbers, dates and other specifics removed.
    pub query: String,
}

/// Verdict for a single claim given the gathered evidence.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClaimVerdict {
    pub status: VerificationStatus,
    /// One or two sentences explaining the verdict.
    pub summary: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

impl From<ClaimVerdict> for Verdict {
    fn from(v: ClaimVerdict) -> Self {
        Verdict {
            status: v.status,
            summary: v.summary,
            sources: v.sources,
        }
    }
}

/// The master verdicts a conclusion may reach. A crisis never goes back to PENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MasterVerdict {
    #[serde(rename = "CATASTROPHIC EMERGENCY")]
    CatastrophicEmergency,
    #[serde(rename = "LETHAL MISINFORMATION")]
    LethalMisinformation,
    #[serde(rename = "CONFIRMED SITUATION")]
    ConfirmedSituation,
    #[serde(rename = "DEVELOPING NARRATIVE")]
    DevelopingNarrative,
}

impl From<MasterVerdict> for CrisisVerdict {
    fn from(v: MasterVerdict) -> Self {
        match v {
            MasterVerdict::CatastrophicEmergency => CrisisVerdict::CatastrophicEmergency,
            MasterVerdict::LethalMisinformation => CrisisVerdict::LethalMisinformation,
            MasterVerdict::ConfirmedSituation => CrisisVerdict::ConfirmedSituation,
            MasterVerdict::DevelopingNarrative => CrisisVerdict::DevelopingNarrative,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CrisisConclusion {
    pub verdict: MasterVerdict,
    /// Public-facing summary of the narrative as a whole.
    pub summary: String,
}

/// One candidate crisis proposed from the discovery digest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CrisisDraft {
    /// Short title, e.g. "Rumor: Bio-Leak in Hyderabad".
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Comma-separated search keywords.
    #[serde(default)]
    pub keywords: String,
    /// 90-100 lethal, 70-89 dangerous, 50-69 disruptive.
    pub severity: i64,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThreatAssessment {
    #[serde(default)]
    pub crises: Vec<CrisisDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkingSetSelection {
    #[serde(default)]
    pub selected_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClaimDraft {
    pub text: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClaimExtraction {
    #[serde(default)]
    pub claims: Vec<ClaimDraft>,
}
