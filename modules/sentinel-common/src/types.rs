use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_SEVERITY: i32 = 0;
pub const MAX_SEVERITY: i32 = 100;

/// Location used when neither the signal nor the oracle could pin one down.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// Clamp any oracle- or user-supplied severity into `[0, 100]`.
pub fn clamp_severity(raw: i64) -> i32 {
    raw.clamp(MIN_SEVERITY as i64, MAX_SEVERITY as i64) as i32
}

// --- Verification Status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Verified,
    Debunked,
    Unconfirmed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::Debunked => "DEBUNKED",
            VerificationStatus::Unconfirmed => "UNCONFIRMED",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VERIFIED" => Ok(Self::Verified),
            "DEBUNKED" => Ok(Self::Debunked),
            "UNCONFIRMED" => Ok(Self::Unconfirmed),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

// --- Ad hoc analysis status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "PENDING",
            AnalysisStatus::Processing => "PROCESSING",
            AnalysisStatus::Completed => "COMPLETED",
            AnalysisStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown analysis status: {other}")),
        }
    }
}

// --- Crisis master verdict ---

/// The aggregate verdict written onto a Crisis by the conclusion synthesizer.
/// `Pending` is the state of a freshly discovered crisis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CrisisVerdict {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "CATASTROPHIC EMERGENCY")]
    CatastrophicEmergency,
    #[serde(rename = "LETHAL MISINFORMATION")]
    LethalMisinformation,
    #[serde(rename = "CONFIRMED SITUATION")]
    ConfirmedSituation,
    #[serde(rename = "DEVELOPING NARRATIVE")]
    DevelopingNarrative,
}

impl CrisisVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrisisVerdict::Pending => "PENDING",
            CrisisVerdict::CatastrophicEmergency => "CATASTROPHIC EMERGENCY",
            CrisisVerdict::LethalMisinformation => "LETHAL MISINFORMATION",
            CrisisVerdict::ConfirmedSituation => "CONFIRMED SITUATION",
            CrisisVerdict::DevelopingNarrative => "DEVELOPING NARRATIVE",
        }
    }
}

impl fmt::Display for CrisisVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrisisVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('_', " ");
        match normalized.as_str() {
            "PENDING" => Ok(Self::Pending),
            "CATASTROPHIC EMERGENCY" => Ok(Self::CatastrophicEmergency),
            "LETHAL MISINFORMATION" => Ok(Self::LethalMisinformation),
            "CONFIRMED SITUATION" => Ok(Self::ConfirmedSituation),
            "DEVELOPING NARRATIVE" => Ok(Self::DevelopingNarrative),
            other => Err(format!("unknown crisis verdict: {other}")),
        }
    }
}

// --- Crisis ---

/// A clustered candidate threat or rumor narrative tracked over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crisis {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Comma-separated search keywords.
    pub keywords: String,
    /// Always within `[0, 100]`.
    pub severity: i32,
    pub location: String,
    pub verdict_status: CrisisVerdict,
    pub verdict_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Crisis {
    /// Case-insensitive substring match in either direction.
    pub fn name_matches(&self, candidate: &str) -> bool {
        let ours = self.name.to_lowercase();
        let theirs = candidate.trim().to_lowercase();
        if ours.is_empty() || theirs.is_empty() {
            return false;
        }
        ours.contains(&theirs) || theirs.contains(&ours)
    }
}

/// Fields needed to create a Crisis. Severity is clamped on construction.
#[derive(Debug, Clone)]
pub struct NewCrisis {
    pub name: String,
    pub description: String,
    pub keywords: String,
    pub severity: i32,
    pub location: String,
}

impl NewCrisis {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        keywords: impl Into<String>,
        severity: i64,
        location: Option<String>,
    ) -> Self {
        let name = name.into();
        let keywords = keywords.into();
        Self {
            keywords: if keywords.trim().is_empty() {
                name.clone()
            } else {
                keywords
            },
            name,
            description: description.into(),
            severity: clamp_severity(severity),
            location: location
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        }
    }
}

pub const INITIAL_VERDICT_SUMMARY: &str =
    "Initial assessment in progress. Claims are being aggregated.";

// --- Sources & verdicts ---

/// One citation attached to a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceRef {
    pub url: String,
    pub source_name: String,
    /// "official", "media", "fact_check", or "system".
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub date_published: Option<String>,
}

/// Outcome of one Verification Run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerificationStatus,
    pub summary: String,
    pub sources: Vec<SourceRef>,
}

pub const FALLBACK_VERDICT_SUMMARY: &str =
    "Automated analysis could not reach a verdict from the available evidence.";

impl Verdict {
    /// Conservative default used whenever the oracle cannot produce a verdict.
    pub fn unconfirmed_fallback() -> Self {
        Self {
            status: VerificationStatus::Unconfirmed,
            summary: FALLBACK_VERDICT_SUMMARY.to_string(),
            sources: Vec::new(),
        }
    }
}

// --- Timeline ---

/// One verified/debunked/unconfirmed claim. `claim_text` is globally unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: Uuid,
    pub crisis_id: Option<Uuid>,
    pub claim_text: String,
    pub status: VerificationStatus,
    pub summary: String,
    pub location: Option<String>,
    pub sources: Vec<SourceRef>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTimelineItem {
    pub crisis_id: Option<Uuid>,
    pub claim_text: String,
    pub status: VerificationStatus,
    pub summary: String,
    pub location: Option<String>,
    pub sources: Vec<SourceRef>,
}

impl NewTimelineItem {
    pub fn from_verdict(
        crisis_id: Option<Uuid>,
        claim_text: impl Into<String>,
        location: Option<String>,
        verdict: &Verdict,
    ) -> Self {
        Self {
            crisis_id,
            claim_text: claim_text.into(),
            status: verdict.status,
            summary: verdict.summary.clone(),
            location,
            sources: verdict.sources.clone(),
        }
    }
}

// --- Ad hoc analysis ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdhocAnalysis {
    pub id: Uuid,
    pub query_text: String,
    pub status: AnalysisStatus,
    pub verdict_status: Option<VerificationStatus>,
    pub verdict_summary: Option<String>,
    pub verdict_sources: Option<Vec<SourceRef>>,
    pub created_at: DateTime<Utc>,
}

// --- Notifications ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    CatastrophicAlert,
    MisinfoAlert,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::CatastrophicAlert => "CATASTROPHIC_ALERT",
            NotificationType::MisinfoAlert => "MISINFO_ALERT",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CATASTROPHIC_ALERT" => Ok(Self::CatastrophicAlert),
            "MISINFO_ALERT" => Ok(Self::MisinfoAlert),
            other => Err(format!("unknown notification type: {other}")),
        }
    }
}

/// Append-only system notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub content: String,
    pub notification_type: NotificationType,
    pub crisis_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub content: String,
    pub notification_type: NotificationType,
    pub crisis_id: Option<Uuid>,
}

// --- Evidence ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    Official,
    Media,
    Debunk,
}

impl EvidenceCategory {
    pub const ALL: [EvidenceCategory; 3] = [
        EvidenceCategory::Official,
        EvidenceCategory::Media,
        EvidenceCategory::Debunk,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EvidenceCategory::Official => "Official Sources",
            EvidenceCategory::Media => "Media Reports",
            EvidenceCategory::Debunk => "Fact Checks",
        }
    }
}

impl fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceCategory::Official => write!(f, "official"),
            EvidenceCategory::Media => write!(f, "media"),
            EvidenceCategory::Debunk => write!(f, "debunk"),
        }
    }
}

/// One retrieved source snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub category: EvidenceCategory,
    pub source_url: String,
    pub title: String,
    pub snippet: String,
    pub published_date: Option<DateTime<Utc>>,
    /// Always within `[0, 1]`.
    pub confidence: f32,
    /// A "nothing found" report from the source rather than a hit.
    pub negative: bool,
}

impl Evidence {
    pub fn hit(
        category: EvidenceCategory,
        source_url: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            category,
            source_url: source_url.into(),
            title: title.into(),
            snippet: snippet.into(),
            published_date: None,
            confidence: confidence.clamp(0.0, 1.0),
            negative: false,
        }
    }

    pub fn negative_marker(
        category: EvidenceCategory,
        source_url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            category,
            source_url: source_url.into(),
            title: title.into(),
            snippet: String::new(),
            published_date: None,
            confidence: 0.0,
            negative: true,
        }
    }

    pub fn with_published(mut self, published: Option<DateTime<Utc>>) -> Self {
        self.published_date = published;
        self
    }

    pub fn is_substantive(&self) -> bool {
        !self.negative
    }
}

// --- Raw signals ---

/// One item pulled from a signal source during discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    pub title: String,
    pub description: String,
    pub url: String,
    pub source_name: String,
    pub published_at: Option<DateTime<Utc>>,
}
