// Discovery phase: pull raw signals from every source, keep the relevant
// ones, and let the oracle cluster them into new crises. Each new crisis is
// seeded with a placeholder timeline item and handed to a detached
// verification run.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use sentinel_common::{
    Crisis, NewCrisis, NewTimelineItem, RawSignal, ScannerSettings, SourceRef,
    VerificationStatus,
};
use sentinel_oracle::{infer, Oracle};
use sentinel_store::{CandidateStore, StoreError};

use crate::fanout::fan_out;
use crate::shapes::ThreatAssessment;
use crate::sources::SignalSource;
use crate::verification::{ClaimRequest, Verifier};

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

const DIGEST_DESCRIPTION_CHARS: usize = 100;
const WATCHDOG_SOURCE: &str = "Sentinel Watchdog";

/// Claim text prefix of the placeholder item seeded for each new crisis.
pub const SEED_CLAIM_PREFIX: &str = "Signal Detected: ";
const SEED_SUMMARY: &str = "Sentinel picked up this signal from web chatter. \
Automated verification agents have been deployed.";

const THREAT_SYSTEM: &str = "You are a misinformation threat intelligence \
analyst. From the headlines given, identify potential rumors and crises. \
Group headlines about the same event into one entry. Severity scoring: \
90-100 lethal (medical misinformation, riots, nuclear panic); 70-89 \
dangerous (fake accidents, collapse rumors); 50-69 disruptive.";

/// Keyword match against a signal's title and description.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    pattern: Option<Regex>,
}

impl RelevanceFilter {
    pub fn new(keywords: &[String]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = Regex::new(&format!("(?i)({})", alternatives.join("|")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn is_relevant(&self, signal: &RawSignal) -> bool {
        let Some(pattern) = &self.pattern else {
            return false;
        };
        pattern.is_match(&format!("{} {}", signal.title, signal.description))
    }
}

/// URL identity for de-duplication: fragment and trailing slash ignored.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match url::Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => trimmed
            .split('#')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
    }
}

/// Keep the first signal for each URL. Signals without a URL are all kept.
pub fn dedup_by_url(signals: Vec<RawSignal>) -> Vec<RawSignal> {
    let mut seen = HashSet::new();
    signals
        .into_iter()
        .filter(|s| {
            let key = normalize_url(&s.url);
            key.is_empty() || seen.insert(key)
        })
        .collect()
}

/// One digest line per signal: `- {title} ({source}): {description}...`
pub fn digest_line(signal: &RawSignal) -> String {
    let clean = HTML_TAG_RE.replace_all(&signal.description, "");
    let short: String = clean.trim().chars().take(DIGEST_DESCRIPTION_CHARS).collect();
    format!("- {} ({}): {}...", signal.title, signal.source_name, short)
}

fn seed_item(crisis: &Crisis) -> NewTimelineItem {
    NewTimelineItem {
        crisis_id: Some(crisis.id),
        claim_text: format!("{SEED_CLAIM_PREFIX}{}", crisis.name),
        status: VerificationStatus::Unconfirmed,
        summary: SEED_SUMMARY.to_string(),
        location: Some(crisis.location.clone()),
        sources: vec![SourceRef {
            url: "#".to_string(),
            source_name: WATCHDOG_SOURCE.to_string(),
            kind: "system".to_string(),
            date_published: None,
        }],
    }
}

#[derive(Debug, Default, Clone)]
pub struct DiscoveryReport {
    pub raw_signals: usize,
    pub unique_signals: usize,
    pub relevant_signals: usize,
    pub proposed: usize,
    pub duplicates_skipped: usize,
    pub new_crises: Vec<Crisis>,
}

pub struct Discovery {
    store: Arc<dyn CandidateStore>,
    oracle: Arc<dyn Oracle>,
    sources: Vec<Arc<dyn SignalSource>>,
    filter: RelevanceFilter,
    verifier: Verifier,
    tracker: TaskTracker,
    cap: usize,
    source_timeout: Duration,
    oracle_timeout: Duration,
}

impl Discovery {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        oracle: Arc<dyn Oracle>,
        sources: Vec<Arc<dyn SignalSource>>,
        verifier: Verifier,
        tracker: TaskTracker,
        settings: &ScannerSettings,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            store,
            oracle,
            sources,
            filter: RelevanceFilter::new(&settings.relevance_keywords)?,
            verifier,
            tracker,
            cap: settings.discovery_cap,
            source_timeout: settings.source_timeout,
            oracle_timeout: settings.oracle_timeout,
        })
    }

    /// Run one discovery pass. Only store errors are returned.
    pub async fn run(&self) -> Result<DiscoveryReport, StoreError> {
        let mut report = DiscoveryReport::default();

        let raw = self.collect().await;
        report.raw_signals = raw.len();

        let unique = dedup_by_url(raw);
        report.unique_signals = unique.len();

        let mut relevant: Vec<RawSignal> = unique
            .into_iter()
            .filter(|s| self.filter.is_relevant(s))
            .collect();
        report.relevant_signals = relevant.len();
        relevant.truncate(self.cap);

        info!(
            raw = report.raw_signals,
            unique = report.unique_signals,
            relevant = report.relevant_signals,
            "Discovery signals collected"
        );

        if relevant.is_empty() {
            info!("No relevant signals this cycle");
            return Ok(report);
        }

        let drafts = self.assess_threats(&relevant).await;
        report.proposed = drafts.crises.len();

        for draft in drafts.crises {
            let name = draft.name.trim();
            if name.is_empty() {
                continue;
            }
            if let Some(existing) = self.store.find_crisis_by_fuzzy_name(name).await? {
                debug!(candidate = name, existing = %existing.name, "Already tracked");
                report.duplicates_skipped += 1;
                continue;
            }

            let crisis = self
                .store
                .create_crisis(NewCrisis::new(
                    name,
                    draft.description.clone(),
                    draft.keywords.clone(),
                    draft.severity,
                    draft.location.clone(),
                ))
                .await?;
            self.store.create_timeline_item(seed_item(&crisis)).await?;

            info!(
                crisis_id = %crisis.id,
                crisis = %crisis.name,
                severity = crisis.severity,
                location = %crisis.location,
                "New crisis candidate"
            );

            self.spawn_verification(&crisis);
            report.new_crises.push(crisis);
        }

        Ok(report)
    }

    /// Poll every source concurrently; failures and timeouts are logged and skipped.
    async fn collect(&self) -> Vec<RawSignal> {
        let results = fan_out(self.sources.iter(), |source| async move {
            let outcome = tokio::time::timeout(self.source_timeout, source.fetch()).await;
            (source.name().to_string(), outcome)
        })
        .await;

        let mut signals = Vec::new();
        for (name, outcome) in results {
            match outcome {
                Ok(Ok(items)) => signals.extend(items),
                Ok(Err(e)) => warn!(source = %name, error = %e, "Signal source failed"),
                Err(_) => warn!(source = %name, "Signal source timed out"),
            }
        }
        signals
    }

    async fn assess_threats(&self, signals: &[RawSignal]) -> ThreatAssessment {
        let digest = signals.iter().map(digest_line).collect::<Vec<_>>().join("\n");
        let prompt = format!(
            "CURRENT DATE: {}\n\nHEADLINES:\n{digest}",
            Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
        match infer::<ThreatAssessment>(
            self.oracle.as_ref(),
            self.oracle_timeout,
            THREAT_SYSTEM,
            prompt,
        )
        .await
        {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(error = %e, "Threat assessment failed");
                ThreatAssessment { crises: Vec::new() }
            }
        }
    }

    /// Verify the crisis description in the background. Not awaited.
    fn spawn_verification(&self, crisis: &Crisis) {
        let claim = if crisis.description.trim().is_empty() {
            crisis.name.clone()
        } else {
            crisis.description.clone()
        };
        let request = ClaimRequest::new(claim)
            .located(Some(crisis.location.clone()))
            .for_crisis(crisis.id);
        let verifier = self.verifier.clone();
        let crisis_id = crisis.id;

        self.tracker.spawn(async move {
            match verifier.verify(request).await {
                Ok(report) => {
                    debug!(%crisis_id, status = %report.verdict.status, "Background verification finished")
                }
                Err(e) => warn!(%crisis_id, error = %e, "Background verification failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(title: &str, description: &str, url: &str) -> RawSignal {
        RawSignal {
            title: title.into(),
            description: description.into(),
            url: url.into(),
            source_name: "Wire".into(),
            published_at: None,
        }
    }

    #[test]
    fn relevance_is_case_insensitive_over_title_and_description() {
        let filter = RelevanceFilter::new(&["flood".into(), "hoax".into()]).unwrap();
        assert!(filter.is_relevant(&signal("FLOODING in Assam", "", "")));
        assert!(filter.is_relevant(&signal("Weekly roundup", "A viral hoax spreads", "")));
        assert!(!filter.is_relevant(&signal("Stock markets rally", "Sensex up", "")));
    }

    #[test]
    fn empty_keyword_set_matches_nothing() {
        let filter = RelevanceFilter::new(&[]).unwrap();
        assert!(!filter.is_relevant(&signal("flood", "flood", "")));
    }

    #[test]
    fn keywords_are_escaped() {
        let filter = RelevanceFilter::new(&["c++".into()]).unwrap();
        assert!(filter.is_relevant(&signal("c++ leak", "", "")));
        assert!(!filter.is_relevant(&signal("ccc", "", "")));
    }

    #[test]
    fn url_dedup_ignores_fragment_and_trailing_slash() {
        let signals = vec![
            signal("a", "", "https://news.example/story/"),
            signal("b", "", "https://news.example/story#comments"),
            signal("c", "", "https://news.example/other"),
            signal("d", "", ""),
            signal("e", "", ""),
        ];
        let titles: Vec<String> = dedup_by_url(signals).into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn digest_strips_html_and_truncates() {
        let long = format!("<p>{}</p>", "x".repeat(150));
        let line = digest_line(&signal("Dam burst", &long, "u"));
        assert_eq!(line, format!("- Dam burst (Wire): {}...", "x".repeat(100)));
    }
}
