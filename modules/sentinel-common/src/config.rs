use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::SentinelError;

/// Keyword set a raw signal's title + description must hit to count as relevant.
pub const DEFAULT_RELEVANCE_KEYWORDS: &[&str] = &[
    "disaster", "accident", "emergency", "collapse", "explosion", "riot", "earthquake", "flood",
    "tsunami", "virus", "outbreak", "leak", "bioweapon", "conspiracy", "coverup", "censored",
    "exposed", "fake", "hoax", "rumor", "forwarded", "viral", "whatsapp", "audio", "warning",
    "alert", "death", "killed", "lethal", "radioactive", "poison",
];

/// Fact-check outlets and disaster alert feeds.
pub const DEFAULT_FEEDS: &[&str] = &[
    // Fact checkers
    "https://www.altnews.in/feed/",
    "https://www.boomlive.in/feed/",
    "https://newschecker.in/feed/",
    "https://factly.in/feed/",
    "https://factcheck.afp.com/rss/all",
    "https://www.snopes.com/feed/",
    "https://checkyourfact.com/feed/",
    "https://healthfeedback.org/feed/",
    "https://fullfact.org/feed/all/",
    // Disaster alerts
    "https://sachet.ndma.gov.in/CapFeed/rss/all",
    "https://www.gdacs.org/xml/rss.xml",
];

/// Search queries used to listen for rumors spreading on social platforms.
pub const DEFAULT_SOCIAL_QUERIES: &[&str] = &[
    "\"forwarded as received\" site:twitter.com",
    "\"forward this message\" site:whatsapp.com",
    "\"media wont tell you\" site:twitter.com",
    "\"viral video\" \"shocking\" site:facebook.com",
    "\"leaked audio\" warning site:youtube.com",
    "\"government hiding\" disaster site:reddit.com",
    "\"urgent alert\" site:instagram.com",
    "\"don't go there\" site:twitter.com",
    "\"rumor has it\" site:twitter.com",
    "\"fake news\" alert site:twitter.com",
];

pub const DEFAULT_OFFICIAL_DOMAINS: &[&str] = &[
    "ndrf.gov.in",
    "mumbaipolice.gov.in",
    "pib.gov.in",
    "who.int",
    "imd.gov.in",
];

pub const DEFAULT_FACT_CHECK_DOMAINS: &[&str] = &["altnews.in", "boomlive.in", "snopes.com"];

pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Tuning knobs for the scanner. `Default` carries the production values.
#[derive(Debug, Clone)]
pub struct ScannerSettings {
    /// Total supervisor cycle length (T).
    pub cycle_period: Duration,
    /// Fixed discovery window (W).
    pub discovery_window: Duration,
    /// Slack subtracted from the deep-gathering budget.
    pub deep_gather_margin: Duration,
    pub inter_cycle_pause: Duration,
    /// Max concurrent crisis-scan units.
    pub deep_gather_concurrency: usize,
    pub high_risk_threshold: i32,
    pub high_risk_cooldown: Duration,
    /// Target working-set size (K).
    pub working_set_size: usize,
    pub catastrophic_slots: usize,
    pub rumor_slots: usize,
    pub selection_fetch_limit: usize,
    pub active_fetch_limit: usize,
    pub alert_severity_threshold: i32,
    pub discovery_cap: usize,
    pub max_verification_retries: u32,
    pub gather_timeout: Duration,
    pub oracle_timeout: Duration,
    pub source_timeout: Duration,
    pub idle_backoff: Duration,
    pub empty_set_backoff: Duration,
    pub batch_pause: Duration,
    pub relevance_keywords: Vec<String>,
    pub crisis_retention: Duration,
    pub adhoc_retention: Duration,
    pub unconfirmed_retention: Duration,
    pub reverify_batch_size: usize,
    pub shutdown_grace: Duration,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            cycle_period: Duration::from_secs(60 * 60),
            discovery_window: Duration::from_secs(2 * 60),
            deep_gather_margin: Duration::from_secs(30),
            inter_cycle_pause: Duration::from_secs(5),
            deep_gather_concurrency: 5,
            high_risk_threshold: 90,
            high_risk_cooldown: Duration::from_secs(120),
            working_set_size: 10,
            catastrophic_slots: 3,
            rumor_slots: 7,
            selection_fetch_limit: 100,
            active_fetch_limit: 20,
            alert_severity_threshold: 75,
            discovery_cap: 80,
            max_verification_retries: 1,
            gather_timeout: Duration::from_secs(20),
            oracle_timeout: Duration::from_secs(60),
            source_timeout: Duration::from_secs(60),
            idle_backoff: Duration::from_secs(5),
            empty_set_backoff: Duration::from_secs(10),
            batch_pause: Duration::from_secs(2),
            relevance_keywords: DEFAULT_RELEVANCE_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            crisis_retention: Duration::from_secs(3 * 24 * 60 * 60),
            adhoc_retention: Duration::from_secs(6 * 60 * 60),
            unconfirmed_retention: Duration::from_secs(48 * 60 * 60),
            reverify_batch_size: 10,
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

impl ScannerSettings {
    /// Time left for deep gathering once discovery and the margin are spent.
    pub fn deep_gather_budget(&self) -> Duration {
        self.cycle_period
            .saturating_sub(self.discovery_window)
            .saturating_sub(self.deep_gather_margin)
    }

    /// Overlay any `SENTINEL_*` overrides present in the environment.
    pub fn from_env() -> Result<Self, SentinelError> {
        let d = Self::default();
        Ok(Self {
            cycle_period: secs_env("SENTINEL_CYCLE_PERIOD_SECS", d.cycle_period)?,
            discovery_window: secs_env("SENTINEL_DISCOVERY_WINDOW_SECS", d.discovery_window)?,
            deep_gather_margin: secs_env("SENTINEL_DEEP_GATHER_MARGIN_SECS", d.deep_gather_margin)?,
            inter_cycle_pause: secs_env("SENTINEL_INTER_CYCLE_PAUSE_SECS", d.inter_cycle_pause)?,
            deep_gather_concurrency: parsed_env(
                "SENTINEL_DEEP_GATHER_CONCURRENCY",
                d.deep_gather_concurrency,
            )?
            .max(1),
            high_risk_threshold: parsed_env("SENTINEL_HIGH_RISK_THRESHOLD", d.high_risk_threshold)?,
            high_risk_cooldown: secs_env("SENTINEL_HIGH_RISK_COOLDOWN_SECS", d.high_risk_cooldown)?,
            working_set_size: parsed_env("SENTINEL_WORKING_SET_SIZE", d.working_set_size)?,
            catastrophic_slots: parsed_env("SENTINEL_CATASTROPHIC_SLOTS", d.catastrophic_slots)?,
            rumor_slots: parsed_env("SENTINEL_RUMOR_SLOTS", d.rumor_slots)?,
            selection_fetch_limit: parsed_env(
                "SENTINEL_SELECTION_FETCH_LIMIT",
                d.selection_fetch_limit,
            )?,
            active_fetch_limit: parsed_env("SENTINEL_ACTIVE_FETCH_LIMIT", d.active_fetch_limit)?,
            alert_severity_threshold: parsed_env(
                "SENTINEL_ALERT_SEVERITY_THRESHOLD",
                d.alert_severity_threshold,
            )?,
            discovery_cap: parsed_env("SENTINEL_DISCOVERY_CAP", d.discovery_cap)?,
            max_verification_retries: parsed_env(
                "SENTINEL_MAX_VERIFICATION_RETRIES",
                d.max_verification_retries,
            )?,
            gather_timeout: secs_env("SENTINEL_GATHER_TIMEOUT_SECS", d.gather_timeout)?,
            oracle_timeout: secs_env("SENTINEL_ORACLE_TIMEOUT_SECS", d.oracle_timeout)?,
            source_timeout: secs_env("SENTINEL_SOURCE_TIMEOUT_SECS", d.source_timeout)?,
            idle_backoff: d.idle_backoff,
            empty_set_backoff: d.empty_set_backoff,
            batch_pause: d.batch_pause,
            relevance_keywords: list_env("SENTINEL_RELEVANCE_KEYWORDS")
                .unwrap_or(d.relevance_keywords),
            crisis_retention: hours_env("SENTINEL_CRISIS_RETENTION_HOURS", d.crisis_retention)?,
            adhoc_retention: hours_env("SENTINEL_ADHOC_RETENTION_HOURS", d.adhoc_retention)?,
            unconfirmed_retention: hours_env(
                "SENTINEL_UNCONFIRMED_RETENTION_HOURS",
                d.unconfirmed_retention,
            )?,
            reverify_batch_size: parsed_env("SENTINEL_REVERIFY_BATCH_SIZE", d.reverify_batch_size)?,
            shutdown_grace: secs_env("SENTINEL_SHUTDOWN_GRACE_SECS", d.shutdown_grace)?,
        })
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres; when absent the binary falls back to an in-memory store.
    pub database_url: Option<String>,

    // Reasoning oracle
    pub anthropic_api_key: String,
    pub model: String,

    // Evidence + signal collaborators
    pub serper_api_key: String,
    pub news_api_key: Option<String>,
    pub feeds: Vec<String>,
    pub social_queries: Vec<String>,
    pub official_domains: Vec<String>,
    pub fact_check_domains: Vec<String>,

    pub scanner: ScannerSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, SentinelError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY")?,
            model: env::var("SENTINEL_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            serper_api_key: required_env("SERPER_API_KEY")?,
            news_api_key: env::var("NEWS_API_KEY").ok().filter(|v| !v.is_empty()),
            feeds: list_env("SENTINEL_FEEDS").unwrap_or_else(|| owned(DEFAULT_FEEDS)),
            social_queries: list_env("SENTINEL_SOCIAL_QUERIES")
                .unwrap_or_else(|| owned(DEFAULT_SOCIAL_QUERIES)),
            official_domains: list_env("SENTINEL_OFFICIAL_DOMAINS")
                .unwrap_or_else(|| owned(DEFAULT_OFFICIAL_DOMAINS)),
            fact_check_domains: list_env("SENTINEL_FACT_CHECK_DOMAINS")
                .unwrap_or_else(|| owned(DEFAULT_FACT_CHECK_DOMAINS)),
            scanner: ScannerSettings::from_env()?,
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            database = if self.database_url.is_some() { "postgres" } else { "in-memory" },
            anthropic_api_key = redact(&self.anthropic_api_key),
            model = self.model.as_str(),
            serper_api_key = redact(&self.serper_api_key),
            news_api_key = self.news_api_key.as_deref().map(redact).unwrap_or("<unset>"),
            feeds = self.feeds.len(),
            social_queries = self.social_queries.len(),
            cycle_period_secs = self.scanner.cycle_period.as_secs(),
            discovery_window_secs = self.scanner.discovery_window.as_secs(),
            deep_gather_concurrency = self.scanner.deep_gather_concurrency,
            working_set_size = self.scanner.working_set_size,
            "Configuration loaded"
        );
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn required_env(key: &str) -> Result<String, SentinelError> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SentinelError::Config(format!("{key} environment variable is required")))
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T, SentinelError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SentinelError::Config(format!("{key} must be a number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

fn secs_env(key: &str, default: Duration) -> Result<Duration, SentinelError> {
    parsed_env(key, default.as_secs()).map(Duration::from_secs)
}

fn hours_env(key: &str, default: Duration) -> Result<Duration, SentinelError> {
    parsed_env(key, default.as_secs() / 3600).and_then(|h| hours(key, h))
}

fn hours(key: &str, h: u64) -> Result<Duration, SentinelError> {
    h.checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| SentinelError::Config(format!("{key} is out of range, got {h} hours")))
}

fn list_env(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}
