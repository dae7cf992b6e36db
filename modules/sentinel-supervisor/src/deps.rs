use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use sentinel_common::{Config, ScannerSettings};
use sentinel_oracle::{ClaudeOracle, Oracle};
use sentinel_scout::gatherers::{DebunkGatherer, MediaGatherer, OfficialGatherer};
use sentinel_scout::{
    FeedSource, GathererSet, SearchBackend, SearchSignalSource, SerperSearch, SignalSource,
    Verifier,
};
use sentinel_store::{CandidateStore, MemoryStore, PgStore};

use crate::notify::{NotificationEmitter, StoreEmitter};

/// Long-lived collaborators shared by every supervisor phase.
#[derive(Clone, TypedBuilder)]
pub struct ScannerDeps {
    pub store: Arc<dyn CandidateStore>,
    pub oracle: Arc<dyn Oracle>,
    pub search: Arc<dyn SearchBackend>,
    pub gatherers: GathererSet,
    #[builder(default)]
    pub sources: Vec<Arc<dyn SignalSource>>,
    pub emitter: Arc<dyn NotificationEmitter>,
    #[builder(default)]
    pub settings: ScannerSettings,
}

impl ScannerDeps {
    /// Production wiring: Claude, Serper, NewsAPI, configured feeds.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = open_store(config.database_url.as_deref()).await?;
        let oracle: Arc<dyn Oracle> = Arc::new(
            ClaudeOracle::new(config.anthropic_api_key.clone(), config.model.clone())
                .context("Failed to build Claude oracle")?,
        );
        let search: Arc<dyn SearchBackend> = Arc::new(SerperSearch::new(&config.serper_api_key));

        let gatherers = GathererSet::new(
            Arc::new(OfficialGatherer::new(search.clone(), config.official_domains.clone())),
            Arc::new(MediaGatherer::new(config.news_api_key.clone())),
            Arc::new(DebunkGatherer::new(search.clone(), config.fact_check_domains.clone())),
        );

        let mut sources: Vec<Arc<dyn SignalSource>> = config
            .feeds
            .iter()
            .map(|url| Arc::new(FeedSource::new(url.clone())) as Arc<dyn SignalSource>)
            .collect();
        if !config.social_queries.is_empty() {
            sources.push(Arc::new(SearchSignalSource::new(
                search.clone(),
                config.social_queries.clone(),
            )));
        }

        Ok(Self::builder()
            .emitter(Arc::new(StoreEmitter::new(store.clone())) as Arc<dyn NotificationEmitter>)
            .store(store)
            .oracle(oracle)
            .search(search)
            .gatherers(gatherers)
            .sources(sources)
            .settings(config.scanner.clone())
            .build())
    }

    pub fn verifier(&self) -> Verifier {
        Verifier::new(
            self.store.clone(),
            self.oracle.clone(),
            self.gatherers.clone(),
            &self.settings,
        )
    }
}

/// Postgres when a URL is given (migrations applied), otherwise in-memory.
pub async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn CandidateStore>> {
    match database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .context("Failed to connect to Postgres")?;
            info!("Connected to Postgres");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store; nothing will persist");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
