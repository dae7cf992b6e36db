use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use sentinel_common::{Crisis, ScannerSettings};
use sentinel_scout::discovery::SEED_CLAIM_PREFIX;
use sentinel_scout::fanout::fan_out_bounded;
use sentinel_scout::{ClaimExtractor, ClaimRequest, DeepScanner, Discovery, Verifier};
use sentinel_store::CandidateStore;

use crate::deps::ScannerDeps;
use crate::notify::{alerts_for, NotificationEmitter};
use crate::retention::{self, RetentionPolicy};
use crate::scheduler::DeepGatherScheduler;
use crate::selection::Selector;
use crate::types::CycleStats;

/// The perpetual Discovery → Selection → Deep-Gathering cycle.
pub struct Supervisor {
    store: Arc<dyn CandidateStore>,
    discovery: Discovery,
    selector: Selector,
    scanner: DeepScanner,
    verifier: Verifier,
    emitter: Arc<dyn NotificationEmitter>,
    scheduler: DeepGatherScheduler,
    retention: RetentionPolicy,
    settings: ScannerSettings,
    cancel: CancellationToken,
    tracker: TaskTracker,
    first_cycle: bool,
}

impl Supervisor {
    pub fn new(deps: ScannerDeps, cancel: CancellationToken) -> Result<Self> {
        let settings = deps.settings.clone();
        let tracker = TaskTracker::new();
        let verifier = deps.verifier();

        let discovery = Discovery::new(
            deps.store.clone(),
            deps.oracle.clone(),
            deps.sources.clone(),
            verifier.clone(),
            tracker.clone(),
            &settings,
        )
        .context("Invalid relevance keywords")?;
        let scanner = DeepScanner::new(
            deps.store.clone(),
            deps.search.clone(),
            ClaimExtractor::new(deps.oracle.clone(), settings.oracle_timeout),
            verifier.clone(),
        );

        Ok(Self {
            selector: Selector::new(deps.store.clone(), deps.oracle.clone(), &settings),
            scheduler: DeepGatherScheduler::new(&settings),
            retention: RetentionPolicy::from_settings(&settings),
            store: deps.store,
            emitter: deps.emitter,
            discovery,
            scanner,
            verifier,
            settings,
            cancel,
            tracker,
            first_cycle: true,
        })
    }

    /// Background verification runs launched by discovery.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Run cycles until cancelled, then give background runs the grace period.
    pub async fn run(mut self) {
        info!(
            cycle_secs = self.settings.cycle_period.as_secs(),
            window_secs = self.settings.discovery_window.as_secs(),
            "Supervisor started"
        );
        while !self.cancel.is_cancelled() {
            let stats = self.run_cycle().await;
            info!("Cycle complete. {stats}");
            if !self.pause(self.settings.inter_cycle_pause).await {
                break;
            }
        }
        self.shutdown().await;
    }

    async fn shutdown(&self) {
        self.tracker.close();
        info!(pending = self.tracker.len(), "Supervisor stopping");
        if tokio::time::timeout(self.settings.shutdown_grace, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                pending = self.tracker.len(),
                "Shutdown grace elapsed, abandoning background verification"
            );
        }
    }

    /// One full cycle. Cancellation is honoured between phases and during sleeps.
    pub async fn run_cycle(&mut self) -> CycleStats {
        let mut stats = CycleStats::default();

        // Phase 1: discovery, padded to the full window
        let window_end = Instant::now() + self.settings.discovery_window;
        self.discover(&mut stats).await;
        if !self.pause_until(window_end).await {
            return stats;
        }

        // Phase 2: selection
        match self.selector.select().await {
            Ok(report) => {
                stats.crises_pruned = report.deleted;
                stats.selection_fallback = report.used_fallback;
            }
            Err(e) => warn!(error = %e, "Selection failed"),
        }
        if self.cancel.is_cancelled() {
            return stats;
        }

        // Phase 3: deep gathering for the rest of the cycle budget
        let deadline = Instant::now() + self.settings.deep_gather_budget();
        self.deep_gather(deadline, &mut stats).await;
        if self.cancel.is_cancelled() {
            return stats;
        }

        // Phase 4: housekeeping
        stats.sweep = retention::sweep(self.store.as_ref(), &self.retention, Utc::now()).await;
        stats.reverified = self.reverify().await;
        stats
    }

    async fn discover(&mut self, stats: &mut CycleStats) {
        match self.discovery.run().await {
            Ok(report) => {
                stats.signals_relevant = report.relevant_signals;
                stats.crises_created = report.new_crises.len();
                stats.notifications_sent = self.notify(&report.new_crises).await;
            }
            Err(e) => warn!(error = %e, "Discovery failed"),
        }
        self.first_cycle = false;
    }

    async fn notify(&self, new_crises: &[Crisis]) -> usize {
        let mut sent = 0;
        for alert in alerts_for(
            new_crises,
            self.first_cycle,
            self.settings.alert_severity_threshold,
        ) {
            match self
                .emitter
                .emit(&alert.content, alert.notification_type, alert.crisis_id)
                .await
            {
                Ok(()) => sent += 1,
                Err(e) => warn!(error = %e, content = %alert.content, "Failed to emit notification"),
            }
        }
        sent
    }

    async fn deep_gather(&mut self, deadline: Instant, stats: &mut CycleStats) {
        let ceiling = self.scheduler.ceiling();
        let hard_stop = deadline + self.settings.deep_gather_margin;

        while Instant::now() < deadline && !self.cancel.is_cancelled() {
            let active = match self.store.list_crises(self.settings.active_fetch_limit).await {
                Ok(active) => active,
                Err(e) => {
                    warn!(error = %e, "Failed to load active crises");
                    if !self.pause_within(self.settings.idle_backoff, deadline).await {
                        break;
                    }
                    continue;
                }
            };
            if active.is_empty() {
                debug!("No active crises to deep-scan");
                if !self.pause_within(self.settings.empty_set_backoff, deadline).await {
                    break;
                }
                continue;
            }

            self.scheduler.retain_active(&active);
            let now = Instant::now();
            let batch = self.scheduler.build_batch(&active, now);
            if batch.is_empty() {
                if !self.pause_within(self.settings.idle_backoff, deadline).await {
                    break;
                }
                continue;
            }
            self.scheduler.mark_dispatched(&batch, now);
            stats.batches_dispatched += 1;
            debug!(size = batch.len(), "Dispatching deep-scan batch");

            // the last batch may spill into the margin, never past it
            let scanner = &self.scanner;
            let batch_run: Pin<Box<dyn Future<Output = Vec<_>> + Send + '_>> =
                Box::pin(fan_out_bounded(batch.iter(), ceiling, |crisis| async move {
                    (crisis.id, scanner.scan(crisis.id).await)
                }));
            let Ok(results) = tokio::time::timeout_at(hard_stop, batch_run).await else {
                stats.scans_abandoned += batch.len();
                warn!(
                    size = batch.len(),
                    "Deep-gathering budget exhausted, abandoning in-flight scans"
                );
                break;
            };
            for (crisis_id, result) in results {
                match result {
                    Ok(report) => {
                        stats.scans_completed += 1;
                        stats.claims_verified += report.claims_verified;
                    }
                    Err(e) => {
                        stats.scans_failed += 1;
                        warn!(%crisis_id, error = %e, "Deep scan failed");
                    }
                }
            }

            if !self.pause_within(self.settings.batch_pause, deadline).await {
                break;
            }
        }
    }

    /// Re-run verification on the oldest UNCONFIRMED items, overwriting them in place.
    async fn reverify(&self) -> usize {
        let items = match self
            .store
            .unconfirmed_timeline_items(self.settings.reverify_batch_size)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to load unconfirmed items");
                return 0;
            }
        };

        let verifier = &self.verifier;
        let results: Pin<Box<dyn Future<Output = Vec<_>> + Send + '_>> = Box::pin(fan_out_bounded(items.iter(), self.scheduler.ceiling(), |item| async move {
            let claim = item
                .claim_text
                .strip_prefix(SEED_CLAIM_PREFIX)
                .unwrap_or(&item.claim_text);
            let request = ClaimRequest::new(claim)
                .located(item.location.clone())
                .for_timeline_item(item.id);
            (item.id, verifier.verify(request).await)
        }));
        let results = results.await;

        let mut done = 0;
        for (item_id, result) in results {
            match result {
                Ok(_) => done += 1,
                Err(e) => warn!(%item_id, error = %e, "Re-verification failed"),
            }
        }
        if done > 0 {
            info!(count = done, "Re-verified unconfirmed items");
        }
        done
    }

    async fn pause(&self, duration: Duration) -> bool {
        self.pause_until(Instant::now() + duration).await
    }

    /// Sleep for `duration`, cut short at `deadline`.
    async fn pause_within(&self, duration: Duration, deadline: Instant) -> bool {
        self.pause_until((Instant::now() + duration).min(deadline)).await
    }

    /// Returns false when cancelled before `until`.
    async fn pause_until(&self, until: Instant) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep_until(until) => true,
        }
    }
}
