//! Prunes the candidate set down to the working set of K crises.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use sentinel_common::{Crisis, ScannerSettings};
use sentinel_oracle::{infer, Oracle};
use sentinel_scout::shapes::WorkingSetSelection;
use sentinel_store::{CandidateStore, StoreError};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SelectionReport {
    pub candidates: usize,
    pub kept: Vec<Uuid>,
    pub deleted: usize,
    pub used_fallback: bool,
}

/// Highest severity first; ties keep fetch order.
pub fn fallback_selection(candidates: &[Crisis], k: usize) -> Vec<Uuid> {
    let mut ranked: Vec<&Crisis> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.severity.cmp(&a.severity));
    ranked.into_iter().take(k).map(|c| c.id).collect()
}

/// Turn the oracle's picks into exactly `min(k, candidates)` ids: unknown and
/// repeated ids are dropped, extras truncated, and any shortfall topped up by
/// severity. Returns `None` when none of the picks were usable.
pub fn reconcile(candidates: &[Crisis], picks: &[String], k: usize) -> Option<Vec<Uuid>> {
    let known: HashSet<Uuid> = candidates.iter().map(|c| c.id).collect();
    let mut chosen: Vec<Uuid> = Vec::new();
    for pick in picks {
        let Ok(id) = Uuid::parse_str(pick.trim()) else {
            continue;
        };
        if known.contains(&id) && !chosen.contains(&id) {
            chosen.push(id);
        }
    }
    if chosen.is_empty() {
        return None;
    }
    chosen.truncate(k);

    if chosen.len() < k {
        for id in fallback_selection(candidates, candidates.len()) {
            if chosen.len() == k {
                break;
            }
            if !chosen.contains(&id) {
                chosen.push(id);
            }
        }
    }
    Some(chosen)
}

pub struct Selector {
    store: Arc<dyn CandidateStore>,
    oracle: Arc<dyn Oracle>,
    working_set_size: usize,
    catastrophic_slots: usize,
    rumor_slots: usize,
    fetch_limit: usize,
    oracle_timeout: Duration,
}

impl Selector {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        oracle: Arc<dyn Oracle>,
        settings: &ScannerSettings,
    ) -> Self {
        Self {
            store,
            oracle,
            working_set_size: settings.working_set_size,
            catastrophic_slots: settings.catastrophic_slots,
            rumor_slots: settings.rumor_slots,
            fetch_limit: settings.selection_fetch_limit,
            oracle_timeout: settings.oracle_timeout,
        }
    }

    /// Keep at most K crises and delete the rest.
    pub async fn select(&self) -> Result<SelectionReport, StoreError> {
        let k = self.working_set_size;
        let candidates = self.store.list_crises(self.fetch_limit.max(k + 1)).await?;
        let mut report = SelectionReport {
            candidates: candidates.len(),
            ..Default::default()
        };

        if candidates.len() <= k {
            report.kept = candidates.iter().map(|c| c.id).collect();
            return Ok(report);
        }

        let kept = match self.ask_oracle(&candidates).await {
            Some(kept) => kept,
            None => {
                report.used_fallback = true;
                fallback_selection(&candidates, k)
            }
        };

        for crisis in candidates.iter().filter(|c| !kept.contains(&c.id)) {
            if self.store.delete_crisis(crisis.id).await? {
                report.deleted += 1;
            }
        }
        report.deleted += self.delete_beyond_window(&kept).await?;

        info!(
            candidates = report.candidates,
            kept = kept.len(),
            deleted = report.deleted,
            fallback = report.used_fallback,
            "Working set selected"
        );
        report.kept = kept;
        Ok(report)
    }

    /// Rows past the fetch limit were never candidates; drop everything that
    /// is not in `kept` until the store holds only the working set.
    async fn delete_beyond_window(&self, kept: &[Uuid]) -> Result<usize, StoreError> {
        let page = self.fetch_limit.max(kept.len() + 1);
        let mut deleted = 0;
        loop {
            let rows = self.store.list_crises(page).await?;
            let mut progressed = false;
            for crisis in rows.iter().filter(|c| !kept.contains(&c.id)) {
                if self.store.delete_crisis(crisis.id).await? {
                    deleted += 1;
                    progressed = true;
                }
            }
            if !progressed || rows.len() < page {
                return Ok(deleted);
            }
        }
    }

    async fn ask_oracle(&self, candidates: &[Crisis]) -> Option<Vec<Uuid>> {
        let k = self.working_set_size;
        let listing = candidates
            .iter()
            .map(|c| {
                format!(
                    "ID: {} | Name: {} | Severity: {} | Location: {} | {}",
                    c.id, c.name, c.severity, c.location, c.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let system = format!(
            "You curate a crisis monitoring dashboard. Choose exactly {k} crises to keep: \
             {} CATASTROPHIC or REAL events and {} VIRAL RUMORS. Prefer distinct locations \
             and higher severity. Return only the chosen ids.",
            self.catastrophic_slots, self.rumor_slots
        );

        match infer::<WorkingSetSelection>(
            self.oracle.as_ref(),
            self.oracle_timeout,
            system,
            format!("CANDIDATES:\n{listing}"),
        )
        .await
        {
            Ok(selection) => {
                let reconciled = reconcile(candidates, &selection.selected_ids, k);
                if reconciled.is_none() {
                    warn!("Selection returned no usable ids, falling back to severity");
                }
                reconciled
            }
            Err(e) => {
                warn!(error = %e, "Selection oracle failed, falling back to severity");
                None
            }
        }
    }
}
