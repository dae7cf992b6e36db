use std::fmt;

/// Counters from one supervisor cycle.
#[derive(Debug, Default, Clone)]
pub struct CycleStats {
    pub signals_relevant: usize,
    pub crises_created: usize,
    pub notifications_sent: usize,
    pub crises_pruned: usize,
    pub selection_fallback: bool,
    pub batches_dispatched: usize,
    pub scans_completed: usize,
    pub scans_failed: usize,
    pub scans_abandoned: usize,
    pub claims_verified: usize,
    pub reverified: usize,
    pub sweep: SweepReport,
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "relevant={} created={} notified={} pruned={} fallback={} batches={} scans={} scan_failures={} abandoned={} claims={} reverified={} {}",
            self.signals_relevant,
            self.crises_created,
            self.notifications_sent,
            self.crises_pruned,
            self.selection_fallback,
            self.batches_dispatched,
            self.scans_completed,
            self.scans_failed,
            self.scans_abandoned,
            self.claims_verified,
            self.reverified,
            self.sweep,
        )
    }
}

/// Rows removed by the retention sweeps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub crises: u64,
    pub unconfirmed_items: u64,
    pub adhoc_analyses: u64,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "swept_crises={} swept_unconfirmed={} swept_adhoc={}",
            self.crises, self.unconfirmed_items, self.adhoc_analyses
        )
    }
}
