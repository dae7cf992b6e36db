//! Batch builder for the deep-gathering phase.
//!
//! High-risk crises (severity at or above the threshold) are rescanned every
//! time their cooldown lapses. Remaining capacity goes to normal-risk crises
//! in round-robin order; the pointer survives across iterations and cycles.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use sentinel_common::{Crisis, ScannerSettings};

pub struct DeepGatherScheduler {
    ceiling: usize,
    high_risk_threshold: i32,
    cooldown: Duration,
    pointer: usize,
    last_scan: HashMap<Uuid, Instant>,
}

impl DeepGatherScheduler {
    pub fn new(settings: &ScannerSettings) -> Self {
        Self {
            ceiling: settings.deep_gather_concurrency.max(1),
            high_risk_threshold: settings.high_risk_threshold,
            cooldown: settings.high_risk_cooldown,
            pointer: 0,
            last_scan: HashMap::new(),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn is_high_risk(&self, crisis: &Crisis) -> bool {
        crisis.severity >= self.high_risk_threshold
    }

    fn cooled_down(&self, id: Uuid, now: Instant) -> bool {
        match self.last_scan.get(&id) {
            Some(last) => now.saturating_duration_since(*last) > self.cooldown,
            None => true,
        }
    }

    /// Pick up to `ceiling` crises from `active` for the next dispatch.
    /// Does not record the dispatch; call `mark_dispatched` for that.
    pub fn build_batch(&mut self, active: &[Crisis], now: Instant) -> Vec<Crisis> {
        let (high, normal): (Vec<&Crisis>, Vec<&Crisis>) =
            active.iter().partition(|c| self.is_high_risk(c));

        let mut batch: Vec<Crisis> = high
            .into_iter()
            .filter(|c| self.cooled_down(c.id, now))
            .take(self.ceiling)
            .cloned()
            .collect();

        if normal.is_empty() {
            return batch;
        }

        let slots = self.ceiling.saturating_sub(batch.len());
        for _ in 0..slots {
            let candidate = normal[self.pointer % normal.len()];
            if !batch.iter().any(|c| c.id == candidate.id) {
                batch.push(candidate.clone());
            }
            self.pointer = self.pointer.wrapping_add(1);
        }
        batch
    }

    /// Stamp every batched crisis with the dispatch time.
    pub fn mark_dispatched(&mut self, batch: &[Crisis], now: Instant) {
        for crisis in batch {
            self.last_scan.insert(crisis.id, now);
        }
    }

    pub fn last_scanned(&self, id: Uuid) -> Option<Instant> {
        self.last_scan.get(&id).copied()
    }

    /// Drop scan history for crises no longer in the active set.
    pub fn retain_active(&mut self, active: &[Crisis]) {
        self.last_scan
            .retain(|id, _| active.iter().any(|c| c.id == *id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use sentinel_scout::testing::crisis_fixture;

    fn crises(severities: &[i32]) -> Vec<Crisis> {
        severities
            .iter()
            .enumerate()
            .map(|(i, s)| crisis_fixture(&format!("crisis {i}"), *s, chrono::Duration::hours(1)))
            .collect()
    }

    fn ids(batch: &[Crisis]) -> Vec<Uuid> {
        batch.iter().map(|c| c.id).collect()
    }

    #[test]
    fn high_risk_respects_cooldown() {
        let mut scheduler = DeepGatherScheduler::new(&ScannerSettings::default());
        let active = crises(&[95]);
        let t0 = Instant::now();

        let batch = scheduler.build_batch(&active, t0);
        assert_eq!(ids(&batch), vec![active[0].id]);
        scheduler.mark_dispatched(&batch, t0);

        assert!(scheduler.build_batch(&active, t0 + Duration::from_secs(60)).is_empty());
        assert!(scheduler.build_batch(&active, t0 + Duration::from_secs(120)).is_empty());
        assert_eq!(
            ids(&scheduler.build_batch(&active, t0 + Duration::from_secs(121))),
            vec![active[0].id]
        );
    }

    #[test]
    fn normal_risk_round_robin_covers_everyone() {
        let mut scheduler = DeepGatherScheduler::new(&ScannerSettings::default());
        let active = crises(&[10, 20, 30, 40, 50, 60, 70, 15, 25, 35, 45, 55]);
        let now = Instant::now();

        let rounds = active.len().div_ceil(scheduler.ceiling());
        let mut seen = HashSet::new();
        for _ in 0..rounds {
            let batch = scheduler.build_batch(&active, now);
            assert!(batch.len() <= 5);
            seen.extend(ids(&batch));
        }
        assert_eq!(seen.len(), active.len());
    }

    #[test]
    fn pointer_persists_across_batches() {
        let mut scheduler = DeepGatherScheduler::new(&ScannerSettings::default());
        let active = crises(&[10, 20, 30, 40, 50, 60, 70]);
        let now = Instant::now();

        let first = scheduler.build_batch(&active, now);
        let second = scheduler.build_batch(&active, now);
        assert_eq!(ids(&first), ids(&active[..5]));
        assert_eq!(ids(&second), vec![active[5].id, active[6].id, active[0].id, active[1].id, active[2].id]);
    }

    #[test]
    fn high_risk_takes_priority_and_normal_fills_the_rest() {
        let mut scheduler = DeepGatherScheduler::new(&ScannerSettings::default());
        let active = crises(&[95, 92, 40, 30]);
        let batch = scheduler.build_batch(&active, Instant::now());

        assert_eq!(batch.len(), 4);
        assert_eq!(ids(&batch[..2]), ids(&active[..2]));
        let unique: HashSet<Uuid> = ids(&batch).into_iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn batch_never_exceeds_ceiling() {
        let mut scheduler = DeepGatherScheduler::new(&ScannerSettings::default());
        let active = crises(&[99, 98, 97, 96, 95, 94, 93, 10]);
        let batch = scheduler.build_batch(&active, Instant::now());
        assert_eq!(batch.len(), 5);
        assert!(batch.iter().all(|c| c.severity >= 90));
    }

    #[test]
    fn cooling_high_risk_leaves_room_for_normal() {
        let mut scheduler = DeepGatherScheduler::new(&ScannerSettings::default());
        let active = crises(&[95, 20]);
        let t0 = Instant::now();
        let first = scheduler.build_batch(&active, t0);
        scheduler.mark_dispatched(&first, t0);

        let next = scheduler.build_batch(&active, t0 + Duration::from_secs(10));
        assert_eq!(ids(&next), vec![active[1].id]);
    }

    #[test]
    fn forgotten_crises_lose_history() {
        let mut scheduler = DeepGatherScheduler::new(&ScannerSettings::default());
        let active = crises(&[95, 91]);
        let now = Instant::now();
        scheduler.mark_dispatched(&active, now);

        scheduler.retain_active(&active[1..]);
        assert!(scheduler.last_scanned(active[0].id).is_none());
        assert_eq!(scheduler.last_scanned(active[1].id), Some(now));
    }
}
