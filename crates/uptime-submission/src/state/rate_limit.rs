//! Per-submitter attempt limiting over a trailing time window.
//!
//! Each submitter has an oldest-first queue of accepted attempt instants.
//! Records live in a `DashMap`, so two submitters on different shards never
//! contend and all updates for one submitter are serialised by its shard.
//! Queues are pruned on access; the periodic cleanup drops idle submitters.

use crate::domain::config::RateLimitConfig;
use crate::domain::SubmitterKey;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

/// Attempt counter shared across requests
pub struct AttemptCounter {
    records: DashMap<SubmitterKey, VecDeque<Instant>>,
    max_attempts: usize,
    window: Duration,
}

fn prune(record: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = record.front() {
        if now.saturating_duration_since(oldest) >= window {
            record.pop_front();
        } else {
            break;
        }
    }
}

impl AttemptCounter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            records: DashMap::new(),
            max_attempts,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_attempts, config.window())
    }

    /// Record an attempt by `key` now.
    ///
    /// Returns `false`, without recording, when the key already has
    /// `max_attempts` attempts inside the window.
    pub fn record_attempt(&self, key: &SubmitterKey) -> bool {
        self.record_attempt_at(key, Instant::now())
    }

    /// Record an attempt at an explicit instant.
    pub fn record_attempt_at(&self, key: &SubmitterKey, now: Instant) -> bool {
        let mut record = self.records.entry(*key).or_default();
        prune(&mut record, now, self.window);

        if record.len() >= self.max_attempts {
            return false;
        }
        record.push_back(now);
        true
    }

    /// Attempts currently held for `key`, pruned or not.
    pub fn recorded_attempts(&self, key: &SubmitterKey) -> usize {
        self.records.get(key).map(|r| r.len()).unwrap_or(0)
    }

    /// Prune every record and drop the empty ones.
    pub fn cleanup(&self, now: Instant) {
        let window = self.window;
        self.records.retain(|key, record| {
            prune(record, now, window);
            if record.is_empty() {
                debug!(submitter = %key, "Removing idle attempt record");
                false
            } else {
                true
            }
        });
    }

    /// Get number of tracked submitters
    pub fn tracked_keys(&self) -> usize {
        self.records.len()
    }
}

/// Background task dropping idle attempt records until shutdown.
pub async fn cleanup_task(
    counter: Arc<AttemptCounter>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cleanup_interval.tick() => counter.cleanup(Instant::now()),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Attempt cleanup task stopping");
                    return;
                }
            }
        }
    }
}
