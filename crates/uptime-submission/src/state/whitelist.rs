//! Submitter whitelist: an atomically replaced snapshot and its refresher.
//!
//! Readers clone an `Arc` to the current set under a short read lock and
//! inspect it without holding the lock. The refresher is the only writer; it
//! swaps in a complete new set, so a reader sees either the old or the new
//! list in full.

use crate::domain::config::WhitelistConfig;
use crate::domain::{SubmitterKey, Whitelist, WhitelistError};
use crate::ports::WhitelistSource;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Current whitelist snapshot
pub struct WhitelistSnapshot {
    current: RwLock<Arc<Whitelist>>,
}

impl WhitelistSnapshot {
    pub fn new(initial: Whitelist) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Get the current snapshot
    pub fn read(&self) -> Arc<Whitelist> {
        let current = self.current.read();
        Arc::clone(&*current)
    }

    /// Publish a new snapshot
    pub fn replace(&self, next: Whitelist) {
        let next = Arc::new(next);
        *self.current.write() = next;
    }

    pub fn contains(&self, key: &SubmitterKey) -> bool {
        self.read().contains(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Keeps a [`WhitelistSnapshot`] in sync with a [`WhitelistSource`].
pub struct WhitelistRefresher {
    source: Arc<dyn WhitelistSource>,
    snapshot: Arc<WhitelistSnapshot>,
    interval: Duration,
    refresh_attempts: u32,
    backoff: Duration,
}

impl WhitelistRefresher {
    /// Load the initial list and build a refresher around it.
    ///
    /// Fails when no attempt succeeds; the service must not start without a
    /// known list.
    pub async fn initial_load(
        source: Arc<dyn WhitelistSource>,
        config: &WhitelistConfig,
    ) -> Result<Self, WhitelistError> {
        let whitelist = fetch_with_retries(
            source.as_ref(),
            config.initial_attempts,
            config.retry_backoff(),
        )
        .await?;
        info!(
            source = %source.describe(),
            submitters = whitelist.len(),
            "Whitelist loaded"
        );

        Ok(Self {
            source,
            snapshot: Arc::new(WhitelistSnapshot::new(whitelist)),
            interval: config.refresh_interval(),
            refresh_attempts: config.refresh_attempts,
            backoff: config.retry_backoff(),
        })
    }

    pub fn snapshot(&self) -> Arc<WhitelistSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// One refresh cycle. On failure the previous snapshot stays in place.
    pub async fn refresh_once(&self) -> Result<usize, WhitelistError> {
        match fetch_with_retries(self.source.as_ref(), self.refresh_attempts, self.backoff).await {
            Ok(whitelist) => {
                let count = whitelist.len();
                self.snapshot.replace(whitelist);
                info!(submitters = count, "Whitelist refreshed");
                Ok(count)
            }
            Err(e) => {
                error!(
                    error = %e,
                    submitters = self.snapshot.len(),
                    "Failed to refresh whitelist, using previous one"
                );
                Err(e)
            }
        }
    }

    /// Refresh on a fixed interval until shutdown.
    ///
    /// Shutdown also abandons a refresh that is still fetching.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; the list was just loaded.
        ticker.tick().await;

        loop {
            if *shutdown.borrow() {
                debug!("Whitelist refresher stopping");
                return;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if stop_requested(changed, &shutdown) {
                        debug!("Whitelist refresher stopping");
                        return;
                    }
                }
                _ = ticker.tick() => {
                    let refresh = self.refresh_once();
                    tokio::pin!(refresh);
                    loop {
                        tokio::select! {
                            biased;
                            changed = shutdown.changed() => {
                                if stop_requested(changed, &shutdown) {
                                    debug!("Whitelist refresher stopping, refresh abandoned");
                                    return;
                                }
                            }
                            _ = &mut refresh => break,
                        }
                    }
                }
            }
        }
    }
}

fn stop_requested(
    changed: Result<(), watch::error::RecvError>,
    shutdown: &watch::Receiver<bool>,
) -> bool {
    changed.is_err() || *shutdown.borrow()
}

async fn fetch_with_retries(
    source: &dyn WhitelistSource,
    attempts: u32,
    backoff: Duration,
) -> Result<Whitelist, WhitelistError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match source.fetch().await {
            Ok(whitelist) => return Ok(whitelist),
            Err(e) if attempt < attempts => {
                warn!(
                    attempt,
                    attempts,
                    error = %e,
                    "Whitelist fetch failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
