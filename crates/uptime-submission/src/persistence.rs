//! Persistence fan-out across independent storage destinations.
//!
//! Every destination receives every object. A failing destination is logged
//! and counted; it never stops the others and never reaches the caller.
//! Paths a destination existence-checks (blocks, by default) are skipped when
//! already present.

use crate::ports::ObjectStore;
use bytes::Bytes;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything to durably write for one accepted submission, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSet {
    objects: BTreeMap<String, Bytes>,
}

impl ObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; a repeated path replaces the earlier bytes.
    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Bytes>) {
        self.objects.insert(path.into(), bytes.into());
    }

    pub fn get(&self, path: &str) -> Option<&Bytes> {
        self.objects.get(path)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.objects.iter().map(|(p, b)| (p.as_str(), b))
    }
}

/// Outcome of one destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationReport {
    pub destination: String,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome of a [`PersistenceFanout::save`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub destinations: Vec<DestinationReport>,
}

impl SaveReport {
    pub fn written(&self) -> usize {
        self.destinations.iter().map(|d| d.written).sum()
    }

    pub fn skipped(&self) -> usize {
        self.destinations.iter().map(|d| d.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.destinations.iter().map(|d| d.failed).sum()
    }
}

/// Writes object sets to every configured destination.
#[derive(Clone, Default)]
pub struct PersistenceFanout {
    destinations: Vec<Arc<dyn ObjectStore>>,
}

impl PersistenceFanout {
    pub fn new(destinations: Vec<Arc<dyn ObjectStore>>) -> Self {
        Self { destinations }
    }

    /// Write `objects` to every destination concurrently.
    pub async fn save(&self, objects: &ObjectSet) -> SaveReport {
        let reports = join_all(
            self.destinations
                .iter()
                .map(|store| save_to(store.as_ref(), objects)),
        )
        .await;

        SaveReport {
            destinations: reports,
        }
    }

    /// Close every destination, logging failures.
    pub async fn close(&self) {
        for store in &self.destinations {
            match store.close().await {
                Ok(()) => debug!(destination = store.name(), "Storage destination closed"),
                Err(e) => warn!(
                    destination = store.name(),
                    error = %e,
                    "Error closing storage destination"
                ),
            }
        }
    }
}

async fn save_to(store: &dyn ObjectStore, objects: &ObjectSet) -> DestinationReport {
    let mut report = DestinationReport {
        destination: store.name().to_string(),
        ..DestinationReport::default()
    };

    for (path, bytes) in objects.iter() {
        if store.checks_existence(path) {
            match store.exists(path).await {
                Ok(true) => {
                    debug!(destination = store.name(), path, "Object already exists, skipping");
                    report.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => warn!(
                    destination = store.name(),
                    path,
                    error = %e,
                    "Error when checking if object exists, will continue with save"
                ),
            }
        }

        info!(destination = store.name(), path, "Saving object");
        match store.write(path, bytes).await {
            Ok(()) => report.written += 1,
            Err(e) => {
                warn!(
                    destination = store.name(),
                    path,
                    error = %e,
                    "Error while saving object"
                );
                report.failed += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStore;
    use crate::domain::StorageError;
    use async_trait::async_trait;

    const META: &str = "submissions/2024-03-01/2024-03-01T10:00:00Z-aa.json";
    const BLOCK: &str = "blocks/cafe.dat";

    fn objects() -> ObjectSet {
        let mut set = ObjectSet::new();
        set.insert(META, b"{}".to_vec());
        set.insert(BLOCK, b"block".to_vec());
        set
    }

    struct BrokenStore;

    #[async_trait]
    impl ObjectStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn exists(&self, _path: &str) -> Result<bool, StorageError> {
            Err(StorageError::Unavailable("down".into()))
        }

        async fn write(&self, _path: &str, _bytes: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_block_written_once_metadata_every_time() {
        let store = Arc::new(MemoryStore::new("memory"));
        let fanout = PersistenceFanout::new(vec![store.clone() as Arc<dyn ObjectStore>]);

        let first = fanout.save(&objects()).await;
        assert_eq!((first.written(), first.skipped()), (2, 0));

        let second = fanout.save(&objects()).await;
        assert_eq!((second.written(), second.skipped()), (1, 1));

        assert_eq!(store.write_count(BLOCK), 1);
        assert_eq!(store.write_count(META), 2);
    }

    #[tokio::test]
    async fn test_failing_destination_does_not_block_others() {
        let healthy = Arc::new(MemoryStore::new("memory"));
        let fanout = PersistenceFanout::new(vec![
            Arc::new(BrokenStore) as Arc<dyn ObjectStore>,
            healthy.clone() as Arc<dyn ObjectStore>,
        ]);

        let report = fanout.save(&objects()).await;

        assert_eq!(report.failed(), 2);
        assert_eq!(report.written(), 2);
        assert_eq!(report.destinations[0].destination, "broken");
        assert_eq!(healthy.get(BLOCK).as_deref(), Some(&b"block"[..]));
        assert!(healthy.get(META).is_some());
    }

    #[tokio::test]
    async fn test_no_destinations_is_a_noop() {
        let report = PersistenceFanout::default().save(&objects()).await;
        assert!(report.destinations.is_empty());
    }

    #[test]
    fn test_object_set_keys_are_unique() {
        let mut set = objects();
        set.insert(BLOCK, b"other".to_vec());
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(BLOCK).map(|b| b.as_ref()), Some(&b"other"[..]));
    }
}
