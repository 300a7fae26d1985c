use crate::domain::StorageError;
use crate::ports::ObjectStore;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique sibling path used while an object is being written.
fn temp_path(full: &Path) -> PathBuf {
    let mut name = full.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", TEMP_SEQ.fetch_add(1, Ordering::Relaxed)));
    full.with_file_name(name)
}

/// Local filesystem destination.
///
/// Objects are files under `root`, one per storage path. Unlike the other
/// destinations, every path is existence-checked: a file that is already
/// present is never overwritten, metadata included.
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve a storage path below the root, refusing anything that could
    /// escape it.
    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = path.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    async fn write_then_rename(temp: &Path, full: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        let mut file = tokio::fs::File::create(temp)
            .await
            .map_err(|e| Self::io_error(temp, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| Self::io_error(temp, e))?;
        file.sync_all()
            .await
            .map_err(|e| Self::io_error(temp, e))?;
        drop(file);

        tokio::fs::rename(temp, full)
            .await
            .map_err(|e| Self::io_error(full, e))
    }
}

#[async_trait]
impl ObjectStore for FileSystemStore {
    fn name(&self) -> &str {
        "local-filesystem"
    }

    fn checks_existence(&self, _path: &str) -> bool {
        true
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full = self.full_path(path)?;
        tokio::fs::try_exists(&full)
            .await
            .map_err(|e| Self::io_error(&full, e))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full = self.full_path(path)?;

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(parent, e))?;
        }

        // Write via temp file so readers never see a partial object
        let temp = temp_path(&full);
        let result = Self::write_then_rename(&temp, &full, bytes).await;
        if result.is_err() {
            // Nothing else ever claims a temp name; drop it on any failure
            let _ = tokio::fs::remove_file(&temp).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{ObjectSet, PersistenceFanout};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path());
        let path = "submissions/2024-03-01/2024-03-01T10:00:00Z-aa.json";

        assert!(!store.exists(path).await.unwrap());
        store.write(path, b"{}").await.unwrap();
        assert!(store.exists(path).await.unwrap());

        let on_disk = std::fs::read(dir.path().join(path)).unwrap();
        assert_eq!(on_disk, b"{}");
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path());

        for bad in ["../outside", "/etc/passwd", "blocks/../../x", ""] {
            assert!(matches!(
                store.write(bad, b"x").await,
                Err(StorageError::InvalidPath(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path());
        // A non-empty directory where the object should go makes the rename fail
        std::fs::create_dir_all(dir.path().join("blocks/x.dat")).unwrap();
        std::fs::write(dir.path().join("blocks/x.dat/inner"), b"").unwrap();

        assert!(matches!(
            store.write("blocks/x.dat", b"block").await,
            Err(StorageError::Io { .. })
        ));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("blocks"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_existing_metadata_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileSystemStore::new(dir.path()));
        let fanout = PersistenceFanout::new(vec![store as Arc<dyn ObjectStore>]);
        let meta = "submissions/2024-03-01/2024-03-01T10:00:00Z-aa.json";

        let mut first = ObjectSet::new();
        first.insert(meta, b"first".to_vec());
        fanout.save(&first).await;

        let mut second = ObjectSet::new();
        second.insert(meta, b"second".to_vec());
        let report = fanout.save(&second).await;

        assert_eq!(report.skipped(), 1);
        assert_eq!(std::fs::read(dir.path().join(meta)).unwrap(), b"first");
    }
}
