//! Adapter selection from configuration.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uptime_submission::{
    FileSystemStore, FileWhitelistSource, HttpWhitelistSource, MemoryStore, ObjectStore,
    StorageConfig, WhitelistConfig, WhitelistError, WhitelistSource,
};

/// Timeout of one whitelist download.
const WHITELIST_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// One destination per enabled storage backend.
pub fn build_destinations(config: &StorageConfig) -> Vec<Arc<dyn ObjectStore>> {
    let mut destinations: Vec<Arc<dyn ObjectStore>> = Vec::new();

    if let Some(root) = &config.local_path {
        info!(root = %root.display(), "Storage destination: local filesystem");
        destinations.push(Arc::new(FileSystemStore::new(root)));
    }
    if config.memory {
        info!("Storage destination: in-memory");
        destinations.push(Arc::new(MemoryStore::new("memory")));
    }

    destinations
}

/// The configured whitelist source. A URL takes precedence over a file.
pub fn whitelist_source(
    config: &WhitelistConfig,
) -> Result<Arc<dyn WhitelistSource>, WhitelistError> {
    if let Some(url) = &config.url {
        return Ok(Arc::new(HttpWhitelistSource::new(
            url.clone(),
            WHITELIST_HTTP_TIMEOUT,
        )?));
    }
    if let Some(path) = &config.file {
        return Ok(Arc::new(FileWhitelistSource::new(path)));
    }
    Err(WhitelistError::NotConfigured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destinations_follow_config() {
        assert!(build_destinations(&StorageConfig::default()).is_empty());

        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            local_path: Some(dir.path().to_path_buf()),
            memory: true,
        };
        let names: Vec<String> = build_destinations(&config)
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["local-filesystem", "memory"]);
    }

    #[test]
    fn test_whitelist_source_selection() {
        let mut config = WhitelistConfig::default();
        assert!(matches!(
            whitelist_source(&config),
            Err(WhitelistError::NotConfigured)
        ));

        config.file = Some("/etc/uptime/whitelist".into());
        assert_eq!(
            whitelist_source(&config).unwrap().describe(),
            "file:/etc/uptime/whitelist"
        );

        config.url = Some("https://example.org/list.csv".into());
        assert_eq!(
            whitelist_source(&config).unwrap().describe(),
            "https://example.org/list.csv"
        );
    }
}
