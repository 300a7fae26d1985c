use super::parse_whitelist;
use crate::domain::{Whitelist, WhitelistError};
use crate::ports::WhitelistSource;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Whitelist read from a local file on every fetch.
pub struct FileWhitelistSource {
    path: PathBuf,
}

impl FileWhitelistSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl WhitelistSource for FileWhitelistSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn fetch(&self) -> Result<Whitelist, WhitelistError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| WhitelistError::Transport(format!("{}: {}", self.path.display(), e)))?;
        parse_whitelist(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_fetch_reads_current_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", hex::encode([5u8; 32])).unwrap();
        let source = FileWhitelistSource::new(file.path());

        assert_eq!(source.fetch().await.unwrap().len(), 1);

        writeln!(file, "{}", hex::encode([6u8; 32])).unwrap();
        assert_eq!(source.fetch().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_transport_error() {
        let source = FileWhitelistSource::new("/nonexistent/whitelist.txt");
        assert!(matches!(
            source.fetch().await,
            Err(WhitelistError::Transport(_))
        ));
    }
}
