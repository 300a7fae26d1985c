//! Whitelist sources implementing [`WhitelistSource`](crate::ports::WhitelistSource).
//!
//! Both sources read the same list format: one entry per line, the first
//! comma-separated cell holds the submitter key. Blank lines and `#` comments
//! are ignored. Cells that do not parse as keys (a CSV header row, a note in
//! the sheet) are skipped. A document without a single key is rejected, so a
//! login page or an empty export never replaces a good list.

mod file;
mod http;

pub use file::FileWhitelistSource;
pub use http::HttpWhitelistSource;

use crate::domain::{SubmitterKey, Whitelist, WhitelistError};
use tracing::debug;

/// Parse a whitelist document.
pub fn parse_whitelist(text: &str) -> Result<Whitelist, WhitelistError> {
    let mut whitelist = Whitelist::new();
    let mut entries = 0usize;

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        entries += 1;

        let cell = line
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches('"');
        match cell.parse::<SubmitterKey>() {
            Ok(key) => {
                whitelist.insert(key);
            }
            Err(e) => debug!(line = index + 1, error = %e, "Skipping whitelist entry"),
        }
    }

    if whitelist.is_empty() {
        return Err(WhitelistError::Parse(format!(
            "no submitter keys in {} entries",
            entries
        )));
    }
    Ok(whitelist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_list() {
        let a = hex::encode([1u8; 32]);
        let b = hex::encode([2u8; 32]);
        let text = format!("# producers\n{}\n\n  {}  \n", a, b);

        let whitelist = parse_whitelist(&text).unwrap();
        assert_eq!(whitelist.len(), 2);
        assert!(whitelist.contains(&a.parse().unwrap()));
    }

    #[test]
    fn test_parse_csv_export() {
        let a = hex::encode([3u8; 32]);
        let text = format!("submitter,name\n\"{}\",alice\nnot-a-key,bob\n{},alice-dup\n", a, a);

        let whitelist = parse_whitelist(&text).unwrap();
        assert_eq!(whitelist.len(), 1);
        assert!(whitelist.contains(&a.parse().unwrap()));
    }

    #[test]
    fn test_document_without_keys_is_rejected() {
        for text in [
            "",
            "# only a comment\n\n",
            "<html><body>Sign in to continue</body></html>",
            "submitter,name\n",
        ] {
            assert!(matches!(
                parse_whitelist(text),
                Err(WhitelistError::Parse(_))
            ));
        }
    }
}
