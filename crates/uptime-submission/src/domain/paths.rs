//! Storage key layout shared by every destination.
//!
//! ```text
//! submissions/<YYYY-MM-DD>/<RFC3339>-<submitter>.json   one per accepted submission
//! blocks/<block_hash>.dat                                content-addressed, write-once
//! ```

use super::payload::rfc3339_seconds;
use super::types::SubmitterKey;
use chrono::{DateTime, Utc};

/// Prefix of metadata objects.
pub const SUBMISSIONS_PREFIX: &str = "submissions/";

/// Prefix of content-addressed block objects.
pub const BLOCKS_PREFIX: &str = "blocks/";

/// Whether a storage path names a content-addressed block.
pub fn is_block_path(path: &str) -> bool {
    path.starts_with(BLOCKS_PREFIX)
}

/// Metadata and block paths for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePaths {
    pub meta: String,
    pub block: String,
}

impl StoragePaths {
    /// Derive paths from the time the submission was received.
    pub fn build(submitted_at: DateTime<Utc>, block_hash: &str, submitter: &SubmitterKey) -> Self {
        Self::from_rfc3339(&rfc3339_seconds(&submitted_at), block_hash, submitter)
    }

    /// Derive paths from an already formatted RFC3339 timestamp.
    ///
    /// The date directory is the first 10 characters of `submitted_at`.
    pub fn from_rfc3339(submitted_at: &str, block_hash: &str, submitter: &SubmitterKey) -> Self {
        let day = submitted_at.get(..10).unwrap_or(submitted_at);
        Self {
            meta: format!(
                "{}{}/{}-{}.json",
                SUBMISSIONS_PREFIX, day, submitted_at, submitter
            ),
            block: format!("{}{}.dat", BLOCKS_PREFIX, block_hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_layout() {
        let submitter = SubmitterKey::from_bytes([0x11; 32]);
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 58).unwrap();
        let paths = StoragePaths::build(at, "cafe", &submitter);

        assert_eq!(
            paths.meta,
            format!("submissions/2024-03-01/2024-03-01T23:59:58Z-{}.json", submitter)
        );
        assert_eq!(paths.block, "blocks/cafe.dat");
        assert!(is_block_path(&paths.block));
        assert!(!is_block_path(&paths.meta));
    }

    #[test]
    fn test_short_timestamp_does_not_panic() {
        let submitter = SubmitterKey::from_bytes([0; 32]);
        let paths = StoragePaths::from_rfc3339("2024", "h", &submitter);
        assert!(paths.meta.starts_with("submissions/2024/2024-"));
    }

    proptest! {
        #[test]
        fn prop_paths_are_deterministic(secs in 0i64..4_102_444_800, hash in "[0-9a-f]{64}", key in any::<[u8; 32]>()) {
            let at = Utc.timestamp_opt(secs, 0).unwrap();
            let submitter = SubmitterKey::from_bytes(key);
            prop_assert_eq!(
                StoragePaths::build(at, &hash, &submitter),
                StoragePaths::build(at, &hash, &submitter)
            );
        }

        #[test]
        fn prop_distinct_hashes_never_share_block_path(a in "[0-9a-f]{64}", b in "[0-9a-f]{64}") {
            prop_assume!(a != b);
            let submitter = SubmitterKey::from_bytes([1; 32]);
            let at = Utc.timestamp_opt(0, 0).unwrap();
            prop_assert_ne!(
                StoragePaths::build(at, &a, &submitter).block,
                StoragePaths::build(at, &b, &submitter).block
            );
        }

        #[test]
        fn prop_distinct_submissions_never_share_meta_path(
            s1 in 0i64..4_102_444_800,
            s2 in 0i64..4_102_444_800,
            k1 in any::<[u8; 32]>(),
            k2 in any::<[u8; 32]>(),
        ) {
            prop_assume!(s1 != s2 || k1 != k2);
            let p1 = StoragePaths::build(Utc.timestamp_opt(s1, 0).unwrap(), "h", &SubmitterKey::from_bytes(k1));
            let p2 = StoragePaths::build(Utc.timestamp_opt(s2, 0).unwrap(), "h", &SubmitterKey::from_bytes(k2));
            prop_assert_ne!(p1.meta, p2.meta);
        }
    }
}
