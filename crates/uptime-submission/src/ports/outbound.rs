//! # Outbound Ports (Driven Ports)
//!
//! Capabilities the submission pipeline requires from its host.
//!
//! Production: `Ed25519Verifier`, `FileWhitelistSource`/`HttpWhitelistSource`,
//! `FileSystemStore`, `SystemTimeSource` (see `crate::adapters`).
//! Testing: `MemoryStore` and fakes defined in the tests.

use crate::domain::{Signature, StorageError, SubmitterKey, Whitelist, WhitelistError};
use crate::domain::paths::is_block_path;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Signature check over a message hash.
pub trait SignatureVerifier: Send + Sync {
    /// True when `signature` is valid for `message_hash` under `key` on the
    /// network identified by `network_id`.
    fn verify(
        &self,
        key: &SubmitterKey,
        signature: &Signature,
        message_hash: &[u8],
        network_id: u8,
    ) -> bool;
}

/// Source of the authorization list.
#[async_trait]
pub trait WhitelistSource: Send + Sync {
    /// Short name used in logs.
    fn describe(&self) -> String;

    /// Fetch the complete current list.
    async fn fetch(&self) -> Result<Whitelist, WhitelistError>;
}

/// One storage destination of the fan-out.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Destination name used in logs and reports.
    fn name(&self) -> &str;

    /// Whether `path` is checked with [`ObjectStore::exists`] before writing.
    ///
    /// Only content-addressed blocks by default.
    fn checks_existence(&self, path: &str) -> bool {
        is_block_path(path)
    }

    /// Check whether an object is already stored.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Store an object, replacing any previous content.
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Release destination resources at shutdown.
    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System time implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
