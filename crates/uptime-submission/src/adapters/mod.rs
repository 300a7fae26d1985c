//! # Adapters
//!
//! Implementations of the outbound ports.

pub mod crypto;
pub mod storage;
pub mod whitelist;

pub use crypto::Ed25519Verifier;
pub use storage::{FileSystemStore, MemoryStore};
pub use whitelist::{parse_whitelist, FileWhitelistSource, HttpWhitelistSource};
