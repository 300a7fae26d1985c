//! Ports for the submission backend.

pub mod outbound;

pub use outbound::{ObjectStore, SignatureVerifier, SystemTimeSource, TimeSource, WhitelistSource};
