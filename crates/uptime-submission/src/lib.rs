//! Uptime submission backend - ingestion pipeline for signed uptime reports.
//!
//! Block producers periodically POST a signed submission to `/v1/submit`.
//! Every submission passes an ordered chain of checks before it is written,
//! once per logical key, to every configured storage destination.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     HTTP (axum router)                       │
//! │       Content-Length gate → bounded body read                │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴───────────────────────────────┐
//! │                   SubmissionPipeline                         │
//! │  Decode → Fields → Whitelist → Freshness → Signature →       │
//! │  RateLimit → Paths → Persist                                 │
//! └───────┬──────────────┬──────────────────┬────────────────────┘
//!         │              │                  │
//!  WhitelistSnapshot  AttemptCounter  PersistenceFanout
//!  (refresher task)   (cleanup task)    │        │
//!                                  FileSystem  Memory
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use uptime_submission::{build_router, AppState, SubmissionPipeline};
//!
//! let pipeline = Arc::new(SubmissionPipeline::new(config, attempts, whitelist, verifier, fanout, clock));
//! let app = build_router(AppState::new(pipeline, ready));
//! axum::serve(listener, app).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod persistence;
pub mod ports;
pub mod router;
pub mod service;
pub mod state;

// Re-exports
pub use adapters::{
    Ed25519Verifier, FileSystemStore, FileWhitelistSource, HttpWhitelistSource, MemoryStore,
};
pub use domain::config::{
    HttpConfig, LimitsConfig, RateLimitConfig, StorageConfig, WhitelistConfig,
};
pub use domain::{
    ConfigError, IngestConfig, StorageError, StoragePaths, SubmitError, SubmitterKey,
    WhitelistError,
};
pub use persistence::{ObjectSet, PersistenceFanout, SaveReport};
pub use ports::{ObjectStore, SignatureVerifier, SystemTimeSource, TimeSource, WhitelistSource};
pub use router::{build_router, AppState};
pub use service::SubmissionPipeline;
pub use state::{cleanup_task, AttemptCounter, WhitelistRefresher, WhitelistSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
