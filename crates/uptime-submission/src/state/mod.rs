//! Shared state every concurrent submission touches.
//!
//! The whitelist snapshot and the attempt counter live here together with
//! the background tasks that maintain them.

pub mod rate_limit;
pub mod whitelist;

pub use rate_limit::{cleanup_task, AttemptCounter};
pub use whitelist::{WhitelistRefresher, WhitelistSnapshot};
