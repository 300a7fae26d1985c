//! Backend configuration with validation.
//!
//! All sections default to production values; a JSON document may override
//! any subset of fields.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Network name whose signatures use discriminator `1`.
pub const MAINNET: &str = "mainnet";

/// Main backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Request size and timing limits
    pub limits: LimitsConfig,
    /// Per-submitter attempt quota
    pub rate_limit: RateLimitConfig,
    /// Whitelist source and refresh schedule
    pub whitelist: WhitelistConfig,
    /// Storage destinations
    pub storage: StorageConfig,
    /// Network the submissions are signed for
    pub network_name: String,
    /// Skip signature verification (testing only)
    pub verify_signature_disabled: bool,
}

impl IngestConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_payload_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_payload_size cannot be 0".into(),
            ));
        }

        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "max_attempts cannot be 0".into(),
            ));
        }

        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "window_secs cannot be 0".into(),
            ));
        }

        if !self.whitelist.disabled {
            if self.whitelist.file.is_none() && self.whitelist.url.is_none() {
                return Err(ConfigError::MissingWhitelistSource);
            }
            if self.whitelist.refresh_interval_secs == 0 {
                return Err(ConfigError::InvalidWhitelist(
                    "refresh_interval_secs cannot be 0".into(),
                ));
            }
        }

        if !self.storage.any_enabled() {
            return Err(ConfigError::NoStorageBackend);
        }

        Ok(())
    }

    /// Discriminator mixed into the signed message.
    pub fn network_id(&self) -> u8 {
        if self.network_name == MAINNET {
            1
        } else {
            0
        }
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
        }
    }
}

/// Request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum declared Content-Length in bytes
    pub max_payload_size: u64,
    /// Upper bound on reading the request body
    pub body_read_timeout_secs: u64,
    /// Tolerated clock skew for `created_at`
    pub time_diff_delta_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 50_000_000,
            body_read_timeout_secs: 30,
            time_diff_delta_secs: 300,
        }
    }
}

impl LimitsConfig {
    pub fn body_read_timeout(&self) -> Duration {
        Duration::from_secs(self.body_read_timeout_secs)
    }

    pub fn time_diff_delta(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.time_diff_delta_secs as i64)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Accepted attempts per submitter per window
    pub max_attempts: usize,
    /// Trailing window length
    pub window_secs: u64,
    /// How often idle records are dropped
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 120,
            window_secs: 3600,
            cleanup_interval_secs: 600,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

/// Whitelist configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Accept every submitter
    pub disabled: bool,
    /// Local whitelist file
    pub file: Option<PathBuf>,
    /// Remote whitelist (plain list or CSV export)
    pub url: Option<String>,
    /// Delay between refreshes
    pub refresh_interval_secs: u64,
    /// Fetch attempts at startup
    pub initial_attempts: u32,
    /// Fetch attempts per refresh
    pub refresh_attempts: u32,
    /// Pause between failed attempts
    pub retry_backoff_ms: u64,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            file: None,
            url: None,
            refresh_interval_secs: 600,
            initial_attempts: 1,
            refresh_attempts: 10,
            retry_backoff_ms: 1000,
        }
    }
}

impl WhitelistConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Storage destinations. Every enabled destination receives every object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the local filesystem destination
    pub local_path: Option<PathBuf>,
    /// Keep objects in process memory
    pub memory: bool,
}

impl StorageConfig {
    pub fn any_enabled(&self) -> bool {
        self.local_path.is_some() || self.memory
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),

    #[error("invalid whitelist configuration: {0}")]
    InvalidWhitelist(String),

    #[error("whitelist enabled but neither a file nor a url is configured")]
    MissingWhitelistSource,

    #[error("no storage backend configured")]
    NoStorageBackend,
}
