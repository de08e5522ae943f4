//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the grid server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, proxy trust, limits).
    pub listener: ListenerConfig,

    /// Durable storage settings.
    pub database: DatabaseConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Grid and claim quota settings.
    pub grid: GridConfig,

    /// Cache-Control lifetimes for cacheable responses.
    pub caches: CacheConfig,

    /// Response compression.
    pub compression: CompressionConfig,

    /// Static asset serving.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Trust `X-Forwarded-For` when the peer is a loopback or private address.
    pub trust_forwarded: bool,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trust_forwarded: false,
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// SQLite database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the database file. Parent directories are created on open.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/soulgrid.db".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client within one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 120,
            window_secs: 60,
        }
    }
}

/// Grid configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    /// Maximum number of pixels a single soul may paint.
    pub quota: u32,

    /// Advisory cool-down sent with quota rejections, in seconds.
    pub quota_cooldown_secs: u64,

    /// Upper bound on cells accepted by a single register call.
    pub max_register_cells: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            quota: 10,
            quota_cooldown_secs: 168 * 60 * 60,
            max_register_cells: 65_536,
        }
    }
}

/// Cache lifetimes in seconds. Zero disables the header.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Static asset responses.
    pub static_files_secs: u64,

    /// `GET /api/souls/me` responses.
    pub souls_me_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            static_files_secs: 60 * 60,
            souls_me_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Negotiate br / zstd / gzip from `Accept-Encoding`.
    pub enabled: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory served for any path not matched by the API.
    pub dir: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
