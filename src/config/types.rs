// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Debug mode: unhandled failures propagate to the caller and the
    /// request context is kept alive for post-mortem inspection.
    pub debug: bool,
    /// Secret key for session signing. Sessions are read-only without it.
    pub secret_key: Option<String>,
    /// Name of the cookie carrying the signed session.
    pub session_cookie_name: String,
    /// Expiry horizon for sessions marked permanent.
    pub permanent_session_lifetime_days: i64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Content type applied to text payloads without one of their own
    pub default_content_type: String,
    /// Requests with a larger declared body are rejected with 413
    pub max_body_size: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log format (combined, common or json)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                workers: None,
            },
            app: AppConfig {
                debug: false,
                secret_key: None,
                session_cookie_name: "session".to_string(),
                permanent_session_lifetime_days: 31,
            },
            http: HttpConfig {
                default_content_type: "text/html; charset=utf-8".to_string(),
                max_body_size: 10_485_760,
            },
            logging: LoggingConfig {
                access_log: true,
                access_log_format: "combined".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
        }
    }
}
