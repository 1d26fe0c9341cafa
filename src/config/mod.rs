// Configuration module entry point
// Layered loading: optional TOML file, environment overrides, defaults

mod types;

use std::net::SocketAddr;

// Re-export public types
pub use types::{
    AppConfig, Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
};

impl Config {
    /// Load configuration from the default "config.toml" location.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension).
    /// Environment variables prefixed with `FRAMEWORK_` override file
    /// values, e.g. `FRAMEWORK_SERVER.PORT=8080`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("FRAMEWORK"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("app.debug", false)?
            .set_default("app.session_cookie_name", "session")?
            .set_default("app.permanent_session_lifetime_days", 31)?
            .set_default("http.default_content_type", "text/html; charset=utf-8")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.app.session_cookie_name, "session");
        assert!(config.app.secret_key.is_none());
        assert!(!config.app.debug);
        assert!(config.http.default_content_type.starts_with("text/html"));
    }

    #[test]
    fn test_socket_addr_parsing() {
        let config = Config::default();
        let addr = config.get_socket_addr().unwrap();
        assert_eq!(addr.port(), 5000);

        let mut bad = Config::default();
        bad.server.host = "not a host".to_string();
        assert!(bad.get_socket_addr().is_err());
    }
}
