//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible
//! defaults for development. In production, configure via environment
//! variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `ADMIN_API_KEY` / `WRITER_API_KEY` / `READONLY_API_KEY`: the static
//!   credential table. Each key maps to a fixed role and permission set.
//!   The development defaults MUST be overridden in production.
//! - `CORS_ALLOWED_ORIGINS`: Comma-separated list of allowed origins
//!   (default: `*` for dev)
//! - `RATE_LIMIT_ENABLED`: Set to `false` to bypass rate limiting
//!   (non-production contexts only)
//! - `DEBUG_MODE`: Disables rate limiting and relaxes error redaction;
//!   never enable in production.

use std::env;

use crate::error::{AppError, AppResult};

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Master switch for the sliding-window rate limiter (default: true).
    /// When false, every rate-limit check allows the request without
    /// consuming any category budget.
    pub rate_limit_enabled: bool,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// API key granting {read, write, delete, admin}
    pub admin_api_key: String,

    /// API key granting {read, write}
    pub writer_api_key: String,

    /// API key granting {read}
    pub readonly_api_key: String,

    /// Comma-separated list of allowed CORS origins
    /// Use "*" to allow all origins (not recommended for production)
    pub cors_allowed_origins: Vec<String>,

    /// Maximum request body size in bytes (default: 10MB)
    /// Enforced before any body parsing is attempted.
    pub max_request_body_size: usize,

    // =========================================================================
    // Development Configuration
    // =========================================================================
    /// Debug mode: bypasses rate limiting, like the rate-limit disable
    /// switch, and enables verbose request logging (default: false)
    pub debug_mode: bool,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any configuration value is
    /// invalid (e.g., non-numeric PORT value).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Rate limiting
            rate_limit_enabled: Self::parse_env("RATE_LIMIT_ENABLED", true)?,

            // Security - development defaults mirror the documented roles;
            // production deployments must override all three
            admin_api_key: env::var("ADMIN_API_KEY")
                .unwrap_or_else(|_| "admin_key_123".to_string()),
            writer_api_key: env::var("WRITER_API_KEY")
                .unwrap_or_else(|_| "writer_key_789".to_string()),
            readonly_api_key: env::var("READONLY_API_KEY")
                .unwrap_or_else(|_| "readonly_key_456".to_string()),
            cors_allowed_origins: Self::parse_cors_origins(),
            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 10 * 1024 * 1024)?, // 10MB

            // Development
            debug_mode: Self::parse_env("DEBUG_MODE", false)?,

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    fn validate(&self) -> AppResult<()> {
        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        for (name, key) in [
            ("ADMIN_API_KEY", &self.admin_api_key),
            ("WRITER_API_KEY", &self.writer_api_key),
            ("READONLY_API_KEY", &self.readonly_api_key),
        ] {
            if key.is_empty() {
                return Err(AppError::ConfigError(format!("{name} must not be empty")));
            }
        }

        // The credential table is keyed by token; duplicate tokens would
        // silently collapse two roles into one
        if self.admin_api_key == self.writer_api_key
            || self.admin_api_key == self.readonly_api_key
            || self.writer_api_key == self.readonly_api_key
        {
            return Err(AppError::ConfigError(
                "API keys must be distinct per role".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if rate limiting is active.
    ///
    /// Debug mode bypasses limiting just like the explicit disable switch.
    pub fn rate_limiting_active(&self) -> bool {
        self.rate_limit_enabled && !self.debug_mode
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Rate limiting
            rate_limit_enabled: true,
            // Security
            admin_api_key: "admin_key_123".to_string(),
            writer_api_key: "writer_key_789".to_string(),
            readonly_api_key: "readonly_key_456".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
            max_request_body_size: 10 * 1024 * 1024, // 10MB
            // Development
            debug_mode: false,
            // Observability
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}
