//! Configuration loading and constants.
//!
//! Loads application configuration from TOML files and defines constants for
//! the HTTP server, the OpenAPI document locations, request validation and
//! logging. `AppConfig` is the root configuration struct containing all settings.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// HTTP Server
// =============================================================================

/// Default bind address
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";

/// Default listening port
pub const DEFAULT_HTTP_PORT: u16 = 9200;

/// Time in seconds in-flight requests get to finish after a shutdown signal
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Cache-Control value applied to every API response
pub const CACHE_CONTROL_API: &str = "no-store";

// =============================================================================
// OpenAPI Documents
// =============================================================================

/// OpenAPI document describing the records variant of the API
pub const DEFAULT_RECORDS_SPEC_PATH: &str = "openapi/openapi.yml";

/// OpenAPI document describing the errors variant of the API
pub const DEFAULT_ERRORS_SPEC_PATH: &str = "openapi/openapi-errors.yml";

/// Upper bound for one request/response validation round trip
pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest request or response body buffered during validation (1 MiB)
pub const MAX_VALIDATED_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default env file, loaded before anything else
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable that may point at the configuration file
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "routecheck=info,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Which set of endpoints to expose
    #[serde(default)]
    pub api: ApiConfig,
    /// OpenAPI document settings
    #[serde(default)]
    pub openapi: OpenApiConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Grace window for in-flight requests once shutdown starts
    #[serde(default = "HttpServerConfig::default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            shutdown_grace_seconds: Self::default_shutdown_grace(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    fn default_shutdown_grace() -> u64 {
        DEFAULT_SHUTDOWN_GRACE_SECS
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

/// Endpoint set exposed under `/api`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiVariant {
    /// `ping` and `get-record/{id}`
    #[default]
    Records,
    /// `ping`, `not-found` and `internal-server-error`
    Errors,
}

impl ApiVariant {
    /// OpenAPI document shipped for this variant
    pub fn default_spec_path(self) -> &'static str {
        match self {
            ApiVariant::Records => DEFAULT_RECORDS_SPEC_PATH,
            ApiVariant::Errors => DEFAULT_ERRORS_SPEC_PATH,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub variant: ApiVariant,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiConfig {
    /// Document to check routes against. Defaults to the variant's document.
    pub spec_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpServerConfig::default(),
            api: ApiConfig::default(),
            openapi: OpenApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;

        if config.http.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "http.host must not be empty".to_string(),
            ));
        }

        if !matches!(config.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::Validation(format!(
                "logging.format must be \"text\" or \"json\", got \"{}\"",
                config.logging.format
            )));
        }

        Ok(config)
    }

    /// OpenAPI document for the configured variant, explicit path first.
    pub fn spec_path(&self) -> PathBuf {
        self.openapi
            .spec_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.api.variant.default_spec_path()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
