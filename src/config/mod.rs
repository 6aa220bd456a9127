mod env;
mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use loader::load_config;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Relay listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    5000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Upstream processing service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Full endpoint URL the uploads are posted to
    #[serde(default = "default_upstream_url")]
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// TLS configuration options
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS configuration for upstream connections
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Accept invalid certificates (self-signed, expired)
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Path to custom CA certificate (PEM format)
    pub ca_cert_path: Option<String>,
}

fn default_upstream_url() -> String {
    "https://flask-backend-2pfq.onrender.com/process".to_string()
}

fn default_timeout() -> u64 {
    300
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_seconds: default_timeout(),
            tls: None,
        }
    }
}

impl UpstreamConfig {
    /// Returns true if the URL uses HTTPS
    pub fn is_tls(&self) -> bool {
        self.url.to_lowercase().starts_with("https://")
    }
}

/// Where and how inbound uploads are staged
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadsConfig {
    /// Directory holding staged files while a request is in flight
    #[serde(default = "default_uploads_dir")]
    pub dir: PathBuf,
    /// Multipart field name carrying the files, inbound and outbound
    #[serde(default = "default_field_name")]
    pub field_name: String,
    /// Cap on the whole inbound request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_field_name() -> String {
    "files".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024 * 100
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
            field_name: default_field_name(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Static asset serving
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticFilesConfig {
    #[serde(default = "default_static_enabled")]
    pub enabled: bool,
    #[serde(default = "default_static_dir")]
    pub dir: PathBuf,
}

fn default_static_enabled() -> bool {
    true
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: default_static_enabled(),
            dir: default_static_dir(),
        }
    }
}

/// Cross-origin policy. When enabled every origin, method and header is allowed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,
}

fn default_cors_enabled() -> bool {
    true
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_cors_enabled(),
        }
    }
}

/// Stats logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub format: StatsFormat,
}

fn default_stats_enabled() -> bool {
    true
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: default_stats_enabled(),
            format: StatsFormat::default(),
        }
    }
}

/// Stats output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    Pretty,
    Json,
    #[default]
    Compact,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load configuration, falling back to built-in defaults when no file exists
    /// at any of the default locations. An explicit path must exist.
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::from_file(path),
            None => {
                let default_paths = ["config.yaml", "config.yml", "./config/config.yaml"];
                for p in default_paths {
                    let path = Path::new(p);
                    if path.exists() {
                        return Self::from_file(path);
                    }
                }
                tracing::debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check the values that the relay cannot start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.upstream.url).map_err(|e| {
            ConfigError::Validation(format!("invalid upstream url '{}': {}", self.upstream.url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "upstream url must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if self.upstream.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "upstream.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.uploads.field_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "uploads.field_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.upstream.url, "https://flask-backend-2pfq.onrender.com/process");
        assert_eq!(config.uploads.field_name, "files");
        assert_eq!(config.uploads.dir, PathBuf::from("uploads"));
        assert_eq!(config.static_files.dir, PathBuf::from("public"));
        assert!(config.cors.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_upstream_is_tls() {
        let mut upstream = UpstreamConfig::default();
        assert!(upstream.is_tls());

        upstream.url = "http://localhost:8080/process".to_string();
        assert!(!upstream.is_tls());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = AppConfig::default();
        config.upstream.url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let mut config = AppConfig::default();
        config.upstream.url = "ftp://example.com/process".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.upstream.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_field_name() {
        let mut config = AppConfig::default();
        config.uploads.field_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stats_format_serde() {
        assert_eq!(serde_json::to_string(&StatsFormat::Pretty).unwrap(), "\"pretty\"");
        assert_eq!(serde_json::to_string(&StatsFormat::Json).unwrap(), "\"json\"");
        assert_eq!(serde_json::to_string(&StatsFormat::Compact).unwrap(), "\"compact\"");

        let pretty: StatsFormat = serde_json::from_str("\"pretty\"").unwrap();
        assert_eq!(pretty, StatsFormat::Pretty);
        assert_eq!(StatsFormat::default(), StatsFormat::Compact);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound("test.yaml".to_string());
        assert!(err.to_string().contains("test.yaml"));

        let err = ConfigError::Parse(serde_yaml::from_str::<AppConfig>("- a\n- b").unwrap_err());
        assert!(err.to_string().contains("parse"));

        let err = ConfigError::Validation("invalid URL".to_string());
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_load_or_default_with_missing_path() {
        let result = AppConfig::load_or_default(Some(Path::new("/nonexistent/config.yaml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: AppConfig = serde_yaml::from_str("server:\n  port: 7000\n").unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.upstream.timeout_seconds, 300);
        assert_eq!(config.uploads.max_body_bytes, 100 * 1024 * 1024);
    }
}
