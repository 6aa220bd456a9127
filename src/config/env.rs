//! Environment variable overrides

use super::{AppConfig, ConfigError};

/// Listening port
pub const PORT_VAR: &str = "PORT";
/// Upstream endpoint URL
pub const UPSTREAM_URL_VAR: &str = "RELAY_UPSTREAM_URL";

impl AppConfig {
    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to resolve variable names.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get(PORT_VAR) {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("{} must be a port number, got '{}'", PORT_VAR, port))
            })?;
        }
        if let Some(url) = get(UPSTREAM_URL_VAR) {
            self.upstream.url = url;
        }

        Ok(())
    }
}
