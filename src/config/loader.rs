use std::path::Path;

use super::{AppConfig, ConfigError};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&content)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_missing_config() {
        let result = load_config("/nonexistent/config.yaml");
        assert!(matches!(result.unwrap_err(), ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let file = write_config("invalid: yaml: content: [");

        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_valid() {
        let file = write_config(
            r#"
server:
  port: 18066
  host: "127.0.0.1"

upstream:
  url: "http://127.0.0.1:18080/process"
  timeout_seconds: 30

uploads:
  dir: "/tmp/relay-uploads"
  field_name: "files"

static_files:
  enabled: false

cors:
  enabled: false

stats:
  enabled: true
  format: "json"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 18066);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.upstream.url, "http://127.0.0.1:18080/process");
        assert_eq!(config.upstream.timeout_seconds, 30);
        assert_eq!(config.uploads.dir, std::path::PathBuf::from("/tmp/relay-uploads"));
        assert!(!config.static_files.enabled);
        assert!(!config.cors.enabled);
        assert_eq!(config.stats.format, crate::config::StatsFormat::Json);
    }

    #[test]
    fn test_load_config_empty_document_uses_defaults() {
        let file = write_config("{}\n");

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.uploads.field_name, "files");
    }

    #[test]
    fn test_config_from_file() {
        let result = AppConfig::from_file("/nonexistent/path.yaml");
        assert!(result.is_err());
    }
}
