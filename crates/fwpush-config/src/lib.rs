#![deny(unsafe_code)]

//! Project configuration for fwpush.
//!
//! Loads `fwpush.toml` and validates it. The [`AppConfig`] type carries the
//! project options the post-build hook consumes (`upload_port` and the two
//! custom credential keys), the build output location, and logging settings.
//!
//! ## TOML Example
//!
//! ```toml
//! [project]
//! upload_port = "192.0.2.5"
//! custom_upload_user = "admin"
//! custom_upload_password = "secret"
//!
//! [build]
//! build_dir = ".pio/build/esp32dev"
//! program_name = "firmware"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

/// Environment variable consulted when `custom_upload_password` is not set.
pub const PASSWORD_ENV: &str = "FWPUSH_UPLOAD_PASSWORD";

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "fwpush.toml";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level project configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Device connection options.
    #[serde(default)]
    pub project: ProjectConfig,

    /// Build output location.
    #[serde(default)]
    pub build: BuildConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device connection options, named after the PlatformIO project options
/// they replace.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Device address (`host` or `host:port`).
    #[serde(default)]
    pub upload_port: Option<String>,

    /// Basic-auth username.
    #[serde(default)]
    pub custom_upload_user: Option<String>,

    /// Basic-auth password. Never serialized in clear text.
    #[serde(default, serialize_with = "serialize_redacted")]
    pub custom_upload_password: Option<String>,
}

fn serialize_redacted<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => s.serialize_some("[REDACTED]"),
        None => s.serialize_none(),
    }
}

impl ProjectConfig {
    /// The upload password, falling back to [`PASSWORD_ENV`].
    pub fn upload_password(&self) -> Option<String> {
        self.upload_password_or(std::env::var(PASSWORD_ENV).ok())
    }

    /// The upload password, falling back to `fallback` when unset.
    pub fn upload_password_or(&self, fallback: Option<String>) -> Option<String> {
        self.custom_upload_password.clone().or(fallback)
    }
}

/// Where the build tool leaves its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Build output directory.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Program name; the firmware image is `<build_dir>/<program_name>.bin`.
    #[serde(default = "default_program_name")]
    pub program_name: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            program_name: default_program_name(),
        }
    }
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_program_name() -> String {
    "firmware".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "Loaded project configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Presence of the connection options is checked by the post-build hook
    /// at call time; here only their shape is checked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(port) = &self.project.upload_port {
            if port.contains("://") || port.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "project.upload_port must be a host or host:port, got {port:?}"
                )));
            }
        }
        if self.build.program_name.is_empty() {
            return Err(ConfigError::Validation(
                "build.program_name must not be empty".to_string(),
            ));
        }
        if self.build.program_name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "build.program_name must be a file stem, got {:?}",
                self.build.program_name
            )));
        }
        if self.build.build_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "build.build_dir must not be empty".to_string(),
            ));
        }
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.project.upload_port.is_none());
        assert_eq!(config.build.build_dir, PathBuf::from("build"));
        assert_eq!(config.build.program_name, "firmware");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.build.program_name, "firmware");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [project]
            upload_port = "192.0.2.5"
            custom_upload_user = "admin"
            custom_upload_password = "secret"

            [build]
            build_dir = ".pio/build/esp32dev"
            program_name = "ebus"

            [logging]
            level = "debug"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.project.upload_port.as_deref(), Some("192.0.2.5"));
        assert_eq!(config.project.custom_upload_user.as_deref(), Some("admin"));
        assert_eq!(config.project.upload_password_or(None).as_deref(), Some("secret"));
        assert_eq!(config.build.build_dir, PathBuf::from(".pio/build/esp32dev"));
        assert_eq!(config.build.program_name, "ebus");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_upload_port_with_port_number() {
        let toml = r#"
            [project]
            upload_port = "esp32.local:8080"
        "#;
        assert!(AppConfig::parse(toml).is_ok());
    }

    #[test]
    fn test_validation_rejects_url_upload_port() {
        let toml = r#"
            [project]
            upload_port = "http://192.0.2.5/firmware"
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("upload_port"));
    }

    #[test]
    fn test_validation_rejects_empty_program_name() {
        let toml = r#"
            [build]
            program_name = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let toml = r#"
            [logging]
            level = "loud"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_password_fallback() {
        let project = ProjectConfig::default();
        assert_eq!(project.upload_password_or(None), None);
        assert_eq!(
            project.upload_password_or(Some("from-env".to_string())).as_deref(),
            Some("from-env")
        );

        let project = ProjectConfig {
            custom_upload_password: Some("from-file".to_string()),
            ..Default::default()
        };
        assert_eq!(
            project.upload_password_or(Some("from-env".to_string())).as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn test_serialized_config_redacts_password() {
        let config = AppConfig::parse(
            r#"
            [project]
            custom_upload_user = "admin"
            custom_upload_password = "hunter2"
        "#,
        )
        .unwrap();
        let out = toml::to_string_pretty(&config).unwrap();
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("hunter2"));
        assert!(out.contains("admin"));
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        tokio::fs::write(&path, b"[project]\nupload_port = \"10.0.0.7\"\n")
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.project.upload_port.as_deref(), Some("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/fwpush.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[").await.unwrap();

        let result = AppConfig::load(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }
}
