//! Configuration builders for tests.

use std::path::Path;

use fwpush_config::AppConfig;
use toml::{Table, Value};

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .device("127.0.0.1:8080", "admin", "secret")
///     .build_dir(fixture.build_dir())
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Set all three connection options.
    pub fn device(mut self, address: &str, user: &str, password: &str) -> Self {
        self.config.project.upload_port = Some(address.to_string());
        self.config.project.custom_upload_user = Some(user.to_string());
        self.config.project.custom_upload_password = Some(password.to_string());
        self
    }

    pub fn upload_port(mut self, address: &str) -> Self {
        self.config.project.upload_port = Some(address.to_string());
        self
    }

    pub fn build_dir(mut self, dir: &Path) -> Self {
        self.config.build.build_dir = dir.to_path_buf();
        self
    }

    pub fn program_name(mut self, name: &str) -> Self {
        self.config.build.program_name = name.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }

    /// Render as TOML with the password in clear text, for writing config
    /// files that a test binary will load.
    pub fn to_toml(&self) -> String {
        let project = &self.config.project;
        let mut project_table = Table::new();
        for (key, value) in [
            ("upload_port", &project.upload_port),
            ("custom_upload_user", &project.custom_upload_user),
            ("custom_upload_password", &project.custom_upload_password),
        ] {
            if let Some(v) = value {
                project_table.insert(key.to_string(), Value::String(v.clone()));
            }
        }

        let mut build = Table::new();
        build.insert(
            "build_dir".to_string(),
            Value::String(self.config.build.build_dir.display().to_string()),
        );
        build.insert(
            "program_name".to_string(),
            Value::String(self.config.build.program_name.clone()),
        );

        let mut logging = Table::new();
        logging.insert(
            "level".to_string(),
            Value::String(self.config.logging.level.clone()),
        );

        let mut root = Table::new();
        root.insert("project".to_string(), Value::Table(project_table));
        root.insert("build".to_string(), Value::Table(build));
        root.insert("logging".to_string(), Value::Table(logging));
        toml::to_string(&root).expect("string tables always serialize")
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
