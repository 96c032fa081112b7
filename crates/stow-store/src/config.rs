//! Store configuration.
//!
//! Configuration can be built in code, through [`StoreConfig::builder`], or
//! loaded from TOML:
//!
//! ```toml
//! conn = "data/objects.db"
//! busy_timeout_ms = 2000
//! provision_policy = "missing_table_only"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Decides which statement failures trigger provisioning of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionPolicy {
    /// Any failure is treated as a missing table.
    #[default]
    AnyFailure,
    /// Only the engine's "no such table" failure triggers provisioning;
    /// anything else is returned as is.
    MissingTableOnly,
}

impl ProvisionPolicy {
    /// Returns true if `err` should be answered by provisioning the table.
    pub fn should_provision(self, err: &rusqlite::Error) -> bool {
        match self {
            ProvisionPolicy::AnyFailure => true,
            ProvisionPolicy::MissingTableOnly => is_missing_table(err),
        }
    }
}

fn is_missing_table(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.starts_with("no such table"),
        _ => false,
    }
}

/// Configuration for a [`SqliteStore`](crate::SqliteStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection descriptor: a path, `:memory:`, or a `file:` URI.
    #[serde(default = "default_conn")]
    pub conn: String,

    /// How long to wait on a locked database before failing, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Which failures trigger provisioning.
    #[serde(default)]
    pub provision_policy: ProvisionPolicy,

    /// Engine steps between context checks while a statement runs.
    #[serde(default = "default_progress_ops")]
    pub progress_ops: i32,
}

fn default_conn() -> String {
    ":memory:".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_progress_ops() -> i32 {
    1000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            conn: default_conn(),
            busy_timeout_ms: default_busy_timeout_ms(),
            provision_policy: ProvisionPolicy::default(),
            progress_ops: default_progress_ops(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the given connection descriptor.
    pub fn new(conn: impl Into<String>) -> Self {
        Self {
            conn: conn.into(),
            ..Default::default()
        }
    }

    /// Parses a configuration from TOML.
    pub fn from_toml_str(content: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Checks the configuration for values the engine cannot use.
    pub fn validate(&self) -> StoreResult<()> {
        if self.conn.is_empty() {
            return Err(StoreError::Config("conn must not be empty".to_string()));
        }
        if self.progress_ops <= 0 {
            return Err(StoreError::Config(format!(
                "progress_ops must be positive, got {}",
                self.progress_ops
            )));
        }
        Ok(())
    }

    /// Returns a builder for configuration.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }
}

/// Builder for [`StoreConfig`].
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Sets the connection descriptor.
    pub fn conn(mut self, conn: impl Into<String>) -> Self {
        self.config.conn = conn.into();
        self
    }

    /// Sets the busy timeout in milliseconds.
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.config.busy_timeout_ms = ms;
        self
    }

    /// Sets the provisioning policy.
    pub fn provision_policy(mut self, policy: ProvisionPolicy) -> Self {
        self.config.provision_policy = policy;
        self
    }

    /// Sets the number of engine steps between context checks.
    pub fn progress_ops(mut self, ops: i32) -> Self {
        self.config.progress_ops = ops;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> StoreConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.conn, ":memory:");
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.provision_policy, ProvisionPolicy::AnyFailure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::builder()
            .conn("objects.db")
            .busy_timeout_ms(10)
            .provision_policy(ProvisionPolicy::MissingTableOnly)
            .progress_ops(50)
            .build();

        assert_eq!(config.conn, "objects.db");
        assert_eq!(config.busy_timeout_ms, 10);
        assert_eq!(config.provision_policy, ProvisionPolicy::MissingTableOnly);
        assert_eq!(config.progress_ops, 50);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            conn = "data/objects.db"
            provision_policy = "missing_table_only"
        "#;

        let config = StoreConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.conn, "data/objects.db");
        assert_eq!(config.provision_policy, ProvisionPolicy::MissingTableOnly);
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.toml");
        std::fs::write(&path, "busy_timeout_ms = 42\n").unwrap();

        let config = StoreConfig::from_file(&path).unwrap();
        assert_eq!(config.busy_timeout_ms, 42);
        assert_eq!(config.conn, ":memory:");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            StoreConfig::new("").validate(),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str("progress_ops = 0"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str("provision_policy = \"sometimes\""),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_policy_matching() {
        let missing = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some("no such table: widgets".to_string()),
        );
        let syntax = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some("near \"SELEC\": syntax error".to_string()),
        );

        assert!(ProvisionPolicy::AnyFailure.should_provision(&missing));
        assert!(ProvisionPolicy::AnyFailure.should_provision(&syntax));
        assert!(ProvisionPolicy::MissingTableOnly.should_provision(&missing));
        assert!(!ProvisionPolicy::MissingTableOnly.should_provision(&syntax));
    }
}
