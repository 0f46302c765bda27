//! Configuration management for apicov.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `apicov.toml` file
//! 3. User config `~/.config/apicov/config.toml`
//! 4. Built-in defaults (lowest priority)
//!
//! Command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

use crate::admission::OverflowPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Webhook server configuration.
    pub server: ServerConfig,

    /// Intake queue configuration.
    pub intake: IntakeConfig,

    /// Schema catalog, rules and ignored fields.
    pub coverage: CoverageConfig,

    /// Cluster registration configuration.
    pub webhook: WebhookConfig,

    /// Collect client configuration.
    pub client: ClientConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./apicov.toml` (project local)
    /// 2. `~/.config/apicov/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        // Try project-local config first
        if Path::new("apicov.toml").exists() {
            return Self::from_file("apicov.toml");
        }

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("apicov").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path when one is given, else from the default
    /// locations.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(bind) = var("APICOV_BIND_ADDRESS") {
            self.server.bind_address = bind;
        }
        if let Some(port) = var("APICOV_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(cert) = var("APICOV_TLS_CERT_FILE") {
            self.server.tls_cert_file = Some(cert);
        }
        if let Some(key) = var("APICOV_TLS_KEY_FILE") {
            self.server.tls_key_file = Some(key);
        }

        // Intake overrides
        if let Some(capacity) = var("APICOV_QUEUE_CAPACITY").and_then(|c| c.parse().ok()) {
            self.intake.queue_capacity = capacity;
        }
        if let Some(policy) = var("APICOV_OVERFLOW").and_then(|p| parse_overflow(&p)) {
            self.intake.overflow = policy;
        }

        // Coverage overrides
        if let Some(catalog) = var("APICOV_CATALOG") {
            self.coverage.catalog = Some(catalog);
        }
        if let Some(rules) = var("APICOV_RULES") {
            self.coverage.rules = Some(rules);
        }
        if let Some(dir) = var(KO_DATA_PATH_ENV) {
            self.coverage.data_dir = dir;
        }

        // Client overrides
        if let Some(dir) = var(ARTIFACTS_ENV) {
            self.client.artifacts_dir = dir;
        }
        if let Some(uri) = var("APICOV_WEBHOOK_URI") {
            self.client.webhook_uri = Some(uri);
        }

        // Logging overrides
        if let Some(level) = var("APICOV_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("APICOV_LOG_FORMAT").and_then(|f| parse_log_format(&f)) {
            self.logging.format = format;
        }
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intake.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "intake.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be at least 1".to_string(),
            ));
        }
        if self.server.tls_cert_file.is_some() != self.server.tls_key_file.is_some() {
            return Err(ConfigError::Invalid(
                "server.tls_cert_file and server.tls_key_file must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_overflow(value: &str) -> Option<OverflowPolicy> {
    match value {
        "block" => Some(OverflowPolicy::Block),
        "drop-newest" => Some(OverflowPolicy::DropNewest),
        _ => None,
    }
}

fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value {
        "json" => Some(LogFormat::Json),
        "pretty" => Some(LogFormat::Pretty),
        _ => None,
    }
}

/// Webhook server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_address: String,

    /// Port to listen on.
    pub port: u16,

    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,

    /// PEM certificate chain served to the API server. Plain HTTP when unset.
    pub tls_cert_file: Option<String>,

    /// PEM private key for `tls_cert_file`.
    pub tls_key_file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            tls_cert_file: None,
            tls_key_file: None,
        }
    }
}

impl ServerConfig {
    /// `address:port` to bind.
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Certificate and key paths, when both are configured.
    pub fn tls_files(&self) -> Option<TlsFiles> {
        match (&self.tls_cert_file, &self.tls_key_file) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            _ => None,
        }
    }
}

/// PEM files for the webhook's TLS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Intake queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Maximum queued record requests.
    pub queue_capacity: usize,

    /// What to do when the queue is full: "block" or "drop-newest".
    pub overflow: OverflowPolicy,

    /// Upper bound on waiting for room under the "block" policy.
    pub block_timeout_ms: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowPolicy::default(),
            block_timeout_ms: DEFAULT_BLOCK_TIMEOUT_MS,
        }
    }
}

impl IntakeConfig {
    pub fn block_timeout(&self) -> Duration {
        Duration::from_millis(self.block_timeout_ms)
    }
}

/// Schema catalog, rules and ignored fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Custom catalog file. The built-in catalog is used when unset.
    pub catalog: Option<String>,

    /// Extra rules file, consulted before the built-in rules.
    pub rules: Option<String>,

    /// Directory holding bundled data files (`KO_DATA_PATH`).
    pub data_dir: String,

    /// Ignored-fields file name, relative to `data_dir`.
    pub ignored_fields_file: String,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            rules: None,
            data_dir: DEFAULT_DATA_DIR.to_string(),
            ignored_fields_file: DEFAULT_IGNORED_FIELDS_FILE.to_string(),
        }
    }
}

impl CoverageConfig {
    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog.as_ref().map(PathBuf::from)
    }

    pub fn rules_path(&self) -> Option<PathBuf> {
        self.rules.as_ref().map(PathBuf::from)
    }

    /// Full path to the ignored-fields file.
    pub fn ignored_fields_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.ignored_fields_file)
    }
}

/// Cluster registration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Name of the ValidatingWebhookConfiguration.
    pub name: String,

    /// Namespace of the webhook component.
    pub namespace: String,

    /// Name of the webhook's Deployment and Service.
    pub component: String,

    /// Seconds to wait after startup before registering.
    pub registration_delay_secs: u64,

    /// PEM file with the CA bundle the API server uses to trust the webhook.
    pub ca_bundle_file: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_WEBHOOK_NAME.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            component: DEFAULT_COMPONENT.to_string(),
            registration_delay_secs: DEFAULT_REGISTRATION_DELAY_SECS,
            ca_bundle_file: None,
        }
    }
}

impl WebhookConfig {
    pub fn registration_delay(&self) -> Duration {
        Duration::from_secs(self.registration_delay_secs)
    }
}

/// Collect client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Where reports are written (`ARTIFACTS`).
    pub artifacts_dir: String,

    /// Query API base URI. Discovered through the cluster when unset.
    pub webhook_uri: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: DEFAULT_ARTIFACTS_DIR.to_string(),
            webhook_uri: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable, for local runs.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level filter; `RUST_LOG` takes precedence when set.
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.intake.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.intake.overflow, OverflowPolicy::Block);
        assert_eq!(config.webhook.namespace, DEFAULT_NAMESPACE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = Config::default_config_string();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[intake]"));
        assert!(toml_str.contains("[webhook]"));
        assert!(toml_str.contains("overflow = \"block\""));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[server]
port = 9443

[intake]
queue_capacity = 64
overflow = "drop-newest"

[logging]
format = "pretty"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9443);
        assert_eq!(config.server.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.intake.queue_capacity, 64);
        assert_eq!(config.intake.overflow, OverflowPolicy::DropNewest);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_ignored_fields_path() {
        let mut config = CoverageConfig::default();
        config.data_dir = "/var/run/ko".to_string();
        assert_eq!(
            config.ignored_fields_path(),
            PathBuf::from("/var/run/ko/ignoredfields.yaml")
        );
    }
}
