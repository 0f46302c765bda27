use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use apicov_core::config::{
    ConfigError, LogFormat, TlsFiles, DEFAULT_BIND_ADDRESS, DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY,
};
use apicov_core::{Config, OverflowPolicy};
use tempfile::NamedTempFile;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.server.port, DEFAULT_PORT);
    assert_eq!(config.server.bind_address, DEFAULT_BIND_ADDRESS);
    assert_eq!(config.intake.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[intake]
queue_capacity = 32
overflow = "drop-newest"

[coverage]
catalog = "/etc/apicov/catalog.yaml"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.intake.queue_capacity, 32);
    assert_eq!(config.intake.overflow, OverflowPolicy::DropNewest);
    assert_eq!(
        config.coverage.catalog_path().unwrap().to_str(),
        Some("/etc/apicov/catalog.yaml")
    );
}

#[test]
fn test_zero_capacity_is_invalid() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[intake]\nqueue_capacity = 0").unwrap();
    assert!(matches!(
        Config::from_file(file.path()),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_malformed_file_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[server\nport = ").unwrap();
    assert!(matches!(
        Config::from_file(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_overrides() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("APICOV_PORT", "9000"),
        ("APICOV_OVERFLOW", "drop-newest"),
        ("APICOV_LOG_FORMAT", "pretty"),
        ("KO_DATA_PATH", "/var/run/ko"),
        ("ARTIFACTS", "/logs/artifacts"),
        ("APICOV_QUEUE_CAPACITY", "not-a-number"),
    ]);

    let mut config = Config::default();
    config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

    assert_eq!(config.server.port, 9000);
    assert_eq!(config.intake.overflow, OverflowPolicy::DropNewest);
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(
        config.coverage.ignored_fields_path().to_str(),
        Some("/var/run/ko/ignoredfields.yaml")
    );
    assert_eq!(config.client.artifacts_dir, "/logs/artifacts");
    // unparsable values are skipped
    assert_eq!(config.intake.queue_capacity, DEFAULT_QUEUE_CAPACITY);
}

#[test]
fn test_tls_files_from_toml_and_env() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[server]\ntls_cert_file = \"/etc/webhook/tls.crt\"\ntls_key_file = \"/etc/webhook/tls.key\""
    )
    .unwrap();
    let mut config = Config::from_file(file.path()).unwrap();
    assert_eq!(
        config.server.tls_files(),
        Some(TlsFiles {
            cert: PathBuf::from("/etc/webhook/tls.crt"),
            key: PathBuf::from("/etc/webhook/tls.key"),
        })
    );

    let vars: HashMap<&str, &str> = HashMap::from([("APICOV_TLS_KEY_FILE", "/run/key.pem")]);
    config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));
    assert_eq!(
        config.server.tls_files().unwrap().key,
        PathBuf::from("/run/key.pem")
    );

    assert!(Config::default().server.tls_files().is_none());
}

#[test]
fn test_tls_cert_without_key_is_invalid() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[server]\ntls_cert_file = \"/etc/webhook/tls.crt\"").unwrap();
    assert!(matches!(
        Config::from_file(file.path()),
        Err(ConfigError::Invalid(message)) if message.contains("tls_key_file")
    ));
}
