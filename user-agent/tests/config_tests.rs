//! Integration tests for configuration loading.

use std::io::Write;

use agent::config::{self, ConfigError};
use log::LevelFilter;
use tempfile::NamedTempFile;

fn write_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[test]
fn full_file_is_loaded() {
    let file = write_config(
        r#"
[logging]
enable = true
file = "bridge.log"
level = "debug"

[mount]
version = 99
thread_count = 2
max_open_handles = 16
mount_point = "Z:\\"
"#,
    );

    let cfg = config::load(file.path()).unwrap();
    assert!(cfg.logging.enable);
    assert_eq!(cfg.logging.file.as_deref(), Some("bridge.log"));
    assert_eq!(cfg.logging.level_filter().unwrap(), LevelFilter::Debug);
    assert_eq!(cfg.mount.version, 99);
    assert_eq!(cfg.mount.thread_count, 2);
    assert_eq!(cfg.mount.max_open_handles, 16);
    assert_eq!(cfg.mount.mount_point, "Z:\\");
}

#[test]
fn missing_tables_use_defaults() {
    let cfg = config::load_from_str("").unwrap();
    assert!(!cfg.logging.enable);
    assert_eq!(cfg.logging.level, "INFO");
    assert_eq!(cfg.mount.version, 110);
    assert_eq!(cfg.mount.thread_count, 4);
    assert_eq!(cfg.mount.max_open_handles, 4096);
}

#[test]
fn shipped_default_toml_parses() {
    let cfg = config::load(std::path::Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/default.toml"))).unwrap();
    assert_eq!(cfg.mount.version, 110);
    assert_eq!(cfg.logging.level_filter().unwrap(), LevelFilter::Debug);
}

#[test]
fn bad_values_are_reported() {
    let err = config::load_from_str("[logging]\nlevel = \"chatty\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLevel(_)), "{err}");

    let err = config::load_from_str("[mount]\nthread_count = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidMount(_)), "{err}");

    let err = config::load_from_str("[mount]\nmax_open_handles = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidMount(_)), "{err}");

    let err = config::load_from_str("[mount]\nversion = \"x\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = config::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn unknown_mount_keys_are_rejected() {
    let err = config::load_from_str("[mount]\nkeepalive = \"1m\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");
    assert!(err.to_string().contains("keepalive"), "{err}");
}
