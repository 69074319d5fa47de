#![allow(clippy::unwrap_used)]

// Every test runs inside a figment `Jail`: jails are serialized, so env
// set by one test never leaks into another's load.

use std::path::PathBuf;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;

use petwatch_config::{Config, ConfigError, DEFAULT_API_URL, load_config_from, save_config_to};
use petwatch_core::EscapeAlertType;

fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn file_values_override_defaults() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
username = "owner@example.com"
polling_interval = 120
escape_alert_type = "motion"
ignored_pets = ["Biscuit"]
"#,
        );

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.username.as_deref(), Some("owner@example.com"));
        assert_eq!(cfg.polling_interval, 120);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.escape_confirmations, 2);
        assert_eq!(cfg.escape_check_interval, 30);

        let monitor = cfg.monitor_config().unwrap();
        assert_eq!(monitor.polling_interval, Duration::from_secs(120));
        assert_eq!(monitor.escape_alert_type, EscapeAlertType::Motion);
        assert!(monitor.is_ignored("biscuit"));
        Ok(())
    });
}

#[test]
fn missing_file_yields_defaults() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        Ok(())
    });
}

#[test]
fn invalid_file_values_are_rejected() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "escape_confirmations = 0\n");

        let err = load_config_from(&path).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "escape_confirmations")
        );
        Ok(())
    });
}

#[test]
fn malformed_toml_is_a_loading_error() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "polling_interval = \"soon\"\n");

        assert!(matches!(load_config_from(&path), Err(ConfigError::Figment(_))));
        Ok(())
    });
}

#[test]
fn saved_config_loads_back() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            username: Some("owner@example.com".into()),
            timeout: 10,
            ignored_pets: vec!["Rex".into(), "Fido".into()],
            ..Config::default()
        };

        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
        Ok(())
    });
}

#[test]
fn environment_overrides_file_but_not_password() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
username = "owner@example.com"
password = "from-file"
polling_interval = 120
"#,
        )?;
        jail.set_env("PETWATCH_POLLING_INTERVAL", "45");
        jail.set_env("PETWATCH_API_URL", "http://localhost:8080");
        jail.set_env("PETWATCH_PASSWORD", "from-env");

        let path = jail.directory().join("config.toml");
        let cfg = load_config_from(&path).map_err(|e| e.to_string())?;

        assert_eq!(cfg.polling_interval, 45);
        assert_eq!(cfg.api_url, "http://localhost:8080");
        assert_eq!(cfg.password.as_deref(), Some("from-file"));
        Ok(())
    });
}
