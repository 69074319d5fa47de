//! Configuration for petwatch.
//!
//! A single TOML file merged with `PETWATCH_`-prefixed environment
//! variables, credential resolution (env + keyring + plaintext), and
//! translation to `petwatch_core::MonitorConfig`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use petwatch_core::{EscapeAlertType, MonitorConfig};

pub const DEFAULT_API_URL: &str = "https://api.tryfi.com";
pub const ENV_PREFIX: &str = "PETWATCH_";
pub const PASSWORD_ENV: &str = "PETWATCH_PASSWORD";
pub const KEYRING_SERVICE: &str = "petwatch";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {missing} configured")]
    NoCredentials { missing: &'static str },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Account e-mail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Account password (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Main poll interval in seconds.
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,

    /// How a confirmed escape is presented: `leak` or `motion`.
    #[serde(default = "default_alert_type")]
    pub escape_alert_type: String,

    /// Pet names excluded from monitoring (case-insensitive).
    #[serde(default)]
    pub ignored_pets: Vec<String>,

    /// Consecutive escaped readings needed to raise the alarm.
    #[serde(default = "default_confirmations")]
    pub escape_confirmations: u32,

    /// Delay in seconds before a quick recheck of a suspected escape.
    #[serde(default = "default_check_interval")]
    pub escape_check_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            api_url: default_api_url(),
            timeout: default_timeout(),
            polling_interval: default_polling_interval(),
            escape_alert_type: default_alert_type(),
            ignored_pets: Vec::new(),
            escape_confirmations: default_confirmations(),
            escape_check_interval: default_check_interval(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_polling_interval() -> u64 {
    60
}
fn default_alert_type() -> String {
    EscapeAlertType::default().to_string()
}
fn default_confirmations() -> u32 {
    2
}
fn default_check_interval() -> u64 {
    30
}

impl Config {
    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;
        self.alert_type()?;
        if self.timeout == 0 {
            return Err(invalid("timeout", "must be at least 1 second"));
        }
        if self.polling_interval == 0 {
            return Err(invalid("polling_interval", "must be at least 1 second"));
        }
        if self.escape_check_interval == 0 {
            return Err(invalid("escape_check_interval", "must be at least 1 second"));
        }
        if self.escape_confirmations == 0 {
            return Err(invalid("escape_confirmations", "must be at least 1"));
        }
        Ok(())
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self
            .api_url
            .parse()
            .map_err(|e| invalid("api_url", format!("{e}: {}", self.api_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid("api_url", format!("unsupported scheme '{other}'"))),
        }
    }

    pub fn alert_type(&self) -> Result<EscapeAlertType, ConfigError> {
        EscapeAlertType::from_str(&self.escape_alert_type).map_err(|_| {
            invalid(
                "escape_alert_type",
                format!("expected 'leak' or 'motion', got '{}'", self.escape_alert_type),
            )
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Translate to the monitor's runtime settings.
    pub fn monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        self.validate()?;
        Ok(MonitorConfig {
            polling_interval: Duration::from_secs(self.polling_interval),
            escape_confirmations: self.escape_confirmations,
            escape_check_interval: Duration::from_secs(self.escape_check_interval),
            ignored_pets: self.ignored_pets.clone(),
            escape_alert_type: self.alert_type()?,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "petwatch", "petwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("petwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load and validate the config from `path` + environment.
///
/// A missing file is not an error; defaults and env still apply. The
/// password is never read from the environment here, see
/// [`resolve_credentials`].
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["password"]))
        .extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Account credentials ready for the remote client.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Resolve credentials: password from `PETWATCH_PASSWORD`, then the
/// system keyring (service `petwatch`, entry per username), then the
/// plaintext `password` key.
pub fn resolve_credentials(cfg: &Config) -> Result<Credentials, ConfigError> {
    resolve_with(cfg, std::env::var(PASSWORD_ENV).ok(), keyring_password)
}

fn keyring_password(username: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, username)
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

fn resolve_with(
    cfg: &Config,
    env_password: Option<String>,
    keyring: impl FnOnce(&str) -> Option<String>,
) -> Result<Credentials, ConfigError> {
    let username = cfg
        .username
        .clone()
        .filter(|u| !u.trim().is_empty())
        .ok_or(ConfigError::NoCredentials {
            missing: "username",
        })?;

    let password = env_password
        .or_else(|| keyring(&username))
        .or_else(|| cfg.password.clone())
        .filter(|p| !p.is_empty())
        .ok_or(ConfigError::NoCredentials {
            missing: "password",
        })?;

    Ok(Credentials {
        username,
        password: SecretString::from(password),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn with_user() -> Config {
        Config {
            username: Some("owner@example.com".into()),
            password: Some("plain".into()),
            ..Config::default()
        }
    }

    #[test]
    fn env_password_wins_over_keyring_and_file() {
        let creds = resolve_with(&with_user(), Some("from-env".into()), |_| {
            Some("from-keyring".into())
        })
        .unwrap();
        assert_eq!(creds.password.expose_secret(), "from-env");
    }

    #[test]
    fn keyring_wins_over_file() {
        let creds = resolve_with(&with_user(), None, |user| {
            assert_eq!(user, "owner@example.com");
            Some("from-keyring".into())
        })
        .unwrap();
        assert_eq!(creds.password.expose_secret(), "from-keyring");
    }

    #[test]
    fn plaintext_is_the_last_resort() {
        let creds = resolve_with(&with_user(), None, |_| None).unwrap();
        assert_eq!(creds.username, "owner@example.com");
        assert_eq!(creds.password.expose_secret(), "plain");
    }

    #[test]
    fn missing_username_or_password_is_reported() {
        let err = resolve_with(&Config::default(), Some("pw".into()), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { missing: "username" }));

        let cfg = Config {
            password: None,
            ..with_user()
        };
        let err = resolve_with(&cfg, None, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { missing: "password" }));
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let cases = [
            Config {
                polling_interval: 0,
                ..Config::default()
            },
            Config {
                escape_check_interval: 0,
                ..Config::default()
            },
            Config {
                escape_confirmations: 0,
                ..Config::default()
            },
            Config {
                api_url: "not a url".into(),
                ..Config::default()
            },
            Config {
                api_url: "ftp://api.tryfi.com".into(),
                ..Config::default()
            },
            Config {
                escape_alert_type: "siren".into(),
                ..Config::default()
            },
        ];
        for cfg in cases {
            assert!(
                matches!(cfg.validate(), Err(ConfigError::Validation { .. })),
                "{cfg:?} should be rejected"
            );
        }
    }

    #[test]
    fn monitor_config_carries_every_setting() {
        let cfg = Config {
            polling_interval: 90,
            escape_confirmations: 3,
            escape_check_interval: 15,
            ignored_pets: vec!["Rex".into()],
            escape_alert_type: "motion".into(),
            ..Config::default()
        };
        let monitor = cfg.monitor_config().unwrap();
        assert_eq!(monitor.polling_interval, Duration::from_secs(90));
        assert_eq!(monitor.escape_confirmations, 3);
        assert_eq!(monitor.escape_check_interval, Duration::from_secs(15));
        assert_eq!(monitor.escape_alert_type, EscapeAlertType::Motion);
        assert!(monitor.is_ignored("rex"));
    }
}
