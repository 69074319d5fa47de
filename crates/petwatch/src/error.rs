//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use petwatch_config::ConfigError;
use petwatch_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(petwatch::auth_failed),
        help(
            "Verify the account e-mail and password.\n\
             The password is read from PETWATCH_PASSWORD, then the system keyring \
             (service 'petwatch'), then the config file."
        )
    )]
    AuthFailed { message: String },

    #[error("No {missing} configured")]
    #[diagnostic(
        code(petwatch::no_credentials),
        help(
            "Set 'username' in the config file (see: petwatch config path)\n\
             and provide the password via PETWATCH_PASSWORD or the system keyring."
        )
    )]
    NoCredentials { missing: &'static str },

    // ── Resources ────────────────────────────────────────────────────

    #[error("Pet '{identifier}' not found")]
    #[diagnostic(
        code(petwatch::not_found),
        help("Run: petwatch pets to see available pets")
    )]
    NotFound { identifier: String },

    // ── Remote service ───────────────────────────────────────────────

    #[error("Collar service unavailable: {message}")]
    #[diagnostic(
        code(petwatch::unavailable),
        help("The service is busy or unreachable. Try again in a minute.")
    )]
    Unavailable { message: String },

    #[error("Collar service error: {message}")]
    #[diagnostic(code(petwatch::api_error))]
    Api { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(petwatch::validation))]
    Validation { field: String, reason: String },

    #[error("Could not load configuration: {message}")]
    #[diagnostic(
        code(petwatch::config),
        help("Check the file at: petwatch config path")
    )]
    Config { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(petwatch::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(petwatch::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unavailable { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::Config { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Authentication { message } => Self::AuthFailed { message },
            CoreError::Transient { message } => Self::Unavailable { message },
            CoreError::DeviceNotFound { identifier } => Self::NotFound { identifier },
            CoreError::Config { message } => Self::Config { message },
            other @ (CoreError::Remote { .. }
            | CoreError::MalformedResponse { .. }
            | CoreError::MonitorStopped) => Self::Api {
                message: other.to_string(),
            },
        }
    }
}

impl From<petwatch_api::Error> for CliError {
    fn from(err: petwatch_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { missing } => Self::NoCredentials { missing },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
