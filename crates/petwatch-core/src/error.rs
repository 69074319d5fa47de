// ── Core error types ──
//
// The scheduler's error classes. Consumers never see HTTP status codes or
// JSON parse failures directly: the `From<petwatch_api::Error>` impl sorts
// transport-layer errors into the class that decides how a poll reacts.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote errors (poll failure policy keys off these) ───────────
    /// Bad credentials, no session returned, or session rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The service is temporarily unavailable (busy status, timeout,
    /// connection failure). Absorbed by the scheduler.
    #[error("Service temporarily unavailable: {message}")]
    Transient { message: String },

    /// Any other application-level failure reported by the service.
    #[error("Remote error: {message}")]
    Remote {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    /// The response was missing fields or could not be parsed.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    // ── Local errors ─────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Monitor has been shut down")]
    MonitorStopped,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<petwatch_api::Error> for CoreError {
    fn from(err: petwatch_api::Error) -> Self {
        if err.is_auth_expired() {
            return Self::Authentication {
                message: err.to_string(),
            };
        }
        if err.is_transient() {
            return Self::Transient {
                message: err.to_string(),
            };
        }
        match err {
            petwatch_api::Error::Deserialization { message, body: _ } => {
                Self::MalformedResponse { message }
            }
            petwatch_api::Error::Http { status, message } => Self::Remote {
                message,
                status: Some(status),
            },
            petwatch_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            petwatch_api::Error::Transport(ref e) => Self::Remote {
                message: err.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            other => Self::Remote {
                message: other.to_string(),
                status: None,
            },
        }
    }
}
