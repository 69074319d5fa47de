use thiserror::Error;

/// Top-level error type for the `petwatch-api` crate.
///
/// Covers every failure mode of the remote service: authentication,
/// transport, HTTP status, GraphQL application errors, and malformed bodies.
/// `petwatch-core` maps these into the scheduler's error classes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed, the login response carried no session, or the
    /// service rejected the current session (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server status ───────────────────────────────────────────────
    /// The service answered with one of the server-busy statuses.
    #[error("Service temporarily unavailable (HTTP {status})")]
    ServerBusy { status: u16 },

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // ── Application ─────────────────────────────────────────────────
    /// The GraphQL response carried an `errors` array.
    #[error("GraphQL error: {message}")]
    GraphQl { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Statuses the service returns while it is overloaded or restarting.
pub const SERVER_BUSY_STATUSES: [u16; 3] = [502, 503, 504];

impl Error {
    /// Returns `true` if this error indicates the session is missing or
    /// rejected and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        match self {
            Self::Authentication { .. } => true,
            Self::Transport(e) => matches!(e.status().map(|s| s.as_u16()), Some(401 | 403)),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::ServerBusy { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Map a non-success HTTP status into the matching error variant.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let preview: String = body.chars().take(200).collect();
        match code {
            401 | 403 => Self::Authentication {
                message: format!("session rejected (HTTP {code})"),
            },
            c if SERVER_BUSY_STATUSES.contains(&c) => Self::ServerBusy { status: c },
            _ => Self::Http {
                status: code,
                message: preview,
            },
        }
    }
}
