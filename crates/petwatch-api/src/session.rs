use secrecy::{ExposeSecret, SecretString};

/// Credential pair returned by a successful login.
///
/// Replaced wholesale on every re-login; never mutated in place, so a
/// request that captured a session keeps using it consistently.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub session_id: SecretString,
}

impl Session {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: SecretString::from(session_id.into()),
        }
    }

    /// The raw session id, for the rare caller that needs to forward it.
    pub fn expose_session_id(&self) -> &str {
        self.session_id.expose_secret()
    }
}
