// Collar service HTTP client
//
// Wraps `reqwest::Client` with session management, URL construction, and
// GraphQL envelope unwrapping. Endpoint methods (pets, location, writes)
// live in `pets.rs` to keep this module focused on transport mechanics.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, trace};
use url::Url;

use crate::error::Error;
use crate::location::LocationCache;
use crate::models::{GraphQlResponse, LoginResponse};
use crate::session::Session;
use crate::transport::TransportConfig;

/// Raw HTTP client for the collar service.
///
/// Logs in lazily, keeps the session cookie in the client's jar, and
/// strips the `{ data, errors }` GraphQL envelope before the caller sees
/// it. Owns the per-pet location cache used to ride out failed fetches.
pub struct PetClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    /// Swapped wholesale on login; `None` until the first successful login
    /// and after the service rejects the session.
    session: ArcSwapOption<Session>,
    locations: LocationCache,
}

impl PetClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// A cookie jar is added if the config doesn't already carry one
    /// (session auth requires cookies).
    pub fn new(
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self::with_client(http, base_url, username, password))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username: username.into(),
            password,
            session: ArcSwapOption::empty(),
            locations: LocationCache::new(),
        }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The account this client logs in as.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn has_session(&self) -> bool {
        self.session.load().is_some()
    }

    /// Forget the current session; the next call logs in again.
    pub fn clear_session(&self) {
        self.session.store(None);
    }

    /// The per-pet location fallback cache.
    pub fn location_cache(&self) -> &LocationCache {
        &self.locations
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Exchange the configured credentials for a session.
    ///
    /// `POST /auth/login` with form-encoded `email` / `password`. The
    /// service also sets a session cookie, which the jar picks up. Safe to
    /// call repeatedly: the last successful call wins.
    pub async fn login(&self) -> Result<Arc<Session>, Error> {
        let url = self.endpoint("/auth/login")?;
        debug!("logging in at {}", url);

        let resp = self
            .http
            .post(url)
            .form(&[
                ("email", self.username.as_str()),
                ("password", self.password.expose_secret()),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(match Error::from_status(status, &body) {
                busy @ Error::ServerBusy { .. } => busy,
                _ => Error::Authentication {
                    message: format!("login failed (HTTP {status})"),
                },
            });
        }

        let parsed: LoginResponse =
            serde_json::from_str(&body).map_err(|e| Error::Authentication {
                message: format!("unreadable login response: {e}"),
            })?;

        if let Some(err) = parsed.error {
            return Err(Error::Authentication {
                message: err.message.unwrap_or_else(|| "login rejected".into()),
            });
        }

        let (Some(user_id), Some(session_id)) = (parsed.user_id, parsed.session_id) else {
            return Err(Error::Authentication {
                message: "no session data returned".into(),
            });
        };

        let session = Arc::new(Session::new(user_id, session_id));
        self.session.store(Some(Arc::clone(&session)));
        info!(user = %session.user_id, "authenticated with collar service");
        Ok(session)
    }

    /// Log in if no session is held yet.
    pub(crate) async fn ensure_authenticated(&self) -> Result<(), Error> {
        if !self.has_session() {
            self.login().await?;
        }
        Ok(())
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    /// Run a GraphQL document and return its `data` payload.
    ///
    /// A rejected session (401/403) clears the stored session before the
    /// error is returned.
    pub(crate) async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<Option<T>, Error> {
        let url = self.endpoint("/graphql")?;
        trace!("POST {}", url);

        let body = match variables {
            Some(vars) => json!({ "query": query, "variables": vars }),
            None => json!({ "query": query }),
        };

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            let err = Error::from_status(status, &text);
            if err.is_auth_expired() {
                self.clear_session();
            }
            return Err(err);
        }

        let envelope: GraphQlResponse<T> = serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: text.clone(),
            }
        })?;

        if let Some(first) = envelope.errors.as_ref().and_then(|errs| errs.first()) {
            return Err(Error::GraphQl {
                message: first.message.clone(),
            });
        }

        Ok(envelope.data)
    }
}
