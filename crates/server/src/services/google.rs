//! Google OAuth sign-in.
//!
//! Authorization-code flow: the client is redirected to Google, the
//! callback exchanges the code for an access token, and the profile either
//! matches an existing account (linking the Google identity) or creates a
//! fresh one.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use pomelo_core::Email;

use crate::config::GoogleOAuthConfig;
use crate::db::{RepositoryError, UserRepository};
use crate::models::User;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Errors from the OAuth exchange.
#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token exchange rejected: {0}")]
    Exchange(String),

    #[error("profile has no usable email: {0}")]
    BadProfile(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Pending OAuth `state` tokens, single-use with a short lifetime.
///
/// [`GoogleClient::authorize_url`] embeds a token from here; the callback
/// must hand the same token back before the code exchange runs, so a forged
/// callback cannot log the browser into an attacker's account.
pub struct OauthStateStore {
    pending: Mutex<HashMap<String, Instant>>,
}

impl OauthStateStore {
    const TTL: Duration = Duration::from_secs(600);

    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a fresh state token and remember it. Stale entries from
    /// abandoned flows are pruned on the way.
    pub fn issue(&self) -> String {
        let token: String = {
            let mut rng = rand::thread_rng();
            (0..32)
                .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
                .collect()
        };

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        pending.retain(|_, issued| now.duration_since(*issued) < Self::TTL);
        pending.insert(token.clone(), now);
        token
    }

    /// Consume a token. Succeeds at most once per issue, and only within
    /// the lifetime window.
    pub fn consume(&self, token: &str) -> bool {
        self.consume_at(token, Instant::now())
    }

    fn consume_at(&self, token: &str, now: Instant) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending
            .remove(token)
            .is_some_and(|issued| now.duration_since(issued) < Self::TTL)
    }
}

impl Default for OauthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Profile fields returned by the userinfo endpoint.
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Client for the Google OAuth endpoints.
#[derive(Clone)]
pub struct GoogleClient {
    http: Client,
    config: GoogleOAuthConfig,
}

impl GoogleClient {
    /// Build a client from the configured OAuth credentials.
    #[must_use]
    pub fn new(http: Client, config: GoogleOAuthConfig) -> Self {
        Self { http, config }
    }

    /// URL the browser is sent to to start the flow.
    ///
    /// `state` is echoed back on the callback and must be checked there.
    #[must_use]
    pub fn authorize_url(&self, state: &str) -> String {
        let mut url = Url::parse(AUTH_ENDPOINT).expect("static endpoint URL parses");
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("state", state);
        url.into()
    }

    /// Exchange an authorization code for the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Exchange` when Google rejects the code.
    pub async fn fetch_profile(&self, code: &str) -> Result<GoogleProfile, GoogleError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                (
                    "client_secret",
                    self.config.client_secret.expose_secret(),
                ),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleError::Exchange(body));
        }
        let token: TokenResponse = response.json().await?;

        let profile = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<GoogleProfile>()
            .await?;

        Ok(profile)
    }

    /// Resolve a Google profile to a local account, creating or linking
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::BadProfile` when the profile email doesn't
    /// parse.
    pub async fn find_or_create_user(
        &self,
        pool: &sqlx::PgPool,
        profile: &GoogleProfile,
    ) -> Result<User, GoogleError> {
        let email = Email::parse(&profile.email)
            .map_err(|e| GoogleError::BadProfile(e.to_string()))?;
        let users = UserRepository::new(pool);

        if let Some(existing) = users.get_by_email(&email).await? {
            if existing.google_id.is_none() {
                users
                    .link_google_identity(existing.id, &profile.id, profile.picture.as_deref())
                    .await?;
            }
            // Re-read so the linked identity shows in the returned value
            return Ok(users
                .get_by_id(existing.id)
                .await?
                .ok_or(RepositoryError::NotFound)?);
        }

        let name = profile
            .name
            .clone()
            .unwrap_or_else(|| email.as_str().to_string());
        let user = users
            .create_from_google(&name, &email, &profile.id, profile.picture.as_deref())
            .await?;

        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_state_token_is_single_use() {
        let store = OauthStateStore::new();
        let token = store.issue();
        assert!(store.consume(&token));
        assert!(!store.consume(&token));
    }

    #[test]
    fn test_unissued_state_rejected() {
        let store = OauthStateStore::new();
        store.issue();
        assert!(!store.consume("never-issued"));
    }

    #[test]
    fn test_expired_state_rejected() {
        let store = OauthStateStore::new();
        let token = store.issue();
        let later = Instant::now() + OauthStateStore::TTL;
        assert!(!store.consume_at(&token, later));
    }

    #[test]
    fn test_authorize_url_carries_state_and_scope() {
        let client = GoogleClient::new(
            Client::new(),
            GoogleOAuthConfig {
                client_id: "client-123".to_string(),
                client_secret: SecretString::from("shhh"),
                redirect_url: "http://localhost:5000/api/auth/google/callback".to_string(),
            },
        );

        let url = Url::parse(&client.authorize_url("abc123")).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(pairs.contains(&("state".to_string(), "abc123".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "openid email profile".to_string())));
    }
}
