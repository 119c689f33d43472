//! Application state shared across handlers.

use std::sync::Arc;

use reqwest::Client;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::{AuthService, GoogleClient, OauthStateStore};
use crate::stripe::StripeClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    auth: AuthService,
    stripe: StripeClient,
    google: Option<GoogleClient>,
    oauth_states: OauthStateStore,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let http = Client::new();
        let auth = AuthService::new(&config.jwt_secret);
        let stripe = StripeClient::new(http.clone(), config.stripe.clone());
        let google = config
            .google
            .clone()
            .map(|google| GoogleClient::new(http, google));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth,
                stripe,
                google,
                oauth_states: OauthStateStore::new(),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the auth service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the Stripe client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get the Google OAuth client, if configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleClient> {
        self.inner.google.as_ref()
    }

    /// Get the pending OAuth state-token store.
    #[must_use]
    pub fn oauth_states(&self) -> &OauthStateStore {
        &self.inner.oauth_states
    }
}
