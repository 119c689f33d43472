//! Account routes: signup, login, Google OAuth, and profile.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use pomelo_core::Role;

use crate::db::UserRepository;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, User};
use crate::state::AppState;

/// Signup and login, behind the strict rate limiter.
pub fn credential_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/signup", post(signup))
        .route("/api/users/login", post(login))
}

/// OAuth and profile routes.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/google", get(google_start))
        .route("/api/auth/google/callback", get(google_callback))
        .route("/api/users/me", get(me))
        .route("/api/users/addresses", post(add_address))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub user_id: i32,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub token: String,
}

impl SessionResponse {
    fn new(user: &User, token: String) -> Self {
        Self {
            success: true,
            user_id: user.id.as_i32(),
            email: user.email.as_str().to_string(),
            name: user.name.clone(),
            role: user.role,
            token,
        }
    }
}

#[instrument(skip_all, fields(email = %body.email))]
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidInput("name must not be empty".to_string()));
    }

    let (user, token) = state
        .auth()
        .signup(state.pool(), name, &body.email, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(&user, token)),
    ))
}

#[instrument(skip_all, fields(email = %body.email))]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let (user, token) = state
        .auth()
        .login(state.pool(), &body.email, &body.password)
        .await?;

    Ok(Json(SessionResponse::new(&user, token)))
}

#[instrument(skip_all)]
async fn google_start(State(state): State<AppState>) -> Result<Redirect> {
    let google = state
        .google()
        .ok_or_else(|| ApiError::NotFound("Google sign-in is not configured".to_string()))?;

    let state_token = state.oauth_states().issue();
    Ok(Redirect::to(&google.authorize_url(&state_token)))
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[instrument(skip_all)]
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<Redirect> {
    let google = state
        .google()
        .ok_or_else(|| ApiError::NotFound("Google sign-in is not configured".to_string()))?;

    if let Some(error) = query.error {
        tracing::warn!(%error, "Google OAuth denied");
        return Ok(Redirect::to(&format!(
            "{}/login?error=oauth_denied",
            state.config().client_url
        )));
    }

    // The state token must come back exactly once, or the callback could
    // have been forged by a third party (login CSRF).
    let state_token = query.state.as_deref().unwrap_or_default();
    if !state.oauth_states().consume(state_token) {
        return Err(ApiError::Unauthenticated(
            "OAuth state mismatch".to_string(),
        ));
    }

    let code = query
        .code
        .ok_or_else(|| ApiError::InvalidInput("missing authorization code".to_string()))?;

    let profile = google.fetch_profile(&code).await.map_err(|e| {
        tracing::warn!(error = %e, "Google code exchange failed");
        ApiError::Unauthenticated("Google sign-in failed".to_string())
    })?;

    let user = google
        .find_or_create_user(state.pool(), &profile)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let token = state.auth().issue_session_token(&user)?;
    Ok(Redirect::to(&format!(
        "{}/auth/callback?token={token}",
        state.config().client_url
    )))
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<serde_json::Value>> {
    let addresses = UserRepository::new(state.pool())
        .list_addresses(user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "user": user,
        "addresses": addresses,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAddressRequest {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn add_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddAddressRequest>,
) -> Result<(StatusCode, Json<Address>)> {
    for (field, value) in [
        ("street", &body.street),
        ("city", &body.city),
        ("state", &body.state),
        ("zipCode", &body.zip_code),
        ("country", &body.country),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::InvalidInput(format!("{field} must not be empty")));
        }
    }

    let address = UserRepository::new(state.pool())
        .add_address(
            user.id,
            &body.street,
            &body.city,
            &body.state,
            &body.zip_code,
            &body.country,
            body.is_default,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(address)))
}
