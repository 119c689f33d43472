//! Authentication extractors for bearer-token protected routes.
//!
//! `RequireAuth` validates the `Authorization: Bearer <jwt>` header and
//! loads the account; `RequireAdmin` additionally checks the stored role.
//! The role inside the token is never trusted on its own.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use pomelo_core::Role;

use crate::db::UserRepository;
use crate::error::{ApiError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// The authenticated account for this request.
pub type CurrentUser = User;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a valid bearer token belonging to an admin.
pub struct RequireAdmin(pub CurrentUser);

async fn authenticate(parts: &Parts, state: &AppState) -> Result<CurrentUser, ApiError> {
    let token = bearer_token(parts)
        .ok_or_else(|| ApiError::Unauthenticated("missing bearer token".to_string()))?;

    let claims = state.auth().verify_token(token)?;

    let user = UserRepository::new(state.pool())
        .get_by_id(claims.user_id())
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("account no longer exists".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Forbidden("account is deactivated".to_string()));
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(user)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state).await?))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ApiError::Forbidden("admin access required".to_string()));
        }
        Ok(Self(user))
    }
}
