//! Password authentication and bearer token issuance.
//!
//! Passwords hash with Argon2id. Tokens are HS256 JWTs carrying the user id
//! and role; the role claim is advisory only, admin routes re-check the
//! database.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, password_hash::rand_core::OsRng};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use pomelo_core::{Email, EmailError, Role, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::models::User;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Tokens from interactive logins last a week; the short-lived signup
/// token forces an early re-login.
const SIGNUP_TOKEN_TTL: Duration = Duration::hours(1);
const LOGIN_TOKEN_TTL: Duration = Duration::days(7);

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailTaken,

    #[error("weak password: {0}")]
    WeakPassword(String),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Account was created through Google and has no password.
    #[error("password login unavailable for this account")]
    PasswordLoginUnavailable,

    #[error("account is deactivated")]
    AccountDisabled,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::PasswordLoginUnavailable
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::AccountDisabled => StatusCode::FORBIDDEN,
            Self::EmailTaken => StatusCode::UNPROCESSABLE_ENTITY,
            Self::WeakPassword(_) | Self::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            Self::Hash(_) | Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal detail stays out of responses.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::EmailTaken => "An account with this email already exists".to_string(),
            Self::PasswordLoginUnavailable => {
                "This account uses Google sign-in".to_string()
            }
            Self::AccountDisabled => "Account is deactivated".to_string(),
            Self::InvalidToken => "Invalid or expired token".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::InvalidEmail(_) => "Invalid email address".to_string(),
            Self::Hash(_) | Self::Repository(_) => "Authentication error".to_string(),
        }
    }
}

/// JWT claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::new(self.sub)
    }
}

/// Service for password auth and token issuance.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Build the service from the configured signing secret.
    #[must_use]
    pub fn new(jwt_secret: &SecretString) -> Self {
        let secret = jwt_secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Register a new account and issue a short-lived token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailTaken` if the email is already registered
    /// and `AuthError::WeakPassword` if the password fails validation.
    pub async fn signup(
        &self,
        pool: &PgPool,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let hash = hash_password(password)?;
        let user = UserRepository::new(pool)
            .create_with_password(name, &email, &hash)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        let token = self.issue_token(&user, SIGNUP_TOKEN_TTL)?;
        Ok((user, token))
    }

    /// Verify credentials and issue a week-long token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or a
    /// wrong password; the two cases are indistinguishable to the caller.
    pub async fn login(
        &self,
        pool: &PgPool,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = UserRepository::new(pool)
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::PasswordLoginUnavailable)?;
        verify_password(hash, password)?;

        let token = self.issue_token(&user, LOGIN_TOKEN_TTL)?;
        Ok((user, token))
    }

    /// Issue a week-long token without a password check. Used after a
    /// verified OAuth exchange.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hash` if token signing fails.
    pub fn issue_session_token(&self, user: &User) -> Result<String, AuthError> {
        self.issue_token(user, LOGIN_TOKEN_TTL)
    }

    fn issue_token(&self, user: &User, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.as_i32(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    /// Decode and validate a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a bad signature or an expired
    /// token.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2id and a random salt.
///
/// # Errors
///
/// Returns `AuthError::Hash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(hash: &str, password: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user() -> User {
        User {
            id: UserId::new(1),
            name: "Test".to_string(),
            email: Email::parse("test@example.com").unwrap(),
            password_hash: None,
            google_id: None,
            picture: None,
            phone: None,
            role: Role::Customer,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password(&hash, "correct horse battery").is_ok());
        assert!(matches!(
            verify_password(&hash, "wrong password"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("abcdefg"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("abcdefgh").is_ok());
    }

    #[test]
    fn test_token_roundtrip() {
        let service = AuthService::new(&SecretString::from("q8Rt!2mZ@7bN%4xKp0Wv&5cJ*9dF^1gH"));
        let token = service.issue_session_token(&test_user()).unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.role, Role::Customer);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let issuer = AuthService::new(&SecretString::from("q8Rt!2mZ@7bN%4xKp0Wv&5cJ*9dF^1gH"));
        let verifier = AuthService::new(&SecretString::from("different-secret-entirely-0123456"));

        let token = issuer.issue_session_token(&test_user()).unwrap();
        assert!(matches!(
            verifier.verify_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = AuthService::new(&SecretString::from("q8Rt!2mZ@7bN%4xKp0Wv&5cJ*9dF^1gH"));
        assert!(service.verify_token("not.a.token").is_err());
    }
}
