//! Admin account management commands.

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher};
use pomelo_core::Role;

use super::CliError;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Create a new admin account with a password.
///
/// Fails if an account with the same email already exists.
pub async fn create(email: &str, name: &str, password: &str) -> Result<i32, CliError> {
    if !email.contains('@') {
        return Err(CliError::InvalidInput(format!("Invalid email: {email}")));
    }
    if name.trim().is_empty() {
        return Err(CliError::InvalidInput("Name must not be empty".to_owned()));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(CliError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CliError::InvalidInput(format!("Failed to hash password: {e}")))?
        .to_string();

    let pool = super::connect().await?;

    tracing::info!("Creating admin account: {email}");

    let existing: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&pool)
        .await?;

    if existing.is_some() {
        return Err(CliError::InvalidInput(format!(
            "An account already exists with email: {email}. Use 'admin promote' instead."
        )));
    }

    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name.trim())
    .bind(email)
    .bind(&password_hash)
    .bind(Role::Admin)
    .fetch_one(&pool)
    .await?;

    tracing::info!("Admin account created. ID: {user_id}, Email: {email}");
    Ok(user_id)
}

/// Promote an existing account to admin.
pub async fn promote(email: &str) -> Result<(), CliError> {
    let pool = super::connect().await?;

    let updated = sqlx::query("UPDATE users SET role = $1, updated_at = now() WHERE email = $2")
        .bind(Role::Admin)
        .bind(email)
        .execute(&pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(CliError::InvalidInput(format!(
            "No account found with email: {email}"
        )));
    }

    tracing::info!("Promoted {email} to admin");
    Ok(())
}
