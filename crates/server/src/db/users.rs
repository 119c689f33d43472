//! User repository for account and address-book persistence.

use sqlx::PgPool;

use pomelo_core::{Email, UserId};

use super::RepositoryError;
use crate::models::{Address, User};

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, google_id, picture, phone, \
                            role, is_active, created_at, updated_at";

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Create a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create_with_password(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "email already exists"))?;

        Ok(user)
    }

    /// Create a new user from a Google profile (no password).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or Google identity
    /// already exists.
    pub async fn create_from_google(
        &self,
        name: &str,
        email: &Email,
        google_id: &str,
        picture: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, google_id, picture)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(google_id)
        .bind(picture)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "account already exists"))?;

        Ok(user)
    }

    /// Attach a Google identity to an existing account, if not already set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn link_google_identity(
        &self,
        id: UserId,
        google_id: &str,
        picture: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET google_id = COALESCE(google_id, $2),
                 picture = COALESCE(picture, $3),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(google_id)
        .bind(picture)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// List customer accounts for the admin panel, newest first.
    ///
    /// `search` matches name or email, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_customers(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, RepositoryError> {
        let pattern = search.map(|s| format!("%{s}%"));
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE role = 'customer'
               AND ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Count customer accounts matching the admin listing filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_customers(&self, search: Option<&str>) -> Result<i64, RepositoryError> {
        let pattern = search.map(|s| format!("%{s}%"));
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users
             WHERE role = 'customer'
               AND ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)",
        )
        .bind(pattern)
        .fetch_one(self.pool)
        .await?;

        Ok(count.0)
    }

    /// List a user's address book, default address first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_addresses(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(
            "SELECT id, user_id, street, city, state, zip_code, country, is_default
             FROM addresses
             WHERE user_id = $1
             ORDER BY is_default DESC, id ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(addresses)
    }

    /// Add an address to a user's address book.
    ///
    /// A new default address clears the flag on any previous default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_address(
        &self,
        user_id: UserId,
        street: &str,
        city: &str,
        state: &str,
        zip_code: &str,
        country: &str,
        is_default: bool,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let address = sqlx::query_as::<_, Address>(
            "INSERT INTO addresses (user_id, street, city, state, zip_code, country, is_default)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, user_id, street, city, state, zip_code, country, is_default",
        )
        .bind(user_id)
        .bind(street)
        .bind(city)
        .bind(state)
        .bind(zip_code)
        .bind(country)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(address)
    }
}
