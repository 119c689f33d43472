//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and are embedded into the
//! CLI binary at compile time, so the deployed binary carries its own schema.

use super::CliError;

/// Run all pending database migrations.
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
