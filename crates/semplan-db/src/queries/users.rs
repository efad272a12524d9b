//! Database query functions for the `users` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

/// Return the user with `email`, creating the row on first login.
pub async fn get_or_create_user(pool: &PgPool, email: &str) -> Result<User> {
    // DO UPDATE (rather than DO NOTHING) so RETURNING yields the existing row.
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email) VALUES ($1) \
         ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email \
         RETURNING *",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to get or create user {email:?}"))?;

    Ok(user)
}

/// Fetch a user by id.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}
