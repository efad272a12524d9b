//! `semplan login`, `semplan logout` and `semplan whoami`.
//!
//! Login only issues a session: the user row is looked up (or created) by
//! email and its id is recorded in the config file. There are no
//! credentials.

use std::path::Path;

use anyhow::{Result, bail};
use sqlx::PgPool;
use uuid::Uuid;

use semplan_db::queries::users;

use crate::config;

pub async fn cmd_login(pool: &PgPool, config_path: &Path, email: &str) -> Result<()> {
    let email = normalize_email(email)?;
    let user = users::get_or_create_user(pool, &email).await?;
    config::write_session(config_path, Some((user.id, &user.email)))?;

    tracing::info!(user_id = %user.id, "session issued");
    println!("Logged in as {} ({})", user.email, user.id);
    Ok(())
}

pub fn cmd_logout(config_path: &Path) -> Result<()> {
    config::write_session(config_path, None)?;
    println!("Logged out.");
    Ok(())
}

pub async fn cmd_whoami(pool: &PgPool, user_id: Option<Uuid>) -> Result<()> {
    let Some(user_id) = user_id else {
        println!("Not logged in. Run `semplan login <email>`.");
        return Ok(());
    };

    match users::get_user(pool, user_id).await? {
        Some(user) => println!("{} ({})", user.email, user.id),
        None => bail!("session user {user_id} does not exist in this database; log in again"),
    }
    Ok(())
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => bail!("{email:?} is not an email address"),
    }
}
