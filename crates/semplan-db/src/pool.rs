//! Connection pools and database lifecycle for the semplan schema.
//!
//! `semplan db-init` goes through [`ensure_database_exists`], then
//! [`create_pool`] and [`run_migrations`]. The lower-level helpers
//! ([`connect`], [`create_database`], [`drop_database`]) are shared with the
//! integration-test harness, which creates one throwaway database per test.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/semplan-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Tables created by the migrations, in dependency order.
pub const TABLES: [&str; 3] = ["users", "courses", "course_plans"];

/// Connections held by a CLI process.
const APP_MAX_CONNECTIONS: u32 = 5;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a pool against `url` with at most `max_connections` connections.
pub async fn connect(
    url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(url)
        .await
        .with_context(|| format!("failed to connect to database at {url}"))
}

/// Pool for the configured semplan database.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    connect(&config.database_url, APP_MAX_CONNECTIONS, ACQUIRE_TIMEOUT).await
}

/// Apply every embedded migration that has not run yet.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(tables = ?TABLES, "semplan schema is up to date");
    Ok(())
}

/// Reject names that cannot be spliced into `CREATE DATABASE` /
/// `DROP DATABASE`, which take no bind parameters.
pub fn check_database_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("database name is empty");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("database name {name:?} contains invalid characters");
    }
    Ok(())
}

/// Whether a database called `name` exists on the server behind `maint`.
pub async fn database_exists(maint: &PgPool, name: &str) -> Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(name)
        .fetch_one(maint)
        .await
        .context("failed to query pg_database")
}

/// `CREATE DATABASE name`, issued over a maintenance connection.
pub async fn create_database(maint: &PgPool, name: &str) -> Result<()> {
    check_database_name(name)?;
    maint
        .execute(format!("CREATE DATABASE {name}").as_str())
        .await
        .with_context(|| format!("failed to create database {name}"))?;
    info!(db = name, "database created");
    Ok(())
}

/// Disconnect every other session from `name`, then drop it. A database
/// that is already gone is not an error.
pub async fn drop_database(maint: &PgPool, name: &str) -> Result<()> {
    check_database_name(name)?;
    let terminated = sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(name)
    .execute(maint)
    .await
    .with_context(|| format!("failed to disconnect sessions from {name}"))?;
    debug!(db = name, sessions = terminated.rows_affected(), "sessions terminated");

    maint
        .execute(format!("DROP DATABASE IF EXISTS {name}").as_str())
        .await
        .with_context(|| format!("failed to drop database {name}"))?;
    Ok(())
}

/// Create the configured database through the server's `postgres`
/// maintenance database when it is missing. Returns `true` when it was
/// created.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<bool> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;
    check_database_name(db_name)?;

    let maint = connect(&config.maintenance_url(), 1, ACQUIRE_TIMEOUT)
        .await
        .context("cannot reach the postgres maintenance database")?;

    let result: Result<bool> = async {
        if database_exists(&maint, db_name).await? {
            info!(db = db_name, "database already exists");
            return Ok(false);
        }
        create_database(&maint, db_name).await?;
        Ok(true)
    }
    .await;

    maint.close().await;
    result
}

/// Row count for each table in [`TABLES`].
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push((table, count));
    }
    Ok(counts)
}
