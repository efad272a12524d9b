//! PostgreSQL fixtures for semplan integration tests.
//!
//! Every test gets its own migrated database, named `semplan_test_<uuid>`,
//! on a server shared by the whole test binary. The server is
//! `SEMPLAN_TEST_PG_URL` when that is set, otherwise a `postgres:17`
//! container started on first use.

use std::time::Duration;

use sqlx::PgPool;
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use semplan_db::pool;

const SERVER_ENV_VAR: &str = "SEMPLAN_TEST_PG_URL";
const PG_IMAGE_TAG: &str = "17";
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

enum Server {
    External(String),
    Container {
        url: String,
        _handle: ContainerAsync<Postgres>,
    },
}

impl Server {
    async fn start() -> Self {
        if let Ok(url) = std::env::var(SERVER_ENV_VAR) {
            return Server::External(url.trim_end_matches('/').to_owned());
        }

        let handle = Postgres::default()
            .with_tag(PG_IMAGE_TAG)
            .start()
            .await
            .expect("failed to start PostgreSQL container");
        let host = handle.get_host().await.expect("container has no host");
        let port = handle
            .get_host_port_ipv4(5432)
            .await
            .expect("container port 5432 is not mapped");

        Server::Container {
            url: format!("postgresql://postgres:postgres@{host}:{port}"),
            _handle: handle,
        }
    }

    fn url(&self) -> &str {
        match self {
            Server::External(url) | Server::Container { url, .. } => url,
        }
    }
}

static SERVER: OnceCell<Server> = OnceCell::const_new();

/// Server root URL (no database name).
pub async fn pg_url() -> &'static str {
    SERVER.get_or_init(Server::start).await.url()
}

async fn open(db_name: &str, max_connections: u32) -> PgPool {
    let url = format!("{}/{db_name}", pg_url().await);
    pool::connect(&url, max_connections, ACQUIRE_TIMEOUT)
        .await
        .unwrap_or_else(|e| panic!("{e:#}"))
}

/// Create a fresh database with the semplan schema applied.
///
/// Returns `(pool, db_name)`; pass `db_name` to [`drop_test_db`] afterwards.
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("semplan_test_{}", Uuid::new_v4().simple());

    let maint = open("postgres", 1).await;
    pool::create_database(&maint, &db_name)
        .await
        .unwrap_or_else(|e| panic!("{e:#}"));
    maint.close().await;

    let test_pool = open(&db_name, 5).await;
    pool::run_migrations(&test_pool)
        .await
        .unwrap_or_else(|e| panic!("migrating {db_name}: {e:#}"));

    (test_pool, db_name)
}

/// Drop a database made by [`create_test_db`]. Cleanup failures are
/// reported but never fail the test.
pub async fn drop_test_db(db_name: &str) {
    let maint = open("postgres", 1).await;
    if let Err(e) = pool::drop_database(&maint, db_name).await {
        eprintln!("warning: leaving {db_name} behind: {e:#}");
    }
    maint.close().await;
}
