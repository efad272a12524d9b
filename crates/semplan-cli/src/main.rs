mod auth_cmds;
mod config;
mod course_cmds;
mod plan_cmds;
mod prompt;
mod resolve;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use sqlx::PgPool;

use semplan_core::{OwnerId, PgStore, PlanSession, PlanSynchronizer, SessionAuth};
use semplan_db::pool;

use config::SemplanConfig;

#[derive(Parser)]
#[command(name = "semplan", about = "Semester course planner")]
struct Cli {
    /// Database URL (overrides SEMPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a semplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/semplan")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the semplan database
    DbInit,
    /// Sign in as the user with this email (created on first login)
    Login {
        /// Account email
        email: String,
    },
    /// Forget the signed-in user
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Course plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Course catalog management
    Course {
        #[command(subcommand)]
        command: CourseCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Show the plan, semester by semester
    Show {
        /// Print the plan view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Place a course in a semester
    Add {
        /// Semester number (1-based)
        semester: u32,
        /// Course code or ID
        course: String,
    },
    /// Remove a course from a semester
    Remove {
        /// Semester number (1-based)
        semester: u32,
        /// Course code or ID
        course: String,
    },
    /// Move a course from one semester to another
    Move {
        /// Course code or ID
        course: String,
        /// Source semester
        from: u32,
        /// Target semester
        to: u32,
    },
    /// Change the number of semesters (usually 4, 6, 8, 10 or 12)
    Resize {
        /// New number of semesters (at most 24)
        total: u32,
        /// Answer "yes" to a confirmation prompt (repeat to answer both)
        #[arg(short = 'y', action = ArgAction::Count)]
        yes: u8,
    },
}

#[derive(Subcommand)]
pub enum CourseCommands {
    /// List catalog courses and where they are placed
    List {
        /// Print the course list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a course, or update the one with the same code
    Save {
        /// Course code (e.g. CS101)
        #[arg(long)]
        code: String,
        /// Course name
        #[arg(long)]
        name: String,
        /// Credit hours (positive)
        #[arg(long)]
        credits: u32,
        /// Mark the course as required
        #[arg(long)]
        required: bool,
        /// Prerequisite course code (repeatable)
        #[arg(long = "prereq")]
        prereq: Vec<String>,
        /// Intended semester
        #[arg(long)]
        semester: Option<u32>,
    },
    /// Edit a course field: `grade` or `isRequired`
    Set {
        /// Course code or ID
        course: String,
        /// Field name (grade, isRequired)
        field: String,
        /// New value (empty clears a grade)
        value: String,
    },
}

/// Execute the `semplan init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        session: config::SessionSection::default(),
        plan: config::PlanSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  plan.conflict_policy = {}", cfg.plan.conflict_policy);
    println!();
    println!("Next: run `semplan db-init`, then `semplan login <email>`.");

    Ok(())
}

/// Execute the `semplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = SemplanConfig::resolve(cli_db_url)?;

    println!("Initializing semplan database...");

    if pool::ensure_database_exists(&resolved.db_config).await? {
        println!("Created database.");
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("semplan db-init complete.");
    Ok(())
}

/// Connect and build a session for the configured user.
async fn open_session(cli_db_url: Option<&str>) -> anyhow::Result<(PgPool, PlanSession)> {
    let resolved = SemplanConfig::resolve(cli_db_url)?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    let auth = match resolved.user_id {
        Some(id) => SessionAuth::signed_in(OwnerId(id)),
        None => SessionAuth::signed_out(),
    };
    let store = Arc::new(PgStore::new(db_pool.clone()));
    let sync = PlanSynchronizer::new(store).with_policy(resolved.conflict_policy);

    Ok((db_pool, PlanSession::new(sync, Arc::new(auth))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Login { email } => {
            let resolved = SemplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = auth_cmds::cmd_login(&db_pool, &config::config_path(), &email).await;
            db_pool.close().await;
            result?;
        }
        Commands::Logout => {
            auth_cmds::cmd_logout(&config::config_path())?;
        }
        Commands::Whoami => {
            let resolved = SemplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = auth_cmds::cmd_whoami(&db_pool, resolved.user_id).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { command } => {
            let (db_pool, mut session) = open_session(cli.database_url.as_deref()).await?;
            let result = plan_cmds::run_plan_command(command, &mut session).await;
            db_pool.close().await;
            result?;
        }
        Commands::Course { command } => {
            let (db_pool, mut session) = open_session(cli.database_url.as_deref()).await?;
            let result = course_cmds::run_course_command(command, &mut session).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
