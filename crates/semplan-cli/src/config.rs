//! Configuration file management for semplan.
//!
//! Provides a TOML-based config file at `~/.config/semplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.
//!
//! The `[session]` table is written by `semplan login` / `semplan logout`
//! through `toml_edit`, so hand edits and comments elsewhere in the file
//! survive.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use semplan_core::ConflictPolicy;
use semplan_db::config::DbConfig;

/// Environment variable naming the signed-in user.
pub const USER_ENV_VAR: &str = "SEMPLAN_USER_ID";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub plan: PlanSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PlanSection {
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the semplan config directory: `$XDG_CONFIG_HOME/semplan` or
/// `~/.config/semplan`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("semplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("semplan")
}

/// Return the path to the semplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(&config_path(), config)
}

pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    write_private(path, &contents)
}

/// Record (`Some`) or clear (`None`) the signed-in user in the `[session]`
/// table of an existing config file. Other content is preserved verbatim.
pub fn write_session(path: &Path, session: Option<(Uuid, &str)>) -> Result<()> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "failed to read config file at {}; run `semplan init` first",
            path.display()
        )
    })?;

    let mut doc: toml_edit::DocumentMut = content
        .parse::<toml_edit::DocumentMut>()
        .with_context(|| format!("failed to parse {} as TOML document", path.display()))?;

    match session {
        Some((user_id, email)) => {
            let table = doc
                .entry("session")
                .or_insert(toml_edit::table())
                .as_table_mut()
                .context("[session] in config file is not a table")?;
            table.insert("user_id", toml_edit::value(user_id.to_string()));
            table.insert("email", toml_edit::value(email));
        }
        None => {
            doc.remove("session");
        }
    }

    write_private(path, &doc.to_string())
}

/// Write `contents` to `path` with 0600 permissions on Unix.
fn write_private(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct SemplanConfig {
    pub db_config: DbConfig,
    /// `None` when nobody is logged in.
    pub user_id: Option<Uuid>,
    pub conflict_policy: ConflictPolicy,
}

impl SemplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `SEMPLAN_DATABASE_URL` env > `database.url` > `DbConfig::DEFAULT_URL`
    /// - User: `SEMPLAN_USER_ID` env > `session.user_id` > signed out
    /// - Conflict policy: `plan.conflict_policy` > last writer wins
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        Self::resolve_with(cli_db_url, load_config().ok())
    }

    fn resolve_with(cli_db_url: Option<&str>, file_config: Option<ConfigFile>) -> Result<Self> {
        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let user_id = if let Ok(raw) = std::env::var(USER_ENV_VAR) {
            Some(
                Uuid::parse_str(raw.trim())
                    .with_context(|| format!("{USER_ENV_VAR} is not a valid UUID: {raw:?}"))?,
            )
        } else {
            file_config.as_ref().and_then(|cfg| cfg.session.user_id)
        };

        let conflict_policy = file_config
            .map(|cfg| cfg.plan.conflict_policy)
            .unwrap_or_default();

        Ok(Self {
            db_config: DbConfig::new(db_url),
            user_id,
            conflict_policy,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
