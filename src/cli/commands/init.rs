//! Initialize the postsync database.
//!
//! Creates `~/.postsync/data/postsync.db` (or the `--db` path) and applies
//! the schema. When the default location is used, a `config.json` template
//! with an empty `remote` section is written next to it.

use crate::config::{global_postsync_dir, resolve_db_path, PostsyncConfig, RemoteFileSettings};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<PathBuf>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if the directory or database cannot be created.
pub fn execute(force: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let explicit = db_path.map(PathBuf::as_path);
    let db_path = resolve_db_path(explicit).ok_or_else(|| {
        Error::Config("Could not determine global postsync directory".to_string())
    })?;

    let config = if explicit.is_none() {
        global_postsync_dir().map(|dir| dir.join("config.json"))
    } else {
        None
    };

    init_database(&db_path, force)?;
    if let Some(path) = &config {
        write_config_template(path)?;
    }

    if json {
        let output = InitOutput {
            database: db_path,
            config,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized postsync database");
        println!("  Database: {}", db_path.display());
        if let Some(path) = config {
            println!("  Config:   {}", path.display());
            println!();
            println!("Next: add Blogger credentials to the config file or BLOGGER_* env vars.");
        }
    }

    Ok(())
}

fn init_database(db_path: &Path, force: bool) -> Result<()> {
    if db_path.exists() {
        if !force {
            return Err(Error::AlreadyInitialized {
                path: db_path.to_path_buf(),
            });
        }
        fs::remove_file(db_path)?;
    }

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // Opening applies the schema.
    SqliteStorage::open(db_path)?;
    tracing::info!(path = %db_path.display(), "Created database");
    Ok(())
}

fn write_config_template(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let template = PostsyncConfig {
        remote: Some(RemoteFileSettings::default()),
    };
    fs::write(path, serde_json::to_string_pretty(&template)? + "\n")?;
    Ok(())
}
