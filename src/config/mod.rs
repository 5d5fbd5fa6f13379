//! Configuration management.
//!
//! This module provides functions for discovering the postsync directory,
//! resolving the database path, the audit actor, and loading
//! `~/.postsync/config.json`.
//!
//! # Layout
//!
//! - **Database**: Single global database at `~/.postsync/data/postsync.db`
//! - **Config**: Optional `~/.postsync/config.json` holding remote settings

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of `~/.postsync/config.json`.
///
/// Every section is optional; a missing file is the same as an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostsyncConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteFileSettings>,
}

/// The `remote` section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteFileSettings {
    pub blog_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub api_base: Option<String>,
    pub token_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_results: Option<u32>,
}

/// Get the global postsync directory location (`~/.postsync/`).
#[must_use]
pub fn global_postsync_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".postsync"))
}

/// Get the config file path.
fn config_path() -> Result<PathBuf> {
    global_postsync_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the postsync configuration file.
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<PostsyncConfig> {
    let path = config_path()?;
    load_config_from(&path)
}

/// Load configuration from an explicit path.
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<PostsyncConfig> {
    if !path.exists() {
        return Ok(PostsyncConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `POSTSYNC_TEST_DB=1` (or any non-empty value).
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("POSTSYNC_TEST_DB")
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && value.to_lowercase() != "false"
}

/// Get the test database path (`~/.postsync/test/postsync.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_postsync_dir().map(|dir| dir.join("test").join("postsync.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `POSTSYNC_TEST_DB` environment variable → uses test database
/// 3. `POSTSYNC_DB` environment variable
/// 4. Global location: `~/.postsync/data/postsync.db`
///
/// Returns `None` if no home directory can be determined.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("POSTSYNC_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_postsync_dir().map(|dir| dir.join("data").join("postsync.db"))
}

/// Resolve the actor recorded in audit events.
///
/// Priority:
/// 1. Explicit `--actor` flag
/// 2. `POSTSYNC_ACTOR` environment variable
/// 3. System username
/// 4. "postsync"
#[must_use]
pub fn resolve_actor(explicit: Option<&str>) -> String {
    if let Some(actor) = explicit.filter(|a| !a.is_empty()) {
        return actor.to_string();
    }

    if let Ok(actor) = std::env::var("POSTSYNC_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(user) = std::env::var("USER") {
        if !user.is_empty() {
            return user;
        }
    }

    "postsync".to_string()
}
