//! SQLite storage layer for postsync.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic writes
//! - Audit events for history
//!
//! # Submodules
//!
//! - [`events`] - Audit event storage
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod events;
pub mod schema;
pub mod sqlite;

pub use sqlite::{MutationContext, PostCounts, SqliteStorage};

use crate::error::Result;
use crate::model::{ContentRecord, NewPost, PostFilter, PostPatch};

/// The local post store as seen by the reconciliation engine.
///
/// Writes are attributed to `actor` in the audit trail.
pub trait ContentStore {
    /// List records matching the filter, ordered by creation time then id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_posts(&self, filter: &PostFilter) -> Result<Vec<ContentRecord>>;

    /// Fetch one record, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_post(&self, id: &str) -> Result<Option<ContentRecord>>;

    /// Insert a new record and return it with its generated id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn insert_post(&mut self, post: &NewPost, actor: &str) -> Result<ContentRecord>;

    /// Apply a partial update and return the resulting record.
    ///
    /// `updated_at` only changes when the patch sets it.
    ///
    /// # Errors
    ///
    /// Returns `PostNotFound` for an unknown id, or a database error.
    fn update_post(&mut self, id: &str, patch: &PostPatch, actor: &str) -> Result<ContentRecord>;
}
