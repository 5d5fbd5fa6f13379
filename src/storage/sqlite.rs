//! SQLite storage implementation.
//!
//! This module provides the local post store for postsync using SQLite.
//! It follows the MutationContext pattern for transaction discipline and audit logging.

use crate::error::{Error, Result};
use crate::model::{ContentRecord, NewPost, PostFilter, PostPatch, PostStatus};
use crate::storage::ContentStore;
use crate::storage::events::{Event, EventType, get_events, insert_event};
use crate::storage::schema::apply_schema;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const POST_COLUMNS: &str = "id, title, html_content, category, status, remote_id, remote_url, \
     remote_published_at, source_url, created_at, updated_at, last_synced_at";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// This struct is passed to mutation closures to record audit events
/// that are written just before the transaction commits.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation (user, sync job, etc.).
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_id: &str, event_type: EventType) {
        self.events.push(
            Event::new("post", entity_id, event_type, &self.actor).with_comment(&self.op_name),
        );
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new("post", entity_id, event_type, &self.actor)
                .with_values(old_value, new_value)
                .with_comment(&self.op_name),
        );
    }
}

/// Post counts used by the status overview.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PostCounts {
    pub total: usize,
    pub by_status: HashMap<String, usize>,
    pub linked: usize,
    pub unlinked: usize,
    /// Published records without a live URL.
    pub published_missing_url: usize,
    /// Most recent `last_synced_at` across all records.
    pub last_synced_at: Option<i64>,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;

        Ok(result)
    }

    /// Get all post IDs (for Levenshtein suggestions).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_all_post_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM posts")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Audit trail of one post, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_post_events(&self, id: &str, limit: Option<u32>) -> Result<Vec<Event>> {
        get_events(&self.conn, "post", id, limit).map_err(Error::from)
    }

    /// Aggregate counts for the sync status overview.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_posts(&self) -> Result<PostCounts> {
        let mut counts = PostCounts::default();

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM posts GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status, n) = row?;
            let n = usize::try_from(n).unwrap_or(0);
            counts.total += n;
            counts.by_status.insert(status, n);
        }

        let (linked, missing_url, last_synced): (i64, i64, Option<i64>) = self.conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN remote_id IS NOT NULL AND remote_id != '' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'published'
                    AND (remote_url IS NULL OR remote_url = '') THEN 1 ELSE 0 END), 0),
                MAX(last_synced_at)
             FROM posts",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, read_timestamp(row, 2)?)),
        )?;

        counts.linked = usize::try_from(linked).unwrap_or(0);
        counts.unlinked = counts.total.saturating_sub(counts.linked);
        counts.published_missing_url = usize::try_from(missing_url).unwrap_or(0);
        counts.last_synced_at = last_synced;

        Ok(counts)
    }
}

impl ContentStore for SqliteStorage {
    fn list_posts(&self, filter: &PostFilter) -> Result<Vec<ContentRecord>> {
        let mut sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(status.as_str()));
        }
        match filter.linked {
            Some(true) => sql.push_str(" AND remote_id IS NOT NULL AND remote_id != ''"),
            Some(false) => sql.push_str(" AND (remote_id IS NULL OR remote_id = '')"),
            None => {}
        }

        sql.push_str(" ORDER BY created_at ASC, id ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit));
        }

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), map_post_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_post(&self, id: &str) -> Result<Option<ContentRecord>> {
        let post = self
            .conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                [id],
                map_post_row,
            )
            .optional()?;
        Ok(post)
    }

    fn insert_post(&mut self, post: &NewPost, actor: &str) -> Result<ContentRecord> {
        let now = chrono::Utc::now().timestamp_millis();
        let id = format!("post_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
        let updated_at = post.updated_at.unwrap_or(now);
        let imported = post.remote_id.is_some();

        self.mutate("insert_post", actor, |tx, ctx| {
            tx.execute(
                &format!(
                    "INSERT INTO posts ({POST_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                rusqlite::params![
                    id,
                    post.title,
                    post.html_content,
                    post.category,
                    post.status.as_str(),
                    post.remote_id,
                    post.remote_url,
                    post.remote_published_at,
                    post.source_url,
                    now,
                    updated_at,
                    post.last_synced_at,
                ],
            )?;

            if imported {
                ctx.record_change(&id, EventType::PostImported, None, post.remote_id.clone());
            } else {
                ctx.record_event(&id, EventType::PostCreated);
            }

            Ok(())
        })?;

        self.get_post(&id)?
            .ok_or_else(|| Error::PostNotFound { id: id.clone() })
    }

    fn update_post(&mut self, id: &str, patch: &PostPatch, actor: &str) -> Result<ContentRecord> {
        let current = self
            .get_post(id)?
            .ok_or_else(|| Error::PostNotFound { id: id.to_string() })?;

        if patch.is_empty() {
            return Ok(current);
        }

        let mut set_clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(title) = &patch.title {
            set_clauses.push("title = ?");
            params.push(Box::new(title.clone()));
        }
        if let Some(html) = &patch.html_content {
            set_clauses.push("html_content = ?");
            params.push(Box::new(html.clone()));
        }
        if let Some(status) = patch.status {
            set_clauses.push("status = ?");
            params.push(Box::new(status.as_str()));
        }
        if let Some(remote_id) = &patch.remote_id {
            set_clauses.push("remote_id = ?");
            params.push(Box::new(remote_id.clone()));
        }
        if let Some(remote_url) = &patch.remote_url {
            set_clauses.push("remote_url = ?");
            params.push(Box::new(remote_url.clone()));
        }
        if let Some(published_at) = patch.remote_published_at {
            set_clauses.push("remote_published_at = ?");
            params.push(Box::new(published_at));
        }
        if let Some(updated_at) = patch.updated_at {
            set_clauses.push("updated_at = ?");
            params.push(Box::new(updated_at));
        }
        if let Some(synced_at) = patch.last_synced_at {
            set_clauses.push("last_synced_at = ?");
            params.push(Box::new(synced_at));
        }

        let mut next = current.clone();
        patch.apply_to(&mut next);

        self.mutate("update_post", actor, |tx, ctx| {
            let sql = format!("UPDATE posts SET {} WHERE id = ?", set_clauses.join(", "));
            params.push(Box::new(id.to_string()));

            let param_refs: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            let rows = tx.execute(&sql, param_refs.as_slice())?;
            if rows == 0 {
                return Err(Error::PostNotFound { id: id.to_string() });
            }

            record_patch_events(ctx, &current, &next, patch);
            Ok(())
        })?;

        Ok(next)
    }
}

/// Derive audit events from the difference between two versions of a record.
///
/// Content changes that arrive together with a sync stamp came from the
/// remote and are logged as pulls; otherwise they are local edits.
fn record_patch_events(
    ctx: &mut MutationContext,
    before: &ContentRecord,
    after: &ContentRecord,
    patch: &PostPatch,
) {
    let id = before.id.as_str();

    if before.status != after.status {
        ctx.record_change(
            id,
            EventType::PostStatusChanged,
            Some(before.status.as_str().to_string()),
            Some(after.status.as_str().to_string()),
        );
    }

    if before.remote_id != after.remote_id {
        let event = if after.remote_id.is_some() {
            EventType::PostLinked
        } else {
            EventType::PostUnlinked
        };
        ctx.record_change(id, event, before.remote_id.clone(), after.remote_id.clone());
    } else if before.remote_url != after.remote_url
        || before.remote_published_at != after.remote_published_at
    {
        ctx.record_change(
            id,
            EventType::PostUpdated,
            before.remote_url.clone(),
            after.remote_url.clone(),
        );
    }

    if before.title != after.title || before.html_content != after.html_content {
        let event = if patch.last_synced_at.is_some() {
            EventType::ContentPulled
        } else {
            EventType::PostUpdated
        };
        ctx.record_change(id, event, Some(before.title.clone()), Some(after.title.clone()));
    }
}

/// Read a timestamp column that may hold Unix milliseconds or RFC 3339 text.
///
/// Anything unreadable is treated as absent.
fn read_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(ms) => Some(ms),
        ValueRef::Text(raw) => std::str::from_utf8(raw)
            .ok()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.timestamp_millis()),
        #[allow(clippy::cast_possible_truncation)]
        ValueRef::Real(ms) => Some(ms as i64),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

// Helper to map post rows
fn map_post_row(row: &rusqlite::Row) -> rusqlite::Result<ContentRecord> {
    let status: String = row.get(4)?;
    Ok(ContentRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        html_content: row.get(2)?,
        category: row.get(3)?,
        status: PostStatus::from_db(&status),
        remote_id: row.get(5)?,
        remote_url: row.get(6)?,
        remote_published_at: read_timestamp(row, 7)?,
        source_url: row.get(8)?,
        created_at: read_timestamp(row, 9)?.unwrap_or(0),
        updated_at: read_timestamp(row, 10)?,
        last_synced_at: read_timestamp(row, 11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RemotePost, Visibility};

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.db");

        {
            let mut storage = SqliteStorage::open(&path).unwrap();
            storage
                .insert_post(&NewPost::draft("Persisted", "<p>x</p>"), "tester")
                .unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        let posts = storage.list_posts(&PostFilter::default()).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Persisted");
    }

    #[test]
    fn test_post_crud() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        // Create
        let post = storage
            .insert_post(
                &NewPost::draft("Hello", "<p>World</p>")
                    .with_category("news")
                    .with_source_url("https://source.example.com/a"),
                "tester",
            )
            .unwrap();
        assert!(post.id.starts_with("post_"));
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.updated_at.is_some());
        assert!(!post.is_linked());

        // Read
        let fetched = storage.get_post(&post.id).unwrap().unwrap();
        assert_eq!(fetched, post);

        // Update
        let patch = PostPatch {
            status: Some(PostStatus::Reviewed),
            ..PostPatch::default()
        };
        let updated = storage.update_post(&post.id, &patch, "tester").unwrap();
        assert_eq!(updated.status, PostStatus::Reviewed);
        assert_eq!(updated.updated_at, post.updated_at);

        let fetched = storage.get_post(&post.id).unwrap().unwrap();
        assert_eq!(fetched.status, PostStatus::Reviewed);
    }

    #[test]
    fn test_update_missing_post() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let patch = PostPatch {
            title: Some("x".to_string()),
            ..PostPatch::default()
        };
        let err = storage.update_post("post_nope", &patch, "tester").unwrap_err();
        assert!(matches!(err, Error::PostNotFound { .. }));
    }

    #[test]
    fn test_list_filters_and_order() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let a = storage.insert_post(&NewPost::draft("A", ""), "t").unwrap();
        let b = storage
            .insert_post(&NewPost::draft("B", "").with_status(PostStatus::Published), "t")
            .unwrap();
        storage
            .update_post(
                &b.id,
                &PostPatch {
                    remote_id: Some(Some("R1".to_string())),
                    ..PostPatch::default()
                },
                "t",
            )
            .unwrap();

        let all = storage.list_posts(&PostFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let linked = storage.list_posts(&PostFilter::linked()).unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, b.id);

        let unlinked = storage
            .list_posts(&PostFilter {
                linked: Some(false),
                ..PostFilter::default()
            })
            .unwrap();
        assert_eq!(unlinked.len(), 1);
        assert_eq!(unlinked[0].id, a.id);

        let published = storage
            .list_posts(&PostFilter {
                status: Some(PostStatus::Published),
                ..PostFilter::default()
            })
            .unwrap();
        assert_eq!(published.len(), 1);
    }

    #[test]
    fn test_insert_from_remote_records_import_event() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let remote = RemotePost {
            id: "R5".to_string(),
            title: "Remote".to_string(),
            content: "<p>c</p>".to_string(),
            url: Some("https://blog.example.com/r5".to_string()),
            visibility: Visibility::Live,
            published_at: Some(100),
            updated_at: Some(200),
        };

        let post = storage
            .insert_post(&NewPost::from_remote(&remote, 300), "sync")
            .unwrap();
        assert_eq!(post.updated_at, Some(200));
        assert_eq!(post.last_synced_at, Some(300));

        let events = get_events(storage.conn(), "post", &post.id, None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::PostImported);
        assert_eq!(events[0].new_value.as_deref(), Some("R5"));
    }

    #[test]
    fn test_update_records_unlink_and_status_events() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let post = storage
            .insert_post(&NewPost::draft("P", "").with_status(PostStatus::Published), "t")
            .unwrap();
        storage
            .update_post(
                &post.id,
                &PostPatch {
                    remote_id: Some(Some("R1".to_string())),
                    remote_url: Some(Some("https://x".to_string())),
                    ..PostPatch::default()
                },
                "t",
            )
            .unwrap();

        let mut patch = PostPatch {
            status: Some(PostStatus::Reviewed),
            last_synced_at: Some(1),
            ..PostPatch::default()
        };
        patch.unlink();
        storage.update_post(&post.id, &patch, "sync").unwrap();

        let types: Vec<EventType> = get_events(storage.conn(), "post", &post.id, None)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert!(types.contains(&EventType::PostStatusChanged));
        assert!(types.contains(&EventType::PostUnlinked));
        assert!(types.contains(&EventType::PostLinked));
    }

    #[test]
    fn test_content_pull_event_when_stamped() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let post = storage.insert_post(&NewPost::draft("Old", ""), "t").unwrap();

        storage
            .update_post(
                &post.id,
                &PostPatch {
                    title: Some("New".to_string()),
                    updated_at: Some(Some(42)),
                    last_synced_at: Some(43),
                    ..PostPatch::default()
                },
                "sync",
            )
            .unwrap();

        let events = get_events(storage.conn(), "post", &post.id, Some(1)).unwrap();
        assert_eq!(events[0].event_type, EventType::ContentPulled);
    }

    #[test]
    fn test_text_timestamps_are_read_leniently() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage
            .conn()
            .execute(
                "INSERT INTO posts (id, title, status, created_at, updated_at)
                 VALUES ('p1', 'Legacy', 'draft', 0, '2024-01-02T03:04:05+00:00')",
                [],
            )
            .unwrap();
        storage
            .conn()
            .execute(
                "INSERT INTO posts (id, title, status, created_at, updated_at)
                 VALUES ('p2', 'Broken', 'draft', 1, 'not-a-date')",
                [],
            )
            .unwrap();

        let p1 = storage.get_post("p1").unwrap().unwrap();
        assert_eq!(p1.updated_at, Some(1_704_164_645_000));

        let p2 = storage.get_post("p2").unwrap().unwrap();
        assert!(p2.updated_at.is_none());
    }

    #[test]
    fn test_count_posts() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.insert_post(&NewPost::draft("A", ""), "t").unwrap();
        storage
            .insert_post(&NewPost::draft("B", "").with_status(PostStatus::Published), "t")
            .unwrap();

        let counts = storage.count_posts().unwrap();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.by_status.get("draft"), Some(&1));
        assert_eq!(counts.unlinked, 2);
        assert_eq!(counts.published_missing_url, 1);
        assert!(counts.last_synced_at.is_none());
    }

    #[test]
    fn test_get_all_post_ids() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let post = storage.insert_post(&NewPost::draft("A", ""), "t").unwrap();
        assert_eq!(storage.get_all_post_ids().unwrap(), vec![post.id]);
    }

    #[test]
    fn test_post_events_newest_first() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let post = storage.insert_post(&NewPost::draft("A", ""), "editor").unwrap();
        storage
            .update_post(
                &post.id,
                &PostPatch {
                    status: Some(PostStatus::Reviewed),
                    ..PostPatch::default()
                },
                "editor",
            )
            .unwrap();

        let events = storage.get_post_events(&post.id, None).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::PostStatusChanged);
        assert_eq!(events[1].event_type, EventType::PostCreated);
        assert!(storage.get_post_events("post_missing", None).unwrap().is_empty());

        let json = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json["event_type"], "post_status_changed");
        assert_eq!(json["actor"], "editor");
        assert!(json.get("entity_type").is_none());
    }
}
