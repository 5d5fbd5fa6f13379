//! Reconciliation between the local store and the remote publisher.
//!
//! - **Identity**: pair local records with remote posts by id, falling back
//!   to fuzzy title similarity
//! - **Conflict**: decide per-record corrections and merge content by recency
//! - **Full sync**: discover, verify, import and push across everything
//! - **Light sync**: re-check linked records without listing the remote
//! - **Edit**: local edits pushed through to the linked remote post
//! - **Publish**: editor-driven publish, unpublish and review transitions
//! - **Status**: local overview, no network
//!
//! # Example
//!
//! ```ignore
//! use postsync::remote::BloggerClient;
//! use postsync::storage::SqliteStorage;
//! use postsync::sync::FullSync;
//!
//! let mut storage = SqliteStorage::open(&db_path)?;
//! let remote = BloggerClient::from_env()?;
//! let report = FullSync::new(&mut storage, &remote, "cron").run().await?;
//! println!("{} synced, {} failed", report.synced, report.failed);
//! ```

pub mod conflict;
mod edit;
mod full;
pub mod identity;
mod light;
mod publish;
mod status;
mod types;

pub use conflict::{resolve_conflict, MergeDirection, Resolution};
pub use edit::{apply_local_edit, EditOutcome};
pub use full::FullSync;
pub use identity::{normalize, similarity, FUZZY_MATCH_THRESHOLD};
pub use light::{LightSync, NOT_CONFIGURED_MESSAGE};
pub use publish::{publish_post, set_review_status, unpublish_post, UnpublishMode};
pub use status::{get_sync_overview, print_overview, SyncOverview};
pub use types::{IssueType, LightSyncReport, MatchResult, SyncDetail, SyncReport};
