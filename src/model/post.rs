//! Post models for postsync.
//!
//! A [`ContentRecord`] is the local, durable copy of a post. A [`RemotePost`]
//! is the publishing target's view of the same content, refetched on every
//! sync run and never persisted.

use serde::{Deserialize, Serialize};

/// Category assigned to posts imported from the remote, which carry no
/// local category of their own.
pub const FALLBACK_CATEGORY: &str = "general";

/// Local editorial status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Reviewed,
    Published,
}

impl PostStatus {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Reviewed => "reviewed",
            Self::Published => "published",
        }
    }

    /// Parse a stored status value.
    ///
    /// Unknown values fall back to `Draft`, the least-visible state.
    #[must_use]
    pub fn from_db(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "reviewed" => Self::Reviewed,
            "published" => Self::Published,
            _ => Self::Draft,
        }
    }

    /// Whether the post is still in the editorial pipeline.
    #[must_use]
    pub const fn is_unpublished(&self) -> bool {
        matches!(self, Self::Draft | Self::Reviewed)
    }
}

impl Default for PostStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of a post on the remote publishing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Publicly visible.
    Live,
    /// Not yet published.
    Draft,
}

impl Visibility {
    /// Wire representation used by the remote API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::Draft => "DRAFT",
        }
    }

    /// Lowercase form used in listing query parameters.
    #[must_use]
    pub const fn as_query(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Draft => "draft",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The local, authoritative copy of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Unique identifier (e.g., "post_1a2b3c4d5e6f")
    pub id: String,

    pub title: String,

    /// Rendered HTML body
    pub html_content: String,

    pub category: String,

    pub status: PostStatus,

    /// Identifier of the linked remote post. Survives unpublish so the
    /// link can be reused to republish.
    pub remote_id: Option<String>,

    /// Public URL, only set while the remote copy is live
    pub remote_url: Option<String>,

    /// Remote publication timestamp (Unix milliseconds)
    pub remote_published_at: Option<i64>,

    /// Article the post was generated from
    pub source_url: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last content edit (Unix milliseconds). `None` when never recorded
    /// or unreadable.
    pub updated_at: Option<i64>,

    /// Last successful reconciliation (Unix milliseconds)
    pub last_synced_at: Option<i64>,
}

impl ContentRecord {
    /// Whether the record carries a link to a remote post.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.remote_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Whether a live URL is recorded.
    #[must_use]
    pub fn has_remote_url(&self) -> bool {
        self.remote_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// Labels sent to the remote when creating or updating the post.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        if self.category.trim().is_empty() {
            Vec::new()
        } else {
            vec![self.category.clone()]
        }
    }
}

/// Fields for inserting a new local record.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub html_content: String,
    pub category: String,
    pub status: PostStatus,
    pub remote_id: Option<String>,
    pub remote_url: Option<String>,
    pub remote_published_at: Option<i64>,
    pub source_url: Option<String>,
    /// Explicit content timestamp; defaults to now when `None`.
    pub updated_at: Option<i64>,
    pub last_synced_at: Option<i64>,
}

impl NewPost {
    /// A fresh local draft, as produced by the generation pipeline.
    pub fn draft(title: impl Into<String>, html_content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            html_content: html_content.into(),
            category: FALLBACK_CATEGORY.to_string(),
            status: PostStatus::Draft,
            remote_id: None,
            remote_url: None,
            remote_published_at: None,
            source_url: None,
            updated_at: None,
            last_synced_at: None,
        }
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the status.
    #[must_use]
    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the source article URL.
    #[must_use]
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Build a local record from a remote post that has no local counterpart.
    ///
    /// Live posts arrive as `Published` with their URL; drafts arrive as
    /// `Draft` without one. The content timestamp is copied from the remote
    /// so the next merge sees both sides as equally fresh.
    #[must_use]
    pub fn from_remote(post: &RemotePost, synced_at: i64) -> Self {
        let live = post.visibility == Visibility::Live;
        Self {
            title: post.title.clone(),
            html_content: post.content.clone(),
            category: FALLBACK_CATEGORY.to_string(),
            status: if live {
                PostStatus::Published
            } else {
                PostStatus::Draft
            },
            remote_id: Some(post.id.clone()),
            remote_url: if live { post.url.clone() } else { None },
            remote_published_at: if live { post.published_at } else { None },
            source_url: None,
            updated_at: post.updated_at,
            last_synced_at: Some(synced_at),
        }
    }
}

/// Partial update of a local record.
///
/// Outer `None` leaves a field untouched; for nullable columns the inner
/// `None` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub html_content: Option<String>,
    pub status: Option<PostStatus>,
    pub remote_id: Option<Option<String>>,
    pub remote_url: Option<Option<String>>,
    pub remote_published_at: Option<Option<i64>>,
    pub updated_at: Option<Option<i64>>,
    pub last_synced_at: Option<i64>,
}

impl PostPatch {
    /// True when nothing besides the sync stamp would change.
    #[must_use]
    pub fn is_material_empty(&self) -> bool {
        self.title.is_none()
            && self.html_content.is_none()
            && self.status.is_none()
            && self.remote_id.is_none()
            && self.remote_url.is_none()
            && self.remote_published_at.is_none()
            && self.updated_at.is_none()
    }

    /// True when the patch would not touch the record at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_material_empty() && self.last_synced_at.is_none()
    }

    /// Clear every linkage field.
    pub fn unlink(&mut self) {
        self.remote_id = Some(None);
        self.remote_url = Some(None);
        self.remote_published_at = Some(None);
    }

    /// Apply the patch to an in-memory record.
    pub fn apply_to(&self, record: &mut ContentRecord) {
        if let Some(title) = &self.title {
            record.title.clone_from(title);
        }
        if let Some(html) = &self.html_content {
            record.html_content.clone_from(html);
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(remote_id) = &self.remote_id {
            record.remote_id.clone_from(remote_id);
        }
        if let Some(remote_url) = &self.remote_url {
            record.remote_url.clone_from(remote_url);
        }
        if let Some(published_at) = self.remote_published_at {
            record.remote_published_at = published_at;
        }
        if let Some(updated_at) = self.updated_at {
            record.updated_at = updated_at;
        }
        if let Some(synced_at) = self.last_synced_at {
            record.last_synced_at = Some(synced_at);
        }
    }
}

/// Filter for listing local records.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    /// `Some(true)` keeps only records with a remote link, `Some(false)`
    /// only records without one.
    pub linked: Option<bool>,
    pub limit: Option<u32>,
}

impl PostFilter {
    /// Records that carry a remote link.
    #[must_use]
    pub fn linked() -> Self {
        Self {
            linked: Some(true),
            ..Self::default()
        }
    }
}

/// A post as reported by the remote publishing target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePost {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Present only while the post is live
    pub url: Option<String>,
    pub visibility: Visibility,
    /// Publication timestamp (Unix milliseconds)
    pub published_at: Option<i64>,
    /// Last remote modification (Unix milliseconds)
    pub updated_at: Option<i64>,
}

/// Payload for creating a remote post.
#[derive(Debug, Clone)]
pub struct NewRemotePost {
    pub title: String,
    pub html_content: String,
    pub labels: Vec<String>,
    pub as_draft: bool,
}

/// What the remote returns after creating a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPost {
    pub id: String,
    pub url: Option<String>,
    pub published_at: Option<i64>,
}
