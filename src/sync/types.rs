//! Reconciliation report types.
//!
//! These are the output contract of a sync run. Nothing here is persisted.

use serde::{Deserialize, Serialize};

use crate::model::{PostStatus, RemotePost};

/// How a local record was paired with a remote post.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// The record's `remote_id` points at a post that still exists.
    IdMatch(RemotePost),
    /// No usable link, but a remote title is similar enough.
    FuzzyTitleMatch { post: RemotePost, score: f64 },
    /// No link and no similar title.
    Unmatched,
    /// The record's `remote_id` points at a post that no longer exists.
    DeletedRemotely,
}

impl MatchResult {
    /// The paired remote post, if any.
    #[must_use]
    pub fn post(&self) -> Option<&RemotePost> {
        match self {
            Self::IdMatch(post) | Self::FuzzyTitleMatch { post, .. } => Some(post),
            Self::Unmatched | Self::DeletedRemotely => None,
        }
    }

    /// Storage-style name of the match kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IdMatch(_) => "id_match",
            Self::FuzzyTitleMatch { .. } => "fuzzy_title_match",
            Self::Unmatched => "unmatched",
            Self::DeletedRemotely => "deleted_remotely",
        }
    }
}

/// Kind of divergence (or phase outcome) recorded in a report detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Published locally, remote post is gone.
    DeletedRemotely,
    /// Unpublished record still points at a vanished remote post.
    StaleRemoteLink,
    /// Published locally but never linked or pushed live.
    MissingRemote,
    /// Published locally, remote copy is a draft.
    StatusMismatch,
    /// Published and live, but no URL recorded locally.
    MissingUrl,
    /// Live remotely, still draft or reviewed locally.
    UnpublishedLocally,
    /// Live URL or publish time changed on the remote.
    UrlRefreshed,
    /// Link restored from a fuzzy title match.
    LinkRepaired,
    /// Newer remote title or body copied into the local record.
    ContentPulled,
    /// Newer local title or body sent to the remote.
    ContentPushed,
    /// Sending newer local content to the remote failed.
    ContentPushFailed,
    /// Remote post with no local counterpart was imported.
    Imported,
    /// Unlinked local record was created on the remote as a draft.
    Pushed,
    /// Reconciling this record failed; see the detail's error.
    SyncFailed,
}

impl IssueType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DeletedRemotely => "deleted_remotely",
            Self::StaleRemoteLink => "stale_remote_link",
            Self::MissingRemote => "missing_remote",
            Self::StatusMismatch => "status_mismatch",
            Self::MissingUrl => "missing_url",
            Self::UnpublishedLocally => "unpublished_locally",
            Self::UrlRefreshed => "url_refreshed",
            Self::LinkRepaired => "link_repaired",
            Self::ContentPulled => "content_pulled",
            Self::ContentPushed => "content_pushed",
            Self::ContentPushFailed => "content_push_failed",
            Self::Imported => "imported",
            Self::Pushed => "pushed",
            Self::SyncFailed => "sync_failed",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a sync report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDetail {
    /// Local record id (empty when an import failed before a record existed)
    pub record_id: String,
    pub title: String,
    pub issue: IssueType,
    pub prior_status: Option<PostStatus>,
    pub new_status: Option<PostStatus>,
    /// Human-readable description of what was done
    pub action: String,
    /// Failure message when the corrective action could not be applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncDetail {
    pub fn new(record_id: &str, title: &str, issue: IssueType, action: impl Into<String>) -> Self {
        Self {
            record_id: record_id.to_string(),
            title: title.to_string(),
            issue,
            prior_status: None,
            new_status: None,
            action: action.into(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_statuses(mut self, prior: PostStatus, new: PostStatus) -> Self {
        self.prior_status = Some(prior);
        self.new_status = Some(new);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of a full reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Records whose reconciliation changed something locally or remotely
    pub synced: usize,
    pub issues_found: usize,
    pub issues_fixed: usize,
    pub imported: usize,
    pub pushed: usize,
    /// Records (or remote posts) that could not be reconciled
    pub failed: usize,
    pub remote_live: usize,
    pub remote_draft: usize,
    pub local_checked: usize,
    pub details: Vec<SyncDetail>,
}

impl SyncReport {
    /// Nothing needed fixing and nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.synced == 0
            && self.issues_found == 0
            && self.imported == 0
            && self.pushed == 0
            && self.failed == 0
    }

    /// At least one record could not be reconciled.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Details of one issue type.
    pub fn details_of(&self, issue: IssueType) -> impl Iterator<Item = &SyncDetail> {
        self.details.iter().filter(move |d| d.issue == issue)
    }
}

/// Result of a light sync over linked records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSyncReport {
    /// Records whose reconciliation changed something
    pub synced_count: usize,
    /// Linked records fetched from the remote
    pub posts_checked: usize,
    /// Records skipped because the remote lookup failed
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub details: Vec<SyncDetail>,
}
