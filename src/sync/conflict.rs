//! Conflict resolution for a single record.
//!
//! [`resolve_conflict`] is pure: it inspects a record and its match and
//! returns the patch, report details and optional content push that would
//! bring the two sides back in line. [`apply`] carries a resolution out
//! against the store and the remote.

use super::types::{IssueType, MatchResult, SyncDetail};
use crate::model::{ContentRecord, PostPatch, PostStatus, RemotePost, Visibility};
use crate::remote::RemotePublisher;
use crate::storage::ContentStore;

/// Which side's content wins for a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDirection {
    /// Remote is strictly newer.
    Pull,
    /// Local is strictly newer.
    Push,
    /// Equal, missing or unreadable timestamps.
    None,
}

/// Compare content timestamps. Only a strict ordering moves content.
#[must_use]
pub fn merge_direction(local_updated: Option<i64>, remote_updated: Option<i64>) -> MergeDirection {
    match (local_updated, remote_updated) {
        (Some(local), Some(remote)) if remote > local => MergeDirection::Pull,
        (Some(local), Some(remote)) if local > remote => MergeDirection::Push,
        _ => MergeDirection::None,
    }
}

/// Local content to send to the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPush {
    pub remote_id: String,
    pub title: String,
    pub html_content: String,
    pub labels: Vec<String>,
}

/// Corrective actions decided for one record.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub patch: PostPatch,
    pub details: Vec<SyncDetail>,
    pub push: Option<ContentPush>,
}

impl Resolution {
    /// Whether persisting the patch would change more than the sync stamp.
    #[must_use]
    pub fn is_material(&self) -> bool {
        !self.patch.is_material_empty()
    }

    fn note(&mut self, record: &ContentRecord, issue: IssueType, action: impl Into<String>) {
        self.details
            .push(SyncDetail::new(&record.id, &record.title, issue, action));
    }
}

/// Decide what to do about one record.
///
/// Rules are evaluated in priority order and the first that applies wins.
/// Matched pairs additionally get their link repaired and content merged
/// by recency. `now` is the sync stamp written with any fix.
#[must_use]
pub fn resolve_conflict(record: &ContentRecord, matched: &MatchResult, now: i64) -> Resolution {
    let mut res = Resolution::default();
    let published = record.status == PostStatus::Published;

    match matched {
        MatchResult::DeletedRemotely if published => {
            res.patch.status = Some(PostStatus::Reviewed);
            res.patch.unlink();
            res.patch.last_synced_at = Some(now);
            res.note(
                record,
                IssueType::DeletedRemotely,
                "remote post deleted; reverted to reviewed and unlinked",
            );
        }
        MatchResult::DeletedRemotely => {
            res.note(
                record,
                IssueType::StaleRemoteLink,
                format!(
                    "linked remote post {} no longer exists; left unchanged",
                    record.remote_id.as_deref().unwrap_or_default()
                ),
            );
        }
        MatchResult::Unmatched if published && !record.has_remote_url() => {
            res.patch.status = Some(PostStatus::Reviewed);
            res.patch.unlink();
            res.patch.last_synced_at = Some(now);
            res.note(
                record,
                IssueType::MissingRemote,
                "marked published but never pushed live; reverted to reviewed",
            );
        }
        MatchResult::Unmatched => {}
        MatchResult::IdMatch(post) => resolve_matched(record, post, None, now, &mut res),
        MatchResult::FuzzyTitleMatch { post, score } => {
            resolve_matched(record, post, Some(*score), now, &mut res);
        }
    }

    let new_status = res.patch.status.unwrap_or(record.status);
    for detail in &mut res.details {
        detail.prior_status = Some(record.status);
        detail.new_status = Some(new_status);
    }

    res
}

fn resolve_matched(
    record: &ContentRecord,
    post: &RemotePost,
    fuzzy_score: Option<f64>,
    now: i64,
    res: &mut Resolution,
) {
    if record.remote_id.as_deref() != Some(post.id.as_str()) {
        res.patch.remote_id = Some(Some(post.id.clone()));
        let action = match fuzzy_score {
            Some(score) => format!("linked to remote post {} (title similarity {score:.2})", post.id),
            None => format!("linked to remote post {}", post.id),
        };
        res.note(record, IssueType::LinkRepaired, action);
    }
    res.patch.last_synced_at = Some(now);

    let published = record.status == PostStatus::Published;
    let live = post.visibility == Visibility::Live;

    if published && !live {
        if record.remote_url.is_some() || record.remote_published_at.is_some() {
            res.patch.remote_url = Some(None);
            res.patch.remote_published_at = Some(None);
            res.note(
                record,
                IssueType::StatusMismatch,
                "remote copy is a draft; cleared live URL",
            );
        }
    } else if published && !record.has_remote_url() && live {
        if refresh_live_fields(record, post, &mut res.patch) {
            res.note(record, IssueType::MissingUrl, "backfilled live URL from remote");
        }
    } else if record.status.is_unpublished() && live {
        res.patch.status = Some(PostStatus::Published);
        refresh_live_fields(record, post, &mut res.patch);
        res.note(
            record,
            IssueType::UnpublishedLocally,
            "remote copy is live; promoted to published",
        );
    } else if live && refresh_live_fields(record, post, &mut res.patch) {
        res.note(record, IssueType::UrlRefreshed, "refreshed live URL from remote");
    }

    merge_content(record, post, res);
}

/// Copy the remote's live URL and publish time where they differ.
fn refresh_live_fields(record: &ContentRecord, post: &RemotePost, patch: &mut PostPatch) -> bool {
    let mut changed = false;
    if post.url.is_some() && record.remote_url != post.url {
        patch.remote_url = Some(post.url.clone());
        changed = true;
    }
    if post.published_at.is_some() && record.remote_published_at != post.published_at {
        patch.remote_published_at = Some(post.published_at);
        changed = true;
    }
    changed
}

fn merge_content(record: &ContentRecord, post: &RemotePost, res: &mut Resolution) {
    match merge_direction(record.updated_at, post.updated_at) {
        MergeDirection::Pull => {
            let mut pulled = Vec::new();
            if record.title != post.title {
                res.patch.title = Some(post.title.clone());
                pulled.push("title");
            }
            if record.html_content != post.content {
                res.patch.html_content = Some(post.content.clone());
                pulled.push("content");
            }
            if !pulled.is_empty() {
                res.patch.updated_at = Some(post.updated_at);
                res.note(
                    record,
                    IssueType::ContentPulled,
                    format!("pulled newer {} from remote", pulled.join(" and ")),
                );
            }
        }
        MergeDirection::Push => {
            res.push = Some(ContentPush {
                remote_id: post.id.clone(),
                title: record.title.clone(),
                html_content: record.html_content.clone(),
                labels: record.labels(),
            });
        }
        MergeDirection::None => {}
    }
}

/// What happened when a resolution was applied.
#[derive(Debug, Default)]
pub struct Outcome {
    pub details: Vec<SyncDetail>,
    /// Something changed locally or remotely.
    pub changed: bool,
    pub issues_found: usize,
    pub issues_fixed: usize,
    pub failed: bool,
    /// The record as stored afterwards.
    pub record: Option<ContentRecord>,
}

/// Persist a resolution and perform its content push.
///
/// When `always_stamp` is false, only material changes are written. Store
/// and remote failures are recorded on the outcome, never returned. The
/// content push is skipped when the local write fails.
pub async fn apply<S, P>(
    store: &mut S,
    remote: &P,
    record: &ContentRecord,
    mut resolution: Resolution,
    actor: &str,
    always_stamp: bool,
) -> Outcome
where
    S: ContentStore,
    P: RemotePublisher,
{
    let mut outcome = Outcome {
        issues_found: resolution.details.len(),
        ..Outcome::default()
    };

    let material = resolution.is_material();
    let write = material || (always_stamp && resolution.patch.last_synced_at.is_some());

    if write {
        match store.update_post(&record.id, &resolution.patch, actor) {
            Ok(updated) => {
                if material {
                    outcome.changed = true;
                    outcome.issues_fixed += resolution
                        .details
                        .iter()
                        .filter(|d| d.issue != IssueType::StaleRemoteLink)
                        .count();
                    tracing::info!(
                        record_id = %record.id,
                        issues = ?resolution.details.iter().map(|d| d.issue.as_str()).collect::<Vec<_>>(),
                        "Reconciled record"
                    );
                }
                outcome.record = Some(updated);
            }
            Err(e) => {
                tracing::warn!(record_id = %record.id, error = %e, "Failed to persist reconciliation");
                outcome.failed = true;
                if resolution.details.is_empty() {
                    resolution.details.push(SyncDetail::new(
                        &record.id,
                        &record.title,
                        IssueType::SyncFailed,
                        "could not record sync",
                    ));
                    outcome.issues_found += 1;
                }
                for detail in &mut resolution.details {
                    detail.error = Some(e.to_string());
                }
            }
        }
    }

    // A record whose local write failed is not pushed; the next run retries
    // both from the same state.
    let push = if outcome.failed {
        None
    } else {
        resolution.push.take()
    };
    if let Some(push) = push {
        outcome.issues_found += 1;
        let detail = match remote
            .update(&push.remote_id, &push.title, &push.html_content, &push.labels)
            .await
        {
            Ok(_) => {
                tracing::info!(record_id = %record.id, remote_id = %push.remote_id, "Pushed newer local content");
                outcome.changed = true;
                outcome.issues_fixed += 1;
                SyncDetail::new(
                    &record.id,
                    &record.title,
                    IssueType::ContentPushed,
                    "pushed newer local content to remote",
                )
            }
            Err(e) => {
                tracing::warn!(record_id = %record.id, remote_id = %push.remote_id, error = %e, "Content push failed");
                outcome.failed = true;
                SyncDetail::new(
                    &record.id,
                    &record.title,
                    IssueType::ContentPushFailed,
                    "local content left unchanged",
                )
                .with_error(e)
            }
        };
        resolution
            .details
            .push(detail.with_statuses(record.status, record.status));
    }

    outcome.details = resolution.details;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::{self, MockPublisher};
    use crate::storage::SqliteStorage;
    use crate::model::NewPost;

    fn record(status: PostStatus) -> ContentRecord {
        ContentRecord {
            id: "post_1".to_string(),
            title: "Local Title".to_string(),
            html_content: "<p>local</p>".to_string(),
            category: "news".to_string(),
            status,
            remote_id: Some("R1".to_string()),
            remote_url: Some("https://blog.example.com/R1".to_string()),
            remote_published_at: Some(1_000),
            source_url: None,
            created_at: 0,
            updated_at: Some(5_000),
            last_synced_at: None,
        }
    }

    #[test]
    fn test_merge_direction() {
        assert_eq!(merge_direction(Some(1), Some(2)), MergeDirection::Pull);
        assert_eq!(merge_direction(Some(2), Some(1)), MergeDirection::Push);
        assert_eq!(merge_direction(Some(2), Some(2)), MergeDirection::None);
        assert_eq!(merge_direction(None, Some(2)), MergeDirection::None);
        assert_eq!(merge_direction(Some(2), None), MergeDirection::None);
    }

    #[test]
    fn test_deleted_remotely_published_reverts() {
        let rec = record(PostStatus::Published);
        let res = resolve_conflict(&rec, &MatchResult::DeletedRemotely, 9);

        assert_eq!(res.patch.status, Some(PostStatus::Reviewed));
        assert_eq!(res.patch.remote_id, Some(None));
        assert_eq!(res.patch.remote_url, Some(None));
        assert_eq!(res.patch.remote_published_at, Some(None));
        assert_eq!(res.patch.last_synced_at, Some(9));
        assert_eq!(res.details[0].issue, IssueType::DeletedRemotely);
        assert_eq!(res.details[0].new_status, Some(PostStatus::Reviewed));
    }

    #[test]
    fn test_deleted_remotely_unpublished_is_flagged_only() {
        let mut rec = record(PostStatus::Draft);
        rec.remote_url = None;
        let res = resolve_conflict(&rec, &MatchResult::DeletedRemotely, 9);

        assert!(res.patch.is_empty());
        assert_eq!(res.details.len(), 1);
        assert_eq!(res.details[0].issue, IssueType::StaleRemoteLink);
    }

    #[test]
    fn test_unmatched_published_without_url_reverts() {
        let mut rec = record(PostStatus::Published);
        rec.remote_id = None;
        rec.remote_url = None;
        let res = resolve_conflict(&rec, &MatchResult::Unmatched, 9);

        assert_eq!(res.patch.status, Some(PostStatus::Reviewed));
        assert_eq!(res.details[0].issue, IssueType::MissingRemote);
    }

    #[test]
    fn test_unmatched_draft_untouched() {
        let mut rec = record(PostStatus::Draft);
        rec.remote_id = None;
        let res = resolve_conflict(&rec, &MatchResult::Unmatched, 9);
        assert!(res.patch.is_empty());
        assert!(res.details.is_empty());
    }

    #[test]
    fn test_published_with_remote_draft_clears_url() {
        let rec = record(PostStatus::Published);
        let post = mock::draft("R1", "Local Title", "<p>local</p>", Some(5_000));
        let res = resolve_conflict(&rec, &MatchResult::IdMatch(post), 9);

        assert_eq!(res.patch.remote_url, Some(None));
        assert_eq!(res.patch.remote_published_at, Some(None));
        assert!(res.patch.status.is_none());
        assert!(res.patch.remote_id.is_none());
        assert_eq!(res.details[0].issue, IssueType::StatusMismatch);
    }

    #[test]
    fn test_published_missing_url_backfills() {
        let mut rec = record(PostStatus::Published);
        rec.remote_url = None;
        rec.remote_published_at = None;
        let post = mock::live("R1", "Local Title", "<p>local</p>", Some(5_000));
        let res = resolve_conflict(&rec, &MatchResult::IdMatch(post.clone()), 9);

        assert_eq!(res.patch.remote_url, Some(post.url));
        assert_eq!(res.patch.remote_published_at, Some(post.published_at));
        assert_eq!(res.details[0].issue, IssueType::MissingUrl);
    }

    #[test]
    fn test_draft_with_live_remote_promotes() {
        let mut rec = record(PostStatus::Draft);
        rec.remote_url = None;
        let post = mock::live("R1", "Local Title", "<p>local</p>", Some(5_000));
        let res = resolve_conflict(&rec, &MatchResult::IdMatch(post), 9);

        assert_eq!(res.patch.status, Some(PostStatus::Published));
        assert!(res.patch.remote_url.is_some());
        assert_eq!(res.details[0].issue, IssueType::UnpublishedLocally);
        assert_eq!(res.details[0].prior_status, Some(PostStatus::Draft));
    }

    #[test]
    fn test_live_in_sync_only_stamps() {
        let rec = record(PostStatus::Published);
        let mut post = mock::live("R1", "Local Title", "<p>local</p>", Some(5_000));
        post.url.clone_from(&rec.remote_url);
        post.published_at = rec.remote_published_at;
        let res = resolve_conflict(&rec, &MatchResult::IdMatch(post), 9);

        assert!(!res.is_material());
        assert_eq!(res.patch.last_synced_at, Some(9));
        assert!(res.details.is_empty());
        assert!(res.push.is_none());
    }

    #[test]
    fn test_live_url_changed_refreshes() {
        let rec = record(PostStatus::Published);
        let mut post = mock::live("R1", "Local Title", "<p>local</p>", Some(5_000));
        post.url = Some("https://blog.example.com/renamed".to_string());
        let res = resolve_conflict(&rec, &MatchResult::IdMatch(post), 9);

        assert_eq!(
            res.patch.remote_url,
            Some(Some("https://blog.example.com/renamed".to_string()))
        );
        assert_eq!(res.details[0].issue, IssueType::UrlRefreshed);
    }

    #[test]
    fn test_fuzzy_match_repairs_link() {
        let mut rec = record(PostStatus::Reviewed);
        rec.remote_id = None;
        rec.remote_url = None;
        let post = mock::draft("R7", "Local Title", "<p>local</p>", Some(5_000));
        let res = resolve_conflict(
            &rec,
            &MatchResult::FuzzyTitleMatch { post, score: 0.9 },
            9,
        );

        assert_eq!(res.patch.remote_id, Some(Some("R7".to_string())));
        assert_eq!(res.details[0].issue, IssueType::LinkRepaired);
        assert!(res.details[0].action.contains("0.90"));
    }

    #[test]
    fn test_remote_newer_pulls_differing_fields() {
        let rec = record(PostStatus::Published);
        let mut post = mock::live("R1", "Remote Title", "<p>local</p>", Some(6_000));
        post.url.clone_from(&rec.remote_url);
        post.published_at = rec.remote_published_at;
        let res = resolve_conflict(&rec, &MatchResult::IdMatch(post), 9);

        assert_eq!(res.patch.title.as_deref(), Some("Remote Title"));
        assert!(res.patch.html_content.is_none());
        assert_eq!(res.patch.updated_at, Some(Some(6_000)));
        assert_eq!(res.details[0].issue, IssueType::ContentPulled);
    }

    #[test]
    fn test_remote_newer_identical_content_no_change() {
        let rec = record(PostStatus::Published);
        let mut post = mock::live("R1", "Local Title", "<p>local</p>", Some(6_000));
        post.url.clone_from(&rec.remote_url);
        post.published_at = rec.remote_published_at;
        let res = resolve_conflict(&rec, &MatchResult::IdMatch(post), 9);
        assert!(!res.is_material());
    }

    #[test]
    fn test_local_newer_pushes() {
        let rec = record(PostStatus::Published);
        let mut post = mock::live("R1", "Old Remote", "<p>old</p>", Some(4_000));
        post.url.clone_from(&rec.remote_url);
        post.published_at = rec.remote_published_at;
        let res = resolve_conflict(&rec, &MatchResult::IdMatch(post), 9);

        assert!(res.patch.title.is_none());
        let push = res.push.unwrap();
        assert_eq!(push.remote_id, "R1");
        assert_eq!(push.title, "Local Title");
        assert_eq!(push.labels, vec!["news".to_string()]);
    }

    #[test]
    fn test_missing_timestamps_no_transfer() {
        let mut rec = record(PostStatus::Published);
        rec.updated_at = None;
        let post = mock::live("R1", "Remote Title", "<p>remote</p>", None);
        let res = resolve_conflict(&rec, &MatchResult::IdMatch(post), 9);
        assert!(res.patch.title.is_none());
        assert!(res.push.is_none());
    }

    #[tokio::test]
    async fn test_apply_push_failure_leaves_local_untouched() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let rec = store
            .insert_post(&NewPost::draft("Local", "<p>new</p>"), "t")
            .unwrap();
        let remote = MockPublisher::new().failing_update("R1");

        let res = Resolution {
            push: Some(ContentPush {
                remote_id: "R1".to_string(),
                title: rec.title.clone(),
                html_content: rec.html_content.clone(),
                labels: vec![],
            }),
            ..Resolution::default()
        };
        let outcome = apply(&mut store, &remote, &rec, res, "sync", false).await;

        assert!(outcome.failed);
        assert!(!outcome.changed);
        assert_eq!(outcome.details[0].issue, IssueType::ContentPushFailed);
        assert!(outcome.details[0].error.is_some());
        assert_eq!(store.get_post(&rec.id).unwrap().unwrap(), rec);
    }

    #[tokio::test]
    async fn test_apply_store_failure_is_recorded() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let remote = MockPublisher::new();
        let rec = record(PostStatus::Published);

        let res = resolve_conflict(&rec, &MatchResult::DeletedRemotely, 9);
        let outcome = apply(&mut store, &remote, &rec, res, "sync", false).await;

        assert!(outcome.failed);
        assert_eq!(outcome.issues_fixed, 0);
        assert_eq!(outcome.issues_found, 1);
        assert!(outcome.details[0].error.as_deref().unwrap().contains("post_1"));
    }

    #[tokio::test]
    async fn test_apply_skips_push_when_local_write_fails() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let remote = MockPublisher::new().with_post(mock::live("R1", "Remote", "<p>r</p>", Some(1)));
        let rec = record(PostStatus::Published);

        let mut res = Resolution {
            push: Some(ContentPush {
                remote_id: "R1".to_string(),
                title: rec.title.clone(),
                html_content: rec.html_content.clone(),
                labels: vec![],
            }),
            ..Resolution::default()
        };
        res.patch.last_synced_at = Some(9);
        res.patch.remote_url = Some(Some("https://blog.example.com/R1-moved".to_string()));
        res.note(&rec, IssueType::LinkRepaired, "refreshed url");

        let outcome = apply(&mut store, &remote, &rec, res, "sync", false).await;

        assert!(outcome.failed);
        assert!(!outcome.changed);
        assert!(remote.calls_to("update").is_empty());
        assert_eq!(remote.post("R1").unwrap().title, "Remote");
        assert!(outcome
            .details
            .iter()
            .all(|d| d.issue != IssueType::ContentPushed));
    }
}
