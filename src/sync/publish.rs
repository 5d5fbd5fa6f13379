//! Editor-driven publishing: take a record live, take it back down, and
//! move it through review.
//!
//! These are the transitions the reconciliation runs never make on their
//! own. Each one talks to the remote first and writes locally only after the
//! remote call it depends on has succeeded.

use super::edit::EditOutcome;
use crate::error::{Error, Result};
use crate::model::{ContentRecord, NewRemotePost, PostPatch, PostStatus};
use crate::remote::RemotePublisher;
use crate::storage::ContentStore;

/// How `unpublish_post` takes a post off the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnpublishMode {
    /// Revert the remote post to a draft and keep the link.
    #[default]
    Revert,
    /// Delete the remote post (best-effort) and unlink the record.
    Delete,
}

fn load<S: ContentStore>(store: &S, id: &str) -> Result<ContentRecord> {
    store
        .get_post(id)?
        .ok_or_else(|| Error::PostNotFound { id: id.to_string() })
}

/// Publish a record to the remote.
///
/// A record already linked to a remote draft has that draft made live; an
/// unlinked record is created live with its category as label. The record
/// then becomes `published` with the remote id, URL and publication time.
///
/// # Errors
///
/// Returns `RemoteNotConfigured` without credentials, `PostNotFound` for an
/// unknown id, `InvalidArgument` when the record is already live, and any
/// remote or store error. Nothing is written locally when the remote call
/// fails.
pub async fn publish_post<S, P>(
    store: &mut S,
    remote: &P,
    id: &str,
    actor: &str,
) -> Result<ContentRecord>
where
    S: ContentStore,
    P: RemotePublisher,
{
    if !remote.is_configured() {
        return Err(Error::RemoteNotConfigured);
    }
    let record = load(store, id)?;
    if record.status == PostStatus::Published && record.is_linked() && record.has_remote_url() {
        return Err(Error::InvalidArgument(format!(
            "post {id} is already published at {}",
            record.remote_url.as_deref().unwrap_or_default()
        )));
    }

    let now = chrono::Utc::now().timestamp_millis();
    let (remote_id, url, published_at) = match record.remote_id.as_deref().filter(|r| !r.is_empty()) {
        Some(remote_id) => {
            let post = remote.publish_draft(remote_id).await?;
            (post.id, post.url, post.published_at)
        }
        None => {
            let created = remote
                .create(&NewRemotePost {
                    title: record.title.clone(),
                    html_content: record.html_content.clone(),
                    labels: record.labels(),
                    as_draft: false,
                })
                .await?;
            (created.id, created.url, created.published_at)
        }
    };

    let patch = PostPatch {
        status: Some(PostStatus::Published),
        remote_id: Some(Some(remote_id.clone())),
        remote_url: Some(url),
        remote_published_at: Some(Some(published_at.unwrap_or(now))),
        last_synced_at: Some(now),
        ..PostPatch::default()
    };
    let record = store.update_post(id, &patch, actor)?;
    tracing::info!(record_id = %record.id, %remote_id, "Published post");
    Ok(record)
}

/// Take a record off the remote and return it to `reviewed`.
///
/// With [`UnpublishMode::Revert`] the remote post becomes a draft and the
/// record keeps its `remote_id`; the remote call must succeed. With
/// [`UnpublishMode::Delete`] the remote post is deleted if the remote is
/// configured, a failed delete is reported in `remote_synced` and the
/// record is unlinked regardless.
///
/// # Errors
///
/// Returns `PostNotFound` for an unknown id, `InvalidArgument` when the
/// record has no remote link, `RemoteNotConfigured` or a remote error in
/// revert mode, and store errors.
pub async fn unpublish_post<S, P>(
    store: &mut S,
    remote: &P,
    id: &str,
    mode: UnpublishMode,
    actor: &str,
) -> Result<EditOutcome>
where
    S: ContentStore,
    P: RemotePublisher,
{
    let record = load(store, id)?;
    let Some(remote_id) = record.remote_id.clone().filter(|r| !r.is_empty()) else {
        return Err(Error::InvalidArgument(format!(
            "post {id} is not linked to a remote post"
        )));
    };

    let now = chrono::Utc::now().timestamp_millis();
    let mut patch = PostPatch {
        last_synced_at: Some(now),
        ..PostPatch::default()
    };
    if record.status == PostStatus::Published {
        patch.status = Some(PostStatus::Reviewed);
    }

    let remote_synced = match mode {
        UnpublishMode::Revert => {
            if !remote.is_configured() {
                return Err(Error::RemoteNotConfigured);
            }
            remote.revert_to_draft(&remote_id).await?;
            patch.remote_url = Some(None);
            patch.remote_published_at = Some(None);
            Some(true)
        }
        UnpublishMode::Delete => {
            let deleted = if remote.is_configured() {
                match remote.delete(&remote_id).await {
                    Ok(()) => Some(true),
                    Err(e) => {
                        tracing::warn!(record_id = %id, %remote_id, error = %e, "Remote delete failed, unlinking anyway");
                        Some(false)
                    }
                }
            } else {
                None
            };
            patch.unlink();
            deleted
        }
    };

    let record = store.update_post(id, &patch, actor)?;
    tracing::info!(record_id = %record.id, %remote_id, ?mode, "Unpublished post");
    Ok(EditOutcome {
        record,
        remote_synced,
    })
}

/// Move a record between `draft` and `reviewed`.
///
/// Setting the current status again is a no-op.
///
/// # Errors
///
/// Returns `PostNotFound` for an unknown id and `InvalidArgument` when the
/// target or the current status is `published`; those transitions go
/// through [`publish_post`] and [`unpublish_post`].
pub fn set_review_status<S: ContentStore>(
    store: &mut S,
    id: &str,
    status: PostStatus,
    actor: &str,
) -> Result<ContentRecord> {
    let record = load(store, id)?;
    if status == PostStatus::Published {
        return Err(Error::InvalidArgument(
            "use `postsync post publish` to publish a post".to_string(),
        ));
    }
    if record.status == PostStatus::Published {
        return Err(Error::InvalidArgument(format!(
            "post {id} is published; unpublish it before changing its review status"
        )));
    }
    if record.status == status {
        return Ok(record);
    }

    let patch = PostPatch {
        status: Some(status),
        ..PostPatch::default()
    };
    store.update_post(id, &patch, actor)
}
