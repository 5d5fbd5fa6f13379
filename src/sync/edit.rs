//! Local edits that push through to the remote.

use crate::error::{Error, Result};
use crate::model::{ContentRecord, PostPatch};
use crate::remote::RemotePublisher;
use crate::storage::ContentStore;

/// Result of a local change that may have been mirrored on the remote.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub record: ContentRecord,
    /// `None` when no push was attempted, otherwise whether it succeeded.
    pub remote_synced: Option<bool>,
}

/// Edit a record's title and/or body, then push the edit to its linked
/// remote post.
///
/// The local edit always lands and bumps `updated_at`. `last_synced_at` is
/// stamped only when the push succeeds; a failed push leaves the record
/// locally newer so the next sync retries it.
///
/// # Errors
///
/// Returns `InvalidArgument` when neither field is given, `PostNotFound`
/// when the record does not exist, or a store error.
pub async fn apply_local_edit<S, P>(
    store: &mut S,
    remote: &P,
    id: &str,
    title: Option<&str>,
    html_content: Option<&str>,
    actor: &str,
) -> Result<EditOutcome>
where
    S: ContentStore,
    P: RemotePublisher,
{
    if title.is_none() && html_content.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to edit: pass a title or HTML content".to_string(),
        ));
    }
    if store.get_post(id)?.is_none() {
        return Err(Error::PostNotFound { id: id.to_string() });
    }

    let now = chrono::Utc::now().timestamp_millis();
    let patch = PostPatch {
        title: title.map(str::to_string),
        html_content: html_content.map(str::to_string),
        updated_at: Some(Some(now)),
        ..PostPatch::default()
    };
    let record = store.update_post(id, &patch, actor)?;

    let Some(remote_id) = record.remote_id.clone().filter(|id| !id.is_empty()) else {
        return Ok(EditOutcome {
            record,
            remote_synced: None,
        });
    };
    if !remote.is_configured() {
        tracing::debug!(record_id = %record.id, "Remote not configured, edit kept local");
        return Ok(EditOutcome {
            record,
            remote_synced: None,
        });
    }

    match remote
        .update(&remote_id, &record.title, &record.html_content, &record.labels())
        .await
    {
        Ok(_) => {
            let stamp = PostPatch {
                last_synced_at: Some(chrono::Utc::now().timestamp_millis()),
                ..PostPatch::default()
            };
            let record = store.update_post(id, &stamp, actor)?;
            tracing::info!(record_id = %record.id, remote_id = %remote_id, "Edit pushed to remote");
            Ok(EditOutcome {
                record,
                remote_synced: Some(true),
            })
        }
        Err(e) => {
            tracing::warn!(record_id = %record.id, remote_id = %remote_id, error = %e, "Edit saved locally but push failed");
            Ok(EditOutcome {
                record,
                remote_synced: Some(false),
            })
        }
    }
}
