//! Light sync: re-check linked records one at a time.
//!
//! No listing calls are made, so nothing is imported or pushed. Each linked
//! record is fetched by id and corrected with the same rules as a full run.

use super::conflict;
use super::types::{LightSyncReport, MatchResult};
use crate::error::Result;
use crate::model::PostFilter;
use crate::remote::RemotePublisher;
use crate::storage::ContentStore;

/// Message reported when there is no remote to check against.
pub const NOT_CONFIGURED_MESSAGE: &str = "Remote publisher not configured";

pub struct LightSync<'a, S, P> {
    store: &'a mut S,
    remote: &'a P,
    actor: String,
}

impl<'a, S, P> LightSync<'a, S, P>
where
    S: ContentStore,
    P: RemotePublisher,
{
    pub fn new(store: &'a mut S, remote: &'a P, actor: impl Into<String>) -> Self {
        Self {
            store,
            remote,
            actor: actor.into(),
        }
    }

    /// Check every linked record against its remote post.
    ///
    /// An unconfigured remote is not an error here: the report comes back
    /// empty with an explanatory message. A failed lookup skips the record.
    ///
    /// # Errors
    ///
    /// Returns an error only if the linked records cannot be read.
    pub async fn run(self) -> Result<LightSyncReport> {
        if !self.remote.is_configured() {
            tracing::info!("Remote not configured, skipping light sync");
            return Ok(LightSyncReport {
                message: Some(NOT_CONFIGURED_MESSAGE.to_string()),
                ..LightSyncReport::default()
            });
        }

        let now = chrono::Utc::now().timestamp_millis();
        let mut report = LightSyncReport::default();
        let records = self.store.list_posts(&PostFilter::linked())?;
        tracing::info!(linked = records.len(), "Starting light sync");

        for record in &records {
            let Some(remote_id) = record.remote_id.as_deref() else {
                continue;
            };

            let matched = match self.remote.get(remote_id).await {
                Ok(Some(post)) => MatchResult::IdMatch(post),
                Ok(None) => MatchResult::DeletedRemotely,
                Err(e) => {
                    tracing::warn!(record_id = %record.id, remote_id, error = %e, "Skipping record, remote lookup failed");
                    report.skipped += 1;
                    continue;
                }
            };
            report.posts_checked += 1;

            let mut resolution = conflict::resolve_conflict(record, &matched, now);
            resolution.patch.last_synced_at = Some(now);
            let outcome = conflict::apply(
                &mut *self.store,
                self.remote,
                record,
                resolution,
                &self.actor,
                true,
            )
            .await;

            if outcome.changed {
                report.synced_count += 1;
            }
            report.details.extend(outcome.details);
        }

        tracing::info!(
            synced = report.synced_count,
            checked = report.posts_checked,
            skipped = report.skipped,
            "Light sync complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewPost, PostStatus};
    use crate::remote::mock::{self, MockPublisher};
    use crate::storage::SqliteStorage;
    use crate::sync::IssueType;

    fn linked(title: &str, status: PostStatus, url: Option<&str>, updated_at: i64) -> NewPost {
        let mut post = NewPost::draft(title, format!("<p>{title}</p>")).with_status(status);
        post.remote_id = Some("bp-1".to_string());
        post.remote_url = url.map(str::to_string);
        post.remote_published_at = url.map(|_| 1_000);
        post.updated_at = Some(updated_at);
        post
    }

    async fn run(store: &mut SqliteStorage, remote: &MockPublisher) -> LightSyncReport {
        LightSync::new(store, remote, "test").run().await.unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_returns_message() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let remote = MockPublisher::unconfigured();

        let report = run(&mut store, &remote).await;

        assert_eq!(report.synced_count, 0);
        assert!(report.message.unwrap().to_lowercase().contains("not configured"));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_linked_records() {
        let mut store = SqliteStorage::open_memory().unwrap();
        store.insert_post(&NewPost::draft("Unlinked", "<p/>"), "test").unwrap();
        let remote = MockPublisher::new();

        let report = run(&mut store, &remote).await;

        assert_eq!(report.synced_count, 0);
        assert_eq!(report.posts_checked, 0);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_published_reverts() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let record = store
            .insert_post(
                &linked("Test Post", PostStatus::Published, Some("https://blog.example.com/bp-1"), 1_000),
                "test",
            )
            .unwrap();
        let remote = MockPublisher::new();

        let report = run(&mut store, &remote).await;

        assert_eq!(report.synced_count, 1);
        let record = store.get_post(&record.id).unwrap().unwrap();
        assert_eq!(record.status, PostStatus::Reviewed);
        assert!(record.remote_id.is_none());
        assert!(record.remote_url.is_none());
        assert!(record.last_synced_at.is_some());
        assert!(remote.calls_to("list").is_empty());
    }

    #[tokio::test]
    async fn test_deleted_draft_not_counted_but_stamped() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let record = store
            .insert_post(&linked("Draft Post", PostStatus::Draft, None, 1_000), "test")
            .unwrap();
        let remote = MockPublisher::new();

        let report = run(&mut store, &remote).await;

        assert_eq!(report.synced_count, 0);
        assert_eq!(report.posts_checked, 1);
        assert_eq!(report.details[0].issue, IssueType::StaleRemoteLink);
        let record = store.get_post(&record.id).unwrap().unwrap();
        assert_eq!(record.remote_id.as_deref(), Some("bp-1"));
        assert!(record.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_live_remote_promotes_local_draft() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let record = store
            .insert_post(&linked("My Post", PostStatus::Draft, None, 5_000), "test")
            .unwrap();
        let remote =
            MockPublisher::new().with_post(mock::live("bp-1", "My Post", "<p>My Post</p>", Some(5_000)));

        let report = run(&mut store, &remote).await;

        assert_eq!(report.synced_count, 1);
        let record = store.get_post(&record.id).unwrap().unwrap();
        assert_eq!(record.status, PostStatus::Published);
        assert_eq!(record.remote_url.as_deref(), Some("https://blog.example.com/bp-1"));
    }

    #[tokio::test]
    async fn test_draft_remote_clears_local_url() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let record = store
            .insert_post(
                &linked("My Post", PostStatus::Published, Some("https://blog.example.com/bp-1"), 5_000),
                "test",
            )
            .unwrap();
        let remote =
            MockPublisher::new().with_post(mock::draft("bp-1", "My Post", "<p>My Post</p>", Some(5_000)));

        let report = run(&mut store, &remote).await;

        assert_eq!(report.synced_count, 1);
        let record = store.get_post(&record.id).unwrap().unwrap();
        assert_eq!(record.status, PostStatus::Published);
        assert!(record.remote_url.is_none());
    }

    #[tokio::test]
    async fn test_remote_newer_pulls_content() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let record = store
            .insert_post(
                &linked("Old Title", PostStatus::Published, Some("https://blog.example.com/bp-1"), 1_000),
                "test",
            )
            .unwrap();
        let remote = MockPublisher::new().with_post(mock::live(
            "bp-1",
            "New Title From Blogger",
            "<p>New content from Blogger</p>",
            Some(9_000),
        ));

        let report = run(&mut store, &remote).await;

        assert_eq!(report.synced_count, 1);
        let record = store.get_post(&record.id).unwrap().unwrap();
        assert_eq!(record.title, "New Title From Blogger");
        assert_eq!(record.html_content, "<p>New content from Blogger</p>");
    }

    #[tokio::test]
    async fn test_local_newer_pushes_content() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let record = store
            .insert_post(
                &linked("Updated Locally", PostStatus::Published, Some("https://blog.example.com/bp-1"), 9_000),
                "test",
            )
            .unwrap();
        let remote = MockPublisher::new().with_post(mock::live(
            "bp-1",
            "Old Blogger Title",
            "<p>Old Blogger content</p>",
            Some(1_000),
        ));

        let report = run(&mut store, &remote).await;

        assert_eq!(report.synced_count, 1);
        assert_eq!(remote.calls_to("update"), vec!["update:bp-1"]);
        assert_eq!(remote.post("bp-1").unwrap().title, "Updated Locally");
        let record = store.get_post(&record.id).unwrap().unwrap();
        assert_eq!(record.title, "Updated Locally");
    }

    #[tokio::test]
    async fn test_in_sync_record_is_stamped_only() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let record = store
            .insert_post(
                &linked("My Post", PostStatus::Published, Some("https://blog.example.com/bp-1"), 5_000),
                "test",
            )
            .unwrap();
        let remote =
            MockPublisher::new().with_post(mock::live("bp-1", "My Post", "<p>My Post</p>", Some(5_000)));

        let report = run(&mut store, &remote).await;

        assert_eq!(report.synced_count, 0);
        assert!(report.details.is_empty());
        let stored = store.get_post(&record.id).unwrap().unwrap();
        assert!(stored.last_synced_at.is_some());
        assert_eq!(stored.updated_at, record.updated_at);
    }

    #[tokio::test]
    async fn test_lookup_failure_skips_record() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let record = store
            .insert_post(
                &linked("Test Post", PostStatus::Published, Some("https://blog.example.com/bp-1"), 1_000),
                "test",
            )
            .unwrap();
        let remote = MockPublisher::new().failing_get("bp-1");

        let report = run(&mut store, &remote).await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.posts_checked, 0);
        assert_eq!(store.get_post(&record.id).unwrap().unwrap(), record);
    }
}
