//! Full reconciliation across the whole record set.
//!
//! A run has four phases:
//!
//! 1. **Discovery**: list live posts, then drafts. Failure here aborts the
//!    run since nothing can be verified without the listing.
//! 2. **Verify+Fix**: resolve and correct every local record.
//! 3. **Import**: create local records for remote posts nothing matched.
//! 4. **Push**: create remote drafts for unlinked editorial records.
//!
//! Failures after Discovery are recorded per record and the run continues.

use std::collections::{HashMap, HashSet};

use super::conflict::{self, Outcome};
use super::identity;
use super::types::{IssueType, MatchResult, SyncDetail, SyncReport};
use crate::error::{Error, Result};
use crate::model::{
    ContentRecord, NewPost, NewRemotePost, PostFilter, PostPatch, RemotePost, Visibility,
};
use crate::remote::RemotePublisher;
use crate::storage::ContentStore;

/// One full reconciliation run.
///
/// The set of remote ids claimed during the run lives on this value, so
/// every run starts from nothing.
pub struct FullSync<'a, S, P> {
    store: &'a mut S,
    remote: &'a P,
    actor: String,
    claimed: HashSet<String>,
}

impl<'a, S, P> FullSync<'a, S, P>
where
    S: ContentStore,
    P: RemotePublisher,
{
    pub fn new(store: &'a mut S, remote: &'a P, actor: impl Into<String>) -> Self {
        Self {
            store,
            remote,
            actor: actor.into(),
            claimed: HashSet::new(),
        }
    }

    /// Run every phase and report what happened.
    ///
    /// # Errors
    ///
    /// Returns `RemoteNotConfigured` before touching anything when the
    /// remote lacks credentials, and propagates Discovery listing errors
    /// and failures to read the local record set.
    pub async fn run(mut self) -> Result<SyncReport> {
        if !self.remote.is_configured() {
            return Err(Error::RemoteNotConfigured);
        }

        let now = chrono::Utc::now().timestamp_millis();
        let mut report = SyncReport::default();

        tracing::info!(phase = "discovery", "Listing remote posts");
        let live = self.remote.list(Visibility::Live).await?;
        let drafts = self.remote.list(Visibility::Draft).await?;
        report.remote_live = live.len();
        report.remote_draft = drafts.len();

        let all_remote: Vec<RemotePost> = live.into_iter().chain(drafts).collect();
        let by_id: HashMap<String, RemotePost> = all_remote
            .iter()
            .map(|post| (post.id.clone(), post.clone()))
            .collect();

        let records = self.store.list_posts(&PostFilter::default())?;
        report.local_checked = records.len();

        tracing::info!(
            phase = "verify",
            local = records.len(),
            remote_live = report.remote_live,
            remote_draft = report.remote_draft,
            "Verifying local records"
        );
        let to_push = self.verify(&records, &by_id, &all_remote, now, &mut report).await;

        tracing::info!(phase = "import", "Importing unmatched remote posts");
        self.import(&all_remote, now, &mut report);

        tracing::info!(phase = "push", candidates = to_push.len(), "Pushing unlinked records");
        self.push(&to_push, now, &mut report).await;

        tracing::info!(
            synced = report.synced,
            issues_found = report.issues_found,
            issues_fixed = report.issues_fixed,
            imported = report.imported,
            pushed = report.pushed,
            failed = report.failed,
            "Full sync complete"
        );
        Ok(report)
    }

    /// Resolve and fix each record. Returns the records left unlinked in
    /// `draft` or `reviewed`, as stored after their fix.
    async fn verify(
        &mut self,
        records: &[ContentRecord],
        by_id: &HashMap<String, RemotePost>,
        all_remote: &[RemotePost],
        now: i64,
        report: &mut SyncReport,
    ) -> Vec<ContentRecord> {
        // Posts already linked by id are not offered to fuzzy matching.
        for record in records {
            if let Some(id) = record.remote_id.as_deref() {
                if by_id.contains_key(id) {
                    self.claimed.insert(id.to_string());
                }
            }
        }
        let mut fuzzy_pool: Vec<RemotePost> = all_remote
            .iter()
            .filter(|post| !self.claimed.contains(&post.id))
            .cloned()
            .collect();

        let mut to_push = Vec::new();
        for record in records {
            let matched = identity::resolve(record, by_id, &fuzzy_pool);
            if let MatchResult::FuzzyTitleMatch { post, .. } = &matched {
                self.claimed.insert(post.id.clone());
                fuzzy_pool.retain(|p| p.id != post.id);
            }
            let resolution = conflict::resolve_conflict(record, &matched, now);
            let outcome = conflict::apply(
                &mut *self.store,
                self.remote,
                record,
                resolution,
                &self.actor,
                false,
            )
            .await;

            // Candidacy is judged on the stored state after the fix, so a
            // record reverted by this run is pushed by this run.
            let no_remote = matches!(
                matched,
                MatchResult::Unmatched | MatchResult::DeletedRemotely
            );
            if no_remote && !outcome.failed {
                let after = outcome.record.as_ref().unwrap_or(record);
                if after.status.is_unpublished() && !after.is_linked() {
                    to_push.push(after.clone());
                }
            }
            tally(report, outcome);
        }
        to_push
    }

    fn import(&mut self, all_remote: &[RemotePost], now: i64, report: &mut SyncReport) {
        for post in all_remote {
            if self.claimed.contains(&post.id) {
                continue;
            }
            self.claimed.insert(post.id.clone());

            match self.store.insert_post(&NewPost::from_remote(post, now), &self.actor) {
                Ok(record) => {
                    tracing::info!(record_id = %record.id, remote_id = %post.id, "Imported remote post");
                    report.imported += 1;
                    let mut detail = SyncDetail::new(
                        &record.id,
                        &record.title,
                        IssueType::Imported,
                        format!("imported remote {} post {}", post.visibility, post.id),
                    );
                    detail.new_status = Some(record.status);
                    report.details.push(detail);
                }
                Err(e) => {
                    tracing::warn!(remote_id = %post.id, error = %e, "Failed to import remote post");
                    report.failed += 1;
                    report.details.push(
                        SyncDetail::new(
                            "",
                            &post.title,
                            IssueType::SyncFailed,
                            format!("could not import remote post {}", post.id),
                        )
                        .with_error(e),
                    );
                }
            }
        }
    }

    async fn push(&mut self, records: &[ContentRecord], now: i64, report: &mut SyncReport) {
        for record in records {
            let draft = NewRemotePost {
                title: record.title.clone(),
                html_content: record.html_content.clone(),
                labels: record.labels(),
                as_draft: true,
            };

            let created = match self.remote.create(&draft).await {
                Ok(created) => created,
                Err(e) => {
                    tracing::warn!(record_id = %record.id, error = %e, "Failed to create remote draft");
                    report.failed += 1;
                    report.details.push(
                        SyncDetail::new(
                            &record.id,
                            &record.title,
                            IssueType::SyncFailed,
                            "could not create remote draft",
                        )
                        .with_error(e),
                    );
                    continue;
                }
            };

            let patch = PostPatch {
                remote_id: Some(Some(created.id.clone())),
                last_synced_at: Some(now),
                ..PostPatch::default()
            };
            match self.store.update_post(&record.id, &patch, &self.actor) {
                Ok(_) => {
                    tracing::info!(record_id = %record.id, remote_id = %created.id, "Pushed record as remote draft");
                    report.pushed += 1;
                    report.details.push(
                        SyncDetail::new(
                            &record.id,
                            &record.title,
                            IssueType::Pushed,
                            format!("created remote draft {}", created.id),
                        )
                        .with_statuses(record.status, record.status),
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        record_id = %record.id,
                        remote_id = %created.id,
                        error = %e,
                        "Created remote draft but failed to link it locally"
                    );
                    report.failed += 1;
                    report.details.push(
                        SyncDetail::new(
                            &record.id,
                            &record.title,
                            IssueType::SyncFailed,
                            format!("remote draft {} created but not linked", created.id),
                        )
                        .with_error(e),
                    );
                }
            }
        }
    }
}

fn tally(report: &mut SyncReport, outcome: Outcome) {
    report.issues_found += outcome.issues_found;
    report.issues_fixed += outcome.issues_fixed;
    if outcome.changed {
        report.synced += 1;
    }
    if outcome.failed {
        report.failed += 1;
    }
    report.details.extend(outcome.details);
}
