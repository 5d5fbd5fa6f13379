//! Remote publishing target.
//!
//! The reconciliation engine talks to the CMS only through the
//! [`RemotePublisher`] trait. [`blogger::BloggerClient`] is the production
//! implementation; tests use an in-memory double.

pub mod blogger;
pub mod config;
#[cfg(test)]
pub mod mock;

pub use blogger::BloggerClient;
pub use config::RemoteSettings;

use crate::error::Result;
use crate::model::{CreatedPost, NewRemotePost, RemotePost, Visibility};
use std::future::Future;

/// Operations the engine needs from a publishing target.
///
/// Every call is independent and may fail on its own; a not-found post is
/// `Ok(None)` from [`get`](Self::get), never an error.
pub trait RemotePublisher: Send + Sync {
    /// Whether credentials are present. Checked once before a run starts.
    fn is_configured(&self) -> bool;

    /// List every post with the given visibility, following pagination.
    fn list(&self, visibility: Visibility) -> impl Future<Output = Result<Vec<RemotePost>>> + Send;

    /// Fetch one post by id.
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<RemotePost>>> + Send;

    /// Create a post (as a draft when `post.as_draft` is set).
    fn create(&self, post: &NewRemotePost) -> impl Future<Output = Result<CreatedPost>> + Send;

    /// Replace the title and body of an existing post.
    fn update(
        &self,
        id: &str,
        title: &str,
        html_content: &str,
        labels: &[String],
    ) -> impl Future<Output = Result<RemotePost>> + Send;

    /// Make a draft live.
    fn publish_draft(&self, id: &str) -> impl Future<Output = Result<RemotePost>> + Send;

    /// Take a live post back to draft.
    fn revert_to_draft(&self, id: &str) -> impl Future<Output = Result<RemotePost>> + Send;

    /// Delete a post.
    fn delete(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}
