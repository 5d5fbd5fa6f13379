//! In-memory publisher for tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use super::RemotePublisher;
use crate::error::{Error, Result};
use crate::model::{CreatedPost, NewRemotePost, RemotePost, Visibility};

/// Test double that serves posts from memory, records every call and
/// fails on demand.
pub struct MockPublisher {
    configured: bool,
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    posts: Vec<RemotePost>,
    calls: Vec<String>,
    fail_list: bool,
    fail_get: HashSet<String>,
    fail_update: HashSet<String>,
    fail_create: HashSet<String>,
    next_id: u64,
}

/// A live remote post.
pub fn live(id: &str, title: &str, content: &str, updated_at: Option<i64>) -> RemotePost {
    RemotePost {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        url: Some(format!("https://blog.example.com/{id}")),
        visibility: Visibility::Live,
        published_at: Some(1_000),
        updated_at,
    }
}

/// A remote draft.
pub fn draft(id: &str, title: &str, content: &str, updated_at: Option<i64>) -> RemotePost {
    RemotePost {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        url: None,
        visibility: Visibility::Draft,
        published_at: None,
        updated_at,
    }
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            configured: true,
            state: Mutex::new(MockState {
                next_id: 1000,
                ..MockState::default()
            }),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    #[must_use]
    pub fn with_post(self, post: RemotePost) -> Self {
        self.state().posts.push(post);
        self
    }

    #[must_use]
    pub fn failing_list(self) -> Self {
        self.state().fail_list = true;
        self
    }

    #[must_use]
    pub fn failing_get(self, id: &str) -> Self {
        self.state().fail_get.insert(id.to_string());
        self
    }

    #[must_use]
    pub fn failing_update(self, id: &str) -> Self {
        self.state().fail_update.insert(id.to_string());
        self
    }

    #[must_use]
    pub fn failing_create(self, title: &str) -> Self {
        self.state().fail_create.insert(title.to_string());
        self
    }

    /// Every call made so far, as `"op:arg"` strings.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Calls whose op matches `op`.
    pub fn calls_to(&self, op: &str) -> Vec<String> {
        let prefix = format!("{op}:");
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&prefix))
            .collect()
    }

    pub fn post(&self, id: &str) -> Option<RemotePost> {
        self.state().posts.iter().find(|p| p.id == id).cloned()
    }

    pub fn posts(&self) -> Vec<RemotePost> {
        self.state().posts.clone()
    }

    /// Replace a post in place, simulating an out-of-band remote edit.
    pub fn replace(&self, post: RemotePost) {
        let mut state = self.state();
        if let Some(existing) = state.posts.iter_mut().find(|p| p.id == post.id) {
            *existing = post;
        }
    }

    /// Remove a post, simulating deletion on the CMS side.
    pub fn remove(&self, id: &str) {
        self.state().posts.retain(|p| p.id != id);
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn not_found(id: &str) -> Error {
    Error::RemoteApi {
        status: 404,
        message: format!("post {id} not found"),
    }
}

impl RemotePublisher for MockPublisher {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn list(&self, visibility: Visibility) -> Result<Vec<RemotePost>> {
        let mut state = self.state();
        state.calls.push(format!("list:{visibility}"));
        if state.fail_list {
            return Err(Error::RemoteUnavailable("listing timed out".to_string()));
        }
        Ok(state
            .posts
            .iter()
            .filter(|p| p.visibility == visibility)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<RemotePost>> {
        let mut state = self.state();
        state.calls.push(format!("get:{id}"));
        if state.fail_get.contains(id) {
            return Err(Error::RemoteUnavailable(format!("get {id} timed out")));
        }
        Ok(state.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, post: &NewRemotePost) -> Result<CreatedPost> {
        let mut state = self.state();
        state.calls.push(format!("create:{}", post.title));
        if state.fail_create.contains(&post.title) {
            return Err(Error::RemoteUnavailable("create timed out".to_string()));
        }

        state.next_id += 1;
        let id = state.next_id.to_string();
        let remote = if post.as_draft {
            draft(&id, &post.title, &post.html_content, Some(now_ms()))
        } else {
            live(&id, &post.title, &post.html_content, Some(now_ms()))
        };
        let created = CreatedPost {
            id,
            url: remote.url.clone(),
            published_at: if post.as_draft {
                None
            } else {
                remote.published_at
            },
        };
        state.posts.push(remote);
        Ok(created)
    }

    async fn update(
        &self,
        id: &str,
        title: &str,
        html_content: &str,
        _labels: &[String],
    ) -> Result<RemotePost> {
        let mut state = self.state();
        state.calls.push(format!("update:{id}"));
        if state.fail_update.contains(id) {
            return Err(Error::RemoteUnavailable(format!("update {id} timed out")));
        }

        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;
        post.title = title.to_string();
        post.content = html_content.to_string();
        post.updated_at = Some(now_ms());
        Ok(post.clone())
    }

    async fn publish_draft(&self, id: &str) -> Result<RemotePost> {
        let mut state = self.state();
        state.calls.push(format!("publish:{id}"));
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;
        post.visibility = Visibility::Live;
        post.url = Some(format!("https://blog.example.com/{id}"));
        post.published_at = Some(now_ms());
        Ok(post.clone())
    }

    async fn revert_to_draft(&self, id: &str) -> Result<RemotePost> {
        let mut state = self.state();
        state.calls.push(format!("revert:{id}"));
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;
        post.visibility = Visibility::Draft;
        post.url = None;
        Ok(post.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("delete:{id}"));
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        if state.posts.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}
