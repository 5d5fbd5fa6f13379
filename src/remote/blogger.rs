//! Blogger v3 REST client.
//!
//! Authenticates with an OAuth2 refresh token, caching the short-lived
//! access token in memory until shortly before it expires.

use std::time::{Duration, Instant};

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::RemotePublisher;
use super::config::{PAGE_SIZE, RemoteSettings};
use crate::error::{Error, Result};
use crate::model::{CreatedPost, NewRemotePost, RemotePost, Visibility};

/// Access tokens are refreshed this long before their stated expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Blogger publishing client.
pub struct BloggerClient {
    client: reqwest::Client,
    settings: RemoteSettings,
    token: Mutex<Option<AccessToken>>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl BloggerClient {
    /// Create a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(settings: RemoteSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            settings,
            token: Mutex::new(None),
        })
    }

    /// Create a client from the environment and `~/.postsync/config.json`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self> {
        Self::new(RemoteSettings::resolve())
    }

    #[must_use]
    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    fn posts_url(&self) -> Result<String> {
        let blog_id = self
            .settings
            .blog_id
            .as_deref()
            .ok_or(Error::RemoteNotConfigured)?;
        Ok(format!("{}/blogs/{blog_id}/posts", self.settings.api_base))
    }

    fn post_url(&self, id: &str) -> Result<String> {
        Ok(format!("{}/{id}", self.posts_url()?))
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            self.settings.client_id.as_deref(),
            self.settings.client_secret.as_deref(),
            self.settings.refresh_token.as_deref(),
        ) else {
            return Err(Error::RemoteNotConfigured);
        };

        tracing::debug!(url = %self.settings.token_url, "Refreshing access token");
        let response = self
            .client
            .post(&self.settings.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let data: TokenResponse = decode(response).await?;

        let lifetime = Duration::from_secs(data.expires_in.unwrap_or(3600));
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(AccessToken {
            value: data.access_token.clone(),
            expires_at,
        });

        Ok(data.access_token)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder + Send,
    ) -> Result<Response> {
        let token = self.access_token().await?;
        tracing::debug!(%method, url, "Remote request");

        let request = build(self.client.request(method, url).bearer_auth(token));
        request.send().await.map_err(transport_error)
    }

    async fn list_page(
        &self,
        visibility: Visibility,
        page_token: Option<&str>,
    ) -> Result<PostListResponse> {
        let url = self.posts_url()?;
        let mut query = vec![
            ("status", visibility.as_query().to_string()),
            ("view", "ADMIN".to_string()),
            ("fetchBodies", "true".to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self.send(Method::GET, &url, |r| r.query(&query)).await?;
        decode(check_status(response).await?).await
    }
}

impl RemotePublisher for BloggerClient {
    fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    async fn list(&self, visibility: Visibility) -> Result<Vec<RemotePost>> {
        let cap = self.settings.max_results as usize;
        let mut posts = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(visibility, page_token.as_deref()).await?;
            posts.extend(page.items.into_iter().map(|p| p.into_remote(visibility)));

            match page.next_page_token {
                Some(next) if posts.len() < cap => page_token = Some(next),
                _ => break,
            }
        }

        posts.truncate(cap);
        tracing::debug!(%visibility, count = posts.len(), "Listed remote posts");
        Ok(posts)
    }

    async fn get(&self, id: &str) -> Result<Option<RemotePost>> {
        let url = self.post_url(id)?;
        let response = self
            .send(Method::GET, &url, |r| r.query(&[("view", "ADMIN")]))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let post: WirePost = decode(check_status(response).await?).await?;
        Ok(Some(post.into_remote(Visibility::Live)))
    }

    async fn create(&self, post: &NewRemotePost) -> Result<CreatedPost> {
        let url = self.posts_url()?;
        let body = PostBody {
            kind: Some("blogger#post"),
            title: &post.title,
            content: &post.html_content,
            labels: &post.labels,
        };
        let is_draft = if post.as_draft { "true" } else { "false" };

        let response = self
            .send(Method::POST, &url, |r| {
                r.query(&[("isDraft", is_draft)]).json(&body)
            })
            .await?;

        let fallback = if post.as_draft {
            Visibility::Draft
        } else {
            Visibility::Live
        };
        let created = decode::<WirePost>(check_status(response).await?)
            .await?
            .into_remote(fallback);

        Ok(CreatedPost {
            id: created.id,
            url: created.url,
            published_at: created.published_at,
        })
    }

    async fn update(
        &self,
        id: &str,
        title: &str,
        html_content: &str,
        labels: &[String],
    ) -> Result<RemotePost> {
        let url = self.post_url(id)?;
        let body = PostBody {
            kind: None,
            title,
            content: html_content,
            labels,
        };

        let response = self.send(Method::PATCH, &url, |r| r.json(&body)).await?;
        let post: WirePost = decode(check_status(response).await?).await?;
        Ok(post.into_remote(Visibility::Live))
    }

    async fn publish_draft(&self, id: &str) -> Result<RemotePost> {
        let url = format!("{}/publish", self.post_url(id)?);
        let response = self.send(Method::POST, &url, |r| r).await?;
        let post: WirePost = decode(check_status(response).await?).await?;
        Ok(post.into_remote(Visibility::Live))
    }

    async fn revert_to_draft(&self, id: &str) -> Result<RemotePost> {
        let url = format!("{}/revert", self.post_url(id)?);
        let response = self.send(Method::POST, &url, |r| r).await?;
        let post: WirePost = decode(check_status(response).await?).await?;
        Ok(post.into_remote(Visibility::Draft))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.post_url(id)?;
        let response = self.send(Method::DELETE, &url, |r| r).await?;
        check_status(response).await?;
        Ok(())
    }
}

// ── Wire types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostListResponse {
    #[serde(default)]
    items: Vec<WirePost>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    url: Option<String>,
    status: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

impl WirePost {
    /// Convert to the engine's view, using `fallback` when the response
    /// carries no status (non-admin views omit it).
    fn into_remote(self, fallback: Visibility) -> RemotePost {
        let visibility = match self.status.as_deref() {
            Some("LIVE") => Visibility::Live,
            Some(_) => Visibility::Draft,
            None => fallback,
        };
        let live = visibility == Visibility::Live;

        RemotePost {
            id: self.id,
            title: self.title,
            content: self.content,
            url: if live { self.url.filter(|u| !u.is_empty()) } else { None },
            visibility,
            published_at: parse_timestamp(self.published.as_deref()),
            updated_at: parse_timestamp(self.updated.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
struct PostBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    title: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "no_labels")]
    labels: &'a [String],
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_labels(labels: &&[String]) -> bool {
    labels.is_empty()
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
    error_description: Option<String>,
}

// ── Helpers ───────────────────────────────────────────────────

/// Parse an RFC 3339 timestamp into Unix milliseconds.
///
/// Missing or malformed values become `None`.
pub(crate) fn parse_timestamp(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.timestamp_millis())
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::RemoteUnavailable(format!("request timed out: {e}"))
    } else {
        Error::RemoteUnavailable(format!("request failed: {e}"))
    }
}

/// Turn a non-success response into the matching error.
///
/// Server errors and rate limiting are transient; other client errors are not.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        tracing::debug!(status = status.as_u16(), %message, "Transient remote failure");
        Err(Error::RemoteUnavailable(format!("HTTP {}: {message}", status.as_u16())))
    } else {
        Err(Error::RemoteApi {
            status: status.as_u16(),
            message,
        })
    }
}

fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(msg) = parsed.error.message.or(parsed.error.error_description) {
            return msg;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    response.json::<T>().await.map_err(|e| Error::RemoteApi {
        status,
        message: format!("Failed to parse remote response: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp(Some("1970-01-01T00:00:01Z")), Some(1000));
        assert_eq!(
            parse_timestamp(Some("2024-03-01T10:00:00-08:00")),
            parse_timestamp(Some("2024-03-01T18:00:00Z"))
        );
        assert_eq!(parse_timestamp(Some("not-a-date")), None);
        assert_eq!(parse_timestamp(None), None);
    }

    #[test]
    fn test_wire_post_draft_drops_url() {
        let wire = WirePost {
            id: "1".to_string(),
            title: "T".to_string(),
            content: String::new(),
            url: Some("https://blog.example.com/1".to_string()),
            status: Some("DRAFT".to_string()),
            published: None,
            updated: Some("garbage".to_string()),
        };
        let post = wire.into_remote(Visibility::Live);
        assert_eq!(post.visibility, Visibility::Draft);
        assert!(post.url.is_none());
        assert!(post.updated_at.is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"code":403,"message":"Forbidden"}}"#),
            "Forbidden"
        );
        assert_eq!(error_message("plain"), "plain");
        assert_eq!(error_message(""), "empty response");
    }

    #[test]
    fn test_unconfigured_client() {
        let client = BloggerClient::new(RemoteSettings::default()).unwrap();
        assert!(!client.is_configured());
    }
}
