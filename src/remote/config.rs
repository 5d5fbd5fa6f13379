//! Remote publisher settings.
//!
//! Resolution order for every field: environment variable, then the
//! `remote` section of `~/.postsync/config.json`, then a built-in default.
//! Missing credentials are not an error here; they produce settings for
//! which [`RemoteSettings::is_configured`] is false.

use std::time::Duration;

use crate::config::RemoteFileSettings;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/blogger/v3";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Cap on posts fetched per visibility listing.
pub const DEFAULT_MAX_RESULTS: u32 = 500;
/// Page size requested from the listing endpoint.
pub const PAGE_SIZE: u32 = 100;

/// Fully resolved settings for the Blogger client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub blog_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub api_base: String,
    pub token_url: String,
    pub timeout: Duration,
    pub max_results: u32,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            blog_id: None,
            client_id: None,
            client_secret: None,
            refresh_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl RemoteSettings {
    /// Whether every credential needed to talk to the remote is present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        [
            &self.blog_id,
            &self.client_id,
            &self.client_secret,
            &self.refresh_token,
        ]
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    /// Resolve settings from the process environment and the config file.
    ///
    /// An unreadable config file is logged and treated as empty.
    #[must_use]
    pub fn resolve() -> Self {
        let file = match crate::config::load_config() {
            Ok(config) => config.remote.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable config file");
                RemoteFileSettings::default()
            }
        };
        Self::from_sources(|key| std::env::var(key).ok(), &file)
    }

    /// Merge an environment lookup over file settings.
    pub fn from_sources<F>(env: F, file: &RemoteFileSettings) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = env_value("POSTSYNC_REMOTE_TIMEOUT")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .or(file.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            blog_id: env_value("BLOGGER_BLOG_ID").or_else(|| file.blog_id.clone()),
            client_id: env_value("BLOGGER_CLIENT_ID").or_else(|| file.client_id.clone()),
            client_secret: env_value("BLOGGER_CLIENT_SECRET")
                .or_else(|| file.client_secret.clone()),
            refresh_token: env_value("BLOGGER_REFRESH_TOKEN")
                .or_else(|| file.refresh_token.clone()),
            api_base: env_value("BLOGGER_API_BASE")
                .or_else(|| file.api_base.clone())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            token_url: file
                .token_url
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            max_results: file
                .max_results
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_RESULTS),
        }
    }
}
