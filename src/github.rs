use crate::error::{Result, StarNeighboursError};
use crate::types::{GitHubStarredRepo, GitHubUser, RateLimitState};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Read access to the star graph of a code hosting platform.
///
/// Only the first page of each listing is returned.
#[async_trait]
pub trait StarSource: Send + Sync {
    /// Accounts that starred `owner/repo`
    async fn list_stargazers(&self, owner: &str, repo: &str) -> Result<Vec<GitHubUser>>;

    /// Repositories starred by `login`
    async fn list_starred(&self, login: &str) -> Result<Vec<GitHubStarredRepo>>;
}

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(StarNeighboursError::EnvError(
                format!("GitHub base URL cannot carry a path: {}", base_url)
            ));
        }

        Ok(GitHubClient { client, base_url, token: config.token })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StarNeighboursError::EnvError(
                format!("GitHub base URL cannot carry a path: {}", self.base_url)
            ))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue a single GET. Any non-success status is reported as `NotFound`
    /// described by `what`; transport failures surface as `NetworkError`.
    /// A `null` body is read as an empty listing.
    async fn get_json<T: DeserializeOwned + Default>(&self, url: Url, what: String) -> Result<T> {
        debug!(url = %url, "Calling GitHub");

        let mut request = self
            .client
            .get(url.clone())
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {}", token));
        }

        let response = request.send().await?;

        if let Some(rate_limit) = Self::rate_limit_state(&response) {
            if rate_limit.is_low() {
                warn!(
                    remaining = rate_limit.remaining,
                    limit = rate_limit.limit,
                    reset_at = ?rate_limit.reset_at,
                    "GitHub rate limit is running low"
                );
            }
        }

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = %status, "GitHub returned a non-success status");
            return Err(StarNeighboursError::NotFound(what));
        }

        let body = response.bytes().await?;
        let listing: Option<T> = serde_json::from_slice(&body)?;
        Ok(listing.unwrap_or_default())
    }

    /// Rate limit state carried by a response, if GitHub sent the headers
    pub fn rate_limit_state(response: &Response) -> Option<RateLimitState> {
        let headers = response.headers();

        let remaining = header_value(headers, "X-RateLimit-Remaining")?.parse::<u32>().ok()?;
        let limit = header_value(headers, "X-RateLimit-Limit")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(60);
        let reset_at = header_value(headers, "X-RateLimit-Reset")
            .and_then(|s| s.parse::<i64>().ok());

        Some(RateLimitState { remaining, limit, reset_at })
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

#[async_trait]
impl StarSource for GitHubClient {
    async fn list_stargazers(&self, owner: &str, repo: &str) -> Result<Vec<GitHubUser>> {
        let url = self.endpoint(&["repos", owner, repo, "stargazers"])?;
        self.get_json(url, format!("user {} and repo {}", owner, repo)).await
    }

    async fn list_starred(&self, login: &str) -> Result<Vec<GitHubStarredRepo>> {
        let url = self.endpoint(&["users", login, "starred"])?;
        self.get_json(url, format!("user {}", login)).await
    }
}
