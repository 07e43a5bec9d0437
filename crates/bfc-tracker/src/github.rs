//! GitHub REST client
//!
//! Lists closed bug issues through the search API and reads issue events
//! to find the commit linked to a "closed" event.

use async_trait::async_trait;
use bfc_core::{IssueEvent, IssueTracker, TrackedIssue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::TrackerError;
use crate::Result;

const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    pub api_url: String,
    /// Personal access token (optional; unauthenticated requests are rate limited)
    pub token: Option<String>,
    /// Results requested per page (GitHub caps this at 100)
    pub per_page: u32,
    /// Upper bound on pages fetched per listing
    pub max_pages: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            per_page: 100,
            max_pages: 10,
        }
    }
}

impl GitHubConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        GitHubConfig {
            api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            ..Self::default()
        }
    }

    /// Create config for a specific API endpoint
    pub fn new(api_url: &str) -> Self {
        GitHubConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_page_limits(mut self, per_page: u32, max_pages: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self.max_pages = max_pages.max(1);
        self
    }
}

/// `owner/name` slug of a GitHub repository URL.
///
/// Accepts `https://github.com/owner/name(.git)` and
/// `git@github.com:owner/name(.git)`.
pub fn repo_slug_from_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .or_else(|| trimmed.strip_prefix("git@github.com:"))
        .ok_or_else(|| TrackerError::InvalidRepository(url.to_string()))?;
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Ok(format!("{owner}/{name}"))
        }
        _ => Err(TrackerError::InvalidRepository(url.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    number: u64,
    #[serde(default)]
    title: String,
    /// Present when the item is a pull request rather than an issue.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

fn parse_search_page(body: &str) -> Result<SearchPage> {
    Ok(serde_json::from_str(body)?)
}

fn parse_events_page(body: &str) -> Result<Vec<IssueEvent>> {
    Ok(serde_json::from_str(body)?)
}

/// GitHub REST client
pub struct GitHubClient {
    config: GitHubConfig,
    http_client: reqwest::Client,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("bfc-tracker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GitHubClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GitHubConfig::from_env())
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{}", self.config.api_url, path);
        debug!(url = %url, "GitHub request");

        let mut request = self
            .http_client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(query);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TrackerError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Closed issues labelled "bug", excluding pull requests.
    pub async fn search_closed_bugs(&self, slug: &str) -> Result<Vec<TrackedIssue>> {
        let q = format!("repo:{slug} is:issue is:closed label:bug");
        let mut issues = Vec::new();

        for page in 1..=self.config.max_pages {
            let body = self
                .get(
                    "/search/issues",
                    &[
                        ("q", q.clone()),
                        ("per_page", self.config.per_page.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            let parsed = parse_search_page(&body)?;
            let fetched = parsed.items.len();
            issues.extend(
                parsed
                    .items
                    .into_iter()
                    .filter(|item| item.pull_request.is_none())
                    .map(|item| TrackedIssue {
                        number: item.number,
                        title: item.title,
                    }),
            );

            if fetched < self.config.per_page as usize
                || issues.len() as u64 >= parsed.total_count
            {
                break;
            }
        }

        info!(repo = %slug, issues = issues.len(), "Listed closed bug issues");
        Ok(issues)
    }

    /// All events of one issue, oldest first.
    pub async fn list_issue_events(&self, slug: &str, number: u64) -> Result<Vec<IssueEvent>> {
        let path = format!("/repos/{slug}/issues/{number}/events");
        let mut events = Vec::new();

        for page in 1..=self.config.max_pages {
            let body = self
                .get(
                    &path,
                    &[
                        ("per_page", self.config.per_page.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            let parsed = parse_events_page(&body)?;
            let fetched = parsed.len();
            events.extend(parsed);
            if fetched < self.config.per_page as usize {
                break;
            }
        }

        debug!(issue = number, events = events.len(), "Fetched issue events");
        Ok(events)
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn closed_bug_issues(&self, repo: &str) -> bfc_core::Result<Vec<TrackedIssue>> {
        Ok(self.search_closed_bugs(repo).await?)
    }

    async fn issue_events(&self, repo: &str, number: u64) -> bfc_core::Result<Vec<IssueEvent>> {
        Ok(self.list_issue_events(repo, number).await?)
    }
}
