//! GitHub REST client and the activity records the metrics are derived from.
//!
//! Every call is authorized with the caller's [`Credential`], carries an explicit API
//! version header, and is bounded by the configured per-call timeout. Nothing is cached and
//! nothing is retried.

use crate::config::AppConfig;
use crate::session::Credential;
use crate::types::RepoId;
use axum::http::HeaderName;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

/// Repositories requested from the listing endpoint, most recently pushed first.
pub const REPOSITORY_LIST_LIMIT: u32 = 100;

/// Commits and pull requests requested per repository.
pub const ACTIVITY_PAGE_SIZE: u32 = 50;

/// Maximum number of review listings in flight for one repository.
const REVIEW_CONCURRENCY_LIMIT: usize = 5;

const API_VERSION_HEADER: &str = "x-github-api-version";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The credential was missing, expired or lacks access (HTTP 401/403).
    #[error("GitHub rejected the credential (status {status})")]
    Auth { status: u16 },

    /// Any other non-2xx response.
    #[error("GitHub API error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("GitHub API call to {route} timed out after {timeout:?}")]
    Timeout { route: String, timeout: StdDuration },

    #[error("malformed GitHub response: {0}")]
    Malformed(String),

    /// Transport or client construction failures. The octocrab error carries a backtrace,
    /// so it is only reachable through `source()`.
    #[error("GitHub request failed")]
    Client(#[from] octocrab::Error),
}

/// A repository as listed for the authenticated user.
///
/// Field names match both the GitHub payload and the dashboard response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(rename = "private", default)]
    pub is_private: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    pub sha: String,
    /// GitHub login of the author, absent when the commit email maps to no account.
    pub author_login: Option<String>,
    pub authored_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestRecord {
    pub number: u64,
    pub state: PrState,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    /// Only populated for merged pull requests.
    #[serde(default)]
    pub reviews: Vec<ReviewRecord>,
}

impl PullRequestRecord {
    pub fn is_merged(&self) -> bool {
        self.state == PrState::Closed && self.merged_at.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.state == PrState::Open
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewRecord {
    /// Pending reviews have no submission time.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Raw activity of a single repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoActivity {
    pub repository: String,
    pub commits: Vec<CommitRecord>,
    pub pull_requests: Vec<PullRequestRecord>,
}

#[derive(Deserialize)]
struct CommitPayload {
    #[serde(default)]
    sha: String,
    #[serde(default)]
    author: Option<AccountPayload>,
    #[serde(default)]
    commit: Option<CommitDetailPayload>,
}

#[derive(Deserialize)]
struct AccountPayload {
    #[serde(default)]
    login: Option<String>,
}

#[derive(Deserialize)]
struct CommitDetailPayload {
    #[serde(default)]
    author: Option<CommitSignaturePayload>,
}

#[derive(Deserialize)]
struct CommitSignaturePayload {
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

impl From<CommitPayload> for CommitRecord {
    fn from(payload: CommitPayload) -> Self {
        CommitRecord {
            sha: payload.sha,
            author_login: payload.author.and_then(|a| a.login),
            authored_at: payload.commit.and_then(|c| c.author).and_then(|a| a.date),
        }
    }
}

/// A GitHub client bound to one caller's credential.
#[derive(Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    base_uri: String,
    timeout: StdDuration,
}

impl GitHubClient {
    pub fn new(config: &AppConfig, credential: &Credential) -> Result<Self, FetchError> {
        let octocrab = Octocrab::builder()
            .add_retry_config(RetryConfig::None)
            .base_uri(config.github_api_base.as_str())?
            .personal_token(credential.expose().to_string())
            .add_header(
                HeaderName::from_static(API_VERSION_HEADER),
                config.github_api_version.clone(),
            )
            .build()?;

        Ok(Self {
            octocrab,
            base_uri: config.github_api_base.trim_end_matches('/').to_string(),
            timeout: config.upstream_timeout(),
        })
    }

    /// Lists the caller's repositories, most recently pushed first.
    pub async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, FetchError> {
        self.get_list(
            "/user/repos".to_string(),
            &[
                ("sort", "pushed".to_string()),
                ("per_page", REPOSITORY_LIST_LIMIT.to_string()),
            ],
        )
        .await
    }

    /// Fetches recent commits and pull requests of one repository, plus the reviews of
    /// every merged pull request.
    ///
    /// Any failed call fails the whole repository.
    pub async fn fetch_repo_activity(
        &self,
        repo: &RepositorySummary,
    ) -> Result<RepoActivity, FetchError> {
        let repo_id: RepoId = repo.full_name.parse().map_err(FetchError::Malformed)?;

        let (commits, pulls) = tokio::try_join!(
            self.list_commits(&repo_id),
            self.list_pull_requests(&repo_id)
        )?;
        tracing::debug!(
            repo = %repo_id,
            commits = commits.len(),
            pulls = pulls.len(),
            "Fetched repository activity"
        );

        let pull_requests = stream::iter(pulls)
            .map(|mut pr| {
                let client = self.clone();
                let repo_id = repo_id.clone();
                async move {
                    if pr.is_merged() {
                        pr.reviews = client.list_reviews(&repo_id, pr.number).await?;
                    }
                    Ok::<_, FetchError>(pr)
                }
            })
            .buffered(REVIEW_CONCURRENCY_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(RepoActivity {
            repository: repo.full_name.clone(),
            commits,
            pull_requests,
        })
    }

    async fn list_commits(&self, repo_id: &RepoId) -> Result<Vec<CommitRecord>, FetchError> {
        let payload: Vec<CommitPayload> = self
            .get_list(
                format!("/repos/{}/{}/commits", repo_id.owner, repo_id.repo),
                &[("per_page", ACTIVITY_PAGE_SIZE.to_string())],
            )
            .await?;

        Ok(payload.into_iter().map(CommitRecord::from).collect())
    }

    async fn list_pull_requests(
        &self,
        repo_id: &RepoId,
    ) -> Result<Vec<PullRequestRecord>, FetchError> {
        self.get_list(
            format!("/repos/{}/{}/pulls", repo_id.owner, repo_id.repo),
            &[
                ("state", "all".to_string()),
                ("per_page", ACTIVITY_PAGE_SIZE.to_string()),
            ],
        )
        .await
    }

    async fn list_reviews(
        &self,
        repo_id: &RepoId,
        number: u64,
    ) -> Result<Vec<ReviewRecord>, FetchError> {
        self.get_list(
            format!(
                "/repos/{}/{}/pulls/{}/reviews",
                repo_id.owner, repo_id.repo, number
            ),
            &[],
        )
        .await
    }

    async fn get_list<T>(&self, route: String, params: &[(&str, String)]) -> Result<Vec<T>, FetchError>
    where
        T: DeserializeOwned,
    {
        let body = self.get_body(&route, params).await?;
        decode_records(&route, &body)
    }

    /// Sends one GET and returns the body of a 2xx response.
    ///
    /// The status is checked before the body is decoded, so a 401/403 is an `Auth` error
    /// whatever the body looks like.
    async fn get_body(&self, route: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        let uri = self.uri(route, params);
        let request = async {
            let response = self.octocrab._get(uri).await?;
            let status = response.status();
            let body = self.octocrab.body_to_string(response).await?;
            Ok::<_, octocrab::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    route: route.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        if status.is_success() {
            return Ok(body);
        }

        let code = status.as_u16();
        if code == 401 || code == 403 {
            return Err(FetchError::Auth { status: code });
        }
        Err(FetchError::Upstream {
            status: code,
            message: error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string()),
        })
    }

    fn uri(&self, route: &str, params: &[(&str, String)]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        if query.is_empty() {
            format!("{}{}", self.base_uri, route)
        } else {
            format!("{}{}?{}", self.base_uri, route, query.join("&"))
        }
    }
}

/// Decodes a JSON array record by record, dropping the records that do not match `T`.
fn decode_records<T: DeserializeOwned>(route: &str, body: &str) -> Result<Vec<T>, FetchError> {
    let items: Vec<serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed(format!("{route}: {e}")))?;

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(route, index, error = %e, "Dropping malformed record");
                None
            }
        })
        .collect())
}

/// The `message` field of a GitHub error body, if there is one.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}
