use crate::benchmark::Benchmarks;
use crate::github::{FetchError, GitHubClient, RepoActivity, RepositorySummary};
use crate::metrics::{self, MetricsSummary};
use futures::stream::{self, StreamExt};
use serde::Serialize;

/// Only the most recently pushed repositories feed the metrics. Fixed to bound the number
/// of upstream calls per request.
pub const MAX_REPOSITORIES_FOR_METRICS: usize = 10;

/// Maximum number of repositories whose activity is fetched at the same time.
const ACTIVITY_CONCURRENCY_LIMIT: usize = 4;

/// Body of a successful dashboard request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// Every listed repository, not only the ones the metrics cover.
    pub repos: Vec<RepositorySummary>,
    pub metrics: MetricsSummary,
    pub benchmarks: Benchmarks,
    pub selected_repo: Option<String>,
}

/// Lists the caller's repositories and derives flow metrics from the most recent ones.
///
/// Failing to list repositories fails the request. Failing to fetch one repository's
/// activity only drops that repository from the metrics.
///
/// `days` is accepted for the dashboard's lookback selector but does not filter the
/// fetched records: metrics cover the latest commits and pull requests GitHub returns.
pub async fn fetch_dashboard(
    client: &GitHubClient,
    days: u32,
) -> Result<DashboardResponse, FetchError> {
    let repos = client.list_repositories().await?;
    tracing::debug!(
        listed = repos.len(),
        processed = repos.len().min(MAX_REPOSITORIES_FOR_METRICS),
        days,
        "Fetched repository list"
    );

    let activities = fetch_activities(client, &repos).await;
    let metrics = metrics::aggregate(&activities);

    Ok(DashboardResponse {
        benchmarks: Benchmarks::for_summary(&metrics),
        repos,
        metrics,
        selected_repo: None,
    })
}

/// Fetches activity for the capped subset of `repos`, skipping repositories that fail.
pub async fn fetch_activities(
    client: &GitHubClient,
    repos: &[RepositorySummary],
) -> Vec<RepoActivity> {
    stream::iter(repos.iter().take(MAX_REPOSITORIES_FOR_METRICS).cloned())
        .map(|repo| {
            let client = client.clone();
            async move {
                let result = client.fetch_repo_activity(&repo).await;
                (repo, result)
            }
        })
        .buffered(ACTIVITY_CONCURRENCY_LIMIT)
        .filter_map(|(repo, result)| async move {
            match result {
                Ok(activity) => Some(activity),
                Err(e) => {
                    tracing::warn!(repo = %repo.full_name, error = ?e, "Skipping repository");
                    None
                }
            }
        })
        .collect()
        .await
}
