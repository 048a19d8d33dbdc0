use crate::github::{RepoActivity, ReviewRecord};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const MILLIS_PER_HOUR: f64 = 60.0 * 60.0 * 1000.0;
const MILLIS_PER_DAY: f64 = 24.0 * MILLIS_PER_HOUR;

/// Cycle time is approximated from lead time because first-commit timestamps are not
/// fetched. One day of lead time counts as eight working hours.
const CYCLE_HOURS_PER_LEAD_DAY: f64 = 8.0;

/// Flow metrics aggregated across every fetched repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    /// Mean time from PR creation to merge, in days.
    pub lead_time_days: f64,
    pub cycle_time_hours: f64,
    /// Mean time from PR creation to its earliest review, in hours.
    pub pr_review_delay_hours: f64,
    /// Always 0 until a deployments source exists.
    pub deployment_frequency_per_week: f64,
    /// Always 0 until a deployments source exists.
    pub change_failure_rate_percent: f64,
    pub total_commits: usize,
    #[serde(rename = "totalPRs")]
    pub total_prs: usize,
    #[serde(rename = "mergedPRs")]
    pub merged_prs: usize,
    #[serde(rename = "openPRs")]
    pub open_prs: usize,
    pub deployments: usize,
    pub contributors: usize,
}

/// Reduces per-repository activity into a single [`MetricsSummary`].
///
/// Every reduction is a sum or an unweighted mean over all pull requests, so the order of
/// `activities` does not matter. Records missing the timestamps a statistic needs are left
/// out of that statistic but still counted.
pub fn aggregate(activities: &[RepoActivity]) -> MetricsSummary {
    let mut summary = MetricsSummary::default();
    let mut contributors: HashSet<&str> = HashSet::new();
    let mut lead_times: Vec<Duration> = Vec::new();
    let mut review_delays: Vec<Duration> = Vec::new();

    for activity in activities {
        summary.total_commits += activity.commits.len();
        contributors.extend(
            activity
                .commits
                .iter()
                .filter_map(|commit| commit.author_login.as_deref())
                .filter(|login| !login.is_empty()),
        );

        for pr in &activity.pull_requests {
            summary.total_prs += 1;

            if pr.is_open() {
                summary.open_prs += 1;
                continue;
            }
            if !pr.is_merged() {
                continue;
            }
            summary.merged_prs += 1;

            let Some(created_at) = pr.created_at else {
                tracing::debug!(
                    repo = %activity.repository,
                    number = pr.number,
                    "Merged PR has no creation time, excluding from durations"
                );
                continue;
            };
            if let Some(merged_at) = pr.merged_at {
                lead_times.push(merged_at - created_at);
            }
            if let Some(first_review) = earliest_review(&pr.reviews) {
                review_delays.push(first_review - created_at);
            }
        }
    }

    let lead_time_days = mean_millis(&lead_times) / MILLIS_PER_DAY;

    summary.contributors = contributors.len();
    summary.lead_time_days = round_one_decimal(lead_time_days);
    summary.cycle_time_hours = round_one_decimal(lead_time_days * CYCLE_HOURS_PER_LEAD_DAY);
    summary.pr_review_delay_hours = round_one_decimal(mean_millis(&review_delays) / MILLIS_PER_HOUR);
    summary
}

/// The first submitted review, regardless of the order GitHub returned them in.
fn earliest_review(reviews: &[ReviewRecord]) -> Option<DateTime<Utc>> {
    reviews.iter().filter_map(|review| review.submitted_at).min()
}

/// Mean in milliseconds, 0 for an empty slice.
fn mean_millis(durations: &[Duration]) -> f64 {
    if durations.is_empty() {
        return 0.0;
    }
    let total: f64 = durations.iter().map(|d| d.num_milliseconds() as f64).sum();
    total / durations.len() as f64
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{CommitRecord, PrState, PullRequestRecord};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::days(day as i64 - 1)
            + Duration::hours(hour as i64)
    }

    fn commit(author: Option<&str>) -> CommitRecord {
        CommitRecord {
            sha: "deadbeef".to_string(),
            author_login: author.map(str::to_string),
            authored_at: None,
        }
    }

    fn merged_pr(created: DateTime<Utc>, merged: DateTime<Utc>, reviews: &[DateTime<Utc>]) -> PullRequestRecord {
        PullRequestRecord {
            number: 1,
            state: PrState::Closed,
            created_at: Some(created),
            merged_at: Some(merged),
            reviews: reviews
                .iter()
                .map(|submitted| ReviewRecord {
                    submitted_at: Some(*submitted),
                })
                .collect(),
        }
    }

    fn pr(state: PrState) -> PullRequestRecord {
        PullRequestRecord {
            number: 2,
            state,
            created_at: Some(at(1, 0)),
            merged_at: None,
            reviews: vec![],
        }
    }

    fn activity(commits: Vec<CommitRecord>, pull_requests: Vec<PullRequestRecord>) -> RepoActivity {
        RepoActivity {
            repository: "octo/repo".to_string(),
            commits,
            pull_requests,
        }
    }

    #[test]
    fn test_aggregate_two_repositories() {
        let repo1 = activity(
            vec![commit(Some("a")), commit(Some("b")), commit(Some("a"))],
            vec![merged_pr(at(1, 0), at(3, 0), &[at(1, 10)])],
        );
        let repo2 = activity(vec![], vec![pr(PrState::Open)]);

        let summary = aggregate(&[repo1, repo2]);

        assert_eq!(
            summary,
            MetricsSummary {
                lead_time_days: 2.0,
                cycle_time_hours: 16.0,
                pr_review_delay_hours: 10.0,
                deployment_frequency_per_week: 0.0,
                change_failure_rate_percent: 0.0,
                total_commits: 3,
                total_prs: 2,
                merged_prs: 1,
                open_prs: 1,
                deployments: 0,
                contributors: 2,
            }
        );
    }

    #[test]
    fn test_aggregate_without_merged_prs_is_zero_not_nan() {
        let summary = aggregate(&[activity(
            vec![commit(Some("a"))],
            vec![pr(PrState::Open), pr(PrState::Closed)],
        )]);

        assert_eq!(summary.lead_time_days, 0.0);
        assert_eq!(summary.cycle_time_hours, 0.0);
        assert_eq!(summary.pr_review_delay_hours, 0.0);
        assert!(!summary.lead_time_days.is_nan());
    }

    #[test]
    fn test_aggregate_empty_input() {
        assert_eq!(aggregate(&[]), MetricsSummary::default());
    }

    #[test]
    fn test_closed_without_merge_counts_only_in_total() {
        let summary = aggregate(&[activity(
            vec![],
            vec![
                pr(PrState::Closed),
                pr(PrState::Open),
                merged_pr(at(1, 0), at(1, 12), &[]),
            ],
        )]);

        assert_eq!(summary.total_prs, 3);
        assert_eq!(summary.open_prs, 1);
        assert_eq!(summary.merged_prs, 1);
        assert!(summary.merged_prs + summary.open_prs < summary.total_prs);
    }

    #[test]
    fn test_contributors_deduplicated_across_repositories() {
        let summary = aggregate(&[
            activity(vec![commit(Some("alice")), commit(None)], vec![]),
            activity(vec![commit(Some("alice")), commit(Some("")), commit(Some("bob"))], vec![]),
        ]);

        assert_eq!(summary.total_commits, 5);
        assert_eq!(summary.contributors, 2);
    }

    #[test]
    fn test_review_delay_uses_earliest_review_in_any_order() {
        let reviews = [at(2, 0), at(1, 6), at(1, 20)];
        let summary = aggregate(&[activity(vec![], vec![merged_pr(at(1, 0), at(3, 0), &reviews)])]);

        assert_eq!(summary.pr_review_delay_hours, 6.0);
    }

    #[test]
    fn test_review_delay_ignores_merged_prs_without_reviews() {
        let summary = aggregate(&[activity(
            vec![],
            vec![
                merged_pr(at(1, 0), at(2, 0), &[at(1, 4)]),
                merged_pr(at(1, 0), at(4, 0), &[]),
            ],
        )]);

        assert_eq!(summary.pr_review_delay_hours, 4.0);
        assert_eq!(summary.lead_time_days, 2.0);
    }

    #[test]
    fn test_means_are_unweighted_and_rounded() {
        // 1h, 2h and 4h lead times: mean 7/3 h = 0.0972 days.
        let summary = aggregate(&[
            activity(vec![], vec![merged_pr(at(1, 0), at(1, 1), &[])]),
            activity(
                vec![],
                vec![
                    merged_pr(at(1, 0), at(1, 2), &[]),
                    merged_pr(at(1, 0), at(1, 4), &[]),
                ],
            ),
        ]);

        assert_eq!(summary.lead_time_days, 0.1);
        // Cycle time is derived from the unrounded lead time: 0.0972 * 8 = 0.78.
        assert_eq!(summary.cycle_time_hours, 0.8);
    }

    #[test]
    fn test_missing_timestamps_excluded_from_durations() {
        let mut no_created = merged_pr(at(1, 0), at(9, 0), &[at(1, 1)]);
        no_created.created_at = None;
        let pending_review = PullRequestRecord {
            reviews: vec![ReviewRecord { submitted_at: None }],
            ..merged_pr(at(1, 0), at(2, 0), &[])
        };

        let summary = aggregate(&[activity(vec![], vec![no_created, pending_review])]);

        assert_eq!(summary.merged_prs, 2);
        assert_eq!(summary.lead_time_days, 1.0);
        assert_eq!(summary.pr_review_delay_hours, 0.0);
    }

    #[test]
    fn test_summary_serializes_with_dashboard_field_names() {
        let json = serde_json::to_value(MetricsSummary {
            lead_time_days: 2.0,
            total_prs: 4,
            merged_prs: 1,
            open_prs: 2,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(json["leadTimeDays"], 2.0);
        assert_eq!(json["cycleTimeHours"], 0.0);
        assert_eq!(json["prReviewDelayHours"], 0.0);
        assert_eq!(json["deploymentFrequencyPerWeek"], 0.0);
        assert_eq!(json["changeFailureRatePercent"], 0.0);
        assert_eq!(json["totalPRs"], 4);
        assert_eq!(json["mergedPRs"], 1);
        assert_eq!(json["openPRs"], 2);
        assert_eq!(json["totalCommits"], 0);
        assert_eq!(json["contributors"], 0);
    }
}
