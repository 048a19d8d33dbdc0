//! Benchmark tiers for flow metrics.
//!
//! This is the only place the tier thresholds live. Every surface that shows a tier badge
//! goes through [`classify`].

use crate::metrics::MetricsSummary;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Days from PR creation to merge.
    LeadTime,
    /// Hours from first change to merge.
    CycleTime,
    /// Hours from PR creation to first review.
    PrReviewDelay,
    /// Deployments per week.
    DeployFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkTier {
    Elite,
    High,
    Medium,
    Low,
}

impl BenchmarkTier {
    pub fn label(self) -> &'static str {
        match self {
            BenchmarkTier::Elite => "Elite",
            BenchmarkTier::High => "High",
            BenchmarkTier::Medium => "Medium",
            BenchmarkTier::Low => "Low",
        }
    }
}

#[derive(Clone, Copy)]
enum Better {
    Lower,
    Higher,
}

struct Thresholds {
    elite: f64,
    high: f64,
    medium: f64,
    better: Better,
}

const fn thresholds(kind: MetricKind) -> Thresholds {
    match kind {
        MetricKind::LeadTime => Thresholds {
            elite: 1.0,
            high: 7.0,
            medium: 30.0,
            better: Better::Lower,
        },
        MetricKind::CycleTime => Thresholds {
            elite: 4.0,
            high: 24.0,
            medium: 168.0,
            better: Better::Lower,
        },
        MetricKind::PrReviewDelay => Thresholds {
            elite: 4.0,
            high: 24.0,
            medium: 48.0,
            better: Better::Lower,
        },
        MetricKind::DeployFrequency => Thresholds {
            elite: 1.0,
            high: 0.14,
            medium: 0.03,
            better: Better::Higher,
        },
    }
}

/// Classifies a metric value, given in the metric's natural unit, into a tier.
///
/// Boundaries are inclusive. NaN is never within a threshold and classifies as `Low`.
pub fn classify(value: f64, kind: MetricKind) -> BenchmarkTier {
    let t = thresholds(kind);
    let within = |limit: f64| match t.better {
        Better::Lower => value <= limit,
        Better::Higher => value >= limit,
    };

    if within(t.elite) {
        BenchmarkTier::Elite
    } else if within(t.high) {
        BenchmarkTier::High
    } else if within(t.medium) {
        BenchmarkTier::Medium
    } else {
        BenchmarkTier::Low
    }
}

/// A tier ready for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Benchmark {
    pub tier: BenchmarkTier,
    pub label: &'static str,
}

impl Benchmark {
    pub fn of(value: f64, kind: MetricKind) -> Self {
        let tier = classify(value, kind);
        Self {
            tier,
            label: tier.label(),
        }
    }
}

/// Tiers of every classifiable field of a [`MetricsSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Benchmarks {
    pub lead_time: Benchmark,
    pub cycle_time: Benchmark,
    pub pr_review_delay: Benchmark,
    pub deployment_frequency: Benchmark,
}

impl Benchmarks {
    pub fn for_summary(summary: &MetricsSummary) -> Self {
        Self {
            lead_time: Benchmark::of(summary.lead_time_days, MetricKind::LeadTime),
            cycle_time: Benchmark::of(summary.cycle_time_hours, MetricKind::CycleTime),
            pr_review_delay: Benchmark::of(summary.pr_review_delay_hours, MetricKind::PrReviewDelay),
            deployment_frequency: Benchmark::of(
                summary.deployment_frequency_per_week,
                MetricKind::DeployFrequency,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BenchmarkTier::*;

    #[test]
    fn test_lead_time_boundaries() {
        assert_eq!(classify(0.0, MetricKind::LeadTime), Elite);
        assert_eq!(classify(1.0, MetricKind::LeadTime), Elite);
        assert_eq!(classify(1.1, MetricKind::LeadTime), High);
        assert_eq!(classify(7.0, MetricKind::LeadTime), High);
        assert_eq!(classify(30.0, MetricKind::LeadTime), Medium);
        assert_eq!(classify(30.1, MetricKind::LeadTime), Low);
    }

    #[test]
    fn test_cycle_time_boundaries() {
        assert_eq!(classify(4.0, MetricKind::CycleTime), Elite);
        assert_eq!(classify(4.1, MetricKind::CycleTime), High);
        assert_eq!(classify(24.0, MetricKind::CycleTime), High);
        assert_eq!(classify(168.0, MetricKind::CycleTime), Medium);
        assert_eq!(classify(168.1, MetricKind::CycleTime), Low);
    }

    #[test]
    fn test_review_delay_boundaries() {
        assert_eq!(classify(4.0, MetricKind::PrReviewDelay), Elite);
        assert_eq!(classify(24.0, MetricKind::PrReviewDelay), High);
        assert_eq!(classify(48.0, MetricKind::PrReviewDelay), Medium);
        assert_eq!(classify(48.1, MetricKind::PrReviewDelay), Low);
    }

    #[test]
    fn test_deploy_frequency_higher_is_better() {
        assert_eq!(classify(3.0, MetricKind::DeployFrequency), Elite);
        assert_eq!(classify(1.0, MetricKind::DeployFrequency), Elite);
        assert_eq!(classify(0.14, MetricKind::DeployFrequency), High);
        assert_eq!(classify(0.03, MetricKind::DeployFrequency), Medium);
        assert_eq!(classify(0.0, MetricKind::DeployFrequency), Low);
    }

    #[test]
    fn test_classify_is_monotonic() {
        for kind in [MetricKind::LeadTime, MetricKind::CycleTime, MetricKind::PrReviewDelay] {
            let mut previous = Elite;
            for step in 0..2000 {
                let tier = classify(step as f64 * 0.1, kind);
                assert!(tier >= previous, "{kind:?} got better at {}", step as f64 * 0.1);
                previous = tier;
            }
        }
    }

    #[test]
    fn test_nan_is_low() {
        assert_eq!(classify(f64::NAN, MetricKind::LeadTime), Low);
        assert_eq!(classify(f64::NAN, MetricKind::DeployFrequency), Low);
    }

    #[test]
    fn test_benchmarks_for_empty_summary() {
        let benchmarks = Benchmarks::for_summary(&MetricsSummary::default());

        assert_eq!(benchmarks.lead_time.tier, Elite);
        assert_eq!(benchmarks.cycle_time.tier, Elite);
        assert_eq!(benchmarks.pr_review_delay.tier, Elite);
        assert_eq!(benchmarks.deployment_frequency.tier, Low);

        let json = serde_json::to_value(benchmarks).unwrap();
        assert_eq!(json["leadTime"]["tier"], "elite");
        assert_eq!(json["leadTime"]["label"], "Elite");
        assert_eq!(json["deploymentFrequency"]["tier"], "low");
    }
}
