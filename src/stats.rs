//! Run summary over the final clusters.
//!
//! The summary is a quick health check of a merge: a conservative run has
//! mostly singletons and small multi-library clusters, while over-merging
//! shows up as very large clusters. [`RunSummary::quality_score`] and
//! [`RiskLevel`] condense that into two values for the manifest.

use crate::cluster::Cluster;
use crate::source::SourceRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Over-merge risk derived from the cluster-size distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    /// Conservative merge
    Low,
    /// Some large clusters worth reviewing
    Medium,
    /// Probable over-merging
    High,
    /// No clusters
    NoData,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::NoData => "no-data",
        })
    }
}

/// Aggregate statistics of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Loaded records
    pub records: usize,
    /// Clusters (= merged records)
    pub clusters: usize,
    /// Distinct source labels with at least one record
    pub libraries: usize,
    /// Cluster size -> number of clusters
    pub size_histogram: BTreeMap<usize, usize>,
    /// Largest cluster
    pub max_size: usize,
    /// Mean cluster size, two decimals
    pub mean_size: f64,
    /// Share of singleton clusters
    pub singleton_share: f64,
    /// Share of clusters with members from more than one library
    pub multi_library_share: f64,
    /// Share of clusters with more than 10 members
    pub gt10_share: f64,
    /// Share of clusters with more than 25 members
    pub gt25_share: f64,
    /// Share of clusters with more than 50 members
    pub gt50_share: f64,
    /// Weighted health score; higher is better
    pub quality_score: f64,
    /// Over-merge risk
    pub risk_level: RiskLevel,
}

impl RunSummary {
    /// Summarize `clusters` over the run's `records`.
    ///
    /// # Panics
    ///
    /// Panics if a cluster member index is outside `records`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(clusters: &[Cluster], records: &[SourceRecord]) -> Self {
        let libraries = records
            .iter()
            .map(|r| r.label.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        if clusters.is_empty() {
            return RunSummary {
                records: records.len(),
                clusters: 0,
                libraries,
                size_histogram: BTreeMap::new(),
                max_size: 0,
                mean_size: 0.0,
                singleton_share: 0.0,
                multi_library_share: 0.0,
                gt10_share: 0.0,
                gt25_share: 0.0,
                gt50_share: 0.0,
                quality_score: 0.0,
                risk_level: RiskLevel::NoData,
            };
        }

        let mut size_histogram = BTreeMap::new();
        let mut multi_library = 0usize;
        for cluster in clusters {
            *size_histogram.entry(cluster.size()).or_insert(0usize) += 1;
            let labels: BTreeSet<&str> = cluster
                .members
                .iter()
                .map(|&m| records[m].label.as_str())
                .collect();
            if labels.len() > 1 {
                multi_library += 1;
            }
        }

        let count = clusters.len() as f64;
        let share_over = |limit: usize| {
            size_histogram
                .range(limit + 1..)
                .map(|(_, n)| *n)
                .sum::<usize>() as f64
                / count
        };

        let max_size = size_histogram.keys().next_back().copied().unwrap_or(0);
        let total: usize = clusters.iter().map(Cluster::size).sum();
        let singleton_share = size_histogram.get(&1).copied().unwrap_or(0) as f64 / count;
        let multi_library_share = multi_library as f64 / count;
        let gt10_share = share_over(10);
        let gt25_share = share_over(25);
        let gt50_share = share_over(50);

        let quality_score = 0.35 * singleton_share + 0.30 * multi_library_share
            - 0.20 * gt25_share
            - 0.10 * gt50_share
            - 0.05 * (max_size as f64 / 100.0);

        let risk_level = if max_size > 80 || gt25_share > 0.10 {
            RiskLevel::High
        } else if gt25_share > 0.03 || gt50_share > 0.01 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        RunSummary {
            records: records.len(),
            clusters: clusters.len(),
            libraries,
            size_histogram,
            max_size,
            mean_size: round_to(total as f64 / count, 2),
            singleton_share: round_to(singleton_share, 4),
            multi_library_share: round_to(multi_library_share, 4),
            gt10_share: round_to(gt10_share, 4),
            gt25_share: round_to(gt25_share, 4),
            gt50_share: round_to(gt50_share, 4),
            quality_score: round_to(quality_score, 4),
            risk_level,
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
