//! Strong (identifier) matching.
//!
//! Records are grouped by each strong key; every group becomes a star of
//! edges from its lowest record index to each other member. A star has the
//! same connected component as the full clique, with one edge per member
//! instead of one per pair, and no pairwise comparison is ever made.

use super::MatchEdge;
use crate::normalize::NormalizedKeys;
use std::collections::BTreeMap;

/// Records sharing one strong key, in ascending index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup<'a> {
    /// The shared key
    pub key: &'a str,
    /// Record indices carrying it
    pub members: Vec<usize>,
}

/// Group record indices by strong key, in key order.
///
/// Keys carried by a single record are kept; they still describe the record
/// in the report.
#[must_use]
pub fn key_groups(keys: &[NormalizedKeys]) -> Vec<KeyGroup<'_>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, record_keys) in keys.iter().enumerate() {
        for key in &record_keys.strong {
            groups.entry(key.as_str()).or_default().push(index);
        }
    }

    groups
        .into_iter()
        .map(|(key, members)| KeyGroup { key, members })
        .collect()
}

/// Strong edges for all records.
#[must_use]
pub fn strong_edges(keys: &[NormalizedKeys]) -> Vec<MatchEdge> {
    let mut edges = Vec::new();
    for group in key_groups(keys) {
        if let Some((&hub, rest)) = group.members.split_first() {
            edges.extend(rest.iter().map(|&other| MatchEdge::strong(hub, other)));
        }
    }

    tracing::debug!(edges = edges.len(), "strong edges built");
    edges
}
