//! Pairwise record matching.
//!
//! Two matchers produce [`MatchEdge`]s over the run's record indices:
//!
//! - [`strong`]: records sharing a canonical identifier
//! - [`fuzzy`]: records whose title/author/year similarity reaches the
//!   configured threshold
//!
//! Edges are normalized with the lower index first and [`normalize_edges`]
//! sorts and de-duplicates the combined list, so the edge set never depends
//! on thread scheduling.

pub mod fuzzy;
pub mod strong;

use serde::Serialize;
use std::fmt;

/// Which matcher accepted a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Shared canonical identifier
    Strong,
    /// Similarity at or above the threshold
    Fuzzy,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchKind::Strong => "strong",
            MatchKind::Fuzzy => "fuzzy",
        })
    }
}

/// An accepted, undirected match between two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MatchEdge {
    /// Lower record index
    pub a: usize,
    /// Higher record index
    pub b: usize,
    /// Matcher that accepted the pair
    pub kind: MatchKind,
    /// Similarity score; always 100 for strong edges
    pub score: u8,
}

impl MatchEdge {
    /// Strong edge between two records.
    #[must_use]
    pub fn strong(x: usize, y: usize) -> Self {
        let (a, b) = ordered(x, y);
        MatchEdge {
            a,
            b,
            kind: MatchKind::Strong,
            score: 100,
        }
    }

    /// Fuzzy edge between two records with its score.
    #[must_use]
    pub fn fuzzy(x: usize, y: usize, score: u8) -> Self {
        let (a, b) = ordered(x, y);
        MatchEdge {
            a,
            b,
            kind: MatchKind::Fuzzy,
            score,
        }
    }
}

fn ordered(x: usize, y: usize) -> (usize, usize) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

/// Sort edges and drop exact duplicates.
pub fn normalize_edges(edges: &mut Vec<MatchEdge>) {
    edges.sort_unstable();
    edges.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_are_undirected() {
        assert_eq!(MatchEdge::strong(5, 2), MatchEdge::strong(2, 5));
        assert_eq!(MatchEdge::fuzzy(9, 1, 88).a, 1);
        assert_eq!(MatchEdge::strong(0, 1).score, 100);
    }

    #[test]
    fn test_normalize_edges() {
        let mut edges = vec![
            MatchEdge::fuzzy(3, 1, 90),
            MatchEdge::strong(0, 2),
            MatchEdge::fuzzy(1, 3, 90),
        ];
        normalize_edges(&mut edges);
        assert_eq!(edges, vec![MatchEdge::strong(0, 2), MatchEdge::fuzzy(1, 3, 90)]);
    }
}
