//! Transitive clustering of match edges.
//!
//! All edges are folded into a [`DisjointSet`] (path compression plus union
//! by rank), and each resulting component becomes one [`Cluster`]. Records
//! without any edge form singleton clusters, so the clusters always partition
//! the full record set.
//!
//! Cluster ids are 1-based and assigned in ascending order of each cluster's
//! smallest record index. Record indices follow declared source order, so the
//! numbering is stable for a given input.

use crate::matching::{MatchEdge, MatchKind};
use crate::normalize::NormalizedKeys;
use std::collections::BTreeSet;

/// Disjoint-set forest over `0..len`.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// `len` singleton sets.
    #[must_use]
    pub fn new(len: usize) -> Self {
        DisjointSet {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether the forest is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of `x`'s set, compressing the path on the way.
    ///
    /// # Panics
    ///
    /// Panics if `x` is out of range.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`; returns false if already joined.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }

        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] = self.rank[root_a].saturating_add(1);
            },
        }
        true
    }

    /// Whether `a` and `b` are in the same set.
    pub fn connected(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

/// One connected component of the match graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// 1-based id, in order of the smallest member
    pub id: usize,
    /// Record indices, ascending (priority order)
    pub members: Vec<usize>,
    /// Kinds of the edges inside the cluster
    pub match_kinds: BTreeSet<MatchKind>,
    /// Union of the members' strong keys, sorted
    pub strong_keys: Vec<String>,
}

impl Cluster {
    /// Number of member records.
    #[must_use]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// `;`-joined match kinds, or `none` for an unmatched record.
    #[must_use]
    pub fn match_kinds_label(&self) -> String {
        if self.match_kinds.is_empty() {
            "none".to_string()
        } else {
            self.match_kinds
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";")
        }
    }
}

/// Build the clusters for `keys.len()` records from `edges`.
///
/// # Panics
///
/// Panics if an edge references a record index outside `keys`.
#[must_use]
pub fn build_clusters(keys: &[NormalizedKeys], edges: &[MatchEdge]) -> Vec<Cluster> {
    let mut sets = DisjointSet::new(keys.len());
    for edge in edges {
        sets.union(edge.a, edge.b);
    }

    // Roots in order of first (smallest) member
    let mut slot_of_root = vec![usize::MAX; keys.len()];
    let mut clusters: Vec<Cluster> = Vec::new();
    for index in 0..keys.len() {
        let root = sets.find(index);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = clusters.len();
            clusters.push(Cluster {
                id: clusters.len() + 1,
                members: Vec::new(),
                match_kinds: BTreeSet::new(),
                strong_keys: Vec::new(),
            });
        }
        clusters[slot_of_root[root]].members.push(index);
    }

    for edge in edges {
        let root = sets.find(edge.a);
        clusters[slot_of_root[root]].match_kinds.insert(edge.kind);
    }

    for cluster in &mut clusters {
        let cluster_keys: BTreeSet<&str> = cluster
            .members
            .iter()
            .flat_map(|&m| keys[m].strong.iter().map(String::as_str))
            .collect();
        cluster.strong_keys = cluster_keys.into_iter().map(str::to_string).collect();
    }

    tracing::debug!(
        records = keys.len(),
        clusters = clusters.len(),
        "clusters built"
    );
    clusters
}
