//! Fuzzy (similarity) matching.
//!
//! Candidate pairs come from blocking: two records are compared only when
//! they share a block key. Each candidate pair is scored once, in parallel,
//! and accepted when the score reaches the threshold (inclusive).
//!
//! # Scoring
//!
//! Scores are integers in `0..=100`. Three components are combined with
//! weights title 0.6, author 0.3 and year 0.1, renormalized over the
//! components both records have; the title is always present.
//!
//! | Component | [`ScoringMode::Full`] | [`ScoringMode::Fast`] |
//! |-----------|-----------------------|-----------------------|
//! | title | 0.8 × Levenshtein(sorted tokens) + 0.2 × Levenshtein(ordered title) | Jaccard of token sets |
//! | author | Jaro-Winkler | exact equality |
//! | year | 1 if equal, 0.5 if one apart, else 0 | same |
//!
//! A score never depends on the threshold, so raising the threshold can only
//! remove edges.
//!
//! # Blocking
//!
//! Full mode blocks on the first title token, the alphabetically first title
//! token, and author surname plus year. Fast mode uses the first title token
//! only, which misses pairs whose titles start differently: a deliberate
//! recall-for-speed trade.

use super::MatchEdge;
use crate::diagnostics::{Diagnostics, Stage};
use crate::normalize::{FuzzySignature, NormalizedKeys};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use strsim::{jaro_winkler, normalized_levenshtein};

/// Blocks larger than this are not expanded into pairs.
pub const MAX_BLOCK_SIZE: usize = 5_000;

const TITLE_WEIGHT: f64 = 0.6;
const AUTHOR_WEIGHT: f64 = 0.3;
const YEAR_WEIGHT: f64 = 0.1;

const SORTED_TITLE_SHARE: f64 = 0.8;
const ORDERED_TITLE_SHARE: f64 = 0.2;

/// Scorer and blocking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMode {
    /// Edit-distance scoring with three blocking keys
    #[default]
    Full,
    /// Token-overlap scoring with one blocking key
    Fast,
}

/// Counters describing one fuzzy matching pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuzzyStats {
    /// Number of blocks with at least two records
    pub blocks: usize,
    /// Size of the largest block
    pub largest_block: usize,
    /// Blocks skipped for exceeding [`MAX_BLOCK_SIZE`]
    pub oversized_blocks: usize,
    /// Distinct candidate pairs scored
    pub comparisons: usize,
    /// Pairs accepted as edges
    pub accepted: usize,
    /// Mean score of accepted pairs
    pub mean_accepted_score: f64,
}

/// Result of a fuzzy matching pass.
#[derive(Debug, Clone, Default)]
pub struct FuzzyOutcome {
    /// Accepted edges, sorted
    pub edges: Vec<MatchEdge>,
    /// Pass counters
    pub stats: FuzzyStats,
}

/// Similarity of two signatures in `0..=100`.
///
/// ```
/// use unicat::matching::fuzzy::{score, ScoringMode};
/// use unicat::normalize::FuzzySignature;
/// use unicat::{Field, Leader, Record};
///
/// let sig = |title: &str| {
///     let mut record = Record::new(Leader::default());
///     let mut field = Field::new("245".to_string(), '1', '0');
///     field.add_subfield('a', title.to_string());
///     record.add_field(field);
///     FuzzySignature::from_record(&record).unwrap()
/// };
///
/// assert_eq!(score(&sig("Moby Dick"), &sig("Moby Dick"), ScoringMode::Full), 100);
/// assert!(score(&sig("Moby Dick"), &sig("War and Peace"), ScoringMode::Full) < 50);
/// ```
#[must_use]
pub fn score(a: &FuzzySignature, b: &FuzzySignature, mode: ScoringMode) -> u8 {
    let title = match mode {
        ScoringMode::Full => {
            SORTED_TITLE_SHARE * normalized_levenshtein(&a.sorted_title, &b.sorted_title)
                + ORDERED_TITLE_SHARE * normalized_levenshtein(&a.title, &b.title)
        },
        ScoringMode::Fast => token_jaccard(&a.tokens, &b.tokens),
    };

    let mut weighted = TITLE_WEIGHT * title;
    let mut total_weight = TITLE_WEIGHT;

    if let (Some(author_a), Some(author_b)) = (&a.author, &b.author) {
        let author = match mode {
            ScoringMode::Full => jaro_winkler(author_a, author_b),
            ScoringMode::Fast => f64::from(u8::from(author_a == author_b)),
        };
        weighted += AUTHOR_WEIGHT * author;
        total_weight += AUTHOR_WEIGHT;
    }

    if let (Some(year_a), Some(year_b)) = (a.year, b.year) {
        let year = match year_a.abs_diff(year_b) {
            0 => 1.0,
            1 => 0.5,
            _ => 0.0,
        };
        weighted += YEAR_WEIGHT * year;
        total_weight += YEAR_WEIGHT;
    }

    to_percent(weighted / total_weight)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_percent(similarity: f64) -> u8 {
    (similarity.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[allow(clippy::cast_precision_loss)]
fn token_jaccard(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / union as f64
}

/// Block keys of one signature.
#[must_use]
pub fn blocking_keys(signature: &FuzzySignature, mode: ScoringMode) -> Vec<String> {
    let mut keys = vec![format!("t:{}", signature.first_token())];
    if mode == ScoringMode::Full {
        keys.push(format!("m:{}", signature.min_token()));
        if let (Some(author), Some(year)) = (signature.author_token(), signature.year) {
            keys.push(format!("a:{author}:{year}"));
        }
    }
    keys
}

/// Run blocking and scoring over all records.
///
/// Oversized blocks are reported to `diagnostics`.
#[must_use]
pub fn fuzzy_edges(
    keys: &[NormalizedKeys],
    threshold: u8,
    mode: ScoringMode,
    diagnostics: &mut Diagnostics,
) -> FuzzyOutcome {
    let mut blocks: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, record_keys) in keys.iter().enumerate() {
        if let Some(signature) = &record_keys.fuzzy {
            for key in blocking_keys(signature, mode) {
                blocks.entry(key).or_default().push(index);
            }
        }
    }

    let mut stats = FuzzyStats::default();
    let mut pairs = Vec::new();
    for (key, members) in &blocks {
        if members.len() < 2 {
            continue;
        }
        stats.blocks += 1;
        stats.largest_block = stats.largest_block.max(members.len());
        if members.len() > MAX_BLOCK_SIZE {
            stats.oversized_blocks += 1;
            diagnostics.warning(
                Stage::Match,
                format!(
                    "fuzzy block '{key}' has {} records (limit {MAX_BLOCK_SIZE}); not compared",
                    members.len()
                ),
            );
            continue;
        }
        for (i, &x) in members.iter().enumerate() {
            pairs.extend(members[i + 1..].iter().map(|&y| (x, y)));
        }
    }
    pairs.sort_unstable();
    pairs.dedup();
    stats.comparisons = pairs.len();

    let mut edges: Vec<MatchEdge> = pairs
        .par_iter()
        .filter_map(|&(x, y)| {
            let a = keys[x].fuzzy.as_ref()?;
            let b = keys[y].fuzzy.as_ref()?;
            let s = score(a, b, mode);
            (s >= threshold).then(|| MatchEdge::fuzzy(x, y, s))
        })
        .collect();
    edges.sort_unstable();

    stats.accepted = edges.len();
    if !edges.is_empty() {
        let total: f64 = edges.iter().map(|e| f64::from(e.score)).sum();
        #[allow(clippy::cast_precision_loss)]
        let count = edges.len() as f64;
        stats.mean_accepted_score = total / count;
    }

    tracing::info!(
        blocks = stats.blocks,
        largest_block = stats.largest_block,
        comparisons = stats.comparisons,
        accepted = stats.accepted,
        mean_score = stats.mean_accepted_score,
        "fuzzy matching done"
    );

    FuzzyOutcome { edges, stats }
}
