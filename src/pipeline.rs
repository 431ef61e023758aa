//! End-to-end union catalog run.
//!
//! A [`Pipeline`] owns a validated [`RunConfig`] and runs the stages in
//! order over fully loaded input:
//!
//! 1. load every source (unreadable or unparseable sources become warnings
//!    while at least one source remains)
//! 2. normalize all records in parallel
//! 3. strong matching, then fuzzy matching when enabled
//! 4. clustering over the merged, sorted edge list
//! 5. merge synthesis, one record per cluster; with ISO 2709 output, records
//!    over the format's length limits are trimmed with a warning
//!
//! Nothing is written by [`Pipeline::run`]; the caller turns the
//! [`RunOutput`] into [`Artifacts`] once the run has fully succeeded.
//!
//! # Example
//!
//! ```
//! use unicat::{Pipeline, RunOptions, SourceInput};
//!
//! let options = RunOptions::from_toml_str("strong-only = true")?;
//! let pipeline = Pipeline::new(options.validate()?);
//!
//! let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim">
//!   <record>
//!     <leader>00000nam a2200000 a 4500</leader>
//!     <controlfield tag="001">b1</controlfield>
//!     <datafield tag="245" ind1="0" ind2="0"><subfield code="a">Moby Dick</subfield></datafield>
//!   </record>
//! </collection>"#;
//!
//! let output = pipeline.run(&[SourceInput::from_bytes("LIB1", xml)])?;
//! assert_eq!(output.clusters.len(), 1);
//! assert_eq!(output.merged[0].contributors[0].record_id, "b1");
//! # Ok::<(), unicat::MarcError>(())
//! ```

use crate::cluster::{build_clusters, Cluster};
use crate::config::{RunConfig, RunOptions};
use crate::diagnostics::{Diagnostics, Stage, Warning};
use crate::error::{MarcError, Result};
use crate::formats::Format;
use crate::matching::fuzzy::{fuzzy_edges, FuzzyStats, ScoringMode};
use crate::matching::strong::strong_edges;
use crate::matching::{normalize_edges, MatchEdge};
use crate::merge::{merge_all, MergedRecord};
use crate::normalize::{normalize_all, NormalizedKeys};
use crate::report::{Artifacts, RunView};
use crate::source::{self, RecordId, SourceInput, SourceRecord};
use crate::stats::RunSummary;
use crate::writer::fit_record;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// Everything computed by one run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Configuration the run used
    pub config: RunConfig,
    /// Loaded records in priority order
    pub records: Vec<SourceRecord>,
    /// Keys of each record, index-aligned with `records`
    pub keys: Vec<NormalizedKeys>,
    /// Accepted edges, sorted
    pub edges: Vec<MatchEdge>,
    /// Clusters in id order
    pub clusters: Vec<Cluster>,
    /// Union records, index-aligned with `clusters`
    pub merged: Vec<MergedRecord>,
    /// Fuzzy pass counters, when the fuzzy matcher ran
    pub fuzzy_stats: Option<FuzzyStats>,
    /// Cluster statistics
    pub summary: RunSummary,
    /// Warnings in the order they were raised
    pub warnings: Vec<Warning>,
}

impl RunOutput {
    /// Borrowed view used by the artifact writers.
    #[must_use]
    pub fn view(&self) -> RunView<'_> {
        RunView {
            clusters: &self.clusters,
            merged: &self.merged,
            config: &self.config,
            summary: &self.summary,
            warnings: &self.warnings,
        }
    }

    /// Serialize the catalog, report and manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if any artifact cannot be serialized.
    pub fn artifacts(&self) -> Result<Artifacts> {
        Artifacts::build(&self.view())
    }

    /// Cluster containing the record with `id`.
    #[must_use]
    pub fn cluster_of(&self, id: RecordId) -> Option<&Cluster> {
        let index = self.records.binary_search_by_key(&id, |r| r.id).ok()?;
        self.clusters.iter().find(|c| c.members.contains(&index))
    }
}

/// A configured union catalog run.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    /// Pipeline over an already validated configuration.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Pipeline { config }
    }

    /// Validate `options` and build a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::ConfigError`] for invalid options.
    pub fn from_options(options: &RunOptions) -> Result<Self> {
        Ok(Pipeline::new(options.validate()?))
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run all stages over `sources`, declared in priority order.
    ///
    /// # Errors
    ///
    /// - [`MarcError::ConfigError`] if no source is given or labels are empty
    ///   or duplicated
    /// - [`MarcError::NoReadableSources`] if every source failed to load
    pub fn run(&self, sources: &[SourceInput]) -> Result<RunOutput> {
        validate_labels(sources)?;
        let started = Instant::now();
        let mut diagnostics = Diagnostics::new();

        if self.config.fast() {
            diagnostics.warning(
                Stage::Match,
                "fast mode: approximate scoring, single-key blocking and no check-digit \
                 validation trade recall for speed",
            );
        }

        let phase = Instant::now();
        let records = load_sources(sources, &mut diagnostics)?;
        tracing::info!(
            phase = "load",
            elapsed_ms = elapsed_ms(phase),
            sources = sources.len(),
            records = records.len(),
            "phase done"
        );

        let phase = Instant::now();
        let keys = normalize_all(&records, &self.config);
        tracing::info!(
            phase = "normalize",
            elapsed_ms = elapsed_ms(phase),
            with_strong_keys = keys.iter().filter(|k| !k.strong.is_empty()).count(),
            with_signature = keys.iter().filter(|k| k.fuzzy.is_some()).count(),
            "phase done"
        );

        let phase = Instant::now();
        let mut edges = strong_edges(&keys);
        tracing::info!(
            phase = "strong",
            elapsed_ms = elapsed_ms(phase),
            edges = edges.len(),
            "phase done"
        );

        let mut fuzzy_stats = None;
        if let (true, Some(threshold)) = (self.config.fuzzy_enabled(), self.config.weak_threshold())
        {
            let phase = Instant::now();
            let mode = if self.config.fast() {
                ScoringMode::Fast
            } else {
                ScoringMode::Full
            };
            let outcome = fuzzy_edges(&keys, threshold, mode, &mut diagnostics);
            tracing::info!(
                phase = "fuzzy",
                elapsed_ms = elapsed_ms(phase),
                threshold,
                edges = outcome.edges.len(),
                "phase done"
            );
            edges.extend(outcome.edges);
            fuzzy_stats = Some(outcome.stats);
        }
        normalize_edges(&mut edges);

        let phase = Instant::now();
        let clusters = build_clusters(&keys, &edges);
        tracing::info!(
            phase = "cluster",
            elapsed_ms = elapsed_ms(phase),
            clusters = clusters.len(),
            "phase done"
        );

        let phase = Instant::now();
        let mut merged = merge_all(&clusters, &records, &self.config);
        if self.config.catalog_format() == Format::Iso2709 {
            fit_iso2709(&mut merged, &self.config, &mut diagnostics);
        }
        tracing::info!(
            phase = "merge",
            elapsed_ms = elapsed_ms(phase),
            merged = merged.len(),
            "phase done"
        );

        let summary = RunSummary::compute(&clusters, &records);
        tracing::info!(
            records = summary.records,
            clusters = summary.clusters,
            max_size = summary.max_size,
            quality_score = summary.quality_score,
            risk = %summary.risk_level,
            warnings = diagnostics.warnings().len(),
            elapsed_ms = elapsed_ms(started),
            "run complete"
        );

        Ok(RunOutput {
            config: self.config.clone(),
            records,
            keys,
            edges,
            clusters,
            merged,
            fuzzy_stats,
            summary,
            warnings: diagnostics.into_warnings(),
        })
    }
}

/// Trim union records that exceed ISO 2709 limits, holdings and provenance
/// fields first. The manifest still lists every contributor.
fn fit_iso2709(merged: &mut [MergedRecord], config: &RunConfig, diagnostics: &mut Diagnostics) {
    let expendable = [config.holdings_tag(), config.provenance_tag()];
    for merged_record in merged {
        let removed = fit_record(&mut merged_record.record, &expendable);
        if removed.is_empty() {
            continue;
        }
        let mut by_tag: BTreeMap<&str, usize> = BTreeMap::new();
        for tag in &removed {
            *by_tag.entry(tag.as_str()).or_default() += 1;
        }
        let tags: Vec<String> = by_tag
            .into_iter()
            .map(|(tag, count)| format!("{tag} x{count}"))
            .collect();
        diagnostics.warning(
            Stage::Merge,
            format!(
                "cluster {}: {} fields omitted from the ISO 2709 record to fit length limits ({})",
                merged_record.cluster_id,
                removed.len(),
                tags.join(", ")
            ),
        );
    }
}

fn validate_labels(sources: &[SourceInput]) -> Result<()> {
    if sources.is_empty() {
        return Err(MarcError::ConfigError("no sources declared".to_string()));
    }
    let mut seen = HashSet::new();
    for source in sources {
        let label = source.label();
        if label.trim().is_empty() {
            return Err(MarcError::ConfigError(
                "source labels must not be empty".to_string(),
            ));
        }
        if !seen.insert(label) {
            return Err(MarcError::ConfigError(format!(
                "duplicate source label '{label}'"
            )));
        }
    }
    Ok(())
}

/// Load sources in declaration order; a failing source is skipped with a
/// warning while at least one other source loads.
fn load_sources(
    sources: &[SourceInput],
    diagnostics: &mut Diagnostics,
) -> Result<Vec<SourceRecord>> {
    let mut records = Vec::new();
    let mut failures = Vec::new();

    for (index, input) in sources.iter().enumerate() {
        let loaded = input
            .read_bytes()
            .and_then(|bytes| source::load(index, input.label(), &bytes, diagnostics));
        match loaded {
            Ok(source_records) => records.extend(source_records),
            Err(e) => {
                diagnostics.source_warning(Stage::Load, input.label(), format!("source skipped: {e}"));
                failures.push(input.label());
            },
        }
    }

    if failures.len() == sources.len() {
        return Err(MarcError::NoReadableSources(failures.join(", ")));
    }
    Ok(records)
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_RECORD: &str = r#"<record xmlns="http://www.loc.gov/MARC21/slim">
        <leader>00000nam a2200000 a 4500</leader>
        <datafield tag="245" ind1="0" ind2="0"><subfield code="a">Title</subfield></datafield>
    </record>"#;

    #[test]
    fn test_rejects_bad_labels() {
        let pipeline = Pipeline::default();
        assert!(matches!(pipeline.run(&[]), Err(MarcError::ConfigError(_))));

        let duplicate = [
            SourceInput::from_bytes("A", ONE_RECORD),
            SourceInput::from_bytes("A", ONE_RECORD),
        ];
        assert!(matches!(
            pipeline.run(&duplicate),
            Err(MarcError::ConfigError(_))
        ));

        let blank = [SourceInput::from_bytes(" ", ONE_RECORD)];
        assert!(matches!(pipeline.run(&blank), Err(MarcError::ConfigError(_))));
    }

    #[test]
    fn test_all_sources_failing() {
        let sources = [
            SourceInput::from_path("A", "/nonexistent/a.mrc"),
            SourceInput::from_bytes("B", "not a catalog"),
        ];
        let err = Pipeline::default().run(&sources).unwrap_err();
        assert!(matches!(err, MarcError::NoReadableSources(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_failing_source_becomes_warning() {
        let sources = [
            SourceInput::from_path("A", "/nonexistent/a.mrc"),
            SourceInput::from_bytes("B", ONE_RECORD),
        ];
        let output = Pipeline::default().run(&sources).unwrap();
        assert_eq!(output.records.len(), 1);
        // Declared index is kept for priority
        assert_eq!(output.records[0].id, RecordId::new(1, 0));
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].source.as_deref(), Some("A"));
        assert!(output.cluster_of(RecordId::new(1, 0)).is_some());
    }

    #[test]
    fn test_fast_mode_warns() {
        let options = RunOptions {
            fast: Some(true),
            ..RunOptions::default()
        };
        let pipeline = Pipeline::from_options(&options).unwrap();
        let output = pipeline
            .run(&[SourceInput::from_bytes("A", ONE_RECORD)])
            .unwrap();
        assert!(output.warnings.iter().any(|w| w.message.contains("fast mode")));
        // No threshold: fuzzy matching does not run
        assert!(output.fuzzy_stats.is_none());
    }
}
