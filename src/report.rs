//! Run artifacts: merged catalog, cluster report and cluster manifest.
//!
//! All three are serialized in memory by [`Artifacts::build`] before anything
//! touches the filesystem, and [`Artifacts::write_to`] stages every file
//! before moving any of them into place, so a failed run never leaves a
//! report that disagrees with its catalog.
//!
//! # Report columns
//!
//! `kind,cluster_id,size,match_kinds,strong_keys,libraries,policy,message`
//!
//! One `cluster` row per cluster in id order, then one `warning` row per
//! accumulated warning. List columns are `;`-joined.

use crate::cluster::Cluster;
use crate::config::RunConfig;
use crate::diagnostics::Warning;
use crate::error::{MarcError, Result};
use crate::formats::Format;
use crate::matching::MatchKind;
use crate::merge::{Contributor, MergedRecord};
use crate::stats::RunSummary;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    kind: &'static str,
    cluster_id: Option<usize>,
    size: Option<usize>,
    match_kinds: String,
    strong_keys: String,
    libraries: String,
    policy: &'a str,
    message: String,
}

#[derive(Debug, Serialize)]
struct Policy<'a> {
    flags: String,
    #[serde(flatten)]
    config: &'a RunConfig,
}

#[derive(Debug, Serialize)]
struct ManifestCluster<'a> {
    cluster_id: usize,
    size: usize,
    match_kinds: &'a BTreeSet<MatchKind>,
    strong_keys: &'a [String],
    libraries: Vec<&'a str>,
    members: &'a [Contributor],
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    policy: Policy<'a>,
    summary: &'a RunSummary,
    clusters: Vec<ManifestCluster<'a>>,
    warnings: &'a [Warning],
}

/// Everything the export step needs, borrowed from a finished run.
///
/// `clusters` and `merged` are index-aligned: `merged[i]` is the union
/// record of `clusters[i]`.
#[derive(Debug, Clone, Copy)]
pub struct RunView<'a> {
    /// Clusters in id order
    pub clusters: &'a [Cluster],
    /// Merged records in cluster order
    pub merged: &'a [MergedRecord],
    /// Run configuration
    pub config: &'a RunConfig,
    /// Run summary
    pub summary: &'a RunSummary,
    /// Accumulated warnings
    pub warnings: &'a [Warning],
}

impl<'a> RunView<'a> {
    fn aligned(&self) -> Result<impl Iterator<Item = (&'a Cluster, &'a MergedRecord)>> {
        if self.clusters.len() != self.merged.len() {
            return Err(MarcError::SerializationError(format!(
                "{} clusters but {} merged records",
                self.clusters.len(),
                self.merged.len()
            )));
        }
        let (clusters, merged) = (self.clusters, self.merged);
        Ok(clusters.iter().zip(merged.iter()))
    }
}

/// Serialize merged records in the given catalog format.
///
/// # Errors
///
/// Returns an error if a record cannot be encoded.
pub fn write_catalog(merged: &[MergedRecord], format: Format) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut writer = format.writer(&mut buffer);
        for merged_record in merged {
            writer.write_record(&merged_record.record)?;
        }
        writer.finish()?;
    }
    Ok(buffer)
}

/// Build the CSV cluster report.
///
/// # Errors
///
/// Returns an error if the CSV cannot be written or the view is inconsistent.
pub fn cluster_report(view: &RunView<'_>) -> Result<String> {
    let policy = view.config.policy_flags();
    let mut writer = csv::Writer::from_writer(Vec::new());

    for (cluster, merged) in view.aligned()? {
        writer.serialize(ReportRow {
            kind: "cluster",
            cluster_id: Some(cluster.id),
            size: Some(cluster.size()),
            match_kinds: cluster.match_kinds_label(),
            strong_keys: cluster.strong_keys.join(";"),
            libraries: merged.libraries().join(";"),
            policy: &policy,
            message: String::new(),
        })?;
    }

    for warning in view.warnings {
        writer.serialize(ReportRow {
            kind: "warning",
            cluster_id: None,
            size: None,
            match_kinds: String::new(),
            strong_keys: String::new(),
            libraries: warning.source.clone().unwrap_or_default(),
            policy: &policy,
            message: warning.to_string(),
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| MarcError::SerializationError(format!("CSV: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| MarcError::SerializationError(format!("CSV is not UTF-8: {e}")))
}

/// Build the JSON cluster manifest.
///
/// # Errors
///
/// Returns an error if the JSON cannot be written or the view is inconsistent.
pub fn cluster_manifest(view: &RunView<'_>) -> Result<String> {
    let clusters = view
        .aligned()?
        .map(|(cluster, merged)| ManifestCluster {
            cluster_id: cluster.id,
            size: cluster.size(),
            match_kinds: &cluster.match_kinds,
            strong_keys: &cluster.strong_keys,
            libraries: merged.libraries(),
            members: &merged.contributors,
        })
        .collect();

    let manifest = Manifest {
        policy: Policy {
            flags: view.config.policy_flags(),
            config: view.config,
        },
        summary: view.summary,
        clusters,
        warnings: view.warnings,
    };
    Ok(serde_json::to_string_pretty(&manifest)?)
}

/// The three serialized outputs of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// Merged catalog bytes
    pub catalog: Vec<u8>,
    /// Serialization of `catalog`
    pub catalog_format: Format,
    /// CSV cluster report
    pub report: String,
    /// JSON cluster manifest
    pub manifest: String,
}

impl Artifacts {
    /// Serialize all three artifacts.
    ///
    /// # Errors
    ///
    /// Returns an error if any artifact cannot be serialized; nothing is
    /// returned in that case.
    pub fn build(view: &RunView<'_>) -> Result<Self> {
        let catalog_format = view.config.catalog_format();
        let artifacts = Artifacts {
            catalog: write_catalog(view.merged, catalog_format)?,
            catalog_format,
            report: cluster_report(view)?,
            manifest: cluster_manifest(view)?,
        };
        tracing::debug!(
            catalog_bytes = artifacts.catalog.len(),
            report_bytes = artifacts.report.len(),
            manifest_bytes = artifacts.manifest.len(),
            "artifacts serialized"
        );
        Ok(artifacts)
    }

    /// Write the artifacts to `paths`.
    ///
    /// Every file is first written next to its destination with a
    /// `.partial` suffix, then moved into place. An existing file at a
    /// destination is kept as `.previous` until all three moves succeed. If a
    /// move fails, the moves already made are undone and the previous files
    /// restored, so either all three new artifacts are in place or none is.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created or a file cannot be
    /// written or renamed.
    pub fn write_to(&self, paths: &ArtifactPaths) -> Result<()> {
        let outputs: [(&Path, &[u8]); 3] = [
            (&paths.catalog, &self.catalog),
            (&paths.report, self.report.as_bytes()),
            (&paths.manifest, self.manifest.as_bytes()),
        ];

        let mut staged: Vec<Staged<'_>> = Vec::with_capacity(outputs.len());
        for (path, contents) in outputs {
            if let Err(e) = stage(path, contents) {
                rollback(&staged);
                return Err(e.into());
            }
            staged.push(Staged {
                partial: suffixed(path, ".partial"),
                path,
                backup: None,
                committed: false,
            });
        }

        if let Err(e) = commit(&mut staged) {
            rollback(&staged);
            return Err(e.into());
        }
        for entry in &staged {
            if let Some(backup) = &entry.backup {
                remove_or_warn(backup);
            }
        }

        tracing::info!(
            catalog = %paths.catalog.display(),
            report = %paths.report.display(),
            manifest = %paths.manifest.display(),
            "artifacts written"
        );
        Ok(())
    }
}

/// One artifact on its way to its destination.
#[derive(Debug)]
struct Staged<'a> {
    partial: PathBuf,
    path: &'a Path,
    backup: Option<PathBuf>,
    committed: bool,
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn stage(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let partial = suffixed(path, ".partial");
    let written = std::fs::write(&partial, contents);
    if written.is_err() && partial.exists() {
        remove_or_warn(&partial);
    }
    written
}

fn commit(staged: &mut [Staged<'_>]) -> std::io::Result<()> {
    for entry in staged.iter_mut() {
        if entry.path.is_file() {
            let backup = suffixed(entry.path, ".previous");
            std::fs::rename(entry.path, &backup)?;
            entry.backup = Some(backup);
        }
        std::fs::rename(&entry.partial, entry.path)?;
        entry.committed = true;
    }
    Ok(())
}

fn rollback(staged: &[Staged<'_>]) {
    for entry in staged.iter().rev() {
        if entry.committed {
            remove_or_warn(entry.path);
        } else {
            remove_or_warn(&entry.partial);
        }
        if let Some(backup) = &entry.backup {
            if let Err(e) = std::fs::rename(backup, entry.path) {
                tracing::warn!(
                    path = %entry.path.display(),
                    error = %e,
                    "could not restore previous artifact"
                );
            }
        }
    }
}

fn remove_or_warn(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "could not remove staged artifact");
    }
}

/// Destination files of a run's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Merged catalog
    pub catalog: PathBuf,
    /// CSV report
    pub report: PathBuf,
    /// JSON manifest
    pub manifest: PathBuf,
}

impl ArtifactPaths {
    /// `<dir>/<stem>.<ext>`, `<dir>/<stem>_report.csv` and
    /// `<dir>/<stem>_clusters.json`.
    ///
    /// ```
    /// use unicat::{ArtifactPaths, Format};
    ///
    /// let paths = ArtifactPaths::in_dir("out", "union", Format::MarcXml);
    /// assert!(paths.catalog.ends_with("union.xml"));
    /// assert!(paths.report.ends_with("union_report.csv"));
    /// assert!(paths.manifest.ends_with("union_clusters.json"));
    /// ```
    pub fn in_dir(dir: impl AsRef<Path>, stem: &str, format: Format) -> Self {
        let dir = dir.as_ref();
        ArtifactPaths {
            catalog: dir.join(format!("{stem}.{}", format.extension())),
            report: dir.join(format!("{stem}_report.csv")),
            manifest: dir.join(format!("{stem}_clusters.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Stage;
    use crate::leader::Leader;
    use crate::record::{Field, Record};
    use crate::source::RecordId;

    fn fixture() -> (Vec<Cluster>, Vec<MergedRecord>, Vec<Warning>) {
        let mut record = Record::new(Leader::default());
        record.add_field(
            Field::builder("245".to_string(), '0', '0')
                .subfield_str('a', "Moby Dick")
                .build(),
        );

        let clusters = vec![Cluster {
            id: 1,
            members: vec![0, 1],
            match_kinds: [MatchKind::Strong].into_iter().collect(),
            strong_keys: vec!["isbn:9780142437247".to_string()],
        }];
        let merged = vec![MergedRecord {
            cluster_id: 1,
            primary: RecordId::new(0, 0),
            record,
            contributors: vec![
                Contributor {
                    source: "LIB2".to_string(),
                    record_id: "b7".to_string(),
                    position: 0,
                },
                Contributor {
                    source: "LIB1".to_string(),
                    record_id: "a1".to_string(),
                    position: 3,
                },
            ],
        }];
        let warnings = vec![Warning {
            stage: Stage::Load,
            source: Some("LIB3".to_string()),
            message: "record 2 skipped".to_string(),
        }];
        (clusters, merged, warnings)
    }

    #[test]
    fn test_report_rows() {
        let (clusters, merged, warnings) = fixture();
        let config = RunConfig::default();
        let summary = RunSummary::compute(&[], &[]);
        let view = RunView {
            clusters: &clusters,
            merged: &merged,
            config: &config,
            summary: &summary,
            warnings: &warnings,
        };

        let report = cluster_report(&view).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(
            lines[0],
            "kind,cluster_id,size,match_kinds,strong_keys,libraries,policy,message"
        );
        assert_eq!(
            lines[1],
            "cluster,1,2,strong,isbn:9780142437247,LIB1;LIB2,default,"
        );
        assert_eq!(
            lines[2],
            "warning,,,,,LIB3,default,[load] LIB3: record 2 skipped"
        );
    }

    #[test]
    fn test_manifest_shape() {
        let (clusters, merged, warnings) = fixture();
        let config = RunConfig::default();
        let summary = RunSummary::compute(&[], &[]);
        let view = RunView {
            clusters: &clusters,
            merged: &merged,
            config: &config,
            summary: &summary,
            warnings: &warnings,
        };

        let manifest: serde_json::Value =
            serde_json::from_str(&cluster_manifest(&view).unwrap()).unwrap();
        assert_eq!(manifest["policy"]["flags"], "default");
        assert_eq!(manifest["policy"]["prefer-fields"], false);
        let cluster = &manifest["clusters"][0];
        assert_eq!(cluster["cluster_id"], 1);
        assert_eq!(cluster["match_kinds"][0], "strong");
        assert_eq!(cluster["members"][1]["source"], "LIB1");
        assert_eq!(cluster["members"][1]["record_id"], "a1");
        assert_eq!(cluster["members"][1]["position"], 3);
        assert_eq!(manifest["warnings"][0]["stage"], "load");
    }

    #[test]
    fn test_misaligned_view_is_rejected() {
        let (clusters, _, warnings) = fixture();
        let config = RunConfig::default();
        let summary = RunSummary::compute(&[], &[]);
        let view = RunView {
            clusters: &clusters,
            merged: &[],
            config: &config,
            summary: &summary,
            warnings: &warnings,
        };
        assert!(matches!(
            cluster_report(&view),
            Err(MarcError::SerializationError(_))
        ));
    }

    #[test]
    fn test_catalog_formats() {
        let (_, merged, _) = fixture();
        let xml = write_catalog(&merged, Format::MarcXml).unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert!(xml.contains("<collection"));
        assert!(xml.contains("Moby Dick"));

        let iso = write_catalog(&merged, Format::Iso2709).unwrap();
        assert_eq!(iso.last(), Some(&0x1D));

        let empty = String::from_utf8(write_catalog(&[], Format::MarcXml).unwrap()).unwrap();
        assert!(empty.contains("</collection>"));
    }

    #[test]
    fn test_write_to_directory() {
        let (clusters, merged, warnings) = fixture();
        let config = RunConfig::default();
        let summary = RunSummary::compute(&[], &[]);
        let view = RunView {
            clusters: &clusters,
            merged: &merged,
            config: &config,
            summary: &summary,
            warnings: &warnings,
        };
        let artifacts = Artifacts::build(&view).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path().join("out"), "union", Format::MarcXml);
        artifacts.write_to(&paths).unwrap();

        assert_eq!(std::fs::read(&paths.catalog).unwrap(), artifacts.catalog);
        assert_eq!(std::fs::read_to_string(&paths.report).unwrap(), artifacts.report);
        assert!(paths.manifest.exists());
        assert!(!suffixed(&paths.manifest, ".partial").exists());
    }

    fn built_artifacts() -> Artifacts {
        let (clusters, merged, warnings) = fixture();
        let config = RunConfig::default();
        let summary = RunSummary::compute(&[], &[]);
        Artifacts::build(&RunView {
            clusters: &clusters,
            merged: &merged,
            config: &config,
            summary: &summary,
            warnings: &warnings,
        })
        .unwrap()
    }

    #[test]
    fn test_failed_move_leaves_no_artifacts() {
        let artifacts = built_artifacts();
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path(), "union", Format::MarcXml);
        // The manifest cannot replace a directory
        std::fs::create_dir(&paths.manifest).unwrap();

        assert!(artifacts.write_to(&paths).is_err());

        assert!(!paths.catalog.exists());
        assert!(!paths.report.exists());
        assert!(paths.manifest.is_dir());
        for path in [&paths.catalog, &paths.report, &paths.manifest] {
            assert!(!suffixed(path, ".partial").exists());
            assert!(!suffixed(path, ".previous").exists());
        }
    }

    #[test]
    fn test_failed_move_restores_previous_run() {
        let artifacts = built_artifacts();
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path(), "union", Format::MarcXml);
        std::fs::write(&paths.catalog, "old catalog").unwrap();
        std::fs::write(&paths.report, "old report").unwrap();
        std::fs::create_dir(&paths.manifest).unwrap();

        assert!(artifacts.write_to(&paths).is_err());

        assert_eq!(std::fs::read_to_string(&paths.catalog).unwrap(), "old catalog");
        assert_eq!(std::fs::read_to_string(&paths.report).unwrap(), "old report");
        assert!(!suffixed(&paths.catalog, ".previous").exists());
    }

    #[test]
    fn test_write_replaces_previous_run() {
        let artifacts = built_artifacts();
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path(), "union", Format::MarcXml);
        std::fs::write(&paths.report, "old report").unwrap();

        artifacts.write_to(&paths).unwrap();

        assert_eq!(std::fs::read_to_string(&paths.report).unwrap(), artifacts.report);
        assert!(!suffixed(&paths.report, ".previous").exists());
    }
}
