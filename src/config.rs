//! Run configuration.
//!
//! A caller describes a run with [`RunOptions`], a flat set of named options
//! that can be built in code or read from TOML. [`RunOptions::validate`] turns
//! it into an immutable [`RunConfig`] or rejects it with
//! [`MarcError::ConfigError`] before any record is looked at.
//!
//! ```
//! use unicat::RunOptions;
//!
//! let config = RunOptions::from_toml_str("weak-threshold = 85\nprefer-fields = true")?
//!     .validate()?;
//! assert!(config.fuzzy_enabled());
//! assert_eq!(config.weak_threshold(), Some(85));
//!
//! let conflict = RunOptions::from_toml_str("strong-only = true\nweak-threshold = 85")?.validate();
//! assert!(conflict.is_err());
//! # Ok::<(), unicat::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::formats::Format;
use crate::record::is_control_tag;
use serde::{Deserialize, Serialize};

/// Threshold used by the `final-pipeline` bundle.
pub const FINAL_PIPELINE_THRESHOLD: u8 = 92;

const DEFAULT_PROVENANCE_TAG: &str = "035";
const DEFAULT_HOLDINGS_TAG: &str = "910";
const DEFAULT_MERGE_NOTE_TAG: &str = "948";

/// Option set as supplied by a caller.
///
/// Boolean options left unset take their default, or the `final-pipeline`
/// bundle value when that option is on. An explicit value always wins over
/// the bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct RunOptions {
    /// Fuzzy matching enabled (default on; only runs with a threshold)
    pub fuzzy: Option<bool>,
    /// Use strong identifier matches only
    pub strong_only: bool,
    /// Minimum fuzzy score (0-100, inclusive) for a match
    pub weak_threshold: Option<u32>,
    /// Take each tag from the highest-priority member instead of unioning
    pub prefer_fields: Option<bool>,
    /// Widen strong identifier sources to 024 and local identifier tags
    pub alt_tags: Option<bool>,
    /// Cheaper fuzzy scoring and no check-digit validation
    pub fast: Option<bool>,
    /// Keep local-use 9xx fields of member records
    pub keep9xx: Option<bool>,
    /// Production merge policy bundle
    pub final_pipeline: bool,
    /// Tag for per-member system control numbers (default 035)
    pub provenance_tag: Option<String>,
    /// Tag for per-member holdings fields (default 910)
    pub holdings_tag: Option<String>,
    /// Tag for the merge note (default 948)
    pub merge_note_tag: Option<String>,
    /// Serialization of the merged catalog (default MARCXML)
    pub catalog_format: Option<Format>,
}

impl RunOptions {
    /// Parse options from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::ConfigError`] on a syntax error, a wrongly typed
    /// value, or an unknown option name.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| MarcError::ConfigError(e.to_string()))
    }

    /// Check the option set and freeze it into a [`RunConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::ConfigError`] when:
    /// - `weak-threshold` is above 100
    /// - `strong-only` is combined with `weak-threshold` or `final-pipeline`
    /// - `fuzzy = false` is combined with `weak-threshold`
    /// - an output tag is malformed, a control tag, or reused
    pub fn validate(&self) -> Result<RunConfig> {
        if let Some(threshold) = self.weak_threshold {
            if threshold > 100 {
                return Err(MarcError::ConfigError(format!(
                    "weak-threshold must be between 0 and 100, got {threshold}"
                )));
            }
            if self.strong_only {
                return Err(MarcError::ConfigError(
                    "strong-only cannot be combined with weak-threshold".to_string(),
                ));
            }
            if self.fuzzy == Some(false) {
                return Err(MarcError::ConfigError(
                    "weak-threshold requires fuzzy matching, which is disabled".to_string(),
                ));
            }
        }
        if self.strong_only && self.final_pipeline {
            return Err(MarcError::ConfigError(
                "final-pipeline enables fuzzy matching and cannot be combined with strong-only"
                    .to_string(),
            ));
        }

        let bundle = self.final_pipeline;
        let weak_threshold = self
            .weak_threshold
            .and_then(|t| u8::try_from(t).ok())
            .or(bundle.then_some(FINAL_PIPELINE_THRESHOLD));

        let provenance_tag = output_tag(
            "provenance-tag",
            self.provenance_tag.as_deref(),
            DEFAULT_PROVENANCE_TAG,
        )?;
        let holdings_tag = output_tag(
            "holdings-tag",
            self.holdings_tag.as_deref(),
            DEFAULT_HOLDINGS_TAG,
        )?;
        let merge_note_tag = output_tag(
            "merge-note-tag",
            self.merge_note_tag.as_deref(),
            DEFAULT_MERGE_NOTE_TAG,
        )?;
        if provenance_tag == holdings_tag
            || provenance_tag == merge_note_tag
            || holdings_tag == merge_note_tag
        {
            return Err(MarcError::ConfigError(format!(
                "provenance, holdings and merge note tags must differ ({provenance_tag}, {holdings_tag}, {merge_note_tag})"
            )));
        }

        Ok(RunConfig {
            fuzzy: self.fuzzy.unwrap_or(true),
            strong_only: self.strong_only,
            weak_threshold,
            prefer_fields: self.prefer_fields.unwrap_or(bundle),
            alt_tags: self.alt_tags.unwrap_or(bundle),
            fast: self.fast.unwrap_or(false),
            keep9xx: self.keep9xx.unwrap_or(false),
            final_pipeline: bundle,
            provenance_tag,
            holdings_tag,
            merge_note_tag,
            catalog_format: self.catalog_format.unwrap_or_default(),
        })
    }
}

fn output_tag(option: &str, value: Option<&str>, default: &str) -> Result<String> {
    let tag = value.unwrap_or(default).trim();
    if tag.len() != 3 || !tag.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MarcError::ConfigError(format!(
            "{option} must be three digits, got '{tag}'"
        )));
    }
    if is_control_tag(tag) {
        return Err(MarcError::ConfigError(format!(
            "{option} must be a data field tag (010-999), got '{tag}'"
        )));
    }
    Ok(tag.to_string())
}

/// Validated, immutable configuration of one run.
///
/// Built by [`RunOptions::validate`] and passed by reference to every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    fuzzy: bool,
    strong_only: bool,
    weak_threshold: Option<u8>,
    prefer_fields: bool,
    alt_tags: bool,
    fast: bool,
    keep9xx: bool,
    final_pipeline: bool,
    provenance_tag: String,
    holdings_tag: String,
    merge_note_tag: String,
    catalog_format: Format,
}

impl Default for RunConfig {
    /// The configuration of an empty [`RunOptions`]: strong matching only.
    fn default() -> Self {
        RunConfig {
            fuzzy: true,
            strong_only: false,
            weak_threshold: None,
            prefer_fields: false,
            alt_tags: false,
            fast: false,
            keep9xx: false,
            final_pipeline: false,
            provenance_tag: DEFAULT_PROVENANCE_TAG.to_string(),
            holdings_tag: DEFAULT_HOLDINGS_TAG.to_string(),
            merge_note_tag: DEFAULT_MERGE_NOTE_TAG.to_string(),
            catalog_format: Format::default(),
        }
    }
}

impl RunConfig {
    /// Whether the fuzzy matcher runs: enabled, not strong-only, and a
    /// threshold is present.
    #[must_use]
    pub fn fuzzy_enabled(&self) -> bool {
        self.fuzzy && !self.strong_only && self.weak_threshold.is_some()
    }

    /// Inclusive fuzzy acceptance threshold.
    #[must_use]
    pub fn weak_threshold(&self) -> Option<u8> {
        self.weak_threshold
    }

    /// Strong matches only.
    #[must_use]
    pub fn strong_only(&self) -> bool {
        self.strong_only
    }

    /// Per-tag preference for the highest-priority member.
    #[must_use]
    pub fn prefer_fields(&self) -> bool {
        self.prefer_fields
    }

    /// Widened strong identifier sources.
    #[must_use]
    pub fn alt_tags(&self) -> bool {
        self.alt_tags
    }

    /// Approximate scoring, no check-digit validation.
    #[must_use]
    pub fn fast(&self) -> bool {
        self.fast
    }

    /// Keep member 9xx fields.
    #[must_use]
    pub fn keep9xx(&self) -> bool {
        self.keep9xx
    }

    /// Whether the `final-pipeline` bundle was requested.
    #[must_use]
    pub fn final_pipeline(&self) -> bool {
        self.final_pipeline
    }

    /// Tag of the per-member `(LABEL)id` control number field.
    #[must_use]
    pub fn provenance_tag(&self) -> &str {
        &self.provenance_tag
    }

    /// Tag of the per-member holdings field.
    #[must_use]
    pub fn holdings_tag(&self) -> &str {
        &self.holdings_tag
    }

    /// Tag of the merge note field.
    #[must_use]
    pub fn merge_note_tag(&self) -> &str {
        &self.merge_note_tag
    }

    /// Serialization of the merged catalog.
    #[must_use]
    pub fn catalog_format(&self) -> Format {
        self.catalog_format
    }

    /// Active policy flags as a `;`-joined list, as written to the report.
    ///
    /// ```
    /// use unicat::RunOptions;
    ///
    /// let config = RunOptions { final_pipeline: true, ..RunOptions::default() }.validate()?;
    /// assert_eq!(config.policy_flags(), "weak-threshold=92;prefer-fields;alt-tags;final-pipeline");
    /// # Ok::<(), unicat::MarcError>(())
    /// ```
    #[must_use]
    pub fn policy_flags(&self) -> String {
        let mut flags = Vec::new();
        if self.strong_only {
            flags.push("strong-only".to_string());
        }
        if !self.fuzzy {
            flags.push("no-fuzzy".to_string());
        }
        if let Some(threshold) = self.weak_threshold {
            flags.push(format!("weak-threshold={threshold}"));
        }
        for (on, name) in [
            (self.prefer_fields, "prefer-fields"),
            (self.alt_tags, "alt-tags"),
            (self.fast, "fast"),
            (self.keep9xx, "keep9xx"),
            (self.final_pipeline, "final-pipeline"),
        ] {
            if on {
                flags.push(name.to_string());
            }
        }
        if flags.is_empty() {
            "default".to_string()
        } else {
            flags.join(";")
        }
    }
}
