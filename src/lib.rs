#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Unicat: union catalogs from MARC exports
//!
//! Merges bibliographic records exported by independent library systems into
//! one deduplicated catalog. Records describing the same item are linked by
//! shared standard numbers (strong matching) and, optionally, by title,
//! author and year similarity (fuzzy matching); linked records are grouped
//! transitively and each group is synthesized into one union record.
//!
//! ## Quick Start
//!
//! ```no_run
//! use unicat::{ArtifactPaths, Pipeline, RunOptions, SourceInput};
//!
//! # fn main() -> unicat::Result<()> {
//! let options = RunOptions::from_toml_str(
//!     r#"
//!     weak-threshold = 90
//!     prefer-fields = true
//!     "#,
//! )?;
//! let pipeline = Pipeline::from_options(&options)?;
//!
//! let output = pipeline.run(&[
//!     SourceInput::from_path("LIB1", "lib1.mrc"),
//!     SourceInput::from_path("LIB2", "lib2.xml"),
//! ])?;
//!
//! let artifacts = output.artifacts()?;
//! artifacts.write_to(&ArtifactPaths::in_dir(
//!     "out",
//!     "union",
//!     pipeline.config().catalog_format(),
//! ))?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading and Writing Records
//!
//! ```
//! use unicat::{Field, Leader, MarcReader, MarcWriter, Record};
//!
//! # fn main() -> unicat::Result<()> {
//! let mut record = Record::new(Leader::default());
//! record.add_control_field("001".to_string(), "12345".to_string());
//!
//! let mut field = Field::new("245".to_string(), '1', '0');
//! field.add_subfield('a', "Test Title".to_string());
//! record.add_field(field);
//!
//! let mut buffer = Vec::new();
//! {
//!     let mut writer = MarcWriter::new(&mut buffer);
//!     writer.write_record(&record)?;
//! }
//!
//! let mut reader = MarcReader::new(buffer.as_slice());
//! let read_back = reader.read_record()?.expect("one record");
//! assert_eq!(read_back.title(), Some("Test Title"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`record`] - Core MARC record structures (`Record`, `Field`, `Subfield`)
//! - [`leader`] - MARC record leader (24-byte header)
//! - [`reader`] / [`writer`] - ISO 2709 reading and writing
//! - [`marcxml`] - MARCXML reading and writing
//! - [`formats`] - Catalog format detection and the [`FormatWriter`] trait
//! - [`boundary_scanner`] / [`rayon_parser_pool`] - parallel ISO 2709 loading
//! - [`source`] - Labeled sources and loaded records
//! - [`identifiers`] - ISBN/ISSN validation and canonical forms
//! - [`normalize`] - Strong keys and fuzzy signatures
//! - [`matching`] - Strong and fuzzy matchers
//! - [`cluster`] - Disjoint-set clustering
//! - [`merge`] - Union record synthesis
//! - [`stats`] - Run summary
//! - [`report`] - Catalog, report and manifest artifacts
//! - [`pipeline`] - End-to-end run
//! - [`config`] - Run options and validated configuration
//! - [`diagnostics`] - Non-fatal run warnings
//! - [`error`] - Error types and result type
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]: phase timings and counts at `info`,
//! skipped records and sources at `warn`, stage details at `debug`. No
//! subscriber is installed; binaries choose their own.

pub mod boundary_scanner;
pub mod cluster;
pub mod config;
pub mod diagnostics;
pub mod error;
/// Catalog serializations with a shared writer trait.
///
/// See the [`formats`] module documentation for format detection rules.
pub mod formats;
pub mod identifiers;
pub mod leader;
pub mod marcxml;
pub mod matching;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod rayon_parser_pool;
pub mod reader;
/// Core MARC record structures (`Record`, `Field`, `Subfield`)
pub mod record;
pub mod report;
pub mod source;
pub mod stats;
pub mod writer;

pub use cluster::{Cluster, DisjointSet};
pub use config::{RunConfig, RunOptions};
pub use diagnostics::{Diagnostics, Stage, Warning};
pub use error::{MarcError, Result};
pub use formats::{Format, FormatWriter};
pub use identifiers::{IsbnValidator, IssnValidator};
pub use leader::Leader;
pub use marcxml::MarcxmlWriter;
pub use matching::{MatchEdge, MatchKind};
pub use merge::{Contributor, MergedRecord};
pub use normalize::{FuzzySignature, NormalizedKeys};
pub use pipeline::{Pipeline, RunOutput};
pub use reader::MarcReader;
pub use record::{Field, FieldBuilder, Record, RecordBuilder, Subfield};
pub use report::{ArtifactPaths, Artifacts, RunView};
pub use source::{RecordId, SourceInput, SourceRecord};
pub use stats::{RiskLevel, RunSummary};
pub use writer::MarcWriter;
