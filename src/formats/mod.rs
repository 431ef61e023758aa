//! Serialization formats for MARC records.
//!
//! | Format | Reader | Writer |
//! |--------|--------|--------|
//! | ISO 2709 | [`crate::reader`] | [`crate::writer::MarcWriter`] |
//! | MARCXML (LOC slim) | [`crate::marcxml::parse_marcxml`] | [`crate::marcxml::MarcxmlWriter`] |
//!
//! Input format is sniffed from the bytes with [`Format::detect`]; the catalog
//! output format is a run option.

mod traits;

pub use traits::FormatWriter;

use crate::marcxml::MarcxmlWriter;
use crate::writer::MarcWriter;
use serde::{Deserialize, Serialize};
use std::io::Write;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Supported MARC serializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// MARCXML collection in the LOC slim namespace (`.xml`)
    #[default]
    MarcXml,
    /// ISO 2709 binary MARC format (`.mrc`, `.marc`)
    Iso2709,
}

impl Format {
    /// Guess the format of raw source bytes.
    ///
    /// Anything whose first non-whitespace byte (after an optional UTF-8 BOM)
    /// is `<` is MARCXML; everything else is treated as ISO 2709.
    ///
    /// # Example
    ///
    /// ```
    /// use unicat::formats::Format;
    ///
    /// assert_eq!(Format::detect(b"  <collection/>"), Format::MarcXml);
    /// assert_eq!(Format::detect(b"00714cam a2200205 a 4500"), Format::Iso2709);
    /// ```
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Self {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => Self::MarcXml,
            _ => Self::Iso2709,
        }
    }

    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mrc" | "marc" => Some(Self::Iso2709),
            "xml" | "marcxml" => Some(Self::MarcXml),
            _ => None,
        }
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Iso2709 => "mrc",
            Self::MarcXml => "xml",
        }
    }

    /// Get the human-readable name for this format.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Iso2709 => "ISO 2709",
            Self::MarcXml => "MARCXML",
        }
    }

    /// Create a writer for this format over `writer`.
    pub fn writer<'a, W: Write + std::fmt::Debug + 'a>(
        self,
        writer: W,
    ) -> Box<dyn FormatWriter + 'a> {
        match self {
            Self::Iso2709 => Box::new(MarcWriter::new(writer)),
            Self::MarcXml => Box::new(MarcxmlWriter::new(writer)),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
