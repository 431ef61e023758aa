//! Labeled catalog sources and record loading.
//!
//! Each library contributes one [`SourceInput`]: a label plus raw bytes (or a
//! path to read them from). [`load`] turns the bytes into [`SourceRecord`]s,
//! sniffing ISO 2709 versus MARCXML from the content. Individual records that
//! fail to parse are skipped with a warning; only a source with no readable
//! record at all is an error.

use crate::boundary_scanner::RecordBoundaryScanner;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{MarcError, Result};
use crate::formats::Format;
use crate::marcxml::parse_marcxml;
use crate::rayon_parser_pool::parse_batch_parallel;
use crate::record::Record;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of one loaded record.
///
/// `source` is the index of the source in declaration order and `position`
/// the index of the record among the records successfully loaded from it.
/// The derived ordering is the priority order used by the merger: earlier
/// sources first, then earlier records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RecordId {
    /// Declared source index
    pub source: usize,
    /// Position within the source
    pub position: usize,
}

impl RecordId {
    /// Create a record id.
    #[must_use]
    pub fn new(source: usize, position: usize) -> Self {
        RecordId { source, position }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.position)
    }
}

/// One record together with its origin.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// Run-wide identity and priority
    pub id: RecordId,
    /// Label of the contributing source
    pub label: String,
    /// Identifier of the record in its own catalog (999 $c, 001, or `#n`)
    pub local_id: String,
    /// Parsed record, never modified after loading
    pub record: Record,
}

impl SourceRecord {
    /// Wrap a parsed record.
    #[must_use]
    pub fn new(id: RecordId, label: &str, record: Record) -> Self {
        let local_id = record
            .local_id()
            .map_or_else(|| format!("#{}", id.position + 1), str::to_string);
        SourceRecord {
            id,
            label: label.to_string(),
            local_id,
            record,
        }
    }
}

#[derive(Debug, Clone)]
enum SourceData {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A labeled catalog export.
#[derive(Debug, Clone)]
pub struct SourceInput {
    label: String,
    data: SourceData,
}

impl SourceInput {
    /// A source held in memory.
    pub fn from_bytes(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        SourceInput {
            label: label.into(),
            data: SourceData::Bytes(bytes.into()),
        }
    }

    /// A source read from disk when the run loads it.
    pub fn from_path(label: impl Into<String>, path: impl AsRef<Path>) -> Self {
        SourceInput {
            label: label.into(),
            data: SourceData::Path(path.as_ref().to_path_buf()),
        }
    }

    /// Source label, used for provenance and priority.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Raw bytes of the source.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::SourceUnreadable`] if the file cannot be read.
    pub fn read_bytes(&self) -> Result<std::borrow::Cow<'_, [u8]>> {
        match &self.data {
            SourceData::Bytes(bytes) => Ok(std::borrow::Cow::Borrowed(bytes)),
            SourceData::Path(path) => std::fs::read(path)
                .map(std::borrow::Cow::Owned)
                .map_err(|source| MarcError::SourceUnreadable {
                    label: self.label.clone(),
                    source,
                }),
        }
    }
}

/// Parse the records of one source.
///
/// Skipped records are reported to `diagnostics` with their ordinal in the
/// input. Records declaring MARC-8 coding (leader/09 blank) are decoded as
/// UTF-8 and counted in one warning.
///
/// # Errors
///
/// Returns [`MarcError::ParseError`] when the source is not valid MARCXML
/// (for XML input) or when none of its ISO 2709 records can be parsed.
pub fn load(
    source_index: usize,
    label: &str,
    bytes: &[u8],
    diagnostics: &mut Diagnostics,
) -> Result<Vec<SourceRecord>> {
    let format = Format::detect(bytes);
    let parsed = match format {
        Format::MarcXml => {
            let text = String::from_utf8_lossy(bytes);
            parse_marcxml(&text)?
        },
        Format::Iso2709 => {
            let mut scanner = RecordBoundaryScanner::new();
            parse_batch_parallel(scanner.scan(bytes), bytes)
        },
    };

    if parsed.is_empty() {
        diagnostics.source_warning(Stage::Load, label, "source contains no records");
        return Ok(Vec::new());
    }

    let total = parsed.len();
    let mut records = Vec::with_capacity(total);
    let mut marc8 = 0usize;
    for (ordinal, result) in parsed.into_iter().enumerate() {
        match result {
            Ok(record) => {
                if record.leader.character_coding == ' ' {
                    marc8 += 1;
                }
                let id = RecordId::new(source_index, records.len());
                records.push(SourceRecord::new(id, label, record));
            },
            Err(e) if e.is_record_level() => diagnostics.source_warning(
                Stage::Load,
                label,
                format!("record {} skipped: {e}", ordinal + 1),
            ),
            Err(e) => return Err(e),
        }
    }

    if records.is_empty() {
        return Err(MarcError::ParseError(format!(
            "none of the {total} records in source '{label}' could be parsed"
        )));
    }
    if marc8 > 0 {
        diagnostics.source_warning(
            Stage::Load,
            label,
            format!("{marc8} records declare MARC-8 coding; decoded as UTF-8"),
        );
    }

    tracing::debug!(
        source = label,
        %format,
        loaded = records.len(),
        skipped = total - records.len(),
        "source parsed"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::Leader;
    use crate::marcxml::records_to_marcxml;
    use crate::record::Field;
    use crate::writer::encode_record;

    fn record(id: &str, title: &str) -> Record {
        let mut record = Record::new(Leader::default());
        record.add_control_field_str("001", id);
        let mut field = Field::new("245".to_string(), '1', '0');
        field.add_subfield_str('a', title);
        record.add_field(field);
        record
    }

    #[test]
    fn test_load_iso2709() {
        let mut bytes = encode_record(&record("a1", "One")).unwrap();
        bytes.extend(encode_record(&record("a2", "Two")).unwrap());

        let mut diagnostics = Diagnostics::new();
        let records = load(1, "LIB", &bytes, &mut diagnostics).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, RecordId::new(1, 1));
        assert_eq!(records[1].local_id, "a2");
        assert_eq!(records[0].label, "LIB");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_corrupt_record_is_skipped() {
        let mut bytes = encode_record(&record("a1", "One")).unwrap();
        bytes.extend_from_slice(b"99999garbage\x1d");
        bytes.extend(encode_record(&record("a3", "Three")).unwrap());

        let mut diagnostics = Diagnostics::new();
        let records = load(0, "LIB", &bytes, &mut diagnostics).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].local_id, "a3");
        assert_eq!(records[1].id.position, 1);
        assert_eq!(diagnostics.warnings().len(), 1);
        assert!(diagnostics.warnings()[0].message.contains("record 2 skipped"));
    }

    #[test]
    fn test_truncated_tail_is_reported() {
        let mut bytes = encode_record(&record("a1", "One")).unwrap();
        let second = encode_record(&record("a2", "Two")).unwrap();
        bytes.extend_from_slice(&second[..second.len() / 2]);

        let mut diagnostics = Diagnostics::new();
        let records = load(0, "LIB", &bytes, &mut diagnostics).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_all_records_bad_is_parse_error() {
        let mut diagnostics = Diagnostics::new();
        let err = load(0, "LIB", b"junk\x1djunk\x1d", &mut diagnostics).unwrap_err();
        assert!(matches!(err, MarcError::ParseError(_)));
        assert_eq!(diagnostics.warnings().len(), 2);
    }

    #[test]
    fn test_load_marcxml() {
        let xml = records_to_marcxml(&[record("x1", "One"), record("x2", "Two")]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let records = load(0, "XML", xml.as_bytes(), &mut diagnostics).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record.title(), Some("One"));
    }

    #[test]
    fn test_malformed_marcxml_is_parse_error() {
        let mut diagnostics = Diagnostics::new();
        let err = load(0, "XML", b"<collection><record>", &mut diagnostics).unwrap_err();
        assert!(matches!(err, MarcError::ParseError(_)));
    }

    #[test]
    fn test_empty_source_warns() {
        let mut diagnostics = Diagnostics::new();
        let records = load(0, "EMPTY", b"", &mut diagnostics).unwrap();
        assert!(records.is_empty());
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_local_id_fallback() {
        let mut plain = Record::new(Leader::default());
        plain.add_field(Field::new("245".to_string(), '0', '0'));
        let wrapped = SourceRecord::new(RecordId::new(0, 4), "LIB", plain);
        assert_eq!(wrapped.local_id, "#5");
    }

    #[test]
    fn test_marc8_records_warned() {
        let mut old = record("m1", "Old");
        old.leader.character_coding = ' ';
        let bytes = encode_record(&old).unwrap();

        let mut diagnostics = Diagnostics::new();
        load(0, "LIB", &bytes, &mut diagnostics).unwrap();
        assert!(diagnostics.warnings()[0].message.contains("MARC-8"));
    }

    #[test]
    fn test_unreadable_path() {
        let input = SourceInput::from_path("GONE", "/nonexistent/catalog.mrc");
        let err = input.read_bytes().unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
