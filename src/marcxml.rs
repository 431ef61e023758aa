//! MARCXML serialization and deserialization of MARC records.
//!
//! This module converts between MARC records and MARCXML as defined by the
//! Library of Congress (<https://www.loc.gov/standards/marcxml/>). The merged
//! catalog is written as one `<collection>` in the
//! `http://www.loc.gov/MARC21/slim` namespace, with `tag`, `ind1`, `ind2` and
//! `code` as XML attributes.
//!
//! For deserialization, both default-namespace (`<record xmlns="...">`) and
//! prefix-namespace (`<marc:record xmlns:marc="...">`) forms are accepted, as
//! is a bare `<record>` document.
//!
//! # Examples
//!
//! ```
//! use unicat::{marcxml, Field, Leader, Record};
//!
//! let mut record = Record::new(Leader::default());
//! let mut field = Field::new("245".to_string(), '1', '0');
//! field.add_subfield('a', "Title".to_string());
//! record.add_field(field);
//!
//! let xml = marcxml::records_to_marcxml(std::slice::from_ref(&record))?;
//! let restored = marcxml::marcxml_to_records(&xml)?;
//! assert_eq!(restored[0].title(), Some("Title"));
//! # Ok::<(), unicat::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::formats::FormatWriter;
use crate::leader::Leader;
use crate::record::{Field, Record};
use lazy_static::lazy_static;
use quick_xml::de::from_str as xml_from_str;
use quick_xml::se::to_string as xml_to_string;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// The MARCXML namespace URI.
pub const MARCXML_NS: &str = "http://www.loc.gov/MARC21/slim";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

lazy_static! {
    static ref XMLNS_ATTR: Regex = Regex::new(r#"\s+xmlns(?::\w+)?="[^"]*""#).unwrap();
    static ref ELEMENT_PREFIX: Regex = Regex::new(r"<(/?)(\w+):").unwrap();
    static ref ROOT_ELEMENT: Regex = Regex::new(r"<(collection|record)[\s>/]").unwrap();
}

/// MARCXML record representation for serialization.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "record")]
pub struct MarcxmlRecord {
    /// MARC leader string
    #[serde(default)]
    pub leader: String,
    /// Control fields (tags 001-009)
    #[serde(default)]
    pub controlfield: Vec<MarcxmlControlField>,
    /// Data fields (tags 010+)
    #[serde(default)]
    pub datafield: Vec<MarcxmlDataField>,
}

/// MARCXML control field representation.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarcxmlControlField {
    /// Field tag as an XML attribute (e.g., "001", "008")
    #[serde(rename = "@tag")]
    pub tag: String,
    /// Control field value (text content)
    #[serde(default, rename = "$value")]
    pub value: String,
}

/// MARCXML data field representation.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarcxmlDataField {
    /// Field tag as an XML attribute (e.g., "245", "650")
    #[serde(rename = "@tag")]
    pub tag: String,
    /// First indicator as an XML attribute
    #[serde(default, rename = "@ind1")]
    pub ind1: String,
    /// Second indicator as an XML attribute
    #[serde(default, rename = "@ind2")]
    pub ind2: String,
    /// Subfields
    #[serde(default)]
    pub subfield: Vec<MarcxmlSubfield>,
}

/// MARCXML subfield representation.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarcxmlSubfield {
    /// Subfield code as an XML attribute (e.g., "a", "b", "c")
    #[serde(rename = "@code")]
    pub code: String,
    /// Subfield value (text content)
    #[serde(default, rename = "$value")]
    pub value: String,
}

/// MARCXML collection wrapper for multiple records.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "collection")]
pub struct MarcxmlCollection {
    /// Records in the collection
    #[serde(default, rename = "record")]
    pub records: Vec<MarcxmlRecord>,
}

/// Strip XML namespace prefixes and declarations from MARCXML input.
fn strip_marcxml_ns(xml: &str) -> String {
    let stripped = XMLNS_ATTR.replace_all(xml, "");
    ELEMENT_PREFIX.replace_all(&stripped, "<$1").to_string()
}

// ---------------------------------------------------------------------------
// Serialization: Record → MARCXML
// ---------------------------------------------------------------------------

fn record_to_xml_struct(record: &Record) -> Result<MarcxmlRecord> {
    let controlfield = record
        .control_fields_iter()
        .map(|(tag, value)| MarcxmlControlField {
            tag: tag.to_string(),
            value: value.to_string(),
        })
        .collect();

    let datafield = record
        .fields()
        .map(|field| MarcxmlDataField {
            tag: field.tag.clone(),
            ind1: field.indicator1.to_string(),
            ind2: field.indicator2.to_string(),
            subfield: field
                .subfields()
                .map(|sf| MarcxmlSubfield {
                    code: sf.code.to_string(),
                    value: sf.value.clone(),
                })
                .collect(),
        })
        .collect();

    Ok(MarcxmlRecord {
        leader: record.leader.to_marc_string()?,
        controlfield,
        datafield,
    })
}

fn record_element(record: &Record) -> Result<String> {
    xml_to_string(&record_to_xml_struct(record)?)
        .map_err(|e| MarcError::SerializationError(format!("Failed to serialize to MARCXML: {e}")))
}

/// Serialize records as one namespaced MARCXML `<collection>` document.
///
/// # Errors
///
/// Returns an error if any record cannot be serialized.
pub fn records_to_marcxml(records: &[Record]) -> Result<String> {
    let mut buffer = Vec::new();
    let mut writer = MarcxmlWriter::new(&mut buffer);
    for record in records {
        writer.write_record(record)?;
    }
    writer.finish()?;
    String::from_utf8(buffer)
        .map_err(|e| MarcError::SerializationError(format!("MARCXML is not UTF-8: {e}")))
}

/// Streaming MARCXML collection writer.
///
/// The collection header is written with the first record (or on
/// [`finish`](MarcxmlWriter::finish) for an empty collection) and the closing
/// tag on `finish`.
#[derive(Debug)]
pub struct MarcxmlWriter<W: Write> {
    writer: W,
    records_written: usize,
    started: bool,
    finished: bool,
}

impl<W: Write> MarcxmlWriter<W> {
    /// Create a new MARCXML collection writer.
    pub fn new(writer: W) -> Self {
        MarcxmlWriter {
            writer,
            records_written: 0,
            started: false,
            finished: false,
        }
    }

    fn start(&mut self) -> Result<()> {
        if !self.started {
            writeln!(self.writer, "{XML_DECLARATION}")?;
            writeln!(self.writer, "<collection xmlns=\"{MARCXML_NS}\">")?;
            self.started = true;
        }
        Ok(())
    }

    /// Write one `<record>` element.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer was finished, the record cannot be
    /// serialized, or writing fails.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MarcError::InvalidRecord(
                "Cannot write to a finished writer".to_string(),
            ));
        }
        let element = record_element(record)?;
        self.start()?;
        writeln!(self.writer, "{element}")?;
        self.records_written += 1;
        Ok(())
    }

    /// Close the collection and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.start()?;
        writeln!(self.writer, "</collection>")?;
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }
}

impl<W: Write + std::fmt::Debug> FormatWriter for MarcxmlWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        MarcxmlWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        MarcxmlWriter::finish(self)
    }

    fn records_written(&self) -> usize {
        self.records_written
    }
}

// ---------------------------------------------------------------------------
// Deserialization: MARCXML → Record
// ---------------------------------------------------------------------------

/// Parse a MARCXML document into per-record results.
///
/// The document may be a `<collection>` or a single `<record>`. A document
/// that is not well-formed MARCXML is an error for the whole document; a
/// record inside a valid document that cannot be converted (for instance an
/// empty subfield code) is an error for that record only.
///
/// # Errors
///
/// Returns [`MarcError::ParseError`] if the document cannot be deserialized.
pub fn parse_marcxml(xml: &str) -> Result<Vec<Result<Record>>> {
    let cleaned = strip_marcxml_ns(xml);
    let root = ROOT_ELEMENT
        .captures(&cleaned)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            MarcError::ParseError("No <collection> or <record> element found".to_string())
        })?;

    let xml_records = if root == "record" {
        let record: MarcxmlRecord = xml_from_str(&cleaned)
            .map_err(|e| MarcError::ParseError(format!("Failed to parse MARCXML: {e}")))?;
        vec![record]
    } else {
        let collection: MarcxmlCollection = xml_from_str(&cleaned).map_err(|e| {
            MarcError::ParseError(format!("Failed to parse MARCXML collection: {e}"))
        })?;
        collection.records
    };

    Ok(xml_records
        .into_iter()
        .map(marcxml_record_to_record)
        .collect())
}

/// Parse a MARCXML document into records, failing on the first bad record.
///
/// # Errors
///
/// Returns an error if the document or any record in it is malformed.
pub fn marcxml_to_records(xml: &str) -> Result<Vec<Record>> {
    parse_marcxml(xml)?.into_iter().collect()
}

fn marcxml_record_to_record(xml_record: MarcxmlRecord) -> Result<Record> {
    // Text content may lose trailing blanks; leaders are fixed width
    let leader_text = format!("{:<24}", xml_record.leader);
    let leader = Leader::from_bytes(leader_text.as_bytes())?;
    let mut record = Record::new(leader);

    for cf in xml_record.controlfield {
        record.add_control_field(cf.tag, cf.value);
    }

    for df in xml_record.datafield {
        let ind1 = df.ind1.chars().next().unwrap_or(' ');
        let ind2 = df.ind2.chars().next().unwrap_or(' ');

        let mut field = Field::new(df.tag, ind1, ind2);

        for sf in df.subfield {
            let code = sf
                .code
                .chars()
                .next()
                .ok_or_else(|| MarcError::InvalidField("Missing subfield code".to_string()))?;
            field.add_subfield(code, sf.value);
        }

        record.add_field(field);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(id: &str, title: &str) -> Record {
        let mut record = Record::new(Leader::default());
        record.add_control_field("001".to_string(), id.to_string());

        let mut field = Field::new("245".to_string(), '1', '0');
        field.add_subfield('a', title.to_string());
        field.add_subfield('c', "Author".to_string());
        record.add_field(field);
        record
    }

    #[test]
    fn test_collection_output_format() {
        let xml = records_to_marcxml(&[make_record("12345", "Test title")]).unwrap();

        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(&format!("<collection xmlns=\"{MARCXML_NS}\">")));
        assert!(xml.contains("<controlfield tag=\"001\">12345</controlfield>"));
        assert!(xml.contains("<datafield tag=\"245\" ind1=\"1\" ind2=\"0\">"));
        assert!(xml.contains("<subfield code=\"a\">Test title</subfield>"));
        assert!(xml.trim_end().ends_with("</collection>"));
    }

    #[test]
    fn test_collection_roundtrip() {
        let records = vec![make_record("a1", "First"), make_record("a2", "Second & more")];
        let xml = records_to_marcxml(&records).unwrap();
        let restored = marcxml_to_records(&xml).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].get_control_field("001"), Some("a1"));
        assert_eq!(restored[1].title(), Some("Second & more"));
        assert_eq!(restored[0].get_field("245"), records[0].get_field("245"));
    }

    #[test]
    fn test_empty_collection() {
        let xml = records_to_marcxml(&[]).unwrap();
        assert!(marcxml_to_records(&xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_single_record_document() {
        let xml = r#"<record xmlns="http://www.loc.gov/MARC21/slim">
            <leader>01234nam a2200289 a 4500</leader>
            <controlfield tag="001">99999</controlfield>
            <datafield tag="245" ind1="0" ind2="0">
                <subfield code="a">Namespaced title</subfield>
            </datafield>
        </record>"#;

        let records = marcxml_to_records(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_control_field("001"), Some("99999"));
        assert_eq!(records[0].title(), Some("Namespaced title"));
    }

    #[test]
    fn test_parse_collection_with_prefix() {
        let xml = r#"<marc:collection xmlns:marc="http://www.loc.gov/MARC21/slim">
            <marc:record>
                <marc:leader>01234nam a2200289 a 4500</marc:leader>
                <marc:controlfield tag="001">pfx1</marc:controlfield>
            </marc:record>
            <marc:record>
                <marc:leader>01234nam a2200289 a 4500</marc:leader>
                <marc:controlfield tag="001">pfx2</marc:controlfield>
            </marc:record>
        </marc:collection>"#;

        let records = marcxml_to_records(xml).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_control_field("001"), Some("pfx1"));
        assert_eq!(records[1].get_control_field("001"), Some("pfx2"));
    }

    #[test]
    fn test_bad_record_is_isolated() {
        let xml = r#"<collection>
            <record>
                <leader>01234nam a2200289 a 4500</leader>
                <controlfield tag="001">ok</controlfield>
            </record>
            <record>
                <leader>garbage</leader>
            </record>
        </collection>"#;

        let results = parse_marcxml(xml).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_malformed_document() {
        assert!(parse_marcxml("<collection><record>").is_err());
        assert!(parse_marcxml("<html></html>").is_err());
    }

    #[test]
    fn test_repeated_tags_and_subfields() {
        let mut record = make_record("r", "T");
        for i in 1..=3 {
            let mut field = Field::new("650".to_string(), ' ', '0');
            field.add_subfield('a', format!("Subject {i}"));
            field.add_subfield('x', "General subdivision".to_string());
            record.add_field(field);
        }

        let xml = records_to_marcxml(std::slice::from_ref(&record)).unwrap();
        let restored = marcxml_to_records(&xml).unwrap();

        let fields: Vec<_> = restored[0].fields_by_tag("650").collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[2].get_subfield('a'), Some("Subject 3"));
        assert_eq!(fields[2].get_subfield('x'), Some("General subdivision"));
    }

    #[test]
    fn test_interleaved_tags_keep_order() {
        let mut record = make_record("r", "T");
        for (tag, value) in [("650", "A"), ("700", "B"), ("650", "C")] {
            let mut field = Field::new(tag.to_string(), ' ', '0');
            field.add_subfield_str('a', value);
            record.add_field(field);
        }

        let xml = records_to_marcxml(std::slice::from_ref(&record)).unwrap();
        let restored = marcxml_to_records(&xml).unwrap();

        let order: Vec<(&str, Option<&str>)> = restored[0]
            .fields()
            .skip(1)
            .map(|f| (f.tag.as_str(), f.get_subfield('a')))
            .collect();
        assert_eq!(
            order,
            vec![("650", Some("A")), ("700", Some("B")), ("650", Some("C"))]
        );
    }

    #[test]
    fn test_writer_counts_records() {
        let mut buffer = Vec::new();
        let mut writer = MarcxmlWriter::new(&mut buffer);
        writer.write_record(&make_record("1", "One")).unwrap();
        writer.write_record(&make_record("2", "Two")).unwrap();
        writer.finish().unwrap();
        assert_eq!(FormatWriter::records_written(&writer), 2);
        assert!(writer.write_record(&make_record("3", "Three")).is_err());
    }
}
