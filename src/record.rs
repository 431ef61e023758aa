//! MARC bibliographic record structures and operations.
//!
//! This module provides the core record types:
//! - [`Record`] - Main bibliographic record structure
//! - [`Field`] - Variable data fields (010+)
//! - [`Subfield`] - Named data elements within fields
//!
//! # Examples
//!
//! ```
//! use unicat::{Field, Leader, Record};
//!
//! let record = Record::builder(Leader::default())
//!     .control_field_str("001", "12345")
//!     .field(
//!         Field::builder("245".to_string(), '1', '0')
//!             .subfield_str('a', "The Great Gatsby")
//!             .build(),
//!     )
//!     .build();
//!
//! assert_eq!(record.title(), Some("The Great Gatsby"));
//! assert_eq!(record.local_id(), Some("12345"));
//! ```

use crate::leader::Leader;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A MARC bibliographic record
///
/// Control fields are keyed by tag. Data fields are kept in source order, so
/// interleaved tags (650, 700, 650) survive loading, merging and output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Record leader (24 bytes)
    pub leader: Leader,
    /// Control fields (000-009) - tag -> value, preserves insertion order
    pub control_fields: IndexMap<String, String>,
    /// Data fields (010+) in record order
    pub fields: Vec<Field>,
}

/// A data field in a MARC record (fields 010 and higher)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Field tag (3 digits)
    pub tag: String,
    /// First indicator
    pub indicator1: char,
    /// Second indicator
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields with 4 or fewer subfields)
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

/// Whether `tag` names a control field (001-009).
#[must_use]
pub fn is_control_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.starts_with("00") && tag.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `tag` is in the local-use block (900-999).
///
/// These tags carry source-system specific data (holdings, item barcodes,
/// local identifiers) with no meaning across catalogs.
#[must_use]
pub fn is_local_use_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.starts_with('9') && tag.bytes().all(|b| b.is_ascii_digit())
}

impl Record {
    /// Create a new MARC record with the given leader
    #[must_use]
    pub fn new(leader: Leader) -> Self {
        Record {
            leader,
            control_fields: IndexMap::new(),
            fields: Vec::new(),
        }
    }

    /// Create a builder for fluently constructing MARC records
    #[must_use]
    pub fn builder(leader: Leader) -> RecordBuilder {
        RecordBuilder {
            record: Record::new(leader),
        }
    }

    /// Add a control field (000-009)
    ///
    /// Control fields are single-valued; adding a tag twice keeps the last value.
    pub fn add_control_field(&mut self, tag: String, value: String) {
        self.control_fields.insert(tag, value);
    }

    /// Add a control field using string slices
    pub fn add_control_field_str(&mut self, tag: &str, value: &str) {
        self.add_control_field(tag.to_string(), value.to_string());
    }

    /// Get a control field value
    #[must_use]
    pub fn get_control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields
            .get(tag)
            .map(std::string::String::as_str)
    }

    /// Append a data field
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Get first field with a given tag
    #[must_use]
    pub fn get_field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Iterate over all data fields in record order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Iterate over fields matching a specific tag, in record order
    pub fn fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Field> {
        self.fields.iter().filter(move |f| f.tag == tag)
    }

    /// Iterate over all control fields as (tag, value) tuples.
    pub fn control_fields_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.control_fields
            .iter()
            .map(|(tag, value)| (tag.as_str(), value.as_str()))
    }

    /// Whether any control or data field with this tag is present.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.control_fields.contains_key(tag) || self.fields.iter().any(|f| f.tag == tag)
    }

    // ============================================================================
    // Helper methods for common bibliographic fields
    // ============================================================================

    /// Get the main title from field 245, subfield 'a'
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get_field("245").and_then(|f| f.get_subfield('a'))
    }

    /// Get the title proper and remainder of title (245 $a $b), space joined.
    #[must_use]
    pub fn full_title(&self) -> Option<String> {
        let field = self.get_field("245")?;
        let parts = field.get_subfields(&['a', 'b']);
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Get the primary author heading: 100, 110 or 111 subfield 'a', first found.
    #[must_use]
    pub fn main_entry(&self) -> Option<&str> {
        ["100", "110", "111"]
            .iter()
            .find_map(|tag| self.get_field(tag).and_then(|f| f.get_subfield('a')))
    }

    /// Get the publication year.
    ///
    /// Looks for the first four-digit run in 264 $c, then 260 $c, and falls
    /// back to positions 7-10 of field 008.
    #[must_use]
    pub fn publication_year(&self) -> Option<u16> {
        for tag in ["264", "260"] {
            for field in self.fields_by_tag(tag) {
                for date in field.subfields_by_code('c') {
                    if let Some(year) = first_four_digits(date) {
                        return Some(year);
                    }
                }
            }
        }

        self.get_control_field("008").and_then(|field_008| {
            let year = field_008.get(7..11)?;
            if year != "0000" && year.bytes().all(|b| b.is_ascii_digit()) {
                year.parse().ok()
            } else {
                None
            }
        })
    }

    /// Get the record's identifier within its source catalog.
    ///
    /// Uses 999 $c when present (the local system number exported by most
    /// integrated library systems), otherwise the 001 control number.
    #[must_use]
    pub fn local_id(&self) -> Option<&str> {
        self.get_field("999")
            .and_then(|f| f.get_subfield('c'))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .or_else(|| {
                self.get_control_field("001")
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
            })
    }
}

fn first_four_digits(value: &str) -> Option<u16> {
    let mut run = String::new();
    for ch in value.chars() {
        if ch.is_ascii_digit() {
            run.push(ch);
            if run.len() == 4 {
                return run.parse().ok();
            }
        } else {
            run.clear();
        }
    }
    None
}

/// Builder for fluently constructing MARC records
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Add a control field to the record being built
    #[must_use]
    pub fn control_field(mut self, tag: String, value: String) -> Self {
        self.record.add_control_field(tag, value);
        self
    }

    /// Add a control field using string slices
    #[must_use]
    pub fn control_field_str(mut self, tag: &str, value: &str) -> Self {
        self.record.add_control_field_str(tag, value);
        self
    }

    /// Add a data field to the record being built
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.record.add_field(field);
        self
    }

    /// Build the record
    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}

impl Field {
    /// Create a new data field
    #[must_use]
    pub fn new(tag: String, indicator1: char, indicator2: char) -> Self {
        Field {
            tag,
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Create a builder for constructing fields fluently
    ///
    /// # Examples
    ///
    /// ```
    /// use unicat::Field;
    ///
    /// let field = Field::builder("245".to_string(), '1', '0')
    ///     .subfield('a', "The Great Gatsby".to_string())
    ///     .subfield('c', "F. Scott Fitzgerald".to_string())
    ///     .build();
    /// assert_eq!(field.get_subfield('c'), Some("F. Scott Fitzgerald"));
    /// ```
    #[must_use]
    pub fn builder(tag: String, indicator1: char, indicator2: char) -> FieldBuilder {
        FieldBuilder {
            field: Field::new(tag, indicator1, indicator2),
        }
    }

    /// Add a subfield
    pub fn add_subfield(&mut self, code: char, value: String) {
        self.subfields.push(Subfield { code, value });
    }

    /// Add a subfield using a string slice
    pub fn add_subfield_str(&mut self, code: char, value: &str) {
        self.add_subfield(code, value.to_string());
    }

    /// Get first value for a subfield code
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Iterate over all subfields
    pub fn subfields(&self) -> impl Iterator<Item = &Subfield> {
        self.subfields.iter()
    }

    /// Iterate over subfields with a specific code
    pub fn subfields_by_code(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Get values for several subfield codes, in field order.
    #[must_use]
    pub fn get_subfields(&self, codes: &[char]) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|sf| codes.contains(&sf.code))
            .map(|sf| sf.value.as_str())
            .collect()
    }
}

/// Builder for fluently constructing data fields
#[derive(Debug)]
pub struct FieldBuilder {
    field: Field,
}

impl FieldBuilder {
    /// Add a subfield to the field being built
    #[must_use]
    pub fn subfield(mut self, code: char, value: String) -> Self {
        self.field.add_subfield(code, value);
        self
    }

    /// Add a subfield using a string slice
    #[must_use]
    pub fn subfield_str(mut self, code: char, value: &str) -> Self {
        self.field.add_subfield_str(code, value);
        self
    }

    /// Build the field
    #[must_use]
    pub fn build(self) -> Field {
        self.field
    }
}
