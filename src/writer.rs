//! Writing MARC records to binary format.
//!
//! This module provides [`MarcWriter`] for serializing [`Record`] instances
//! to ISO 2709 binary format that can be written to any destination implementing
//! [`std::io::Write`], and [`encode_record`] for encoding one record in memory.
//!
//! # Examples
//!
//! ```
//! use unicat::{Field, Leader, MarcWriter, Record};
//!
//! let mut record = Record::new(Leader::default());
//! let mut field = Field::new("245".to_string(), '1', '0');
//! field.add_subfield('a', "Title".to_string());
//! record.add_field(field);
//!
//! let mut buffer = Vec::new();
//! let mut writer = MarcWriter::new(&mut buffer);
//! writer.write_record(&record)?;
//! writer.finish()?;
//! assert_eq!(buffer.last(), Some(&0x1D));
//! # Ok::<(), unicat::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::formats::FormatWriter;
use crate::record::{Field, Record};
use std::io::Write;

const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: u8 = 0x1F;
const RECORD_TERMINATOR: u8 = 0x1D;

const LEADER_LENGTH: usize = 24;
const DIRECTORY_ENTRY_LENGTH: usize = 12;

/// Largest encodable field, terminator included (4-digit directory length).
pub const MAX_FIELD_LENGTH: usize = 9_999;

/// Largest encodable record (5-digit leader length).
pub const MAX_RECORD_LENGTH: usize = 99_999;

/// Writer for ISO 2709 binary MARC format.
#[derive(Debug)]
pub struct MarcWriter<W: Write> {
    writer: W,
    records_written: usize,
    finished: bool,
}

impl<W: Write> MarcWriter<W> {
    /// Create a new MARC writer.
    pub fn new(writer: W) -> Self {
        MarcWriter {
            writer,
            records_written: 0,
            finished: false,
        }
    }

    /// Write a single MARC record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The writer was already finished
    /// - The record does not fit ISO 2709 length limits
    /// - An I/O error occurs during writing
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MarcError::InvalidRecord(
                "Cannot write to a finished writer".to_string(),
            ));
        }

        let bytes = encode_record(record)?;
        self.writer.write_all(&bytes)?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush the writer and mark it as finished.
    ///
    /// After calling `finish`, no more records can be written.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the underlying writer fails.
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Returns the number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }
}

impl<W: Write + std::fmt::Debug> FormatWriter for MarcWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        MarcWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        MarcWriter::finish(self)
    }

    fn records_written(&self) -> usize {
        self.records_written
    }
}

/// Encode one record as ISO 2709 bytes, recomputing the record length and
/// base address in the leader.
///
/// # Errors
///
/// Returns an error if a field is longer than 9999 bytes, or the record longer
/// than 99999 bytes.
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let mut data_area = Vec::new();
    let mut directory = Vec::new();

    for (tag, value) in record.control_fields_iter() {
        let mut field_data = value.as_bytes().to_vec();
        field_data.push(FIELD_TERMINATOR);
        push_directory_entry(&mut directory, tag, field_data.len(), data_area.len())?;
        data_area.extend_from_slice(&field_data);
    }

    for field in record.fields() {
        let mut field_data = Vec::new();
        field_data.push(field_byte(field.indicator1));
        field_data.push(field_byte(field.indicator2));

        for subfield in field.subfields() {
            field_data.push(SUBFIELD_DELIMITER);
            field_data.push(field_byte(subfield.code));
            field_data.extend_from_slice(subfield.value.as_bytes());
        }
        field_data.push(FIELD_TERMINATOR);

        push_directory_entry(&mut directory, &field.tag, field_data.len(), data_area.len())?;
        data_area.extend_from_slice(&field_data);
    }

    directory.push(FIELD_TERMINATOR);

    let base_address = 24 + directory.len();
    let record_length = base_address + data_area.len() + 1;

    let mut leader = record.leader.clone();
    leader.record_length = u32::try_from(record_length)
        .map_err(|_| MarcError::InvalidRecord("Record length exceeds limit".to_string()))?;
    leader.data_base_address = u32::try_from(base_address)
        .map_err(|_| MarcError::InvalidRecord("Base address exceeds limit".to_string()))?;

    let mut bytes = Vec::with_capacity(record_length);
    bytes.extend_from_slice(&leader.as_bytes()?);
    bytes.extend_from_slice(&directory);
    bytes.extend_from_slice(&data_area);
    bytes.push(RECORD_TERMINATOR);
    Ok(bytes)
}

fn push_directory_entry(
    directory: &mut Vec<u8>,
    tag: &str,
    length: usize,
    start: usize,
) -> Result<()> {
    if tag.len() != 3 {
        return Err(MarcError::InvalidField(format!(
            "Tag must be 3 characters: '{tag}'"
        )));
    }
    if length > MAX_FIELD_LENGTH {
        return Err(MarcError::InvalidField(format!(
            "Field {tag} is {length} bytes, over the {MAX_FIELD_LENGTH} byte limit"
        )));
    }
    if start > MAX_RECORD_LENGTH {
        return Err(MarcError::InvalidRecord(
            "Data area exceeds 99999 bytes".to_string(),
        ));
    }
    directory.extend_from_slice(tag.as_bytes());
    directory.extend_from_slice(format!("{length:04}").as_bytes());
    directory.extend_from_slice(format!("{start:05}").as_bytes());
    Ok(())
}

fn control_field_length(value: &str) -> usize {
    value.len() + 1
}

fn data_field_length(field: &Field) -> usize {
    2 + field
        .subfields()
        .map(|sf| 2 + sf.value.len())
        .sum::<usize>()
        + 1
}

/// Size in bytes of `record` once encoded with [`encode_record`].
#[must_use]
pub fn encoded_length(record: &Record) -> usize {
    let control: usize = record
        .control_fields_iter()
        .map(|(_, value)| DIRECTORY_ENTRY_LENGTH + control_field_length(value))
        .sum();
    let data: usize = record
        .fields()
        .map(|field| DIRECTORY_ENTRY_LENGTH + data_field_length(field))
        .sum();
    LEADER_LENGTH + control + data + 2
}

/// Remove fields until `record` fits the ISO 2709 length limits.
///
/// Fields longer than [`MAX_FIELD_LENGTH`] go first. While the record is still
/// over [`MAX_RECORD_LENGTH`], data fields tagged with one of `expendable` are
/// removed from the end, then any data field from the end.
///
/// Returns the tags of the removed fields in removal order; empty when the
/// record already fit.
pub fn fit_record(record: &mut Record, expendable: &[&str]) -> Vec<String> {
    let mut removed = Vec::new();

    record.control_fields.retain(|tag, value| {
        let fits = control_field_length(value) <= MAX_FIELD_LENGTH;
        if !fits {
            removed.push(tag.clone());
        }
        fits
    });
    record.fields.retain(|field| {
        let fits = data_field_length(field) <= MAX_FIELD_LENGTH;
        if !fits {
            removed.push(field.tag.clone());
        }
        fits
    });

    let mut length = encoded_length(record);
    while length > MAX_RECORD_LENGTH {
        let victim = record
            .fields
            .iter()
            .rposition(|f| expendable.contains(&f.tag.as_str()))
            .or_else(|| record.fields.len().checked_sub(1));
        let Some(index) = victim else {
            break;
        };
        let field = record.fields.remove(index);
        length -= DIRECTORY_ENTRY_LENGTH + data_field_length(&field);
        removed.push(field.tag);
    }

    removed
}

fn field_byte(c: char) -> u8 {
    if c.is_ascii() {
        c as u8
    } else {
        b' '
    }
}
