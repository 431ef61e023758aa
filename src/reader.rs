//! Reading MARC records from ISO 2709 binary data.
//!
//! This module provides [`MarcReader`] for reading records one at a time from
//! any source that implements [`std::io::Read`], and [`parse_record`] for
//! parsing one already-delimited record, which is what the source loader uses
//! after splitting a buffer on record terminators.
//!
//! Field values are decoded as UTF-8; invalid sequences are replaced rather
//! than rejected, so a stray byte never costs the whole record.
//!
//! # Examples
//!
//! ```
//! use unicat::MarcReader;
//! use std::io::Cursor;
//!
//! let mut reader = MarcReader::new(Cursor::new(Vec::new()));
//! assert!(reader.read_record()?.is_none());
//! # Ok::<(), unicat::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::leader::Leader;
use crate::record::{is_control_tag, Field, Record};
use std::io::Read;

const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: u8 = 0x1F;

/// Reader for ISO 2709 binary MARC format.
///
/// `MarcReader` reads one MARC record at a time. Any framing problem is
/// returned as an error; since the stream position is then undefined, callers
/// that must survive corrupt records should split the input on record
/// terminators first (see [`crate::boundary_scanner`]) and use [`parse_record`].
#[derive(Debug)]
pub struct MarcReader<R: Read> {
    reader: R,
    records_read: usize,
}

impl<R: Read> MarcReader<R> {
    /// Create a new MARC reader.
    pub fn new(reader: R) -> Self {
        MarcReader {
            reader,
            records_read: 0,
        }
    }

    /// Read a single MARC record.
    ///
    /// Returns `Ok(Some(record))` if a record was successfully read, `Ok(None)` if EOF
    /// was reached, or `Err` if a parsing error occurred.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The binary data is malformed
    /// - The record is truncated
    /// - An I/O error occurs
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let mut leader_bytes = [0u8; 24];
        match self.reader.read_exact(&mut leader_bytes) {
            Ok(()) => {},
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(MarcError::IoError(e)),
        }

        let leader = Leader::from_bytes(&leader_bytes)?;
        leader.validate_for_reading()?;

        let mut record_data = vec![0u8; leader.record_length as usize - 24];
        match self.reader.read_exact(&mut record_data) {
            Ok(()) => {},
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(MarcError::TruncatedRecord(
                    "Unexpected end of file while reading record data".to_string(),
                ));
            },
            Err(e) => return Err(MarcError::IoError(e)),
        }

        let record = parse_body(leader, &record_data)?;
        self.records_read += 1;
        Ok(Some(record))
    }

    /// Returns the number of records read so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.records_read
    }
}

/// Parse one complete ISO 2709 record (leader through record terminator).
///
/// # Errors
///
/// Returns an error when the leader, directory or any data field is malformed,
/// or when the buffer is shorter than the length declared in the leader.
pub fn parse_record(bytes: &[u8]) -> Result<Record> {
    let leader = Leader::from_bytes(bytes)?;
    leader.validate_for_reading()?;

    let record_length = leader.record_length as usize;
    if bytes.len() < record_length {
        return Err(MarcError::TruncatedRecord(format!(
            "Leader declares {record_length} bytes, only {} available",
            bytes.len()
        )));
    }

    parse_body(leader, &bytes[24..record_length])
}

/// Parse directory and data area; `record_data` starts right after the leader.
fn parse_body(leader: Leader, record_data: &[u8]) -> Result<Record> {
    let base_address = leader.data_base_address as usize;
    let directory_size = base_address - 24;
    if directory_size > record_data.len() {
        return Err(MarcError::InvalidRecord(
            "Base address points past the end of the record".to_string(),
        ));
    }

    let directory = &record_data[..directory_size];
    let data = &record_data[directory_size..];

    let mut record = Record::new(leader);

    // Directory entries are 12 bytes: tag(3) + length(4) + start position(5)
    let mut pos = 0;
    while pos < directory.len() {
        if directory[pos] == FIELD_TERMINATOR {
            break;
        }

        if pos + 12 > directory.len() {
            return Err(MarcError::InvalidRecord(
                "Incomplete directory entry".to_string(),
            ));
        }

        let entry_chunk = &directory[pos..pos + 12];
        let tag = String::from_utf8_lossy(&entry_chunk[0..3]).to_string();
        let field_length = parse_ascii_number(&entry_chunk[3..7])?;
        let start_position = parse_ascii_number(&entry_chunk[7..12])?;
        pos += 12;

        let end_position = start_position + field_length;
        if end_position > data.len() {
            return Err(MarcError::InvalidRecord(format!(
                "Field {tag} exceeds data area"
            )));
        }

        let field_data = &data[start_position..end_position];
        if is_control_tag(&tag) {
            let value = field_data
                .strip_suffix(&[FIELD_TERMINATOR])
                .unwrap_or(field_data);
            record.add_control_field(tag, String::from_utf8_lossy(value).to_string());
        } else {
            let field = parse_data_field(field_data, &tag)
                .map_err(|e| MarcError::InvalidField(format!("Tag {tag}: {e}")))?;
            record.add_field(field);
        }
    }

    Ok(record)
}

/// Parse a data field from raw bytes
fn parse_data_field(data: &[u8], tag: &str) -> Result<Field> {
    if data.len() < 2 {
        return Err(MarcError::InvalidField(
            "Data field too short (needs indicators)".to_string(),
        ));
    }

    let mut field = Field::new(tag.to_string(), data[0] as char, data[1] as char);

    let subfield_data = &data[2..];
    let mut current_position = 0;

    while current_position < subfield_data.len() {
        if subfield_data[current_position] == FIELD_TERMINATOR {
            break;
        }

        if subfield_data[current_position] != SUBFIELD_DELIMITER {
            return Err(MarcError::InvalidField(
                "Expected subfield delimiter".to_string(),
            ));
        }

        current_position += 1;
        if current_position >= subfield_data.len() {
            break;
        }

        let code = subfield_data[current_position] as char;
        current_position += 1;

        let end = subfield_data[current_position..]
            .iter()
            .position(|&b| b == SUBFIELD_DELIMITER || b == FIELD_TERMINATOR)
            .map_or(subfield_data.len(), |offset| current_position + offset);

        let value = String::from_utf8_lossy(&subfield_data[current_position..end]).to_string();
        field.add_subfield(code, value);
        current_position = end;
    }

    Ok(field)
}

/// Parse a fixed-width ASCII number without string allocation
fn parse_ascii_number(bytes: &[u8]) -> Result<usize> {
    let mut result = 0usize;
    for &byte in bytes {
        if byte.is_ascii_digit() {
            result = result * 10 + (byte - b'0') as usize;
        } else {
            return Err(MarcError::InvalidRecord(format!(
                "Invalid numeric field: expected digits, got byte {}",
                byte as char
            )));
        }
    }
    Ok(result)
}
