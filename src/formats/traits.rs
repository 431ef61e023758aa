//! Format writer trait for MARC records.
//!
//! Both catalog serializations implement [`FormatWriter`], so the export step
//! can stream merged records without knowing which one the run selected.
//!
//! # Example
//!
//! ```
//! use unicat::formats::FormatWriter;
//! use unicat::{Leader, MarcWriter, Record};
//!
//! fn write_all<W: FormatWriter>(writer: &mut W, records: &[Record]) -> unicat::Result<usize> {
//!     writer.write_batch(records)?;
//!     writer.finish()?;
//!     Ok(writer.records_written())
//! }
//!
//! let mut buffer = Vec::new();
//! let written = write_all(&mut MarcWriter::new(&mut buffer), &[Record::new(Leader::default())])?;
//! assert_eq!(written, 1);
//! # Ok::<(), unicat::MarcError>(())
//! ```

use crate::error::Result;
use crate::record::Record;

/// Trait for writers that can serialize MARC records to a format.
///
/// Writers follow a standard pattern:
/// 1. Create the writer over any [`std::io::Write`] destination
/// 2. Write records using [`write_record`](Self::write_record) or [`write_batch`](Self::write_batch)
/// 3. Call [`finish`](Self::finish) to flush and close the output
///
/// Dropping a writer without calling `finish` may leave an incomplete document.
pub trait FormatWriter: std::fmt::Debug {
    /// Write a single record to the output.
    ///
    /// Field order, subfield order, indicators and values are written exactly
    /// as held by the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or if writing to
    /// the underlying output fails.
    fn write_record(&mut self, record: &Record) -> Result<()>;

    /// Write multiple records to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if any record cannot be written.
    fn write_batch(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Finish writing and flush any buffered data.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn finish(&mut self) -> Result<()>;

    /// Returns the number of records written so far.
    fn records_written(&self) -> usize;
}
