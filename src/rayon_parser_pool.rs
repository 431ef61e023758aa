//! Parallel MARC record parsing using Rayon.
//!
//! [`parse_batch_parallel`] parses a list of record spans (see
//! [`crate::boundary_scanner`]) on Rayon's work-stealing pool. Unlike a
//! streaming reader, every span yields its own result, so the caller can skip a
//! corrupt record and keep the rest of the source.
//!
//! # Examples
//!
//! ```
//! use unicat::boundary_scanner::RecordBoundaryScanner;
//! use unicat::rayon_parser_pool::parse_batch_parallel;
//!
//! let buffer = b"not a record\x1d".to_vec();
//! let mut scanner = RecordBoundaryScanner::new();
//! let results = parse_batch_parallel(scanner.scan(&buffer), &buffer);
//!
//! assert_eq!(results.len(), 1);
//! assert!(results[0].is_err());
//! ```

use crate::error::{MarcError, Result};
use crate::reader::parse_record;
use crate::record::Record;
use rayon::prelude::*;

/// Parse record spans in parallel.
///
/// Results come back in span order, one per span. A span that lies outside the
/// buffer yields an [`MarcError::InvalidRecord`] for that span only.
#[must_use]
pub fn parse_batch_parallel(
    record_boundaries: &[(usize, usize)],
    buffer: &[u8],
) -> Vec<Result<Record>> {
    record_boundaries
        .par_iter()
        .map(|&(offset, length)| {
            let record_bytes = offset
                .checked_add(length)
                .and_then(|end| buffer.get(offset..end))
                .ok_or_else(|| {
                    MarcError::InvalidRecord(format!(
                        "Record boundary ({offset}, {length}) exceeds buffer size {}",
                        buffer.len()
                    ))
                })?;

            parse_record(record_bytes)
        })
        .collect()
}
