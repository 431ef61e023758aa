//! Record boundary detection using 0x1D delimiters.
//!
//! This module locates ISO 2709 record boundaries with the SIMD-accelerated
//! `memchr` crate so that each record can be parsed on its own. A record whose
//! directory is corrupt then costs only itself: the next span still starts at
//! the byte after the previous terminator.
//!
//! # Example
//!
//! ```
//! use unicat::boundary_scanner::RecordBoundaryScanner;
//!
//! let data = vec![1, 2, 3, 0x1D, 4, 5, 0x1D];
//! let mut scanner = RecordBoundaryScanner::new();
//! let spans = scanner.scan(&data);
//!
//! assert_eq!(spans, &[(0, 4), (4, 3)]);
//! ```

/// The byte value that terminates MARC records (ISO 2709).
const RECORD_TERMINATOR: u8 = 0x1D;

/// Record boundary scanner.
///
/// Spans are `(offset, length)` pairs; the length includes the terminator.
/// Bytes after the last terminator that are not whitespace form one final,
/// unterminated span, so a truncated tail is reported instead of dropped.
#[derive(Debug, Default)]
pub struct RecordBoundaryScanner {
    /// Reused across scans
    boundaries: Vec<(usize, usize)>,
}

impl RecordBoundaryScanner {
    /// Create a new boundary scanner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundaries: Vec::with_capacity(100),
        }
    }

    /// Scan a buffer for record spans.
    ///
    /// Spans consisting only of whitespace (line breaks some exporters put
    /// between records) are skipped, and leading whitespace is trimmed from
    /// each span.
    pub fn scan(&mut self, buffer: &[u8]) -> &[(usize, usize)] {
        self.boundaries.clear();
        let mut offset = 0;

        for terminator_pos in memchr::memchr_iter(RECORD_TERMINATOR, buffer) {
            self.push_span(buffer, offset, terminator_pos + 1);
            offset = terminator_pos + 1;
        }
        self.push_span(buffer, offset, buffer.len());

        &self.boundaries
    }

    /// Number of record spans found by the last scan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Whether the last scan found no record spans.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    fn push_span(&mut self, buffer: &[u8], start: usize, end: usize) {
        let content_start = buffer[start..end]
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map(|skip| start + skip);

        if let Some(content_start) = content_start {
            if buffer[content_start] != RECORD_TERMINATOR || content_start + 1 != end {
                self.boundaries.push((content_start, end - content_start));
            }
        }
    }
}
