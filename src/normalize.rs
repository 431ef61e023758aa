//! Comparable keys derived from records.
//!
//! For every loaded record the normalizer computes, once per run:
//!
//! - a sorted set of **strong keys**: canonical standard numbers
//!   (`isbn:<13>`, `issn:<8>`) and, with `alt-tags`, other identifiers
//!   (`id:<alnum>`);
//! - an optional **fuzzy signature**: normalized title tokens, primary author
//!   and publication year. Records without a title get none and never take
//!   part in fuzzy matching.
//!
//! Normalization is pure: the same record and configuration always produce
//! the same keys.

use crate::config::RunConfig;
use crate::identifiers::{opaque_id, IsbnValidator, IssnValidator};
use crate::record::Record;
use crate::source::SourceRecord;
use lazy_static::lazy_static;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Tags whose `$a` is read for identifiers when `alt-tags` is on.
pub const ALT_IDENTIFIER_TAGS: &[&str] = &["024", "991", "992", "998"];

lazy_static! {
    /// Articles and short function words dropped from title tokens.
    ///
    /// Covers the languages found in Iberian and Western European catalogs:
    /// English, Spanish, Catalan, French, German and Italian.
    static ref STOPWORDS: HashSet<&'static str> = [
        // English
        "a", "an", "the", "of", "and", "in", "on", "to", "for", "by", "with", "at", "from",
        // Spanish / Catalan
        "el", "la", "los", "las", "lo", "un", "una", "unos", "unas", "de", "del", "y", "e",
        "en", "por", "para", "con", "al", "els", "les", "i", "amb",
        // French
        "le", "l", "d", "une", "des", "du", "et", "au", "aux",
        // German
        "der", "die", "das", "dem", "den", "ein", "eine", "und", "von", "zu", "im",
        // Italian
        "il", "gli", "uno", "di", "della", "dei", "degli",
    ]
    .into_iter()
    .collect();
}

/// Text features used by the fuzzy matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuzzySignature {
    /// Normalized title in original word order, articles included
    pub title: String,
    /// Title tokens with stopwords removed, in original order
    pub tokens: Vec<String>,
    /// `tokens` sorted and space-joined, for order-insensitive comparison
    pub sorted_title: String,
    /// Normalized primary author, if the record has one
    pub author: Option<String>,
    /// Publication year, if one can be read
    pub year: Option<u16>,
}

impl FuzzySignature {
    /// Derive the signature of a record; `None` without a usable title.
    #[must_use]
    pub fn from_record(record: &Record) -> Option<Self> {
        let title = normalize_text(&record.full_title()?);
        if title.is_empty() {
            return None;
        }

        let mut tokens: Vec<String> = title
            .split(' ')
            .filter(|t| !STOPWORDS.contains(t))
            .map(str::to_string)
            .collect();
        if tokens.is_empty() {
            // A title made only of stopwords is still a title
            tokens = title.split(' ').map(str::to_string).collect();
        }

        let mut sorted = tokens.clone();
        sorted.sort();

        let author = record
            .main_entry()
            .map(normalize_text)
            .filter(|a| !a.is_empty());

        Some(FuzzySignature {
            title,
            sorted_title: sorted.join(" "),
            tokens,
            author,
            year: record.publication_year(),
        })
    }

    /// First stopword-free title token.
    #[must_use]
    pub fn first_token(&self) -> &str {
        self.tokens.first().map_or("", String::as_str)
    }

    /// Alphabetically first title token.
    #[must_use]
    pub fn min_token(&self) -> &str {
        self.sorted_title.split(' ').next().unwrap_or("")
    }

    /// First token of the author heading (usually the surname).
    #[must_use]
    pub fn author_token(&self) -> Option<&str> {
        self.author.as_deref().and_then(|a| a.split(' ').next())
    }
}

/// All keys derived from one record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NormalizedKeys {
    /// Canonical identifiers, sorted and de-duplicated
    pub strong: Vec<String>,
    /// Text signature for fuzzy matching
    pub fuzzy: Option<FuzzySignature>,
}

impl NormalizedKeys {
    /// Derive the keys of one record.
    #[must_use]
    pub fn from_record(record: &Record, config: &RunConfig) -> Self {
        NormalizedKeys {
            strong: strong_keys(record, config),
            fuzzy: FuzzySignature::from_record(record),
        }
    }
}

/// Normalize every record in parallel; the result is index-aligned with
/// `records`.
#[must_use]
pub fn normalize_all(records: &[SourceRecord], config: &RunConfig) -> Vec<NormalizedKeys> {
    records
        .par_iter()
        .map(|sr| NormalizedKeys::from_record(&sr.record, config))
        .collect()
}

/// Lowercase, strip diacritics, turn punctuation into spaces and collapse
/// whitespace.
///
/// ```
/// use unicat::normalize::normalize_text;
///
/// assert_eq!(normalize_text("  Cien años de soledad / "), "cien anos de soledad");
/// assert_eq!(normalize_text("Great Gatsby, The"), "great gatsby the");
/// ```
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_space && !result.is_empty() {
                result.push(' ');
            }
            pending_space = false;
            result.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }

    result
}

/// Canonical strong keys of a record, sorted and de-duplicated.
///
/// Reads `020 $a $z` (ISBN) and `022 $a $y $z` (ISSN); with `alt-tags` also
/// the `$a` of [`ALT_IDENTIFIER_TAGS`]. Check digits are validated unless the
/// run is in fast mode.
#[must_use]
pub fn strong_keys(record: &Record, config: &RunConfig) -> Vec<String> {
    let validate = !config.fast();
    let mut keys = Vec::new();

    for field in record.fields_by_tag("020") {
        for value in field.get_subfields(&['a', 'z']) {
            if let Some(isbn) = IsbnValidator::canonical(value, validate) {
                keys.push(format!("isbn:{isbn}"));
            }
        }
    }

    for field in record.fields_by_tag("022") {
        for value in field.get_subfields(&['a', 'y', 'z']) {
            if let Some(issn) = IssnValidator::canonical(value, validate) {
                keys.push(format!("issn:{}", issn.to_lowercase()));
            }
        }
    }

    if config.alt_tags() {
        for tag in ALT_IDENTIFIER_TAGS {
            for field in record.fields_by_tag(tag) {
                for value in field.subfields_by_code('a') {
                    if let Some(key) = alternate_key(value, validate) {
                        keys.push(key);
                    }
                }
            }
        }
    }

    keys.sort();
    keys.dedup();
    keys
}

fn alternate_key(value: &str, validate: bool) -> Option<String> {
    if let Some(isbn) = IsbnValidator::canonical(value, validate) {
        return Some(format!("isbn:{isbn}"));
    }
    if let Some(issn) = IssnValidator::canonical(value, validate) {
        return Some(format!("issn:{}", issn.to_lowercase()));
    }
    opaque_id(value).map(|id| format!("id:{id}"))
}
