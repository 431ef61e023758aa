//! Standard number validation and canonical forms.
//!
//! Catalogs write the same ISBN in many ways (`0-306-40615-2`,
//! `9780306406157 (pbk.)`, `978 0 306...`). The helpers here reduce a raw
//! subfield value to one canonical string so that equal identifiers compare
//! equal as plain strings:
//!
//! - ISBN: 13 digits, ISBN-10 converted with a recomputed check digit
//! - ISSN: 8 characters, upper-case `X` check digit
//! - anything else (with `alt-tags`): lower-cased alphanumerics

/// ISBN (International Standard Book Number) validator and normalizer
#[derive(Debug)]
pub struct IsbnValidator;

impl IsbnValidator {
    /// Validate an ISBN-10 checksum
    ///
    /// ISBN-10 uses a weighted checksum where digits are multiplied by 10-1 and mod 11.
    /// The check digit can be 0-9 or 'X' (representing 10).
    ///
    /// # Examples
    ///
    /// ```
    /// use unicat::identifiers::IsbnValidator;
    ///
    /// assert!(IsbnValidator::validate_isbn10("0306406152"));
    /// assert!(!IsbnValidator::validate_isbn10("0306406153"));
    /// ```
    #[must_use]
    pub fn validate_isbn10(isbn: &str) -> bool {
        let clean = isbn.replace(['-', ' '], "");

        if clean.len() != 10 {
            return false;
        }

        let mut sum = 0;
        for (weight, (i, ch)) in (1..=10u32).rev().zip(clean.chars().enumerate()) {
            let digit = if i == 9 && (ch == 'X' || ch == 'x') {
                10
            } else if let Some(d) = ch.to_digit(10) {
                d
            } else {
                return false;
            };
            sum += digit * weight;
        }

        sum % 11 == 0
    }

    /// Validate an ISBN-13 checksum
    ///
    /// ISBN-13 uses a weighted checksum where odd positions are multiplied by 1
    /// and even positions by 3, summed mod 10.
    ///
    /// # Examples
    ///
    /// ```
    /// use unicat::identifiers::IsbnValidator;
    ///
    /// assert!(IsbnValidator::validate_isbn13("9780306406157"));
    /// assert!(!IsbnValidator::validate_isbn13("9780306406158"));
    /// ```
    #[must_use]
    pub fn validate_isbn13(isbn: &str) -> bool {
        let clean = isbn.replace(['-', ' '], "");

        if clean.len() != 13 {
            return false;
        }

        if !clean.starts_with("978") && !clean.starts_with("979") {
            return false;
        }

        let mut sum = 0;
        for (i, ch) in clean.chars().enumerate() {
            if let Some(digit) = ch.to_digit(10) {
                let weight = if i % 2 == 0 { 1 } else { 3 };
                sum += digit * weight;
            } else {
                return false;
            }
        }

        sum % 10 == 0
    }

    /// Convert the first nine digits of an ISBN-10 to its ISBN-13 form.
    ///
    /// The check digit is recomputed, so the ISBN-10 check digit is ignored.
    ///
    /// ```
    /// use unicat::identifiers::IsbnValidator;
    ///
    /// assert_eq!(
    ///     IsbnValidator::isbn10_to_isbn13("0306406152").as_deref(),
    ///     Some("9780306406157")
    /// );
    /// ```
    #[must_use]
    pub fn isbn10_to_isbn13(isbn10: &str) -> Option<String> {
        let body: String = isbn10.chars().take(9).collect();
        if body.len() != 9 || !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut isbn13 = format!("978{body}");
        let check = isbn13_check_digit(&isbn13)?;
        isbn13.push(check);
        Some(isbn13)
    }

    /// Canonical 13-digit form of a raw ISBN subfield value.
    ///
    /// Only the leading identifier part of the value is used, so qualifiers
    /// such as `(pbk.)` are ignored. Returns `None` when no 10- or 13-character
    /// ISBN can be read, or when `validate` is set and the check digit is
    /// wrong.
    ///
    /// ```
    /// use unicat::identifiers::IsbnValidator;
    ///
    /// assert_eq!(
    ///     IsbnValidator::canonical("0-306-40615-2 (pbk.)", true).as_deref(),
    ///     Some("9780306406157")
    /// );
    /// assert_eq!(IsbnValidator::canonical("0-306-40615-3", true), None);
    /// assert!(IsbnValidator::canonical("0-306-40615-3", false).is_some());
    /// ```
    #[must_use]
    pub fn canonical(raw: &str, validate: bool) -> Option<String> {
        let clean = leading_identifier(raw);
        match clean.len() {
            10 => {
                if validate && !Self::validate_isbn10(&clean) {
                    return None;
                }
                Self::isbn10_to_isbn13(&clean)
            },
            13 => {
                if !clean.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                if validate && !Self::validate_isbn13(&clean) {
                    return None;
                }
                Some(clean)
            },
            _ => None,
        }
    }
}

/// ISSN (International Standard Serial Number) validator and normalizer
#[derive(Debug)]
pub struct IssnValidator;

impl IssnValidator {
    /// Validate an 8-character ISSN checksum (weights 8-2, mod 11, `X` = 10).
    ///
    /// ```
    /// use unicat::identifiers::IssnValidator;
    ///
    /// assert!(IssnValidator::validate("0317-8471"));
    /// assert!(!IssnValidator::validate("0317-8472"));
    /// ```
    #[must_use]
    pub fn validate(issn: &str) -> bool {
        let clean = issn.replace(['-', ' '], "");
        if clean.len() != 8 {
            return false;
        }

        let mut sum = 0;
        for (weight, ch) in (2..=8u32).rev().zip(clean.chars()) {
            match ch.to_digit(10) {
                Some(d) => sum += d * weight,
                None => return false,
            }
        }

        let expected = (11 - sum % 11) % 11;
        match clean.chars().last() {
            Some('X' | 'x') => expected == 10,
            Some(ch) => ch.to_digit(10) == Some(expected),
            None => false,
        }
    }

    /// Canonical 8-character form of a raw ISSN subfield value.
    ///
    /// Seven-character values are left-padded with a zero, as some systems
    /// drop the leading digit.
    ///
    /// ```
    /// use unicat::identifiers::IssnValidator;
    ///
    /// assert_eq!(IssnValidator::canonical("0317-8471", true).as_deref(), Some("03178471"));
    /// assert_eq!(IssnValidator::canonical("317-8471", true).as_deref(), Some("03178471"));
    /// ```
    #[must_use]
    pub fn canonical(raw: &str, validate: bool) -> Option<String> {
        let mut clean = leading_identifier(raw);
        if clean.len() == 7 {
            clean.insert(0, '0');
        }
        if clean.len() != 8 || !clean[..7].bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if validate && !Self::validate(&clean) {
            return None;
        }
        Some(clean)
    }
}

/// Opaque identifier form: lower-cased ASCII alphanumerics, at least four.
///
/// ```
/// use unicat::identifiers::opaque_id;
///
/// assert_eq!(opaque_id("OCLC: 12-345").as_deref(), Some("oclc12345"));
/// assert_eq!(opaque_id("n/a"), None);
/// ```
#[must_use]
pub fn opaque_id(raw: &str) -> Option<String> {
    let clean: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (clean.len() >= 4).then_some(clean)
}

fn isbn13_check_digit(first12: &str) -> Option<char> {
    let mut sum = 0;
    for (i, ch) in first12.chars().enumerate() {
        let digit = ch.to_digit(10)?;
        sum += if i % 2 == 0 { digit } else { digit * 3 };
    }
    char::from_digit((10 - sum % 10) % 10, 10)
}

/// Digits and `X` from the identifier-like prefix of a value.
///
/// The prefix ends at the first character that cannot be part of a printed
/// standard number, which drops trailing qualifiers like `(pbk.)` or `:`.
fn leading_identifier(raw: &str) -> String {
    raw.trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, 'X' | 'x' | '-' | ' '))
        .filter(|c| c.is_ascii_digit() || matches!(c, 'X' | 'x'))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
