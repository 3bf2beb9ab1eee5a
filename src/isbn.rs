//! ISBN canonicalization for instance generation.
//!
//! Field 020$a values mix ISBN-10, ISBN-13, and hyphenated forms of the
//! same manifestation, often with a trailing free-text annotation like
//! `(pbk.)`. Canonicalizing each value to its 12-digit EAN prefix (the
//! ISBN-13 minus its check digit) lets the transducer fold forms that
//! differ only by hyphens, check digit, or 10-vs-13 presentation into one
//! Instance per actual manifestation.

use log::debug;

/// A 020$a value split into its digit string and trailing annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIsbn {
    /// The digits (and possible final `X`) of the ISBN proper.
    pub digits: String,
    /// Trailing free text, e.g. `(pbk.)`; empty when absent.
    pub annotation: String,
}

/// Splits a raw 020$a value into ISBN digits and trailing annotation.
///
/// Hyphens and spaces within the number are dropped; everything after the
/// last ISBN character is kept verbatim (trimmed) as the annotation.
#[must_use]
pub fn split_isbn(raw: &str) -> RawIsbn {
    let trimmed = raw.trim();
    let is_isbn_char = |c: char| c.is_ascii_digit() || c == 'X' || c == 'x' || c == '-' || c == ' ';
    let rest_start = trimmed
        .char_indices()
        .find(|&(_, c)| !is_isbn_char(c))
        .map_or(trimmed.len(), |(i, _)| i);
    let digits = trimmed[..rest_start]
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    RawIsbn {
        digits,
        annotation: trimmed[rest_start..].trim().to_string(),
    }
}

/// Canonicalizes an ISBN digit string to its 12-digit EAN prefix form.
///
/// - 9 digits (pre-1970 SBN): prepend `978`
/// - 10 digits (ISBN-10): prepend `978`, drop the trailing check digit
///   (which may be `X`)
/// - 12 digits: already canonical
/// - 13 digits (ISBN-13/EAN): drop the trailing check digit
/// - anything else, or non-digit content outside an ISBN-10 check
///   position: rejected with a debug log
#[must_use]
pub fn canonicalize_isbn(digits: &str) -> Option<String> {
    let numeric = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let canonical = match digits.len() {
        9 if numeric(digits) => Some(format!("978{digits}")),
        10 if numeric(&digits[..9]) => Some(format!("978{}", &digits[..9])),
        12 if numeric(digits) => Some(digits.to_string()),
        13 if numeric(digits) => Some(digits[..12].to_string()),
        _ => None,
    };
    if canonical.is_none() {
        debug!("rejecting malformed ISBN value {digits:?}");
    }
    canonical
}

/// Groups raw 020$a values by canonical form.
///
/// Returns `(canonical_isbn, first_seen_annotation)` pairs sorted by
/// canonical value ascending, one per distinct manifestation. Duplicate
/// canonical forms keep the annotation of the first value that produced
/// them; unparseable values are dropped.
#[must_use]
pub fn isbn_instance_groups(raw_values: &[&str]) -> Vec<(String, String)> {
    let mut groups: Vec<(String, String)> = Vec::new();
    for raw in raw_values {
        let split = split_isbn(raw);
        let Some(canonical) = canonicalize_isbn(&split.digits) else {
            continue;
        };
        if !groups.iter().any(|(c, _)| c == &canonical) {
            groups.push((canonical, split.annotation));
        }
    }
    groups.sort_by(|(a, _), (b, _)| a.cmp(b));
    groups
}

/// Computes the full EAN-13 from a 12-digit prefix by appending the check
/// digit (alternating weights 1 and 3, summed mod 10, complemented).
///
/// Returns `None` when the input is not exactly 12 digits. Used for
/// conformance checking; conversion itself works with the 12-digit form.
#[must_use]
pub fn compute_ean13(prefix: &str) -> Option<String> {
    if prefix.len() != 12 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sum: u32 = prefix
        .bytes()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    let check = (10 - (sum % 10)) % 10;
    Some(format!("{prefix}{check}"))
}
