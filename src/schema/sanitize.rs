//! Identifier sanitization for table names and column fields.
//!
//! Storage engines reject most of what users type into spreadsheet headers:
//! whitespace, punctuation, non-ASCII text, leading digits, over-long names,
//! duplicates. [`sanitize_name`] maps any input to a legal identifier and
//! keeps it unique within the caller's batch.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Identifier length ceiling, in bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Prefix applied when sanitization leaves a name starting with a non-letter.
const MARKER_PREFIX: &str = "x_";

static ILLEGAL_CHARACTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^A-Za-z0-9_]").unwrap());

/// What kind of identifier is being derived; selects the default used for
/// names that sanitize to nothing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NameContext {
    Table,
    Column,
}

impl NameContext {
    fn default_name(self) -> &'static str {
        match self {
            NameContext::Table => "default_table",
            NameContext::Column => "column",
        }
    }
}

/// Derives a storage-legal identifier from arbitrary text, unique against
/// `existing`.
///
/// Illegal characters become `_`; a name not starting with an ASCII letter
/// gets the marker prefix; a name that sanitized away entirely falls back to
/// the context default. The result is lower-cased, truncated to
/// [`MAX_IDENTIFIER_LENGTH`] bytes, suffixed with `_N` for the smallest
/// `N >= 1` on collision (shortening the base so the suffix survives the
/// length ceiling), and inserted into `existing` before returning.
///
/// Deterministic for a given `existing` set and call order; header batches
/// must be processed strictly left to right.
pub fn sanitize_name(raw: &str, context: NameContext, existing: &mut HashSet<String>) -> String {
    let mut name = ILLEGAL_CHARACTERS.replace_all(raw, "_").into_owned();
    let starts_with_letter = name
        .chars()
        .next()
        .map(|character| character.is_ascii_alphabetic())
        .unwrap_or(false);
    if !name.is_empty() && !starts_with_letter {
        name.insert_str(0, MARKER_PREFIX);
    }
    if name.is_empty() {
        name.push_str(context.default_name());
    }
    name.make_ascii_lowercase();
    name.truncate(MAX_IDENTIFIER_LENGTH);

    if !existing.contains(&name) {
        existing.insert(name.clone());
        return name;
    }
    let mut counter = 1usize;
    loop {
        let suffix = format!("_{counter}");
        let base_length = name
            .len()
            .min(MAX_IDENTIFIER_LENGTH.saturating_sub(suffix.len()));
        let candidate = format!("{}{}", &name[..base_length], suffix);
        if !existing.contains(&candidate) {
            existing.insert(candidate.clone());
            return candidate;
        }
        counter += 1;
    }
}
