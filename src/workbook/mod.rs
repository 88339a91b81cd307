//! # Workbook Reading Module
//!
//! Materializes a spreadsheet document into an in-memory [`Workbook`] of
//! worksheets. Two structured strategies parse the OOXML container
//! ([`xlsx`]), one degraded strategy recovers a grid from delimited or raw
//! text ([`text`]); the orchestrator in [`crate::parse`] decides which one
//! runs.

pub(crate) mod cell;
pub(crate) mod sheet;
pub(crate) mod text;
pub(crate) mod xlsx;

use crate::workbook::sheet::Worksheet;

/// A parsed spreadsheet document: zero or more worksheets.
#[derive(Debug)]
pub(crate) struct Workbook {
    pub(crate) sheets: Vec<Worksheet>,
}

/// Converts an `A1`-style cell reference to 1-based (row, column) numbers.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference
        .find(|character: char| character.is_ascii_digit())
        .filter(|index| *index > 0)?;
    let col = column_letters_to_index(&reference[..split])?;
    let row = reference[split..].parse::<usize>().ok()?;
    Some((row, col))
}

/// Converts column letters to a 1-based column number:
/// A = 1, Z = 26, AA = 27, ...
pub(crate) fn column_letters_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|character| character.is_ascii_alphabetic()) {
        return None;
    }
    letters
        .to_ascii_uppercase()
        .chars()
        .map(|letter| letter as usize - 'A' as usize + 1)
        .reduce(|index, digit| index * 26 + digit)
}
