//! # Schema Module
//!
//! The schema side of an extraction: storage-legal identifier derivation
//! ([`sanitize`]), raw-cell-to-string normalization ([`normalize`]), and the
//! extractor ([`extract`]) that walks a workbook grid and assembles the
//! final [`ExtractionResult`].

pub mod normalize;
pub mod sanitize;

pub(crate) mod extract;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

/// One column of the inferred schema.
///
/// `field` is the sanitized, storage-safe identifier and is pairwise distinct
/// within one extraction; `header` keeps the original header text (blank
/// headers get a `列{colIndex}` placeholder, duplicates are preserved).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub field: String,
    pub header: String,
    /// 1-based grid column number, stable across columns and rows
    pub col_index: usize,
}

/// One normalized data row.
///
/// `row_data` holds exactly one entry per column, keyed by the column's
/// `field` in `col_index` order; missing cells are present as `""`, never
/// absent. `row_index` is the grid row number minus one, so the first data
/// row is 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub row_data: IndexMap<String, String>,
    pub row_index: usize,
    pub file_name: String,
    pub sheet_name: String,
}

/// The complete outcome of parsing one spreadsheet file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub data: Vec<Row>,
    pub columns: Vec<Column>,
    pub file_name: String,
    pub sheet_name: String,
}
