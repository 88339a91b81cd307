//! # sheetloader
//!
//! A library for turning semi-structured spreadsheet uploads into a
//! well-formed schema plus normalized rows. One call parses a file into an
//! [`ExtractionResult`]: columns inferred from the header row with
//! storage-legal, batch-unique field names, and string-valued data rows
//! ready for JSON or relational persistence.
//!
//! ## Features
//!
//! - **Multi-format support**: OOXML workbooks (`.xlsx`), delimited text
//!   (`.csv`, semicolon and tab separated) and raw text recovery
//! - **Layered fallback**: three reader strategies of decreasing fidelity,
//!   tried in order until one produces a workbook
//! - **Schema inference**: column fields derived from the header row,
//!   sanitized and kept unique within the extraction
//! - **Value normalization**: rich text, formula results, hyperlinks, date
//!   serials and error markers all collapse to plain strings
//! - **Best-effort extraction**: per-cell and per-row failures degrade
//!   locally with a warning instead of aborting the document
//! - **Storage contract**: JSON-mode records and relational table
//!   definitions for a downstream store, without shipping an engine
//!
//! ## Example
//!
//! ```no_run
//! use sheetloader::{parse_sheet_file, ParseOptions};
//!
//! let result = parse_sheet_file("upload.xlsx", &ParseOptions::default())?;
//! for row in &result.data {
//!     println!("{}: {:?}", row.row_index, row.row_data);
//! }
//! # Ok::<(), sheetloader::SheetError>(())
//! ```

mod helpers;
mod workbook;

pub mod error;
pub mod parse;
pub mod schema;
pub mod store;

pub use crate::error::SheetError;
pub use crate::parse::parse_sheet_file;
pub use crate::parse::ParseOptions;
pub use crate::schema::normalize::normalize_value;
pub use crate::schema::sanitize::sanitize_name;
pub use crate::schema::sanitize::NameContext;
pub use crate::schema::Column;
pub use crate::schema::ExtractionResult;
pub use crate::schema::Row;
pub use crate::workbook::cell::CellValue;
