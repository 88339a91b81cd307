//! Storage-facing contract.
//!
//! The crate never persists anything itself; it shapes an extraction into
//! what a storage collaborator expects. Two modes exist downstream: JSON
//! persistence of whole rows, and a dynamically created relational table
//! with one column per schema field.

use crate::schema::sanitize::sanitize_name;
use crate::schema::sanitize::NameContext;
use crate::schema::Column;
use crate::schema::ExtractionResult;
use crate::schema::Row;
use serde::Serialize;
use std::collections::HashSet;

/// One row shaped for JSON-mode persistence.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRowRecord {
    pub file_name: String,
    pub sheet_name: String,
    pub row_index: usize,
    pub row_data: serde_json::Value,
}

impl Row {
    /// Shapes this row into a JSON-mode record.
    pub fn to_json_record(&self) -> JsonRowRecord {
        JsonRowRecord {
            file_name: self.file_name.clone(),
            sheet_name: self.sheet_name.clone(),
            row_index: self.row_index,
            row_data: serde_json::json!(self.row_data),
        }
    }
}

/// Shapes every row of an extraction for JSON-mode persistence.
pub fn json_records(result: &ExtractionResult) -> Vec<JsonRowRecord> {
    result.data.iter().map(Row::to_json_record).collect()
}

/// Definition of a relational table to create for an extraction: a
/// storage-legal table name plus the column schema.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<Column>,
}

impl TableSpec {
    /// Derives a table definition from an extraction. The raw name goes
    /// through table-context sanitization, so any input (including an empty
    /// one) yields a legal table name.
    pub fn from_extraction(raw_name: &str, result: &ExtractionResult) -> TableSpec {
        TableSpec {
            name: sanitize_name(raw_name, NameContext::Table, &mut HashSet::new()),
            columns: result.columns.clone(),
        }
    }
}

/// What a storage collaborator implements. `save_rows` covers JSON-mode
/// persistence, `create_table` the relational mode; the crate ships no
/// implementation of its own.
pub trait RowStore {
    type Error;

    fn save_rows(&mut self, records: &[JsonRowRecord]) -> Result<(), Self::Error>;

    fn create_table(&mut self, table: &TableSpec, rows: &[Row]) -> Result<(), Self::Error>;
}
