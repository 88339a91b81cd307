//! Schema and row extraction from a materialized workbook grid.
//!
//! Best-effort by policy: a partially reconstructed result beats none, so
//! per-cell and per-row failures degrade locally with a warning and only the
//! complete absence of worksheets is fatal.

use crate::error::SheetError;
use crate::parse::ParseOptions;
use crate::schema::normalize::normalize_value;
use crate::schema::sanitize::sanitize_name;
use crate::schema::sanitize::NameContext;
use crate::schema::Column;
use crate::schema::ExtractionResult;
use crate::schema::Row;
use crate::workbook::cell::serial_to_datetime;
use crate::workbook::cell::CellValue;
use crate::workbook::sheet::Worksheet;
use crate::workbook::Workbook;
use glob::Pattern;
use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

/// Grid bounds assumed when a document declares nothing and has no cells.
const FALLBACK_ROW_COUNT: usize = 10;
const FALLBACK_COLUMN_COUNT: usize = 5;

/// Hard ceiling on declared column counts; OOXML allows at most XFD.
const MAX_COLUMNS: usize = 16_384;

/// Secondary-sweep row caps, with and without a declared row count.
const SWEEP_LIMIT_REPORTED: usize = 1_000;
const SWEEP_LIMIT_UNREPORTED: usize = 100;

/// Recoverable extraction failures. Logged, never returned: the affected
/// cell, row, or header degrades and extraction continues.
#[derive(Error, Debug)]
enum ReadFailure {
    #[error("Cannot read cell at row {row}, column {col}: {message}")]
    Cell {
        row: usize,
        col: usize,
        message: String,
    },

    #[error("Cannot read row {row}: {message}")]
    Row { row: usize, message: String },

    #[error("Cannot read header row: {0}")]
    Header(String),
}

/// Derives the column schema and normalized rows from one worksheet of the
/// workbook: the hinted sheet when a hint matches, the first one otherwise.
pub(crate) fn extract(
    workbook: &Workbook,
    file_name: &str,
    options: &ParseOptions,
) -> Result<ExtractionResult, SheetError> {
    let sheet = select_sheet(workbook, options)
        .ok_or_else(|| SheetError::EmptyDocument(file_name.to_owned()))?;

    let row_bound = sheet
        .reported_rows
        .filter(|count| *count > 0)
        .or(sheet.max_row())
        .unwrap_or(FALLBACK_ROW_COUNT);
    let col_bound = sheet
        .reported_cols
        .filter(|count| *count > 0)
        .or(sheet.max_col())
        .unwrap_or(FALLBACK_COLUMN_COUNT);

    let columns = read_header(sheet, col_bound);
    let mut rows = read_rows(sheet, &columns, file_name);
    if rows.is_empty() {
        rows = sweep_rows(sheet, &columns, file_name, col_bound);
    }

    debug!(
        "Extracted {} columns and {} rows from sheet '{}' of '{}' (bounds {}x{})",
        columns.len(),
        rows.len(),
        sheet.name,
        file_name,
        row_bound,
        col_bound,
    );
    Ok(ExtractionResult {
        data: rows,
        columns,
        file_name: file_name.to_owned(),
        sheet_name: sheet.name.clone(),
    })
}

/// Picks the worksheet to extract: a sheet whose name matches the hint as a
/// glob pattern, else the first sheet, else `None`. A hint that is not a
/// valid pattern is logged and ignored, it never fails the extraction.
fn select_sheet<'a>(workbook: &'a Workbook, options: &ParseOptions) -> Option<&'a Worksheet> {
    if let Some(hint) = &options.sheet_name {
        match Pattern::new(hint) {
            Ok(pattern) => {
                let hinted = workbook
                    .sheets
                    .iter()
                    .find(|sheet| pattern.matches(&sheet.name));
                if hinted.is_some() {
                    return hinted;
                }
            }
            Err(error) => warn!("Ignoring invalid sheet name pattern '{hint}': {error}"),
        }
    }
    workbook.sheets.first()
}

/// Builds the column schema from row 1. Fields are seeded `column{colIndex}`
/// and uniquified by the sanitizer; blank headers keep a placeholder.
fn read_header(sheet: &Worksheet, col_bound: usize) -> Vec<Column> {
    if col_bound > MAX_COLUMNS {
        warn!(
            "{}",
            ReadFailure::Header(format!(
                "declared column count {col_bound} exceeds the {MAX_COLUMNS} limit"
            ))
        );
        return placeholder_columns(sheet.max_col().unwrap_or(10));
    }

    let mut existing = HashSet::new();
    let mut has_header = false;
    let mut columns = Vec::with_capacity(col_bound);
    for col in 1..=col_bound {
        let text = normalize_cell(sheet, 1, col);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            has_header = true;
        }
        let field = sanitize_name(&format!("column{col}"), NameContext::Column, &mut existing);
        columns.push(Column {
            field,
            header: if trimmed.is_empty() {
                format!("列{col}")
            } else {
                trimmed.to_owned()
            },
            col_index: col,
        });
    }
    if columns.is_empty() {
        return placeholder_columns(FALLBACK_COLUMN_COUNT);
    }
    if !has_header {
        debug!("Header row is blank, placeholder headers in use");
    }
    columns
}

fn placeholder_columns(count: usize) -> Vec<Column> {
    (1..=count)
        .map(|col| Column {
            field: format!("column{col}"),
            header: format!("列{col}"),
            col_index: col,
        })
        .collect()
}

/// Walks the populated rows below the header, guarding against readers that
/// yield the same row more than once.
fn read_rows(sheet: &Worksheet, columns: &[Column], file_name: &str) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut visited = HashSet::new();
    for row in sheet.row_numbers() {
        if row == 1 || !visited.insert(row) {
            continue;
        }
        if row == 0 {
            warn!(
                "{}",
                ReadFailure::Row {
                    row,
                    message: "row number 0 lies outside the grid".to_owned(),
                }
            );
            continue;
        }
        rows.push(build_row(sheet, columns, row, file_name));
    }
    rows
}

/// Bounded direct fetch used when row iteration yields nothing: rows are
/// assembled only when at least one cell within the schema holds data.
///
/// [`Worksheet`] backs iteration and direct fetch with the same cell store,
/// so against this grid the sweep can only confirm the absence of data rows.
/// It guards the extraction contract for any future sheet source whose row
/// iteration under-reports.
fn sweep_rows(
    sheet: &Worksheet,
    columns: &[Column],
    file_name: &str,
    col_bound: usize,
) -> Vec<Row> {
    let limit = sheet
        .reported_rows
        .map(|count| count.min(SWEEP_LIMIT_REPORTED))
        .unwrap_or(SWEEP_LIMIT_UNREPORTED);
    (2..=limit)
        .filter(|row| sheet.row_has_data(*row, col_bound))
        .map(|row| build_row(sheet, columns, row, file_name))
        .collect()
}

fn build_row(sheet: &Worksheet, columns: &[Column], row: usize, file_name: &str) -> Row {
    let mut row_data = IndexMap::with_capacity(columns.len());
    for column in columns {
        row_data.insert(
            column.field.clone(),
            normalize_cell(sheet, row, column.col_index),
        );
    }
    Row {
        row_data,
        row_index: row - 1,
        file_name: file_name.to_owned(),
        sheet_name: sheet.name.clone(),
    }
}

/// Normalizes one grid position; an unconvertible date serial is reported
/// and degrades to `""` instead of aborting the row.
fn normalize_cell(sheet: &Worksheet, row: usize, col: usize) -> String {
    let Some(value) = sheet.get(row, col) else {
        return String::new();
    };
    if let CellValue::DateTime { serial, epoch_1904 } = value {
        if serial_to_datetime(*serial, *epoch_1904).is_none() {
            warn!(
                "{}",
                ReadFailure::Cell {
                    row,
                    col,
                    message: format!("invalid date serial {serial}"),
                }
            );
            return String::new();
        }
    }
    normalize_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook_with(sheet: Worksheet) -> Workbook {
        Workbook {
            sheets: vec![sheet],
        }
    }

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_owned())
    }

    fn grid(headers: &[&str], rows: &[&[&str]]) -> Worksheet {
        let mut sheet = Worksheet::new("Sheet1");
        for (index, header) in headers.iter().enumerate() {
            sheet.push(1, index + 1, text(header));
        }
        for (row_index, row) in rows.iter().enumerate() {
            for (col_index, value) in row.iter().enumerate() {
                sheet.push(row_index + 2, col_index + 1, text(value));
            }
        }
        sheet
    }

    #[test]
    fn well_formed_grid_round_trip() {
        let sheet = grid(
            &["name", "age", "city"],
            &[
                &["Alice", "30", "Paris"],
                &["Bob", "25", "Lyon"],
                &["Carol", "41", "Nice"],
                &["Dan", "38", "Lille"],
                &["Eve", "29", "Brest"],
            ],
        );
        let result = extract(&workbook_with(sheet), "people.xlsx", &ParseOptions::default()).unwrap();

        assert_eq!(result.columns.len(), 3);
        assert_eq!(result.data.len(), 5);
        let row_indexes: Vec<usize> = result.data.iter().map(|row| row.row_index).collect();
        assert_eq!(row_indexes, [1, 2, 3, 4, 5]);
        for row in &result.data {
            assert_eq!(row.row_data.len(), 3);
            assert_eq!(row.file_name, "people.xlsx");
            assert_eq!(row.sheet_name, "Sheet1");
        }
        assert_eq!(result.data[0].row_data["column1"], "Alice");
        assert_eq!(result.data[4].row_data["column3"], "Brest");
    }

    #[test]
    fn headers_keep_text_and_default_blanks() {
        let mut sheet = grid(&["id", "", "id"], &[&["1", "2", "3"]]);
        sheet.reported_cols = Some(4);
        let result = extract(&workbook_with(sheet), "f.xlsx", &ParseOptions::default()).unwrap();

        let headers: Vec<&str> = result.columns.iter().map(|c| c.header.as_str()).collect();
        assert_eq!(headers, ["id", "列2", "id", "列4"]);
        let fields: Vec<&str> = result.columns.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, ["column1", "column2", "column3", "column4"]);
        // Missing cells are present as empty strings
        assert_eq!(result.data[0].row_data["column4"], "");
    }

    #[test]
    fn no_sheets_is_an_empty_document() {
        let workbook = Workbook { sheets: Vec::new() };
        let error = extract(&workbook, "empty.xlsx", &ParseOptions::default()).unwrap_err();
        assert!(matches!(error, SheetError::EmptyDocument(file) if file == "empty.xlsx"));
    }

    #[test]
    fn sheet_hint_matches_as_glob() {
        let mut first = Worksheet::new("Summary");
        first.push(1, 1, text("a"));
        let mut second = Worksheet::new("Data 2024");
        second.push(1, 1, text("b"));
        second.push(2, 1, text("value"));
        let workbook = Workbook {
            sheets: vec![first, second],
        };

        let options = ParseOptions {
            sheet_name: Some("Data*".to_owned()),
        };
        let result = extract(&workbook, "f.xlsx", &options).unwrap();
        assert_eq!(result.sheet_name, "Data 2024");

        // A hint matching nothing falls back to the first sheet
        let options = ParseOptions {
            sheet_name: Some("Nope".to_owned()),
        };
        let result = extract(&workbook, "f.xlsx", &options).unwrap();
        assert_eq!(result.sheet_name, "Summary");
    }

    #[test]
    fn invalid_sheet_hint_is_ignored() {
        let sheet = grid(&["a"], &[&["1"]]);
        let options = ParseOptions {
            sheet_name: Some("[".to_owned()),
        };
        let result = extract(&workbook_with(sheet), "f.xlsx", &options).unwrap();
        assert_eq!(result.sheet_name, "Sheet1");
        assert_eq!(result.data.len(), 1);
    }

    #[test]
    fn empty_grid_gets_placeholder_schema() {
        let sheet = Worksheet::new("Sheet1");
        let result = extract(&workbook_with(sheet), "f.xlsx", &ParseOptions::default()).unwrap();
        assert_eq!(result.columns.len(), FALLBACK_COLUMN_COUNT);
        assert_eq!(result.columns[0].field, "column1");
        assert_eq!(result.columns[0].header, "列1");
        assert!(result.data.is_empty());
    }

    #[test]
    fn oversized_column_declaration_degrades_to_placeholders() {
        let mut sheet = grid(&["a", "b"], &[&["1", "2"]]);
        sheet.reported_cols = Some(100_000);
        let result = extract(&workbook_with(sheet), "f.xlsx", &ParseOptions::default()).unwrap();
        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.columns[0].header, "列1");
    }

    #[test]
    fn duplicate_row_yields_are_processed_once() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.push(1, 1, text("h"));
        sheet.push(2, 1, text("a"));
        sheet.push(2, 2, text("b"));
        let result = extract(&workbook_with(sheet), "f.xlsx", &ParseOptions::default()).unwrap();
        assert_eq!(result.data.len(), 1);
    }

    #[test]
    fn out_of_grid_row_is_skipped() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.push(1, 1, text("h"));
        sheet.push(0, 1, text("bogus"));
        sheet.push(2, 1, text("real"));
        let result = extract(&workbook_with(sheet), "f.xlsx", &ParseOptions::default()).unwrap();
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].row_data["column1"], "real");
    }

    #[test]
    fn invalid_date_serial_degrades_to_empty_cell() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.push(1, 1, text("when"));
        sheet.push(
            2,
            1,
            CellValue::DateTime {
                serial: f64::INFINITY,
                epoch_1904: false,
            },
        );
        let result = extract(&workbook_with(sheet), "f.xlsx", &ParseOptions::default()).unwrap();
        assert_eq!(result.data[0].row_data["column1"], "");
    }

    #[test]
    fn header_only_grid_has_no_rows() {
        let mut sheet = grid(&["a", "b"], &[]);
        sheet.reported_rows = Some(50);
        let result = extract(&workbook_with(sheet), "f.xlsx", &ParseOptions::default()).unwrap();
        assert!(result.data.is_empty());
    }
}
