//! Degraded text recovery for documents no structured strategy could read.
//!
//! Decodes the raw bytes, sniffs a delimiter and parses the content as
//! delimited records. When even that fails the content is split by hand on
//! line breaks and `,`/`;`/tab, so any text file yields some grid.

use crate::error::SheetError;
use crate::workbook::cell::CellValue;
use crate::workbook::sheet::Worksheet;
use crate::workbook::Workbook;
use encoding_rs::Encoding;
use encoding_rs::GBK;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

static FIELD_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;\t]").unwrap());

/// Recovers a workbook from a text file. Blank content yields a workbook
/// with zero sheets.
pub(crate) fn read_text_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook, SheetError> {
    let bytes = std::fs::read(path)?;
    let content = decode_text(&bytes);
    if content.trim().is_empty() {
        return Ok(Workbook { sheets: Vec::new() });
    }
    let sheet = match read_delimited(&content) {
        Ok(sheet) => sheet,
        Err(error) => {
            warn!("Delimited parse failed, splitting raw text: {error}");
            split_raw_text(&content)
        }
    };
    Ok(Workbook {
        sheets: vec![sheet],
    })
}

/// Decodes file bytes to text: declared BOM first, then strict UTF-8, then
/// GBK as the legacy fallback for undeclared regional encodings.
fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => {
            let (text, _, _) = GBK.decode(bytes);
            text.into_owned()
        }
    }
}

/// Picks the separator that occurs most often in the first line.
fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or_default();
    [b',', b';', b'\t']
        .into_iter()
        .map(|separator| {
            let count = first_line.bytes().filter(|byte| *byte == separator).count();
            (count, separator)
        })
        .max_by_key(|(count, _)| *count)
        .filter(|(count, _)| *count > 0)
        .map(|(_, separator)| separator)
        .unwrap_or(b',')
}

/// Parses the content as delimited records with flexible record lengths.
fn read_delimited(content: &str) -> Result<Worksheet, SheetError> {
    let mut sheet = Worksheet::new("Sheet1");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    for (row_index, result) in reader.records().enumerate() {
        let record = result?;
        push_fields(&mut sheet, row_index + 1, record.iter());
    }
    Ok(finish_sheet(sheet))
}

/// Last resort: one cell per separator-delimited chunk of each line.
fn split_raw_text(content: &str) -> Worksheet {
    let mut sheet = Worksheet::new("Sheet1");
    let mut row = 0usize;
    for line in content.lines().filter(|line| !line.trim().is_empty()) {
        row += 1;
        push_fields(&mut sheet, row, FIELD_SEPARATORS.split(line));
    }
    finish_sheet(sheet)
}

fn push_fields<'a>(
    sheet: &mut Worksheet,
    row: usize,
    fields: impl Iterator<Item = &'a str>,
) {
    for (col_index, field) in fields.enumerate() {
        let trimmed = field.trim();
        if !trimmed.is_empty() {
            sheet.push(row, col_index + 1, CellValue::Text(trimmed.to_owned()));
        }
    }
}

/// Records the recovered grid's extent as the sheet's declared bounds.
fn finish_sheet(mut sheet: Worksheet) -> Worksheet {
    sheet.reported_rows = sheet.max_row();
    sheet.reported_cols = sheet.max_col();
    sheet
}
