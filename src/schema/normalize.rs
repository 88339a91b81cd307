//! Cell value normalization.
//!
//! Every raw cell shape collapses to a single string so downstream storage
//! only ever deals with text. The function is total: no input panics or
//! errors, unreadable values degrade to `""`.

use crate::workbook::cell::serial_to_datetime;
use crate::workbook::cell::CellValue;

/// Renders date/time cells; naive ISO-8601, no zone offset.
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Collapses a raw cell value to its normalized string form.
///
/// Formula cells yield their cached result, never the formula source.
/// Hyperlinks prefer display text over the target. Error markers render as a
/// small JSON object (`{"error":"#DIV/0!"}`) so the marker survives into
/// text-only storage without being mistaken for data.
pub fn normalize_value(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Text(text) => text.clone(),
        CellValue::Number(number) => format_number(*number),
        CellValue::Bool(value) => if *value { "true" } else { "false" }.to_owned(),
        CellValue::DateTime { serial, epoch_1904 } => serial_to_datetime(*serial, *epoch_1904)
            .map(|datetime| datetime.format(DATETIME_FORMAT).to_string())
            .unwrap_or_default(),
        CellValue::RichText(runs) => runs.concat(),
        CellValue::Formula { cached } => cached
            .as_deref()
            .map(normalize_value)
            .unwrap_or_default(),
        CellValue::Hyperlink { text, target } => text
            .clone()
            .filter(|text| !text.is_empty())
            .or_else(|| target.clone())
            .unwrap_or_default(),
        CellValue::Error(code) => serde_json::json!({ "error": code }).to_string(),
    }
}

/// Integral values render without a fractional part: `3`, not `3.0`.
fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}
