use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;

/// Raw value of a single grid cell, before normalization.
///
/// The variants mirror the shapes a structured spreadsheet document can hand
/// back: plain scalars, rich-text run collections, formula cells carrying a
/// cached result, hyperlinks, date serials, and error markers. The degraded
/// text reader only ever produces [`CellValue::Text`].
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    /// No value at this position
    Empty,
    /// Plain string value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Bool(bool),
    /// Date/time value as an Excel serial number
    DateTime {
        /// Days since the epoch, with the time of day in the fraction
        serial: f64,
        /// Whether the workbook uses the 1904 date system
        epoch_1904: bool,
    },
    /// Rich-text run collection; each run is one text segment
    RichText(Vec<String>),
    /// Formula cell with its cached result, if the producer stored one
    Formula { cached: Option<Box<CellValue>> },
    /// Hyperlink with optional display text and link target
    Hyperlink {
        text: Option<String>,
        target: Option<String>,
    },
    /// Error marker such as `#DIV/0!`
    Error(String),
}

impl CellValue {
    /// Returns true for values that contribute nothing to a row.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(value) => value.is_empty(),
            CellValue::RichText(runs) => runs.iter().all(String::is_empty),
            CellValue::Formula { cached } => {
                cached.as_ref().map(|value| value.is_empty()).unwrap_or(true)
            }
            _ => false,
        }
    }

    /// Plain textual content for string-like values, used when a hyperlink
    /// needs the underlying cell text as its display text.
    pub(crate) fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(value) if !value.is_empty() => Some(value.to_owned()),
            CellValue::RichText(runs) if !runs.iter().all(String::is_empty) => {
                Some(runs.concat())
            }
            _ => None,
        }
    }
}

/// Built-in Excel number format IDs that mark a cell as date/time valued.
pub(crate) fn is_builtin_datetime_format(id: &str) -> bool {
    matches!(
        id,
        "14" | "15" | "16" | "17" | "18" | "19" | "20" | "21" | "22" | "45" | "46" | "47"
    )
}

/// Scans a custom number format code for date/time placeholders.
///
/// Walks the format once tracking escape (`_`, `\`), string literal (`"..."`)
/// and color/condition (`[...]`) contexts; `Y`, `D`, `H` and `S` outside those
/// contexts mark the format as date/time. `M` is ambiguous (month vs minute)
/// and is deliberately ignored on its own.
pub(crate) fn is_custom_datetime_format(format: &str) -> bool {
    let mut is_escaped = false;
    let mut is_literal = false;
    let mut is_color = false;
    for character in format.chars() {
        match character {
            _ if is_escaped => is_escaped = false,
            '_' | '\\' if !is_escaped => is_escaped = true,

            '"' if is_literal => is_literal = false,
            '"' if !is_literal && !is_color => is_literal = true,

            ']' if is_color => is_color = false,
            '[' if !is_color && !is_literal => is_color = true,
            _ if is_literal || is_color => (),

            'Y' | 'y' | 'D' | 'd' | 'H' | 'h' | 'S' | 's' => return true,
            _ => (),
        }
    }
    false
}

/// Converts an Excel date serial to a calendar date/time.
///
/// Serial day 0 is 1899-12-30 in the 1900 system (the offset absorbs the
/// Lotus 1-2-3 leap-year bug for serials below 60) and 1904-01-01 in the
/// 1904 system. Returns `None` when the serial is out of chrono's range.
pub(crate) fn serial_to_datetime(serial: f64, epoch_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.trunc() as i64
        + if epoch_1904 {
            1462
        } else if serial.trunc() < 60.0 {
            1
        } else {
            0
        };
    let milliseconds = (serial.fract() * 86_400_000f64).round() as i64;
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    base.checked_add_signed(Duration::try_days(days)?)?
        .checked_add_signed(Duration::milliseconds(milliseconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_epoch_1900() {
        // 45_292 is 2024-01-01 in the 1900 date system
        let datetime = serial_to_datetime(45_292.0, false).unwrap();
        assert_eq!(datetime.to_string(), "2024-01-01 00:00:00");
    }

    #[test]
    fn serial_time_fraction() {
        let datetime = serial_to_datetime(45_292.5, false).unwrap();
        assert_eq!(datetime.to_string(), "2024-01-01 12:00:00");
    }

    #[test]
    fn serial_before_lotus_bug_cutoff() {
        // Serial 1 is 1900-01-01; serials below 60 compensate for the
        // nonexistent 1900-02-29
        let datetime = serial_to_datetime(1.0, false).unwrap();
        assert_eq!(datetime.to_string(), "1900-01-01 00:00:00");
    }

    #[test]
    fn serial_epoch_1904() {
        let datetime = serial_to_datetime(0.0, true).unwrap();
        assert_eq!(datetime.to_string(), "1904-01-01 00:00:00");
    }

    #[test]
    fn serial_out_of_range() {
        assert!(serial_to_datetime(f64::NAN, false).is_none());
        assert!(serial_to_datetime(1e18, false).is_none());
    }

    #[test]
    fn builtin_datetime_formats() {
        assert!(is_builtin_datetime_format("14"));
        assert!(is_builtin_datetime_format("22"));
        assert!(!is_builtin_datetime_format("0"));
        assert!(!is_builtin_datetime_format("49"));
    }

    #[test]
    fn custom_datetime_formats() {
        assert!(is_custom_datetime_format("yyyy-mm-dd"));
        assert!(is_custom_datetime_format("hh:mm"));
        assert!(!is_custom_datetime_format("0.00"));
        // Date letters inside string literals or color tags do not count
        assert!(!is_custom_datetime_format("0.00\"dollars\""));
        assert!(!is_custom_datetime_format("[Red]0.00"));
    }

    #[test]
    fn cell_emptiness() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::Text(String::new()).is_empty());
        assert!(CellValue::Formula { cached: None }.is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
        assert!(!CellValue::Text("x".to_owned()).is_empty());
    }
}
