//! Parse orchestration: one call turns a file path into an
//! [`ExtractionResult`].
//!
//! Three reader strategies run in fixed order of decreasing fidelity. A
//! failing strategy is logged and the next one runs; only the last one's
//! failure reaches the caller. All state is call-local, so concurrent parses
//! never interfere.

use crate::error::SheetError;
use crate::helpers::reader::SourceReader;
use crate::schema::extract::extract;
use crate::schema::ExtractionResult;
use crate::workbook::text;
use crate::workbook::xlsx;
use crate::workbook::Workbook;
use std::path::Path;
use tracing::debug;
use tracing::warn;

/// Per-call parsing options.
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// Worksheet to extract, matched against sheet names as a glob pattern.
    /// The first worksheet is used when absent or unmatched.
    pub sheet_name: Option<String>,
}

/// Reader strategies in fallback order.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Strategy {
    Structured,
    Streamed,
    DelimitedText,
}

impl Strategy {
    fn name(self) -> &'static str {
        match self {
            Strategy::Structured => "strict structured",
            Strategy::Streamed => "streamed structured",
            Strategy::DelimitedText => "degraded text",
        }
    }

    fn read(self, path: &Path) -> Result<Workbook, SheetError> {
        match self {
            Strategy::Structured => xlsx::read_workbook(SourceReader::open(path)?),
            Strategy::Streamed => xlsx::read_workbook(SourceReader::buffered(path)?),
            Strategy::DelimitedText => text::read_text_workbook(path),
        }
    }
}

/// Parses a spreadsheet file into its schema and normalized rows.
///
/// Fails with [`SheetError::FileNotFound`] before any strategy runs,
/// [`SheetError::UnparsableDocument`] when every strategy exhausts (carrying
/// the innermost failure message), or [`SheetError::EmptyDocument`] when the
/// document reads but holds no worksheets.
pub fn parse_sheet_file<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> Result<ExtractionResult, SheetError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SheetError::FileNotFound(path.display().to_string()));
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    // Once a strategy reads the document, its extraction outcome is final: a
    // lower-fidelity reader cannot conjure worksheets that are not there.
    for strategy in [Strategy::Structured, Strategy::Streamed] {
        match strategy.read(path) {
            Ok(workbook) => {
                debug!("Read '{file_name}' with the {} strategy", strategy.name());
                return extract(&workbook, &file_name, options);
            }
            Err(error) => {
                warn!(
                    "The {} strategy failed for '{file_name}': {error}",
                    strategy.name()
                );
            }
        }
    }

    let strategy = Strategy::DelimitedText;
    match strategy.read(path) {
        Ok(workbook) => {
            debug!("Read '{file_name}' with the {} strategy", strategy.name());
            extract(&workbook, &file_name, options)
        }
        Err(error) => Err(SheetError::UnparsableDocument {
            file: file_name,
            message: error.to_string(),
        }),
    }
}
