use thiserror::Error;

pub use crate::helpers::xml::XmlError;

/// Crate-wide error type.
/// The first three variants are the only failures a caller ever sees from a
/// parse; the rest aggregate errors from the standard library, dependencies,
/// and internal modules while a strategy is still being tried.
#[derive(Error, Debug)]
pub enum SheetError {
    /// Input path does not exist; surfaced immediately, no strategy is tried.
    #[error("File not found: '{0}'")]
    FileNotFound(String),

    /// Every reader strategy failed; carries the innermost failure message.
    #[error("Cannot parse '{file}': {message}")]
    UnparsableDocument { file: String, message: String },

    /// The document parsed but contains no worksheets.
    #[error("No worksheets in '{0}'")]
    EmptyDocument(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),
}
