//! OOXML (`.xlsx`) parser used by the strict and streamed strategies.
//!
//! The container is a ZIP archive of XML parts. Parsing is deliberately
//! lenient: the parts that matter for data extraction (workbook metadata,
//! shared strings, worksheet cells) are required, while known-unstable
//! advanced constructs are neutralized. `styles.xml` failures degrade to
//! default number formats, and table parts, auto filters and conditional
//! formatting are never parsed at all, so a malformed advanced construct
//! cannot abort the parse.

use crate::error::SheetError;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::workbook::cell::is_builtin_datetime_format;
use crate::workbook::cell::is_custom_datetime_format;
use crate::workbook::cell::CellValue;
use crate::workbook::reference_to_index;
use crate::workbook::sheet::Worksheet;
use crate::workbook::Workbook;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufReader;
use tracing::warn;
use zip::read::ZipFile;
use zip::ZipArchive;

// XML tag names for the parts of the OOXML container we read
const TAG_RELATIONSHIP: QName = QName(b"Relationship"); // Part relationship
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet"); // Worksheet definition
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt"); // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs"); // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf"); // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si"); // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh"); // Phonetic annotation to skip
const TAG_TEXT: QName = QName(b"t"); // Text content within strings
const TAG_DIMENSION: QName = QName(b"dimension"); // Declared sheet bounds
const TAG_ROW: QName = QName(b"row"); // Row in worksheet
const TAG_CELL: QName = QName(b"c"); // Cell in worksheet
const TAG_FORMULA: QName = QName(b"f"); // Formula source within a cell
const TAG_INLINE_STRING: QName = QName(b"is"); // Inline string value
const TAG_VALUE: QName = QName(b"v"); // Cell value content
const TAG_HYPERLINK: QName = QName(b"hyperlink"); // Hyperlink reference

/// Cell kind as declared by the `t` attribute.
#[derive(Copy, Clone, Debug, PartialEq)]
enum RawKind {
    Number,
    SharedString,
    InlineString,
    FormulaString,
    Boolean,
    Error,
    IsoDate,
}

/// Parses a workbook from either reader strategy's byte source.
pub(crate) fn read_workbook(reader: SourceReader) -> Result<Workbook, SheetError> {
    let mut zip = ZipArchive::new(reader)?;
    let (sheet_parts, epoch_1904) = load_workbook(&mut zip)?;

    // Advanced-construct short circuit: a broken styles part must not abort
    // the parse, it only costs date/time detection.
    let datetime_formats = match load_number_formats(&mut zip) {
        Ok(formats) => formats,
        Err(error) => {
            warn!("Skipping malformed styles part: {error}");
            Vec::new()
        }
    };

    let shared_strings = load_shared_strings(&mut zip)?;
    let mut sheets = Vec::with_capacity(sheet_parts.len());
    for (sheet_name, zip_path) in &sheet_parts {
        let sheet = read_sheet(
            &mut zip,
            sheet_name,
            zip_path,
            &datetime_formats,
            &shared_strings,
            epoch_1904,
        )?;
        sheets.push(sheet);
    }
    Ok(Workbook { sheets })
}

/// Loads part relationships from a `.rels` file as an id-to-target map.
fn load_relationships(
    zip: &mut ZipArchive<SourceReader>,
    path: &str,
) -> Result<HashMap<String, String>, SheetError> {
    let mut relationships: HashMap<String, String> = HashMap::new();
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP.as_ref() => {
            let id = event.get_attribute_value("Id")?;
            let target = event.get_attribute_value("Target")?;
            if let Some((id, target)) = id.zip(target) {
                relationships.insert(id.to_string(), target.to_string());
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to its location within the archive.
fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(stripped) = path.strip_prefix("/xl/") {
        format!("xl/{stripped}")
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Loads worksheet names/paths and the date system from `workbook.xml`.
fn load_workbook(
    zip: &mut ZipArchive<SourceReader>,
) -> Result<(Vec<(String, String)>, bool), SheetError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "missing xl/workbook.xml")
    })?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut epoch_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<'_, str>>;
            let mut id = None::<Cow<'_, str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.unescape_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.unescape_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(target) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), to_zip_path(Cow::from(target.as_str()))));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            epoch_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, epoch_1904))
}

/// Loads cell format indexes from `styles.xml` as a per-index flag telling
/// whether the format renders its number as a date/time.
fn load_number_formats(zip: &mut ZipArchive<SourceReader>) -> Result<Vec<bool>, SheetError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, bool>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), is_custom_datetime_format(&format));
            }
        }

        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            if let Some(id) = event.get_attribute_value("numFmtId")? {
                format_indexes.push(id.to_string());
            }
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .unwrap_or_else(|| is_builtin_datetime_format(id))
        })
        .collect())
}

/// Loads the shared string table, preserving rich-text runs.
fn load_shared_strings(zip: &mut ZipArchive<SourceReader>) -> Result<Vec<CellValue>, SheetError> {
    let mut shared_strings = Vec::<CellValue>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            let runs = read_string_runs(&mut reader, TAG_SHARED_STRING_ITEM)?;
            shared_strings.push(runs_to_value(runs));
        }
    });
    Ok(shared_strings)
}

/// Folds string runs into a cell value: zero or one run is plain text, more
/// than one preserves the rich-text structure for the normalizer.
fn runs_to_value(mut runs: Vec<String>) -> CellValue {
    match runs.len() {
        0 => CellValue::Text(String::new()),
        1 => CellValue::Text(runs.remove(0)),
        _ => CellValue::RichText(runs),
    }
}

/// Reads one worksheet part into a grid.
fn read_sheet(
    zip: &mut ZipArchive<SourceReader>,
    sheet_name: &str,
    zip_path: &str,
    datetime_formats: &[bool],
    shared_strings: &[CellValue],
    epoch_1904: bool,
) -> Result<Worksheet, SheetError> {
    let mut sheet = Worksheet::new(sheet_name);
    // Hyperlinks reference cells by `ref` and resolve targets through the
    // sheet's own relationship part, read after the grid.
    let mut hyperlinks: Vec<(String, Option<String>, Option<String>, Option<String>)> = Vec::new();

    {
        let mut reader = zip.xml_reader(zip_path)?.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("missing worksheet part '{zip_path}'"),
            )
        })?;

        let mut row_count = 0usize; // completed rows, for cells without a reference
        let mut col_count = 0usize; // cells seen in the current row
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = RawKind::Number;
        let mut datetime_style = false;
        let mut saw_formula = false;
        let mut value: Option<String> = None;
        let mut inline_runs: Option<Vec<String>> = None;

        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_DIMENSION => {
                if let Some(reference) = event.get_attribute_value("ref")? {
                    let corner = reference.rsplit(':').next().unwrap_or_default();
                    if let Some((rows, cols)) = reference_to_index(corner) {
                        sheet.reported_rows = Some(rows);
                        sheet.reported_cols = Some(cols);
                    }
                }
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
                col_count = 0;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count + 1, col_count + 1));
                col_count += 1;
                saw_formula = false;
                value = None;
                inline_runs = None;
                kind = event.get_attribute_value("t")?.map(|t| {
                    match t.as_ref() {
                        "inlineStr" => RawKind::InlineString,
                        "str" => RawKind::FormulaString,
                        "s" => RawKind::SharedString,
                        "d" => RawKind::IsoDate,
                        "b" => RawKind::Boolean,
                        "e" => RawKind::Error,
                        _ => RawKind::Number,
                    }
                }).unwrap_or(RawKind::Number);
                datetime_style = false;
                if kind == RawKind::Number {
                    if let Some(style) = event.get_attribute_value("s")? {
                        // A malformed style index costs date detection for
                        // this cell, never the whole parse
                        match style.parse::<usize>() {
                            Ok(index) => {
                                datetime_style =
                                    datetime_formats.get(index).copied().unwrap_or(false);
                            }
                            Err(_) if style.is_empty() => (),
                            Err(_) => warn!("Ignoring malformed style index '{style}'"),
                        }
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_FORMULA => saw_formula = true,
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                inline_runs = Some(read_string_runs(&mut reader, TAG_INLINE_STRING)?);
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = Some(read_element_text(&mut reader, TAG_VALUE)?);
            }
            Event::End(event) if event.name() == TAG_CELL => {
                let built = build_cell_value(
                    kind,
                    datetime_style,
                    saw_formula,
                    value.take(),
                    inline_runs.take(),
                    shared_strings,
                    epoch_1904,
                );
                if let Some(built) = built {
                    sheet.push(row, col, built);
                }
            }
            Event::Start(event) if event.name() == TAG_HYPERLINK => {
                let mut reference = None::<String>;
                let mut display = None::<String>;
                let mut location = None::<String>;
                let mut id = None::<String>;
                for result in event.attributes() {
                    let attribute = result?;
                    match attribute.key.local_name().as_ref() {
                        b"ref" => reference = Some(attribute.unescape_value()?.to_string()),
                        b"display" => display = Some(attribute.unescape_value()?.to_string()),
                        b"location" => location = Some(attribute.unescape_value()?.to_string()),
                        b"id" => id = Some(attribute.unescape_value()?.to_string()),
                        _ => (),
                    }
                }
                if let Some(reference) = reference {
                    hyperlinks.push((reference, display, location, id));
                }
            }
        });
    }

    if !hyperlinks.is_empty() {
        resolve_hyperlinks(zip, zip_path, &mut sheet, hyperlinks)?;
    }
    Ok(sheet)
}

/// Builds the final cell value from everything seen inside one `<c>` element.
/// Returns `None` for cells that carry no data at all.
fn build_cell_value(
    kind: RawKind,
    datetime_style: bool,
    saw_formula: bool,
    value: Option<String>,
    inline_runs: Option<Vec<String>>,
    shared_strings: &[CellValue],
    epoch_1904: bool,
) -> Option<CellValue> {
    let built = match kind {
        RawKind::Boolean => value.map(|value| CellValue::Bool(value == "1")),
        RawKind::Error => value.map(CellValue::Error),
        RawKind::IsoDate => value.map(CellValue::Text),
        RawKind::SharedString => value.and_then(|value| {
            let index = value.parse::<usize>().ok()?;
            shared_strings.get(index).cloned()
        }),
        RawKind::InlineString => inline_runs.map(runs_to_value),
        RawKind::FormulaString => value.map(CellValue::Text),
        RawKind::Number => value.map(|value| match value.parse::<f64>() {
            Ok(number) if datetime_style => CellValue::DateTime {
                serial: number,
                epoch_1904,
            },
            Ok(number) => CellValue::Number(number),
            // Keep the raw text rather than losing the cell
            Err(_) => CellValue::Text(value),
        }),
    };

    if saw_formula {
        Some(CellValue::Formula {
            cached: built.map(Box::new),
        })
    } else {
        built
    }
}

/// Replaces hyperlinked cells with a hyperlink value carrying display text
/// and the resolved target from the worksheet's relationship part.
fn resolve_hyperlinks(
    zip: &mut ZipArchive<SourceReader>,
    zip_path: &str,
    sheet: &mut Worksheet,
    hyperlinks: Vec<(String, Option<String>, Option<String>, Option<String>)>,
) -> Result<(), SheetError> {
    let relationships = match sheet_relationships_path(zip_path) {
        Some(path) => load_relationships(zip, &path).unwrap_or_else(|error| {
            warn!("Skipping unreadable sheet relationships: {error}");
            HashMap::new()
        }),
        None => HashMap::new(),
    };
    for (reference, display, location, id) in hyperlinks {
        let Some((row, col)) = reference_to_index(&reference) else {
            continue;
        };
        let target = id
            .and_then(|id| relationships.get(&id).cloned())
            .or(location);
        let text = display.or_else(|| sheet.get(row, col).and_then(CellValue::as_text));
        sheet.push(row, col, CellValue::Hyperlink { text, target });
    }
    Ok(())
}

/// Relationship part path for a worksheet part:
/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`.
fn sheet_relationships_path(zip_path: &str) -> Option<String> {
    let (directory, file_name) = zip_path.rsplit_once('/')?;
    Some(format!("{directory}/_rels/{file_name}.rels"))
}

/// Reads the string runs of a shared or inline string item, skipping
/// phonetic annotations. Each `<t>` element contributes one run.
fn read_string_runs(
    reader: &mut XmlReader<BufReader<ZipFile<'_, SourceReader>>>,
    end_tag: QName,
) -> Result<Vec<String>, SheetError> {
    let mut runs = Vec::<String>::new();
    let mut current = String::new();
    let mut is_phonetic = false;
    let mut is_text = false;
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic = false,
        Event::Start(event) if !is_phonetic && event.name() == TAG_TEXT => {
            is_text = true;
            current.clear();
        }
        Event::End(event) if is_text && event.name() == TAG_TEXT => {
            is_text = false;
            runs.push(std::mem::take(&mut current));
        }
        Event::Text(event) if is_text => current.push_bytes_text(&event)?,
        Event::CData(event) if is_text => current.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => current.push_bytes_ref(&event)?,
    });
    Ok(runs)
}

/// Reads the plain text content of an element up to its end tag.
fn read_element_text(
    reader: &mut XmlReader<BufReader<ZipFile<'_, SourceReader>>>,
    end_tag: QName,
) -> Result<String, SheetError> {
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Text(event) => text.push_bytes_text(&event)?,
        Event::CData(event) => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
