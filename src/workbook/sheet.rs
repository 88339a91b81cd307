use crate::workbook::cell::CellValue;
use std::collections::HashMap;

/// A single worksheet as a sparse grid of cells.
///
/// Rows and columns are 1-based to match spreadsheet conventions; whatever
/// position a reader claims is stored verbatim, including a bogus row 0 from
/// a corrupt document, and the extractor decides what to do with it.
#[derive(Debug)]
pub(crate) struct Worksheet {
    /// Sheet name
    pub(crate) name: String,
    /// Row count declared by the document, if any
    pub(crate) reported_rows: Option<usize>,
    /// Column count declared by the document, if any
    pub(crate) reported_cols: Option<usize>,
    /// Populated cells in document order
    cells: Vec<GridCell>,
    /// Index from (row, column) to cell vector position
    indexes: HashMap<(usize, usize), usize>,
    /// Largest populated row number
    max_row: Option<usize>,
    /// Largest populated column number
    max_col: Option<usize>,
}

#[derive(Debug)]
struct GridCell {
    row: usize,
    col: usize,
    value: CellValue,
}

impl Worksheet {
    pub(crate) fn new(name: &str) -> Worksheet {
        Worksheet {
            name: name.to_owned(),
            reported_rows: None,
            reported_cols: None,
            cells: Vec::new(),
            indexes: HashMap::new(),
            max_row: None,
            max_col: None,
        }
    }

    /// Adds a cell, replacing any previous value at the same position.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: CellValue) {
        if let Some(index) = self.indexes.get(&(row, col)) {
            self.cells[*index].value = value;
            return;
        }
        self.indexes.insert((row, col), self.cells.len());
        self.cells.push(GridCell { row, col, value });
        if self.max_row.map(|max| max < row).unwrap_or(true) {
            self.max_row = Some(row);
        }
        if self.max_col.map(|max| max < col).unwrap_or(true) {
            self.max_col = Some(col);
        }
    }

    /// Gets the cell value at a position, if populated.
    pub(crate) fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.indexes
            .get(&(row, col))
            .map(|index| &self.cells[*index].value)
    }

    /// Row numbers of populated cells, in document order. Row numbers repeat
    /// when a row's cells are not adjacent in the source; callers dedupe.
    pub(crate) fn row_numbers(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells.iter().map(|cell| cell.row)
    }

    /// Largest populated row number observed while loading.
    pub(crate) fn max_row(&self) -> Option<usize> {
        self.max_row
    }

    /// Largest populated column number observed while loading.
    pub(crate) fn max_col(&self) -> Option<usize> {
        self.max_col
    }

    /// True when a row has at least one non-empty cell within the bound.
    pub(crate) fn row_has_data(&self, row: usize, col_bound: usize) -> bool {
        (1..=col_bound).any(|col| {
            self.get(row, col)
                .map(|value| !value.is_empty())
                .unwrap_or(false)
        })
    }
}
