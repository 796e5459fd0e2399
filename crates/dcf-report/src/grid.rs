//! In-memory worksheet contents.
//!
//! A [`SheetGrid`] is the bridge between the template reader and the workbook
//! writer. Rows and columns are 1-based, the way spreadsheet users count them.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{Data, DataType, Reader, Xlsx, open_workbook};
use dcf_core::{DcfError, Result};
use tracing::debug;

/// Contents of a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
    /// Boolean value.
    Bool(bool),
    /// Formula, with or without the leading `=`.
    Formula(String),
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A cell value and its optional Excel number format (e.g. `0.00%`).
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Cell contents.
    pub value: CellValue,
    /// Excel number format code.
    pub number_format: Option<String>,
}

/// Sparse grid of cells plus column widths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    name: String,
    cells: BTreeMap<(u32, u16), Cell>,
    column_widths: BTreeMap<u16, f64>,
}

impl SheetGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Loads the first worksheet of an `.xlsx` file, keeping formulas.
    ///
    /// # Errors
    /// Returns a report error if the file cannot be opened or has no worksheet.
    pub fn from_xlsx(path: &Path) -> Result<Self> {
        let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
            DcfError::report(format!(
                "Could not Generate Report. Error reading template {}",
                path.display()
            ))
            .with_cause(e)
        })?;

        let name = workbook.sheet_names().first().cloned().ok_or_else(|| {
            DcfError::report(format!("Template {} has no worksheets", path.display()))
        })?;

        let values = workbook.worksheet_range(&name).map_err(|e| {
            DcfError::report(format!("Could not read worksheet '{name}'")).with_cause(e)
        })?;
        let formulas = workbook.worksheet_formula(&name).map_err(|e| {
            DcfError::report(format!("Could not read formulas of worksheet '{name}'"))
                .with_cause(e)
        })?;

        let mut grid = Self::new(name);

        if let Some((start_row, start_col)) = values.start() {
            for (row, col, data) in values.used_cells() {
                if let Some(value) = cell_value(data) {
                    grid.set(
                        to_row(start_row, row),
                        to_col(start_col, col),
                        value,
                    );
                }
            }
        }

        if let Some((start_row, start_col)) = formulas.start() {
            for (row, col, formula) in formulas.used_cells() {
                if !formula.is_empty() {
                    grid.set(
                        to_row(start_row, row),
                        to_col(start_col, col),
                        CellValue::Formula(formula.clone()),
                    );
                }
            }
        }

        debug!(sheet = %grid.name, cells = grid.len(), "Loaded template");
        Ok(grid)
    }

    /// Worksheet name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the value of a cell, keeping its number format.
    pub fn set(&mut self, row: u32, col: u16, value: impl Into<CellValue>) {
        let value = value.into();
        match self.cells.get_mut(&(row, col)) {
            Some(cell) => cell.value = value,
            None => {
                self.cells.insert(
                    (row, col),
                    Cell {
                        value,
                        number_format: None,
                    },
                );
            }
        }
    }

    /// Sets the value and number format of a cell.
    pub fn set_with_format(
        &mut self,
        row: u32,
        col: u16,
        value: impl Into<CellValue>,
        number_format: &str,
    ) {
        self.cells.insert(
            (row, col),
            Cell {
                value: value.into(),
                number_format: Some(number_format.to_string()),
            },
        );
    }

    /// Returns the cell at `row`, `col`.
    #[must_use]
    pub fn get(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Returns the value at `row`, `col`.
    #[must_use]
    pub fn value(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.get(row, col).map(|cell| &cell.value)
    }

    /// Sets the width of a column, in Excel character units.
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u16), &Cell)> {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Column widths by column.
    pub fn column_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.column_widths.iter().map(|(col, width)| (*col, *width))
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the grid has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn to_row(start: u32, offset: usize) -> u32 {
    start + offset as u32 + 1
}

fn to_col(start: u32, offset: usize) -> u16 {
    (start as usize + offset + 1) as u16
}

fn cell_value(data: &Data) -> Option<CellValue> {
    match data {
        Data::Empty => None,
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        other => Some(
            other
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(other.to_string())),
        ),
    }
}
