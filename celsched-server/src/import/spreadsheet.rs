//! Workbook decoding
//!
//! Turns the first worksheet of an uploaded `.xlsx`/`.xls` file into a
//! row-major grid of cell text where `grid[0][0]` is always cell A1.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use thiserror::Error;

/// Workbook could not be turned into a grid
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("Failed to parse Excel file: {0}")]
    Parse(String),

    #[error("Excel file has no sheets")]
    NoSheets,

    #[error("Failed to read sheet data: {0}")]
    ReadSheet(String),
}

/// Accepted upload extensions, compared case-insensitively
pub fn is_spreadsheet_filename(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}

/// Decode the first worksheet into rows of cell text
///
/// Calamine reports only the used range, so leading empty rows and columns
/// are padded back in to keep spreadsheet coordinates stable. Trailing empty
/// cells in a row are dropped.
pub fn read_first_sheet(bytes: Vec<u8>) -> Result<Vec<Vec<String>>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| SpreadsheetError::Parse(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SpreadsheetError::NoSheets)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SpreadsheetError::ReadSheet(e.to_string()))?;

    let Some((start_row, start_col)) = range.start() else {
        return Ok(Vec::new());
    };

    let mut grid: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells: Vec<String> = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_text));
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        grid.push(cells);
    }

    Ok(grid)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
