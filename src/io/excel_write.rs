use std::fs;
use std::io::Write;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Result, ToolError};
use crate::model::RowSet;

/// Excel's maximum number of characters in one cell.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Sheets to export, in workbook order.
pub type Sheets = Vec<(String, RowSet)>;

/// Writes one sheet per entry to `path`.
///
/// The workbook is rendered in memory and moved into place with a rename,
/// so `path` either holds the complete workbook or is left untouched. Any
/// failure comes back as [`ToolError::Export`].
pub fn write_workbook(path: &Path, sheets: &[(String, RowSet)]) -> Result<()> {
    write_atomically(path, sheets).map_err(|source| ToolError::Export {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn write_atomically(path: &Path, sheets: &[(String, RowSet)]) -> Result<()> {
    let buffer = render(sheets)?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(&buffer)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| error.error)?;
    debug!(path = %path.display(), bytes = buffer.len(), "workbook persisted");
    Ok(())
}

/// Renders the workbook to xlsx bytes.
pub fn render(sheets: &[(String, RowSet)]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for (sheet_name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;
        write_sheet(worksheet, sheet_name, rows, &header_format)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet_name: &str,
    rows: &RowSet,
    header_format: &Format,
) -> Result<()> {
    for (col_idx, header) in rows.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col_idx as u16, header, header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (row_idx, row) in rows.rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let text = match cell {
                Value::Null => continue,
                Value::Bool(value) => {
                    worksheet.write_boolean(excel_row, col_idx as u16, *value)?;
                    continue;
                }
                Value::Number(number) => match number.as_f64() {
                    Some(value) => {
                        worksheet.write_number(excel_row, col_idx as u16, value)?;
                        continue;
                    }
                    None => number.to_string(),
                },
                Value::String(text) => text.clone(),
                nested @ (Value::Array(_) | Value::Object(_)) => serde_json::to_string(nested)?,
            };
            let column = rows.columns.get(col_idx).map(String::as_str).unwrap_or_default();
            let text = fit_cell_text(text, sheet_name, column, excel_row);
            worksheet.write_string(excel_row, col_idx as u16, text)?;
        }
    }
    Ok(())
}

/// Cuts `text` to Excel's per-cell limit so one oversized field cannot fail
/// the whole workbook.
fn fit_cell_text(mut text: String, sheet: &str, column: &str, row: u32) -> String {
    if let Some((cut, _)) = text.char_indices().nth(MAX_CELL_CHARS) {
        warn!(
            sheet,
            column,
            row,
            limit = MAX_CELL_CHARS,
            "cell text exceeds Excel limit, truncating"
        );
        text.truncate(cut);
    }
    text
}
