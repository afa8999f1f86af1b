/*!
Writing reports out as `.xlsx` workbooks.

Each workbook has a single sheet: one bold header row followed by one row per
record.
*/
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::feedback::{Average, Response};

pub const XLSX_MIME: &str =
"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub static AVERAGE_HEADERS: &[&str] = &["Subject", "Criteria", "Average Rating"];
pub static RESPONSE_HEADERS: &[&str] = &["Student ID", "Subject", "Criteria", "Rating"];

/// Most characters Excel will hold in one cell.
pub const MAX_CELL_CHARS: usize = 32_767;

/// `text` cut down to what fits in a cell.
fn cell_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => {
            log::warn!(
                "Truncating {}-character value to {} characters for export.",
                text.chars().count(), MAX_CELL_CHARS
            );
            &text[..end]
        },
        None => text,
    }
}

fn write_text(sheet: &mut Worksheet, row: u32, col: u16, text: &str) -> Result<(), XlsxError> {
    sheet.write_string(row, col, cell_text(text))?;
    Ok(())
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, h) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *h, &bold)?;
    }
    Ok(())
}

fn xlsx_err(e: XlsxError) -> String {
    format!("Error generating spreadsheet: {}", &e)
}

/// Serialize per-criterion averages.
pub fn averages_to_xlsx(averages: &[Average]) -> Result<Vec<u8>, String> {
    log::trace!("averages_to_xlsx( [ {} averages ] ) called.", averages.len());

    let mut book = Workbook::new();
    let sheet = book.add_worksheet();
    sheet.set_name("Feedback").map_err(xlsx_err)?;
    write_headers(sheet, AVERAGE_HEADERS).map_err(xlsx_err)?;

    for (n, a) in averages.iter().enumerate() {
        let row = (n + 1) as u32;
        write_text(sheet, row, 0, &a.subject).map_err(xlsx_err)?;
        write_text(sheet, row, 1, &a.criterion).map_err(xlsx_err)?;
        sheet.write_number(row, 2, a.average).map_err(xlsx_err)?;
    }
    sheet.set_column_width(0, 24).map_err(xlsx_err)?;
    sheet.set_column_width(1, 48).map_err(xlsx_err)?;

    book.save_to_buffer().map_err(xlsx_err)
}

/// Serialize raw per-student rows.
pub fn responses_to_xlsx(responses: &[Response]) -> Result<Vec<u8>, String> {
    log::trace!("responses_to_xlsx( [ {} responses ] ) called.", responses.len());

    let mut book = Workbook::new();
    let sheet = book.add_worksheet();
    sheet.set_name("Responses").map_err(xlsx_err)?;
    write_headers(sheet, RESPONSE_HEADERS).map_err(xlsx_err)?;

    for (n, r) in responses.iter().enumerate() {
        let row = (n + 1) as u32;
        write_text(sheet, row, 0, &r.student_id).map_err(xlsx_err)?;
        write_text(sheet, row, 1, &r.subject).map_err(xlsx_err)?;
        write_text(sheet, row, 2, &r.criterion).map_err(xlsx_err)?;
        sheet.write_number(row, 3, r.rating as f64).map_err(xlsx_err)?;
    }
    sheet.set_column_width(1, 24).map_err(xlsx_err)?;
    sheet.set_column_width(2, 48).map_err(xlsx_err)?;

    book.save_to_buffer().map_err(xlsx_err)
}
