//! Workbook codec: byte buffers to [`Sheet`]s and back.
//!
//! Reading goes through `calamine`, writing through `rust_xlsxwriter`; both
//! sides only ever touch the first sheet of a single-sheet workbook.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::StoreError;
use crate::mirror::SheetCodec;
use crate::sheet::Sheet;

pub struct XlsxCodec;

impl SheetCodec for XlsxCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Sheet, StoreError> {
        let mut workbook = Xlsx::new(Cursor::new(bytes))?;
        let name = workbook.sheet_names().first().cloned().unwrap_or_default();
        let Some(range) = workbook.worksheet_range_at(0) else {
            return Ok(Sheet {
                name,
                header: Vec::new(),
                rows: Vec::new(),
            });
        };
        let range = range?;
        let mut rows = range.rows();
        let header = rows
            .next()
            .map(|row| row.iter().map(cell_to_string).collect())
            .unwrap_or_default();
        let rows = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        Ok(Sheet { name, header, rows })
    }

    fn encode(&self, sheet: &Sheet) -> Result<Vec<u8>, StoreError> {
        let mut workbook = Workbook::new();
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&sheet.name)?;
        for (col, label) in sheet.header.iter().enumerate() {
            worksheet.write_string(0, col as u16, label)?;
        }
        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                worksheet.write_string((r + 1) as u32, c as u16, value)?;
            }
        }
        workbook.push_worksheet(worksheet);
        Ok(workbook.save_to_buffer()?)
    }
}

/// Integral floats print without the trailing `.0` so numeric id cells read
/// back as the digits that were written.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
