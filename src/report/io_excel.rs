use calamine::{open_workbook, DataType, Reader, Xlsx};
use canvass_analysis::SheetContents;
use log::debug;
use snafu::prelude::*;

use crate::report::io_common::rows_to_columns;
use crate::report::{EmptyExcelSnafu, MissingWorksheetSnafu, OpeningExcelSnafu, ReportResult};

/// Reads a sheet from an Excel workbook. The first row holds the column names.
///
/// Without a worksheet name, the first worksheet is used.
pub fn read_excel_sheet(path: &str, worksheet_name: Option<&str>) -> ReportResult<SheetContents> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };

    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => row.iter().map(read_cell).collect(),
        None => Vec::new(),
    };
    debug!("read_excel_sheet: header: {:?}", header);
    let rows: Vec<Vec<String>> = iter
        .map(|row| row.iter().map(read_cell).collect())
        .collect();
    debug!("read_excel_sheet: {:?}: {} rows", path, rows.len());
    Ok(rows_to_columns(&header, &rows))
}

// Whole numbers are stored as floats: 12.0 is rendered as "12".
fn read_cell(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::Empty), "");
        assert_eq!(read_cell(&DataType::Float(98052.0)), "98052");
        assert_eq!(read_cell(&DataType::Float(47.5)), "47.5");
        assert_eq!(read_cell(&DataType::Int(-3)), "-3");
        assert_eq!(read_cell(&DataType::String("P1".to_string())), "P1");
    }

    #[test]
    fn missing_workbook() {
        assert!(matches!(
            read_excel_sheet("/nonexistent/sheet.xlsx", None),
            Err(crate::report::ReportError::OpeningExcel { .. })
        ));
    }
}
