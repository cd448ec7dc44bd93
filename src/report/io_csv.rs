// Primitives for reading CSV files.

use canvass_analysis::SheetContents;
use log::debug;
use snafu::prelude::*;

use crate::report::io_common::rows_to_columns;
use crate::report::{CsvLineParseSnafu, CsvOpenSnafu, ReportResult};

/// Reads a sheet from a CSV file. The first row holds the column names.
pub fn read_csv_sheet(path: &str) -> ReportResult<SheetContents> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;

    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        // The line numbers start at 1 to respect most conventions in the spreadsheet world
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if header.is_none() {
            debug!("read_csv_sheet: header: {:?}", cells);
            header = Some(cells);
        } else {
            rows.push(cells);
        }
    }
    debug!("read_csv_sheet: {:?}: {} rows", path, rows.len());
    Ok(rows_to_columns(&header.unwrap_or_default(), &rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_columns() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sheet.csv");
        fs::write(
            &p,
            "RecId,Address,PrecinctName\nr1,\"12 Main St, Apt 2\",P1\nr2,14 Main St,P2\n",
        )
        .unwrap();
        let res = read_csv_sheet(&p.display().to_string()).unwrap();
        assert_eq!(res.keys().collect::<Vec<_>>(), vec!["RecId", "Address", "PrecinctName"]);
        assert_eq!(res.get("Address").unwrap(), &vec!["12 Main St, Apt 2", "14 Main St"]);
    }

    #[test]
    fn empty_file_has_no_columns() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("empty.csv");
        fs::write(&p, "").unwrap();
        let res = read_csv_sheet(&p.display().to_string()).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn missing_file() {
        assert!(read_csv_sheet("/nonexistent/sheet.csv").is_err());
    }
}
