use std::path::Path;

use canvass_analysis::SheetContents;
use log::{debug, warn};

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Turns rows (the first one being the header) into columns.
///
/// Short rows are padded with empty cells. Cells beyond the header are dropped.
pub fn rows_to_columns(header: &[String], rows: &[Vec<String>]) -> SheetContents {
    let mut columns: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); header.len()];
    for (lineno, row) in rows.iter().enumerate() {
        if row.len() > header.len() {
            warn!(
                "rows_to_columns: row {} has {} cells, only {} columns in the header",
                lineno + 1,
                row.len(),
                header.len()
            );
        }
        for (idx, col) in columns.iter_mut().enumerate() {
            col.push(row.get(idx).cloned().unwrap_or_default());
        }
    }

    let mut res = SheetContents::new();
    for (name, col) in header.iter().zip(columns) {
        if res.add(name.trim(), col).is_some() {
            warn!("rows_to_columns: duplicate column {:?}, keeping the last one", name);
        }
    }
    debug!(
        "rows_to_columns: {} columns, {} rows",
        res.len(),
        rows.len()
    );
    res
}
