use std::cell::RefCell;

use canvass_analysis::{AnalysisErrors, EditEvent, SheetContents, SheetInfo, SheetSource};
use log::debug;

use crate::report::config_reader::{SheetFile, SheetProvider};
use crate::report::io_common::simplify_file_name;
use crate::report::io_csv::read_csv_sheet;
use crate::report::io_deltas::read_deltas;
use crate::report::io_excel::read_excel_sheet;
use crate::report::{ReportError, ReportResult};

/// A sheet and its edit history stored in local files.
///
/// Both inputs are optional: a missing sheet has no columns and missing deltas have no
/// events. The files are read at most once.
pub struct FileSheetSource {
    sheet: Option<SheetFile>,
    deltas_path: Option<String>,
    contents: RefCell<Option<SheetContents>>,
    deltas: RefCell<Option<Vec<EditEvent>>>,
}

fn source_error(e: ReportError) -> AnalysisErrors {
    AnalysisErrors::Source {
        message: e.to_string(),
    }
}

impl FileSheetSource {
    pub fn new(sheet: Option<SheetFile>, deltas_path: Option<String>) -> FileSheetSource {
        FileSheetSource {
            sheet,
            deltas_path,
            contents: RefCell::new(None),
            deltas: RefCell::new(None),
        }
    }

    fn read_sheet(&self) -> ReportResult<SheetContents> {
        match &self.sheet {
            Some(SheetFile {
                path,
                provider: SheetProvider::Csv,
                ..
            }) => read_csv_sheet(path),
            Some(SheetFile {
                path,
                provider: SheetProvider::Xlsx,
                worksheet_name,
            }) => read_excel_sheet(path, worksheet_name.as_deref()),
            None => Ok(SheetContents::new()),
        }
    }

    fn read_deltas(&self) -> ReportResult<Vec<EditEvent>> {
        match &self.deltas_path {
            Some(path) => read_deltas(path),
            None => Ok(Vec::new()),
        }
    }

    fn load(&self) -> ReportResult<()> {
        if self.contents.borrow().is_none() {
            let contents = self.read_sheet()?;
            *self.contents.borrow_mut() = Some(contents);
        }
        if self.deltas.borrow().is_none() {
            let deltas = self.read_deltas()?;
            *self.deltas.borrow_mut() = Some(deltas);
        }
        Ok(())
    }
}

impl SheetSource for FileSheetSource {
    fn info(&self) -> Result<SheetInfo, AnalysisErrors> {
        self.load().map_err(source_error)?;
        let count_records = self
            .contents
            .borrow()
            .as_ref()
            .and_then(|c| c.values().next().map(|col| col.len()))
            .unwrap_or(0);
        let latest_version = self
            .deltas
            .borrow()
            .as_ref()
            .and_then(|d| d.iter().map(|e| e.version).max())
            .unwrap_or(0);
        let name = self
            .sheet
            .as_ref()
            .map(|s| simplify_file_name(&s.path))
            .unwrap_or_default();
        debug!(
            "FileSheetSource::info: {:?} {} records, latest version {}",
            name, count_records, latest_version
        );
        Ok(SheetInfo {
            name,
            count_records: count_records as u64,
            latest_version,
        })
    }

    fn contents(&self) -> Result<SheetContents, AnalysisErrors> {
        match self.contents.borrow_mut().take() {
            Some(c) => Ok(c),
            None => self.read_sheet().map_err(source_error),
        }
    }

    fn for_each_delta(
        &self,
        callback: &mut dyn FnMut(EditEvent),
    ) -> Result<(), AnalysisErrors> {
        let deltas = match self.deltas.borrow_mut().take() {
            Some(d) => d,
            None => self.read_deltas().map_err(source_error)?,
        };
        for d in deltas {
            callback(d);
        }
        Ok(())
    }
}
