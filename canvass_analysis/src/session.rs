//! Read-only access to a sheet and its change history, fetched once per session.

use std::sync::Arc;

use log::{debug, info};

use crate::changelog::ChangeLog;
use crate::config::{AnalysisErrors, EditEvent, SheetContents, SheetInfo};
use crate::household::HouseholdResolver;

/// Where the raw data comes from: a sheet service, a set of local files, etc.
///
/// Implementations do the I/O. Failures are reported as [`AnalysisErrors::Source`].
pub trait SheetSource {
    fn info(&self) -> Result<SheetInfo, AnalysisErrors>;

    fn contents(&self) -> Result<SheetContents, AnalysisErrors>;

    /// Delivers every edit event, in the order of the change history. This may be
    /// paginated behind the scenes.
    fn for_each_delta(
        &self,
        callback: &mut dyn FnMut(EditEvent),
    ) -> Result<(), AnalysisErrors>;
}

/// Receives coarse progress messages during long fetches. An empty message means done.
pub type Progress<'a> = Option<&'a dyn Fn(&str)>;

struct Fetched {
    info: SheetInfo,
    contents: SheetContents,
    deltas: Arc<Vec<EditEvent>>,
}

/// Fetches the sheet data on first use and hands out analysis objects over it.
pub struct AnalysisSession<S: SheetSource> {
    source: S,
    fetched: Option<Fetched>,
}

impl<S: SheetSource> AnalysisSession<S> {
    pub fn new(source: S) -> AnalysisSession<S> {
        AnalysisSession {
            source,
            fetched: None,
        }
    }

    fn init(&mut self, progress: Progress) -> Result<&Fetched, AnalysisErrors> {
        if self.fetched.is_none() {
            let report = |msg: &str| {
                if let Some(cb) = progress {
                    cb(msg);
                }
            };
            report("getting sheet info");
            let info = self.source.info()?;

            report(&format!(
                "getting sheet contents (for {} rows)",
                info.count_records
            ));
            let contents = self.source.contents()?;

            report("getting deltas");
            let mut deltas: Vec<EditEvent> = Vec::new();
            self.source.for_each_delta(&mut |item| deltas.push(item))?;
            info!(
                "AnalysisSession: sheet {:?}: {} deltas fetched",
                info.name,
                deltas.len()
            );
            report("");
            self.fetched = Some(Fetched {
                info,
                contents,
                deltas: Arc::new(deltas),
            });
        } else {
            debug!("AnalysisSession: already initialized");
        }
        self.fetched.as_ref().ok_or_else(|| AnalysisErrors::Source {
            message: "session was not initialized".to_string(),
        })
    }

    pub fn sheet_info(&mut self, progress: Progress) -> Result<SheetInfo, AnalysisErrors> {
        Ok(self.init(progress)?.info.clone())
    }

    pub fn contents(&mut self, progress: Progress) -> Result<&SheetContents, AnalysisErrors> {
        Ok(&self.init(progress)?.contents)
    }

    pub fn householder(&mut self, progress: Progress) -> Result<HouseholdResolver, AnalysisErrors> {
        HouseholdResolver::new(&self.init(progress)?.contents)
    }

    /// All the changes in the sheet, optionally restricted to one user.
    pub fn all_changes(
        &mut self,
        filter_user: Option<&str>,
        progress: Progress,
    ) -> Result<ChangeLog, AnalysisErrors> {
        let fetched = self.init(progress)?;
        ChangeLog::with_filter(fetched.deltas.clone(), filter_user)
    }
}
