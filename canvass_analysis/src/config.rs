// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

use chrono::Duration;

pub use crate::collections::Dict;

/// A column-oriented table: column name -> cell values, all columns aligned by row index.
///
/// This is the shape of both the sheet snapshot and the payload of a single edit, and it
/// is also the shape of every report produced by this crate.
pub type SheetContents = Dict<Vec<String>>;

/// Well-known column names of the canvassing sheets.
///
/// The `X` prefix marks columns that are written by the collection apps rather than
/// imported with the voter file.
pub mod column_names {
    pub const REC_ID: &str = "RecId";
    pub const ADDRESS: &str = "Address";
    pub const CITY: &str = "City";
    pub const ZIP: &str = "Zip";
    pub const PRECINCT_NAME: &str = "PrecinctName";
    pub const PARTY: &str = "Party";
    pub const RESULT_OF_CONTACT: &str = "ResultOfContact";
    pub const X_TARGET_PRI: &str = "XTargetPri";
    pub const X_USER: &str = "XUser";
    pub const X_APP: &str = "XApp";
    pub const X_IP_ADDRESS: &str = "XIPAddress";
    pub const X_LAT: &str = "XLat";
    pub const X_LONG: &str = "XLong";
    pub const X_LAST_MODIFIED: &str = "XLastModified";
}

/// One logged change submission.
///
/// A single version may touch several records and several columns. The payload in `value`
/// always carries the `RecId` column; every other column lists the new values, aligned
/// with the record ids.
#[derive(PartialEq, Debug, Clone)]
pub struct EditEvent {
    pub version: u64,
    pub user: String,
    pub app: String,
    pub user_ip: String,
    /// Server-side timestamp, as sent by the sheet service.
    pub timestamp: String,
    pub geo_lat: String,
    pub geo_long: String,
    pub value: SheetContents,
}

/// Size and metadata of a sheet, as reported by the sheet service.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SheetInfo {
    pub name: String,
    pub count_records: u64,
    pub latest_version: u64,
}

// ********* Configuration **********

/// Controls the session clustering.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ClusterOptions {
    /// Two consecutive edits further apart than this start a new cluster.
    /// Edits exactly this far apart stay in the same cluster.
    pub gap_threshold: Duration,
    /// When true, the stream order is taken as authoritative and edits are
    /// clustered as delivered. When false, the edits are first sorted by
    /// timestamp (stable, so ties keep the stream order).
    pub assume_sorted_input: bool,
}

impl ClusterOptions {
    pub const DEFAULT_GAP_SECONDS: i64 = 15 * 60;

    /// Returns `None` if the threshold is negative or too large for a duration.
    pub fn with_gap_seconds(seconds: i64) -> Option<ClusterOptions> {
        if seconds < 0 {
            return None;
        }
        Some(ClusterOptions {
            gap_threshold: Duration::try_seconds(seconds)?,
            ..ClusterOptions::default()
        })
    }
}

impl Default for ClusterOptions {
    fn default() -> Self {
        ClusterOptions {
            gap_threshold: Duration::seconds(ClusterOptions::DEFAULT_GAP_SECONDS),
            assume_sorted_input: true,
        }
    }
}

// ******** Errors *********

/// Errors that abort an analysis pass. No partial report is produced.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AnalysisErrors {
    /// A column required for identity or grouping is absent.
    MissingColumn { column: String },
    /// A timestamp that could not be parsed into an instant.
    MalformedTimestamp { value: String },
    /// Two distinct keys would land in the same cell of a rectangle.
    KeyCollision { key: String },
    /// A column is shorter than the record id column it should be aligned with.
    RaggedColumns {
        column: String,
        expected: usize,
        found: usize,
    },
    /// The sheet source failed to deliver the data.
    Source { message: String },
}

impl Error for AnalysisErrors {}

impl Display for AnalysisErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisErrors::MissingColumn { column } => {
                write!(f, "missing required column '{}'", column)
            }
            AnalysisErrors::MalformedTimestamp { value } => {
                write!(f, "could not parse timestamp {:?}", value)
            }
            AnalysisErrors::KeyCollision { key } => {
                write!(f, "key '{}' collides with another column of the report", key)
            }
            AnalysisErrors::RaggedColumns {
                column,
                expected,
                found,
            } => write!(
                f,
                "column '{}' has {} values, expected {}",
                column, found, expected
            ),
            AnalysisErrors::Source { message } => write!(f, "sheet source error: {}", message),
        }
    }
}
