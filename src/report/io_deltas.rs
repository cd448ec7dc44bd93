// Reading the edit history from JSON.

use std::fs;

use canvass_analysis::{EditEvent, SheetContents};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::report::{OpeningJsonSnafu, ParsingJsonSnafu, ReportResult};

/// One submission, as exported by the sheet service.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JsonDelta {
    #[serde(rename = "Version")]
    pub version: u64,
    #[serde(rename = "User", default)]
    pub user: String,
    #[serde(rename = "App", default)]
    pub app: String,
    #[serde(rename = "UserIp", default)]
    pub user_ip: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "GeoLat", default)]
    pub geo_lat: String,
    #[serde(rename = "GeoLong", default)]
    pub geo_long: String,
    /// Column name -> new values. The order of the columns is preserved.
    #[serde(rename = "Value", default)]
    pub value: JSMap<String, JSValue>,
}

impl JsonDelta {
    pub fn into_event(self) -> EditEvent {
        let mut value = SheetContents::new();
        for (name, cells) in self.value {
            value.add(name, read_cells(&cells));
        }
        EditEvent {
            version: self.version,
            user: self.user,
            app: self.app,
            user_ip: self.user_ip,
            timestamp: self.timestamp,
            geo_lat: self.geo_lat,
            geo_long: self.geo_long,
            value,
        }
    }
}

// Numbers and booleans are kept in their JSON notation, nulls become empty cells.
fn read_cells(cells: &JSValue) -> Vec<String> {
    match cells {
        JSValue::Array(l) => l.iter().map(read_cell).collect(),
        other => vec![read_cell(other)],
    }
}

fn read_cell(cell: &JSValue) -> String {
    match cell {
        JSValue::Null => String::new(),
        JSValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads all the edit events of a JSON file, in the order of the file.
pub fn read_deltas(path: &str) -> ReportResult<Vec<EditEvent>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let deltas: Vec<JsonDelta> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    info!("read_deltas: {:?}: {} deltas", path, deltas.len());
    let res: Vec<EditEvent> = deltas.into_iter().map(|d| d.into_event()).collect();
    debug!(
        "read_deltas: latest version: {:?}",
        res.iter().map(|e| e.version).max()
    );
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_events() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("deltas.json");
        fs::write(
            &p,
            r#"[
              {"Version": 7, "User": "alice", "App": "canvasser", "UserIp": "10.0.0.1",
               "Timestamp": "2017-06-01T10:00:00Z", "GeoLat": "47.6", "GeoLong": "-122.3",
               "Value": {"RecId": ["r1", "r2"], "Zip": [98052, null], "Party": ["1", "4"]}},
              {"Version": 8, "Timestamp": "2017-06-01T10:01:00Z"}
            ]"#,
        )
        .unwrap();
        let events = read_deltas(&p.display().to_string()).unwrap();
        assert_eq!(events.len(), 2);
        let e = &events[0];
        assert_eq!(e.version, 7);
        assert_eq!(e.user_ip, "10.0.0.1");
        assert_eq!(e.value.keys().collect::<Vec<_>>(), vec!["RecId", "Zip", "Party"]);
        assert_eq!(e.value.get("Zip").unwrap(), &vec!["98052", ""]);
        assert_eq!(events[1].user, "");
        assert!(events[1].value.is_empty());
    }

    #[test]
    fn invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("deltas.json");
        fs::write(&p, "[{\"Version\": \"x\"}]").unwrap();
        assert!(matches!(
            read_deltas(&p.display().to_string()),
            Err(crate::report::ReportError::ParsingJson { .. })
        ));
    }
}
