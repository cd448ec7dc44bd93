pub use crate::config::*;

/// A builder for edit events.
///
/// Edits are added row by row and laid out in the column-oriented form of the sheet
/// service. A column that is not mentioned in a row is left empty for that row.
///
/// ```
/// use canvass_analysis::builder::EventBuilder;
/// use canvass_analysis::ChangeLog;
/// # use canvass_analysis::AnalysisErrors;
///
/// let event = EventBuilder::new(12, "alice", "2017-06-01T10:00:00Z")
///     .app("canvasser")
///     .geo("47.61", "-122.33")
///     .edit("WA123", &[("Supporter", "yes"), ("ResultOfContact", "Home")])
///     .edit("WA124", &[("Supporter", "no")])
///     .build();
///
/// let log = ChangeLog::new(vec![event])?;
/// assert_eq!(log.delta_count(), 1);
///
/// # Ok::<(), AnalysisErrors>(())
/// ```
pub struct EventBuilder {
    pub(crate) _event: EditEvent,
    pub(crate) _rows: Vec<(String, Vec<(String, String)>)>,
}

impl EventBuilder {
    pub fn new(version: u64, user: &str, timestamp: &str) -> EventBuilder {
        EventBuilder {
            _event: EditEvent {
                version,
                user: user.to_string(),
                app: String::new(),
                user_ip: String::new(),
                timestamp: timestamp.to_string(),
                geo_lat: String::new(),
                geo_long: String::new(),
                value: SheetContents::new(),
            },
            _rows: Vec::new(),
        }
    }

    pub fn app(mut self, app: &str) -> EventBuilder {
        self._event.app = app.to_string();
        self
    }

    pub fn ip(mut self, user_ip: &str) -> EventBuilder {
        self._event.user_ip = user_ip.to_string();
        self
    }

    /// Server-side location of the submission.
    pub fn geo(mut self, lat: &str, long: &str) -> EventBuilder {
        self._event.geo_lat = lat.to_string();
        self._event.geo_long = long.to_string();
        self
    }

    /// Adds the new values of one record.
    pub fn edit(mut self, rec_id: &str, cells: &[(&str, &str)]) -> EventBuilder {
        self._rows.push((
            rec_id.to_string(),
            cells
                .iter()
                .map(|(c, v)| (c.to_string(), v.to_string()))
                .collect(),
        ));
        self
    }

    pub fn build(self) -> EditEvent {
        let mut columns: Vec<String> = Vec::new();
        for (_, cells) in self._rows.iter() {
            for (c, _) in cells.iter() {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let mut value = SheetContents::new();
        value.add(
            column_names::REC_ID,
            self._rows.iter().map(|(rec_id, _)| rec_id.clone()).collect(),
        );
        for c in columns.iter() {
            let col: Vec<String> = self
                ._rows
                .iter()
                .map(|(_, cells)| {
                    cells
                        .iter()
                        .find(|(c2, _)| c2 == c)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default()
                })
                .collect();
            value.add(c.as_str(), col);
        }
        EditEvent {
            value,
            ..self._event
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lays_out_columns() {
        let e = EventBuilder::new(3, "bob", "2017-06-01T10:00:00Z")
            .ip("1.2.3.4")
            .edit("r1", &[("Q1", "a")])
            .edit("r2", &[("Q2", "b"), ("Q1", "c")])
            .build();
        assert_eq!(e.version, 3);
        assert_eq!(e.user_ip, "1.2.3.4");
        assert_eq!(e.value.keys().collect::<Vec<_>>(), vec!["RecId", "Q1", "Q2"]);
        assert_eq!(e.value.get("Q1").unwrap(), &vec!["a", "c"]);
        assert_eq!(e.value.get("Q2").unwrap(), &vec!["", "b"]);
    }
}
