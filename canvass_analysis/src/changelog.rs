use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use crate::collections::{
    for_each_cell, optional_column, required_column, KeyedCounter, TwoKeyTable,
};
use crate::config::{
    column_names, AnalysisErrors, ClusterOptions, Dict, EditEvent, SheetContents,
};
use crate::household::Householding;
use crate::time_range::{parse_timestamp, TimeInterval};

/// One session of continuous field work.
#[derive(PartialEq, Debug, Clone)]
pub struct EditCluster {
    time: TimeInterval,
    rec_ids: KeyedCounter,
    versions: Vec<u64>,
    seen_versions: HashSet<u64>,
    edit_count: usize,
    start_location: Option<(String, String)>,
}

impl EditCluster {
    pub fn new(start_time: DateTime<Utc>) -> EditCluster {
        EditCluster {
            time: TimeInterval::at(start_time),
            rec_ids: KeyedCounter::new(),
            versions: Vec::new(),
            seen_versions: HashSet::new(),
            edit_count: 0,
            start_location: None,
        }
    }

    /// Timespan for this cluster.
    pub fn time_range(&self) -> &TimeInterval {
        &self.time
    }

    pub fn duration_seconds(&self) -> f64 {
        self.time.duration_seconds()
    }

    pub fn unique_record_count(&self) -> usize {
        self.rec_ids.count()
    }

    pub fn record_ids(&self) -> &[String] {
        self.rec_ids.keys()
    }

    /// Number of record edits applied, duplicates included.
    pub fn edit_count(&self) -> usize {
        self.edit_count
    }

    /// Number of distinct submissions (versions) in this cluster.
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// First non-empty (lat, long) seen in this cluster.
    pub fn start_location(&self) -> Option<(&str, &str)> {
        self.start_location
            .as_ref()
            .map(|(lat, long)| (lat.as_str(), long.as_str()))
    }

    /// Number of doors knocked in this cluster.
    ///
    /// A record that the householder does not know counts as its own household.
    pub fn unique_household_count(&self, hh: &dyn Householding) -> usize {
        let households: KeyedCounter = self
            .rec_ids
            .iter()
            .map(|rec_id| hh.household_id(rec_id).unwrap_or(rec_id))
            .collect();
        households.count()
    }

    /// A single version can contain multiple edits and timestamps.
    pub fn apply(
        &mut self,
        version: u64,
        rec_id: &str,
        lat: &str,
        long: &str,
        timestamp: DateTime<Utc>,
    ) {
        self.rec_ids.add(rec_id);
        self.time.expand_to_include(timestamp);
        self.edit_count += 1;
        if self.seen_versions.insert(version) {
            self.versions.push(version);
        }
        if self.start_location.is_none() && !lat.is_empty() && !long.is_empty() {
            self.start_location = Some((lat.to_string(), long.to_string()));
        }
    }
}

/// Information accumulated about one record over a change log.
///
/// "Server" values are captured when the server receives the request. "Client" values
/// are recorded by the collection app; they are more accurate in offline scenarios but
/// could be spoofed. Both sides are tracked independently.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ExtraInfo {
    pub user: Option<String>,
    pub app: Option<String>,
    pub ip_address: Option<String>,
    /// Most recent server timestamp, as received.
    pub timestamp: Option<String>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Server-side location, provided when the client uploads.
    pub lat: Option<String>,
    pub long: Option<String>,
    pub client_timestamp: Option<String>,
    pub client_lat: Option<String>,
    pub client_long: Option<String>,
}

/// What a single edit tells about a record.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct Observation<'a> {
    pub user: Option<&'a str>,
    pub app: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub timestamp: Option<(&'a str, DateTime<Utc>)>,
    pub lat: Option<&'a str>,
    pub long: Option<&'a str>,
    pub client_timestamp: Option<&'a str>,
    pub client_lat: Option<&'a str>,
    pub client_long: Option<&'a str>,
}

impl ExtraInfo {
    /// Folds one observation into this record.
    ///
    /// | field                                   | rule                                  |
    /// |-----------------------------------------|---------------------------------------|
    /// | user, app, ip_address                   | first non-empty wins                  |
    /// | client_timestamp, client_lat/long       | first non-empty wins, each on its own |
    /// | lat + long                              | first pair with a lat other than "0"  |
    /// | timestamp                               | latest instant wins                   |
    /// | first_seen / last_seen                  | min / max of all instants             |
    pub fn merge(&mut self, obs: &Observation) {
        keep_first(&mut self.user, obs.user);
        keep_first(&mut self.app, obs.app);
        keep_first(&mut self.ip_address, obs.ip_address);
        keep_first(&mut self.client_timestamp, obs.client_timestamp);
        keep_first(&mut self.client_lat, obs.client_lat);
        keep_first(&mut self.client_long, obs.client_long);

        if self.lat.is_none() {
            if let (Some(lat), Some(long)) = (obs.lat, obs.long) {
                if !lat.is_empty() && lat != "0" {
                    self.lat = Some(lat.to_string());
                    self.long = Some(long.to_string());
                }
            }
        }

        if let Some((raw, instant)) = obs.timestamp {
            if self.last_seen.map_or(true, |last| instant >= last) {
                self.timestamp = Some(raw.to_string());
                self.last_seen = Some(instant);
            }
            if self.first_seen.map_or(true, |first| instant < first) {
                self.first_seen = Some(instant);
            }
        }
    }
}

fn keep_first(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_none() {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            *slot = Some(v.to_string());
        }
    }
}

/// The flat list of edits produced by [`ChangeLog::normalize_by_version`].
#[derive(PartialEq, Debug, Clone)]
pub struct NormalizedEdits {
    /// One row per (version, record, column) edit, in stream order.
    pub rows: SheetContents,
    /// Best-known metadata for every record touched.
    pub record_info: Dict<ExtraInfo>,
}

/// Activity within a single day of a change log.
#[derive(PartialEq, Debug, Clone)]
pub struct DayActivity {
    pub day: TimeInterval,
    pub edits: usize,
    pub users: KeyedCounter,
}

// A record edit, located in time and space.
struct EditPoint<'a> {
    version: u64,
    rec_id: &'a str,
    lat: &'a str,
    long: &'a str,
    time: DateTime<Utc>,
}

/// A set of changes made to a sheet, optionally restricted to one user.
///
/// Beware that a single version can edit multiple records, and that geo information
/// may be in the version or in the payload columns.
#[derive(Debug, Clone)]
pub struct ChangeLog {
    deltas: Arc<Vec<EditEvent>>,
    filter_user: Option<String>,
    users: KeyedCounter,
    time_range: Option<TimeInterval>,
    count: usize,
}

impl ChangeLog {
    pub fn new(deltas: Vec<EditEvent>) -> Result<ChangeLog, AnalysisErrors> {
        ChangeLog::with_filter(Arc::new(deltas), None)
    }

    /// A change log over shared deltas, only looking at the edits of `filter_user` if set.
    pub fn with_filter(
        deltas: Arc<Vec<EditEvent>>,
        filter_user: Option<&str>,
    ) -> Result<ChangeLog, AnalysisErrors> {
        let mut res = ChangeLog {
            deltas,
            filter_user: filter_user.map(|s| s.to_string()),
            users: KeyedCounter::new(),
            time_range: None,
            count: 0,
        };
        let mut users = KeyedCounter::new();
        let mut time_range: Option<TimeInterval> = None;
        let mut count = 0;
        for delta in res.iter() {
            count += 1;
            users.add(&delta.user);
            let d = parse_timestamp(&delta.timestamp)?;
            match time_range.as_mut() {
                Some(tr) => tr.expand_to_include(d),
                None => time_range = Some(TimeInterval::at(d)),
            }
        }
        debug!(
            "ChangeLog::with_filter: filter: {:?} count: {} users: {}",
            res.filter_user,
            count,
            users.count()
        );
        res.users = users;
        res.time_range = time_range;
        res.count = count;
        Ok(res)
    }

    fn iter(&self) -> impl Iterator<Item = &EditEvent> {
        self.deltas.iter().filter(move |d| match &self.filter_user {
            Some(u) => *u == d.user,
            None => true,
        })
    }

    pub fn delta_count(&self) -> usize {
        self.count
    }

    pub fn filter_user(&self) -> Option<&str> {
        self.filter_user.as_deref()
    }

    /// Unique list of users contributing to this change log.
    pub fn users_present(&self) -> &[String] {
        self.users.keys()
    }

    /// Timespan of the whole log, None if it is empty.
    pub fn time_range(&self) -> Option<&TimeInterval> {
        self.time_range.as_ref()
    }

    /// One change log per user, sharing the same underlying deltas.
    pub fn partition_by_user(&self) -> Result<Dict<ChangeLog>, AnalysisErrors> {
        let mut res: Dict<ChangeLog> = Dict::new();
        for user in self.users.iter() {
            res.add(user, ChangeLog::with_filter(self.deltas.clone(), Some(user))?);
        }
        Ok(res)
    }

    /// Flattens to a rectangle indexed by record id.
    ///
    /// Columns include the edited questions and the user, app and IP address of the
    /// submission. When a cell is edited several times, the last value is kept.
    pub fn flatten_by_record(&self) -> Result<SheetContents, AnalysisErrors> {
        let mut d2: TwoKeyTable<String> = TwoKeyTable::new();
        for item in self.iter() {
            for_each_cell(&item.value, |rec_id, column_name, new_value| {
                d2.add(rec_id, column_names::X_USER, item.user.clone());
                d2.add(rec_id, column_names::X_APP, item.app.clone());
                d2.add(rec_id, column_names::X_IP_ADDRESS, item.user_ip.clone());
                d2.add(rec_id, column_name, new_value.to_string());
            })?;
        }
        d2.to_rectangle(column_names::REC_ID)
    }

    /// Unrolls every version into one row per edited cell.
    ///
    /// No deduplication takes place: the rows follow the stream order.
    pub fn normalize_by_version(&self) -> Result<NormalizedEdits, AnalysisErrors> {
        let mut record_info: Dict<ExtraInfo> = Dict::new();

        let mut c_version: Vec<String> = Vec::new();
        let mut c_user: Vec<String> = Vec::new();
        let mut c_lat: Vec<String> = Vec::new();
        let mut c_long: Vec<String> = Vec::new();
        let mut c_timestamp: Vec<String> = Vec::new();
        let mut c_user_ip: Vec<String> = Vec::new();
        let mut c_app: Vec<String> = Vec::new();
        let mut c_rec_id: Vec<String> = Vec::new();
        let mut c_change_column: Vec<String> = Vec::new();
        let mut c_change_value: Vec<String> = Vec::new();

        for item in self.iter() {
            let instant = parse_timestamp(&item.timestamp)?;
            for_each_cell(&item.value, |rec_id, column_name, new_value| {
                let mut obs = Observation {
                    user: Some(item.user.as_str()),
                    app: Some(item.app.as_str()),
                    ip_address: Some(item.user_ip.as_str()),
                    timestamp: Some((item.timestamp.as_str(), instant)),
                    lat: Some(item.geo_lat.as_str()),
                    long: Some(item.geo_long.as_str()),
                    ..Observation::default()
                };
                match column_name {
                    column_names::X_LAST_MODIFIED => obs.client_timestamp = Some(new_value),
                    column_names::X_LAT => obs.client_lat = Some(new_value),
                    column_names::X_LONG => obs.client_long = Some(new_value),
                    _ => {}
                }
                record_info
                    .get_or_insert_with(rec_id, ExtraInfo::default)
                    .merge(&obs);

                c_version.push(item.version.to_string());
                c_user.push(item.user.clone());
                c_lat.push(item.geo_lat.clone());
                c_long.push(item.geo_long.clone());
                c_timestamp.push(item.timestamp.clone());
                c_user_ip.push(item.user_ip.clone());
                c_app.push(item.app.clone());
                c_rec_id.push(rec_id.to_string());
                c_change_column.push(column_name.to_string());
                c_change_value.push(new_value.to_string());
            })?;
        }

        let mut rows = SheetContents::new();
        rows.add("Version", c_version);
        rows.add(column_names::X_USER, c_user);
        rows.add(column_names::X_LAT, c_lat);
        rows.add(column_names::X_LONG, c_long);
        rows.add("Timestamp", c_timestamp);
        rows.add(column_names::X_IP_ADDRESS, c_user_ip);
        rows.add(column_names::X_APP, c_app);
        rows.add(column_names::REC_ID, c_rec_id);
        rows.add("ChangeColumn", c_change_column);
        rows.add("NewValue", c_change_value);
        Ok(NormalizedEdits { rows, record_info })
    }

    // One point per record touched. The payload columns XLat, XLong and
    // XLastModified override the values of the version when they are filled.
    fn edit_points(&self) -> Result<Vec<EditPoint>, AnalysisErrors> {
        let mut res: Vec<EditPoint> = Vec::new();
        for item in self.iter() {
            let rec_ids = required_column(&item.value, column_names::REC_ID)?;
            let col_lats = optional_column(&item.value, column_names::X_LAT, rec_ids.len())?;
            let col_longs = optional_column(&item.value, column_names::X_LONG, rec_ids.len())?;
            let col_timestamps =
                optional_column(&item.value, column_names::X_LAST_MODIFIED, rec_ids.len())?;
            for (i, rec_id) in rec_ids.iter().enumerate() {
                let lat = cell_or(col_lats, i, &item.geo_lat);
                let long = cell_or(col_longs, i, &item.geo_long);
                let timestamp = cell_or(col_timestamps, i, &item.timestamp);
                res.push(EditPoint {
                    version: item.version,
                    rec_id: rec_id.as_str(),
                    lat,
                    long,
                    time: parse_timestamp(timestamp)?,
                });
            }
        }
        Ok(res)
    }

    /// Groups the edits into sessions of continuous activity.
    ///
    /// A new cluster starts whenever an edit comes more than `gap_threshold` after the
    /// end of the current cluster. With `assume_sorted_input`, the edits are taken in
    /// stream order: edits arriving out of order are not detected.
    pub fn cluster(&self, options: &ClusterOptions) -> Result<Vec<EditCluster>, AnalysisErrors> {
        let mut points = self.edit_points()?;
        if !options.assume_sorted_input {
            points.sort_by_key(|p| p.time);
        }

        let mut clusters: Vec<EditCluster> = Vec::new();
        let mut current: Option<usize> = None;
        for p in points.iter() {
            if let Some(idx) = current {
                let gap = p.time - clusters[idx].time_range().end();
                if gap > options.gap_threshold {
                    debug!(
                        "cluster: gap of {}s before version {}, closing cluster {}",
                        gap.num_seconds(),
                        p.version,
                        idx
                    );
                    current = None;
                }
            }
            let idx = match current {
                Some(idx) => idx,
                None => {
                    clusters.push(EditCluster::new(p.time));
                    clusters.len() - 1
                }
            };
            current = Some(idx);
            clusters[idx].apply(p.version, p.rec_id, p.lat, p.long, p.time);
        }
        info!(
            "cluster: {} record edits grouped into {} clusters ({})",
            points.len(),
            clusters.len(),
            self
        );
        Ok(clusters)
    }

    /// Edits and active users for every day spanned by this log.
    pub fn activity_by_day(&self) -> Result<Vec<DayActivity>, AnalysisErrors> {
        let range = match self.time_range {
            Some(r) => r,
            None => return Ok(Vec::new()),
        };
        // Widen so that the first day starts before the first edit and the last
        // day ends after the last edit.
        let span = TimeInterval::new(
            range.start() - Duration::hours(12),
            range.end() + Duration::milliseconds(1),
        );
        let mut res: Vec<DayActivity> = span
            .days()
            .map(|day| DayActivity {
                day,
                edits: 0,
                users: KeyedCounter::new(),
            })
            .collect();
        for item in self.iter() {
            let d = parse_timestamp(&item.timestamp)?;
            if let Some(da) = res.iter_mut().find(|da| da.day.contains(d)) {
                da.edits += 1;
                da.users.add(&item.user);
            }
        }
        Ok(res)
    }
}

impl Display for ChangeLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} changes", self.count)?;
        if let Some(u) = &self.filter_user {
            write!(f, " for user '{}'.", u)?;
        }
        Ok(())
    }
}

fn cell_or<'a>(col: Option<&'a [String]>, idx: usize, default: &'a str) -> &'a str {
    match col.map(|c| c[idx].as_str()) {
        Some(s) if !s.is_empty() => s,
        _ => default,
    }
}
