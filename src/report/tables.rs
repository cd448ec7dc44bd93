// Layout of the reports that are not produced directly by the analysis library.

use canvass_analysis::{
    ChangeLog, DayActivity, Dict, EditCluster, Householding, SheetContents,
};
use chrono::{DateTime, SecondsFormat, Utc};

fn iso(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One row per cluster. The clusters are grouped by user, numbered from 1 in each group.
pub fn clusters_to_rectangle(
    groups: &[(String, Vec<EditCluster>)],
    householder: &dyn Householding,
    with_user: bool,
) -> SheetContents {
    let mut users: Vec<String> = Vec::new();
    let mut index: Vec<String> = Vec::new();
    let mut start: Vec<String> = Vec::new();
    let mut end: Vec<String> = Vec::new();
    let mut duration: Vec<String> = Vec::new();
    let mut duration_seconds: Vec<String> = Vec::new();
    let mut records: Vec<String> = Vec::new();
    let mut households: Vec<String> = Vec::new();

    for (user, clusters) in groups.iter() {
        for (idx, c) in clusters.iter().enumerate() {
            let tr = c.time_range();
            users.push(user.clone());
            index.push((idx + 1).to_string());
            start.push(iso(tr.start()));
            end.push(iso(tr.end()));
            duration.push(tr.pretty_duration());
            duration_seconds.push(c.duration_seconds().to_string());
            records.push(c.unique_record_count().to_string());
            households.push(c.unique_household_count(householder).to_string());
        }
    }

    let mut x = SheetContents::new();
    if with_user {
        x.add("User", users);
    }
    x.add("Cluster", index);
    x.add("Start", start);
    x.add("End", end);
    x.add("Duration", duration);
    x.add("DurationSeconds", duration_seconds);
    x.add("Records", records);
    x.add("Households", households);
    x
}

/// One row per day, with the number of edits and of distinct users.
pub fn days_to_rectangle(activity: &[DayActivity]) -> SheetContents {
    let mut x = SheetContents::new();
    x.add(
        "Day",
        activity
            .iter()
            .map(|da| da.day.start().format("%Y-%m-%d").to_string())
            .collect(),
    );
    x.add(
        "Edits",
        activity.iter().map(|da| da.edits.to_string()).collect(),
    );
    x.add(
        "Users",
        activity.iter().map(|da| da.users.to_string()).collect(),
    );
    x
}

/// One row per user, from a partition of a change log.
pub fn users_to_rectangle(partition: &Dict<ChangeLog>) -> SheetContents {
    let mut users: Vec<String> = Vec::new();
    let mut changes: Vec<String> = Vec::new();
    let mut start: Vec<String> = Vec::new();
    let mut end: Vec<String> = Vec::new();
    let mut duration: Vec<String> = Vec::new();
    for (user, log) in partition.iter() {
        users.push(user.to_string());
        changes.push(log.delta_count().to_string());
        match log.time_range() {
            Some(tr) => {
                start.push(iso(tr.start()));
                end.push(iso(tr.end()));
                duration.push(tr.pretty_duration());
            }
            None => {
                start.push(String::new());
                end.push(String::new());
                duration.push(String::new());
            }
        }
    }

    let mut x = SheetContents::new();
    x.add("User", users);
    x.add("Changes", changes);
    x.add("Start", start);
    x.add("End", end);
    x.add("Duration", duration);
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvass_analysis::builder::EventBuilder;
    use canvass_analysis::ClusterOptions;

    struct SameHousehold;

    impl Householding for SameHousehold {
        fn household_id(&self, _rec_id: &str) -> Option<&str> {
            Some("h")
        }
    }

    fn log() -> ChangeLog {
        ChangeLog::new(vec![
            EventBuilder::new(1, "alice", "2017-06-01T10:00:00Z")
                .edit("r1", &[("Q", "a")])
                .edit("r2", &[("Q", "b")])
                .build(),
            EventBuilder::new(2, "bob", "2017-06-02T09:00:00Z")
                .edit("r3", &[("Q", "c")])
                .build(),
            EventBuilder::new(3, "alice", "2017-06-01T10:01:30Z")
                .edit("r1", &[("Q", "d")])
                .build(),
        ])
        .unwrap()
    }

    #[test]
    fn clusters_layout() {
        let clusters = log()
            .partition_by_user()
            .unwrap()
            .into_iter()
            .map(|(u, l)| (u, l.cluster(&ClusterOptions::default()).unwrap()))
            .collect::<Vec<_>>();
        let rect = clusters_to_rectangle(&clusters, &SameHousehold, true);
        assert_eq!(rect.get("User").unwrap(), &vec!["alice", "bob"]);
        assert_eq!(
            rect.get("Start").unwrap(),
            &vec!["2017-06-01T10:00:00Z", "2017-06-02T09:00:00Z"]
        );
        assert_eq!(
            rect.get("End").unwrap(),
            &vec!["2017-06-01T10:01:30Z", "2017-06-02T09:00:00Z"]
        );
        assert_eq!(
            rect.get("Duration").unwrap(),
            &vec!["1 minute 30 seconds", "0 seconds"]
        );
        assert_eq!(rect.get("DurationSeconds").unwrap(), &vec!["90", "0"]);
        assert_eq!(rect.get("Records").unwrap(), &vec!["2", "1"]);
        assert_eq!(rect.get("Households").unwrap(), &vec!["1", "1"]);
    }

    #[test]
    fn days_layout() {
        let rect = days_to_rectangle(&log().activity_by_day().unwrap());
        assert_eq!(rect.get("Day").unwrap(), &vec!["2017-06-01", "2017-06-02"]);
        assert_eq!(rect.get("Edits").unwrap(), &vec!["2", "1"]);
        assert_eq!(rect.get("Users").unwrap(), &vec!["1", "1"]);
    }

    #[test]
    fn users_layout() {
        let rect = users_to_rectangle(&log().partition_by_user().unwrap());
        assert_eq!(rect.get("User").unwrap(), &vec!["alice", "bob"]);
        assert_eq!(rect.get("Changes").unwrap(), &vec!["2", "1"]);
        assert_eq!(rect.get("Duration").unwrap(), &vec!["1 minute 30 seconds", "0 seconds"]);
    }
}
