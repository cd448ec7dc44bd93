use std::fmt::Display;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::config::AnalysisErrors;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Parses a timestamp as sent by the sheet service or by the collection apps.
///
/// RFC 3339 is the normal form. Other ISO 8601 forms are accepted too: offsets without a
/// colon, times without seconds, and plain dates (midnight). Timestamps without an offset
/// are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AnalysisErrors> {
    let s = value.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Ok(d.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%d %H:%M%z",
    ] {
        if let Ok(d) = DateTime::parse_from_str(s, fmt) {
            return Ok(d.with_timezone(&Utc));
        }
    }
    let naive = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')).unwrap_or(s);
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(nd) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(Utc.from_utc_datetime(&nd));
        }
    }
    if let Some(nd) = NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&nd));
    }
    Err(AnalysisErrors::MalformedTimestamp {
        value: value.to_string(),
    })
}

/// A span of time that can only grow.
///
/// Invariant: `start <= end`.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// A zero-length interval at the given instant.
    pub fn at(instant: DateTime<Utc>) -> TimeInterval {
        TimeInterval {
            start: instant,
            end: instant,
        }
    }

    /// The smallest interval containing both instants.
    pub fn new(a: DateTime<Utc>, b: DateTime<Utc>) -> TimeInterval {
        let mut res = TimeInterval::at(a);
        res.expand_to_include(b);
        res
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn expand_to_include(&mut self, time: DateTime<Utc>) {
        if time < self.start {
            self.start = time;
        }
        if time > self.end {
            self.end = time;
        }
    }

    /// Half-open containment: the end instant is excluded.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 1000.0
    }

    pub fn pretty_duration(&self) -> String {
        pretty_print_seconds(self.duration().num_seconds())
    }

    /// The days overlapping this interval, each one exactly one day long, starting from
    /// the day boundary closest to the start.
    pub fn days(&self) -> Days {
        Days {
            next: round_to_day(self.start),
            end: self.end,
        }
    }

    /// Invokes the callback once per day, see [`TimeInterval::days`].
    pub fn for_each_day(&self, mut callback: impl FnMut(TimeInterval)) {
        for day in self.days() {
            callback(day);
        }
    }
}

impl Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ... {} ({})",
            self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.end.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.pretty_duration()
        )
    }
}

/// Iterator over consecutive one-day intervals.
#[derive(Debug, Clone)]
pub struct Days {
    next: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Iterator for Days {
    type Item = TimeInterval;

    fn next(&mut self) -> Option<TimeInterval> {
        if self.next >= self.end {
            return None;
        }
        let start = self.next;
        let tomorrow = start + Duration::milliseconds(MS_PER_DAY);
        self.next = tomorrow;
        Some(TimeInterval {
            start,
            end: tomorrow,
        })
    }
}

/// Rounds to the closest midnight (UTC). Half a day rounds up.
pub fn round_to_day(date: DateTime<Utc>) -> DateTime<Utc> {
    let ms = date.timestamp_millis();
    let days = (ms + MS_PER_DAY / 2).div_euclid(MS_PER_DAY);
    Utc.timestamp_millis_opt(days * MS_PER_DAY)
        .single()
        .unwrap_or(date)
}

/// Renders a number of seconds using the two largest relevant units.
pub fn pretty_print_seconds(delta: i64) -> String {
    let delta = delta.max(0);
    if delta < 60 {
        return unit(delta, "second");
    }
    if delta < 3600 {
        let min = delta / 60;
        return format!("{} {}", unit(min, "minute"), unit(delta - min * 60, "second"));
    }
    if delta < 86400 {
        let hou = delta / 3600;
        let min = (delta - hou * 3600) / 60;
        return format!("{} {}", unit(hou, "hour"), unit(min, "minute"));
    }
    let days = delta / 86400;
    let hou = (delta - days * 86400) / 3600;
    format!("{} {}", unit(days, "day"), unit(hou, "hour"))
}

fn unit(count: i64, name: &str) -> String {
    if count == 1 {
        format!("{} {}", count, name)
    } else {
        format!("{} {}s", count, name)
    }
}
