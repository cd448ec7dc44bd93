/*!
Analysis of canvassing data: a tabular snapshot of voter records and the stream of
edits made to it by canvassers in the field.

The main entry points are:
- [`ChangeLog`] to cluster the edits into work sessions, flatten them per record or
  normalize them per version
- [`build_precincts`] to roll the snapshot up by precinct
- [`AnalysisSession`] to fetch the data once from a [`SheetSource`] and share it

```
use canvass_analysis::builder::EventBuilder;
use canvass_analysis::*;

let events = vec![
    EventBuilder::new(1, "alice", "2017-06-01T10:00:00Z")
        .edit("WA1", &[("Supporter", "yes")])
        .build(),
    EventBuilder::new(2, "alice", "2017-06-01T10:05:00Z")
        .edit("WA2", &[("Supporter", "no")])
        .build(),
    EventBuilder::new(3, "alice", "2017-06-01T13:00:00Z")
        .edit("WA1", &[("Supporter", "maybe")])
        .build(),
];
let log = ChangeLog::new(events)?;
let clusters = log.cluster(&ClusterOptions::default())?;
assert_eq!(clusters.len(), 2);
assert_eq!(clusters[0].unique_record_count(), 2);
# Ok::<(), AnalysisErrors>(())
```

See the [`manual`] for the input columns and the reports.
*/

mod config;

pub mod builder;
pub mod changelog;
pub mod collections;
pub mod household;
pub mod manual;
pub mod precinct;
pub mod session;
pub mod time_range;

pub use crate::changelog::{ChangeLog, DayActivity, EditCluster, ExtraInfo, NormalizedEdits};
pub use crate::collections::{Counter, KeyedCounter, TwoKeyTable};
pub use crate::config::*;
pub use crate::household::{HouseholdResolver, Householding};
pub use crate::precinct::{build_precincts, build_precincts_with, precincts_to_rectangle, Precinct};
pub use crate::session::{AnalysisSession, Progress, SheetSource};
pub use crate::time_range::TimeInterval;
