/*!

This is the long-form manual for `canvass_analysis` and `canvassrpt`.

## Inputs

Two inputs are analyzed together:
* the sheet: a snapshot of the voter records, one row per record
* the deltas: the history of the edits made to the sheet, one event per submission

### The sheet

The sheet is a table with a header row. Every record is identified by the `RecId` column.
The following columns have a meaning for the reports:

| column            | used by                  | notes                                   |
|-------------------|--------------------------|-----------------------------------------|
| `RecId`           | everything               | required                                |
| `Address`         | householding             | required for household counts           |
| `City`            | householding             | required for household counts           |
| `Zip`             | householding             | required for household counts           |
| `PrecinctName`    | precincts                | required for the precinct report        |
| `Party`           | precincts                | `1`,`2` are GOP, `4`,`5` are DEM        |
| `XTargetPri`      | precincts                | optional, `1` marks a targeted voter    |
| `ResultOfContact` | precincts                | optional, non-empty marks a contact     |

Two records with the same address, city and zip (ignoring case) belong to the same
household.

`canvassrpt` reads the sheet either from a CSV file (`csv`) or from an Excel workbook
(`xlsx`). Numbers in Excel cells are rendered without a trailing `.0`.

### The deltas

The deltas are a JSON array of edit events:

```text
[
  {
    "Version": 12,
    "User": "alice",
    "App": "canvasser",
    "UserIp": "10.0.0.1",
    "Timestamp": "2017-06-01T10:00:00Z",
    "GeoLat": "47.61",
    "GeoLong": "-122.33",
    "Value": {
      "RecId": ["WA123", "WA124"],
      "ResultOfContact": ["Home", "NotHome"]
    }
  }
]
```

`Value` holds the new values of the edited records, column by column, aligned on the
`RecId` column. When the payload carries non-empty `XLat`, `XLong` or `XLastModified`
cells, they take precedence over the location and timestamp of the submission for the
record on that row.

Timestamps are ISO-8601: `2017-06-01T10:00:00Z`, `2017-06-01T12:00+0200` and
`2017-06-01` (midnight) are all accepted. A timestamp without an offset is taken as UTC.
A timestamp that cannot be parsed stops the analysis.

## Reports

| report      | one row per                 | columns                                                         |
|-------------|-----------------------------|-----------------------------------------------------------------|
| `clusters`  | work session                | `Cluster, Start, End, Duration, DurationSeconds, Records, Households` |
| `records`   | edited record               | `RecId`, then the edited columns and `XUser, XApp, XIPAddress`  |
| `edits`     | edited cell                 | `Version, XUser, XLat, XLong, Timestamp, XIPAddress, XApp, RecId, ChangeColumn, NewValue` |
| `precincts` | precinct                    | `Names, count, HouseholdCount, GOPCount, DEMCount, GOPPercent, ContactCount, ContactHouseholdCount, Targets` |
| `days`      | day spanned by the deltas   | `Day, Edits, Users`                                             |
| `users`     | user                        | `User, Changes, Start, End, Duration`                           |

A work session is a run of edits where no two consecutive edits are more than the gap
threshold apart (15 minutes by default, never negative). When the clusters are computed for all the
users, every user gets their own sessions and a leading `User` column is added.

In the `records` report, a cell edited several times keeps its last value.

## Configuration

`canvassrpt` accepts a configuration file in JSON. All the entries are optional and the
command line flags take precedence. File paths are relative to the directory of the
configuration file.

```text
{
  "outputSettings": { "reportName": "clusters", "outputDirectory": "out" },
  "sheetSource": { "provider": "xlsx", "filePath": "sheet.xlsx", "worksheetName": "Voters" },
  "deltaSource": { "filePath": "deltas.json" },
  "rules": { "gapThresholdSeconds": 600, "assumeSortedInput": true, "filterUser": "alice" }
}
```

With `assumeSortedInput` (the default), the deltas are expected in chronological order.
Set it to `false` to sort the edits by time before clustering.

 */
