use log::{debug, info, warn};

use canvass_analysis::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::io::Write;
use std::path::Path;

use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::report::config_reader::*;
use crate::report::file_source::FileSheetSource;
use crate::report::tables::*;

mod config_reader;
mod file_source;
mod io_common;
mod io_csv;
mod io_deltas;
mod io_excel;
mod tables;

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The workbook has no worksheet named {name:?}"))]
    MissingWorksheet { name: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing the report in JSON"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error opening the CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of the CSV file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing the report in CSV"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Error writing to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Analysis failed: {source}"))]
    Analysis { source: AnalysisErrors },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("The {report} report needs the {input} (see --help)"))]
    MissingInput { report: String, input: String },
    #[snafu(display("Unknown report {name:?}"))]
    UnknownReport { name: String },
    #[snafu(display("Unknown sheet provider {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Invalid gap threshold of {seconds} seconds"))]
    InvalidGapThreshold { seconds: i64 },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

/// The reports that can be produced.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ReportKind {
    Clusters,
    Records,
    Edits,
    Precincts,
    Days,
    Users,
}

impl ReportKind {
    pub fn parse(name: &str) -> ReportResult<ReportKind> {
        match name {
            "clusters" => Ok(ReportKind::Clusters),
            "records" => Ok(ReportKind::Records),
            "edits" => Ok(ReportKind::Edits),
            "precincts" => Ok(ReportKind::Precincts),
            "days" => Ok(ReportKind::Days),
            "users" => Ok(ReportKind::Users),
            x => UnknownReportSnafu { name: x }.fail(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::Clusters => "clusters",
            ReportKind::Records => "records",
            ReportKind::Edits => "edits",
            ReportKind::Precincts => "precincts",
            ReportKind::Days => "days",
            ReportKind::Users => "users",
        }
    }

    fn needs_sheet(&self) -> bool {
        *self == ReportKind::Precincts
    }

    fn needs_deltas(&self) -> bool {
        *self != ReportKind::Precincts
    }
}

/// Runs the report described by the command line and the optional configuration file.
pub fn run_report(args: &Args) -> ReportResult<()> {
    let settings = resolve_settings(args)?;
    info!("run_report: settings: {:?}", settings);

    let rect = compute_report(&settings)?;

    let out = settings.out.as_deref();
    write_report(&rect, out)?;

    // The reference report, if provided for comparison
    if let Some(reference_p) = args.reference.as_deref() {
        check_reference(&rect, reference_p)?;
    }
    Ok(())
}

/// Computes the report in memory.
pub fn compute_report(settings: &ReportSettings) -> ReportResult<SheetContents> {
    let report = settings.report;
    if report.needs_sheet() && settings.sheet.is_none() {
        return MissingInputSnafu {
            report: report.name(),
            input: "sheet",
        }
        .fail();
    }
    if report.needs_deltas() && settings.deltas.is_none() {
        return MissingInputSnafu {
            report: report.name(),
            input: "deltas",
        }
        .fail();
    }

    let source = FileSheetSource::new(settings.sheet.clone(), settings.deltas.clone());
    let mut session = AnalysisSession::new(source);
    let progress = |msg: &str| {
        if !msg.is_empty() {
            info!("{}", msg);
        }
    };
    let filter_user = settings.filter_user.as_deref();

    let rect = match report {
        ReportKind::Clusters => {
            let changes = session
                .all_changes(filter_user, Some(&progress))
                .context(AnalysisSnafu {})?;
            let householder = if settings.sheet.is_some() {
                Some(session.householder(None).context(AnalysisSnafu {})?)
            } else {
                None
            };
            let hh: &dyn Householding = match &householder {
                Some(h) => h,
                None => &NoHouseholds,
            };
            let mut groups: Vec<(String, Vec<EditCluster>)> = Vec::new();
            if let Some(user) = filter_user {
                let clusters = changes.cluster(&settings.options).context(AnalysisSnafu {})?;
                groups.push((user.to_string(), clusters));
            } else {
                for (user, log) in changes.partition_by_user().context(AnalysisSnafu {})? {
                    let clusters = log.cluster(&settings.options).context(AnalysisSnafu {})?;
                    groups.push((user, clusters));
                }
            }
            clusters_to_rectangle(&groups, hh, filter_user.is_none())
        }
        ReportKind::Records => session
            .all_changes(filter_user, Some(&progress))
            .and_then(|c| c.flatten_by_record())
            .context(AnalysisSnafu {})?,
        ReportKind::Edits => {
            let normalized = session
                .all_changes(filter_user, Some(&progress))
                .and_then(|c| c.normalize_by_version())
                .context(AnalysisSnafu {})?;
            debug!(
                "compute_report: {} records touched",
                normalized.record_info.len()
            );
            normalized.rows
        }
        ReportKind::Precincts => {
            let householder = session
                .householder(Some(&progress))
                .context(AnalysisSnafu {})?;
            let contents = session.contents(None).context(AnalysisSnafu {})?;
            let precincts = build_precincts_with(contents, &householder).context(AnalysisSnafu {})?;
            precincts_to_rectangle(&precincts)
        }
        ReportKind::Days => {
            let activity = session
                .all_changes(filter_user, Some(&progress))
                .and_then(|c| c.activity_by_day())
                .context(AnalysisSnafu {})?;
            days_to_rectangle(&activity)
        }
        ReportKind::Users => {
            let changes = session
                .all_changes(filter_user, Some(&progress))
                .context(AnalysisSnafu {})?;
            let partition = changes.partition_by_user().context(AnalysisSnafu {})?;
            users_to_rectangle(&partition)
        }
    };
    Ok(rect)
}

// Records that are not in the sheet count as their own household.
struct NoHouseholds;

impl Householding for NoHouseholds {
    fn household_id(&self, _rec_id: &str) -> Option<&str> {
        None
    }
}

fn write_report(rect: &SheetContents, out: Option<&str>) -> ReportResult<()> {
    match out {
        None | Some("stdout") => {
            let stdout = std::io::stdout();
            write_csv(rect, stdout.lock())
        }
        Some(path) => {
            info!("write_report: writing {:?}", path);
            if path.ends_with(".json") {
                let pretty_js = serde_json::to_string_pretty(&rectangle_to_json(rect))
                    .context(WritingJsonSnafu {})?;
                fs::write(path, pretty_js).context(WritingOutputSnafu { path })
            } else {
                let file = fs::File::create(path).context(WritingOutputSnafu { path })?;
                write_csv(rect, file)
            }
        }
    }
}

/// Writes the rectangle as CSV, with the column names as the header row.
pub fn write_csv(rect: &SheetContents, writer: impl Write) -> ReportResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(rect.keys()).context(CsvWriteSnafu {})?;
    let num_rows = rect.values().map(|col| col.len()).max().unwrap_or(0);
    for idx in 0..num_rows {
        let row: Vec<&str> = rect
            .values()
            .map(|col| col.get(idx).map(|s| s.as_str()).unwrap_or(""))
            .collect();
        wtr.write_record(&row).context(CsvWriteSnafu {})?;
    }
    wtr.flush()
        .map_err(csv::Error::from)
        .context(CsvWriteSnafu {})?;
    Ok(())
}

/// The JSON form of a rectangle: an object mapping every column to its values.
pub fn rectangle_to_json(rect: &SheetContents) -> JSValue {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    for (name, col) in rect.iter() {
        res.insert(
            name.to_string(),
            JSValue::Array(col.iter().map(|s| JSValue::String(s.clone())).collect()),
        );
    }
    JSValue::Object(res)
}

fn read_reference(path: &str) -> ReportResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

fn check_reference(rect: &SheetContents, reference_p: &str) -> ReportResult<()> {
    let pretty_js_report =
        serde_json::to_string_pretty(&rectangle_to_json(rect)).context(WritingJsonSnafu {})?;
    let reference = read_reference(reference_p)?;
    let pretty_js_reference =
        serde_json::to_string_pretty(&reference).context(WritingJsonSnafu {})?;
    if pretty_js_reference != pretty_js_report {
        warn!("Found differences with the reference report");
        print_diff(
            pretty_js_reference.as_str(),
            pretty_js_report.as_str(),
            "\n",
        );
        whatever!("Difference detected between the computed report and the reference report")
    }
    info!("check_reference: report matches {:?}", reference_p);
    Ok(())
}

fn resolve_settings(args: &Args) -> ReportResult<ReportSettings> {
    let config = match args.config.as_deref() {
        Some(config_p) => Some(read_config(config_p)?),
        None => None,
    };
    merge_settings(args, config)
}

fn read_config(config_p: &str) -> ReportResult<(ReportConfig, String)> {
    let config_str = fs::read_to_string(config_p).context(OpeningJsonSnafu { path: config_p })?;
    let config: ReportConfig =
        serde_json::from_str(&config_str).context(ParsingJsonSnafu { path: config_p })?;
    debug!("read_config: {:?}", config);
    let root_p = Path::new(config_p)
        .parent()
        .context(MissingParentDirSnafu {})?;
    Ok((config, root_p.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvass_analysis::builder::EventBuilder;
    use std::path::PathBuf;

    fn fixture(name: &str) -> String {
        let p: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "data", name]
            .iter()
            .collect();
        p.display().to_string()
    }

    fn fixture_args(report: &str) -> Args {
        Args {
            config: None,
            sheet: Some(fixture("sheet.csv")),
            sheet_type: None,
            excel_worksheet_name: None,
            deltas: Some(fixture("deltas.json")),
            report: Some(report.to_string()),
            user: None,
            gap_seconds: None,
            sort_input: false,
            out: None,
            reference: None,
            verbose: false,
        }
    }

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn unknown_report() {
        assert!(matches!(
            ReportKind::parse("leaflets"),
            Err(ReportError::UnknownReport { .. })
        ));
        assert_eq!(ReportKind::parse("days").unwrap(), ReportKind::Days);
    }

    #[test]
    fn clusters_per_user() {
        init();
        let settings = resolve_settings(&fixture_args("clusters")).unwrap();
        let rect = compute_report(&settings).unwrap();
        assert_eq!(
            rect.keys().collect::<Vec<_>>(),
            vec![
                "User",
                "Cluster",
                "Start",
                "End",
                "Duration",
                "DurationSeconds",
                "Records",
                "Households"
            ]
        );
        assert_eq!(rect.get("User").unwrap(), &vec!["alice", "alice", "bob"]);
        assert_eq!(rect.get("Cluster").unwrap(), &vec!["1", "2", "1"]);
        assert_eq!(
            rect.get("Duration").unwrap(),
            &vec!["10 minutes 0 seconds", "0 seconds", "2 minutes 0 seconds"]
        );
        assert_eq!(rect.get("Records").unwrap(), &vec!["3", "1", "2"]);
        // r1 and r2 share an address.
        assert_eq!(rect.get("Households").unwrap(), &vec!["2", "1", "2"]);
    }

    #[test]
    fn from_config_file() {
        init();
        let mut args = fixture_args("users");
        args.config = Some(fixture("config.json"));
        args.sheet = None;
        args.deltas = None;
        args.report = None;
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.report, ReportKind::Clusters);
        assert_eq!(settings.deltas, Some(fixture("deltas.json")));
        let rect = compute_report(&settings).unwrap();
        assert_eq!(rect.get("Records").unwrap(), &vec!["3", "1", "2"]);
    }

    #[test]
    fn clusters_for_one_user() {
        init();
        let mut args = fixture_args("clusters");
        args.user = Some("bob".to_string());
        args.sheet = None;
        let settings = resolve_settings(&args).unwrap();
        let rect = compute_report(&settings).unwrap();
        assert!(!rect.contains_key("User"));
        assert_eq!(rect.get("Records").unwrap(), &vec!["2"]);
        assert_eq!(rect.get("Households").unwrap(), &vec!["2"]);
    }

    #[test]
    fn precincts_need_the_sheet() {
        let mut args = fixture_args("precincts");
        args.sheet = None;
        let settings = resolve_settings(&args).unwrap();
        assert!(matches!(
            compute_report(&settings),
            Err(ReportError::MissingInput { .. })
        ));
    }

    #[test]
    fn precincts_from_csv() {
        init();
        let settings = resolve_settings(&fixture_args("precincts")).unwrap();
        let rect = compute_report(&settings).unwrap();
        assert_eq!(rect.get("Names").unwrap(), &vec!["P1", "P2"]);
        assert_eq!(rect.get("count").unwrap(), &vec!["3", "2"]);
        assert_eq!(rect.get("HouseholdCount").unwrap(), &vec!["2", "2"]);
        assert_eq!(rect.get("GOPPercent").unwrap(), &vec!["50%", "na"]);
        assert_eq!(rect.get("ContactCount").unwrap(), &vec!["2", "1"]);
    }

    #[test]
    fn users_and_days() {
        init();
        let settings = resolve_settings(&fixture_args("users")).unwrap();
        let rect = compute_report(&settings).unwrap();
        assert_eq!(rect.get("User").unwrap(), &vec!["alice", "bob"]);
        assert_eq!(rect.get("Changes").unwrap(), &vec!["3", "1"]);

        let settings = resolve_settings(&fixture_args("days")).unwrap();
        let rect = compute_report(&settings).unwrap();
        assert_eq!(rect.get("Day").unwrap(), &vec!["2017-06-01"]);
        assert_eq!(rect.get("Edits").unwrap(), &vec!["4"]);
        assert_eq!(rect.get("Users").unwrap(), &vec!["2"]);
    }

    #[test]
    fn records_keep_last_value() {
        let settings = resolve_settings(&fixture_args("records")).unwrap();
        let rect = compute_report(&settings).unwrap();
        assert_eq!(rect.get("RecId").unwrap(), &vec!["r1", "r2", "r3", "r4"]);
        assert_eq!(
            rect.get("ResultOfContact").unwrap(),
            &vec!["NotHome", "Home", "Home", ""]
        );
    }

    #[test]
    fn json_output_and_reference() {
        init();
        let dir = tempfile::tempdir().unwrap();
        let out_p = dir.path().join("users.json").display().to_string();
        let mut args = fixture_args("users");
        args.out = Some(out_p.clone());
        run_report(&args).unwrap();

        let written = read_reference(&out_p).unwrap();
        assert_eq!(written["User"], serde_json::json!(["alice", "bob"]));

        // The report is its own reference.
        args.reference = Some(out_p.clone());
        run_report(&args).unwrap();

        let other_p = dir.path().join("other.json");
        fs::write(&other_p, r#"{"User": ["carol"]}"#).unwrap();
        args.out = Some(dir.path().join("again.json").display().to_string());
        args.reference = Some(other_p.display().to_string());
        assert!(matches!(
            run_report(&args),
            Err(ReportError::Whatever { .. })
        ));
    }

    #[test]
    fn csv_writer_pads_short_columns() {
        let mut rect = SheetContents::new();
        rect.add("A", vec!["1".to_string(), "2".to_string()]);
        rect.add("B", vec!["x".to_string()]);
        let mut buf: Vec<u8> = Vec::new();
        write_csv(&rect, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "A,B\n1,x\n2,\n");
    }

    #[test]
    fn in_memory_events_cluster() {
        let log = ChangeLog::new(vec![
            EventBuilder::new(1, "carol", "2017-06-01T10:00:00Z")
                .edit("r1", &[("ResultOfContact", "Home")])
                .build(),
            EventBuilder::new(2, "carol", "2017-06-01T10:30:00Z")
                .edit("r2", &[("ResultOfContact", "Home")])
                .build(),
        ])
        .unwrap();
        let clusters = log.cluster(&ClusterOptions::default()).unwrap();
        let rect = clusters_to_rectangle(&[("carol".to_string(), clusters)], &NoHouseholds, false);
        assert_eq!(rect.get("Cluster").unwrap(), &vec!["1", "2"]);
        assert_eq!(rect.get("Households").unwrap(), &vec!["1", "1"]);
    }
}
