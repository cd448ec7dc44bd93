use clap::Parser;

/// This is a reporting program for canvassing sheets and their edit history.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file describing the inputs and the rules.
    /// All the other options override the values of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The snapshot of the sheet, with a header row.
    #[clap(short, long, value_parser)]
    pub sheet: Option<String>,

    /// (default csv) The type of the sheet file: csv or xlsx.
    #[clap(long, value_parser)]
    pub sheet_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) The edit history of the sheet, as a JSON array of edit events.
    #[clap(short, long, value_parser)]
    pub deltas: Option<String>,

    /// (default clusters) The report to produce: clusters, records, edits, precincts, days or users.
    #[clap(long, value_parser)]
    pub report: Option<String>,

    /// (user name, optional) Only looks at the edits of this user.
    #[clap(short, long, value_parser)]
    pub user: Option<String>,

    /// (default 900) The number of seconds without any edit after which a work session ends.
    #[clap(long, value_parser)]
    pub gap_seconds: Option<i64>,

    /// If passed as an argument, the edits are sorted by time before clustering instead of
    /// being taken in the order of the history.
    #[clap(long, takes_value = false)]
    pub sort_input: bool,

    /// (file path, 'stdout' or empty) Where to write the report. A path ending in .json gets
    /// the report in JSON format, any other path gets CSV.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference report in JSON format. If provided, canvassrpt will
    /// check that the computed report matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
