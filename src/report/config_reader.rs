use std::path::PathBuf;

use canvass_analysis::ClusterOptions;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::args::Args;
use crate::report::{InvalidGapThresholdSnafu, ReportKind, ReportResult, UnknownProviderSnafu};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "reportName")]
    pub report_name: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SheetSourceConfig {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "worksheetName")]
    pub worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DeltaSourceConfig {
    #[serde(rename = "filePath")]
    pub file_path: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(rename = "gapThresholdSeconds")]
    pub gap_threshold_seconds: Option<i64>,
    #[serde(rename = "assumeSortedInput")]
    pub assume_sorted_input: Option<bool>,
    #[serde(rename = "filterUser")]
    pub filter_user: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    #[serde(rename = "sheetSource")]
    pub sheet_source: Option<SheetSourceConfig>,
    #[serde(rename = "deltaSource")]
    pub delta_source: Option<DeltaSourceConfig>,
    pub rules: Option<RulesConfig>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SheetProvider {
    Csv,
    Xlsx,
}

/// A sheet snapshot stored in a local file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SheetFile {
    pub path: String,
    pub provider: SheetProvider,
    pub worksheet_name: Option<String>,
}

/// Everything needed to run a report, once the command line and the configuration
/// file have been merged.
#[derive(PartialEq, Debug, Clone)]
pub struct ReportSettings {
    pub report: ReportKind,
    pub sheet: Option<SheetFile>,
    pub deltas: Option<String>,
    pub filter_user: Option<String>,
    pub options: ClusterOptions,
    pub out: Option<String>,
}

fn parse_provider(provider: Option<&str>, path: &str) -> ReportResult<SheetProvider> {
    match provider {
        Some("csv") => Ok(SheetProvider::Csv),
        Some("xlsx") => Ok(SheetProvider::Xlsx),
        Some(x) => UnknownProviderSnafu { provider: x }.fail(),
        None if path.ends_with(".xlsx") => Ok(SheetProvider::Xlsx),
        None => Ok(SheetProvider::Csv),
    }
}

fn relative_to(root: &str, file_path: &str) -> String {
    let p: PathBuf = [root, file_path].iter().collect();
    p.display().to_string()
}

/// Merges the command line with the configuration file, if any. The command line wins.
///
/// The configuration comes with the directory it was read from: the paths it contains
/// are relative to that directory.
pub fn merge_settings(
    args: &Args,
    config: Option<(ReportConfig, String)>,
) -> ReportResult<ReportSettings> {
    let (config, root) = match config {
        Some((c, root)) => (Some(c), root),
        None => (None, String::new()),
    };
    let output_settings = config.as_ref().and_then(|c| c.output_settings.clone());
    let rules = config
        .as_ref()
        .and_then(|c| c.rules.clone())
        .unwrap_or_default();

    let report_name = args
        .report
        .clone()
        .or_else(|| output_settings.as_ref().and_then(|o| o.report_name.clone()))
        .unwrap_or_else(|| "clusters".to_string());
    let report = ReportKind::parse(&report_name)?;

    let sheet = match (&args.sheet, config.as_ref().and_then(|c| c.sheet_source.as_ref())) {
        (Some(path), _) => Some(SheetFile {
            path: path.clone(),
            provider: parse_provider(args.sheet_type.as_deref(), path)?,
            worksheet_name: args.excel_worksheet_name.clone(),
        }),
        (None, Some(ss)) => Some(SheetFile {
            path: relative_to(&root, &ss.file_path),
            provider: parse_provider(
                args.sheet_type.as_deref().or(ss.provider.as_deref()),
                &ss.file_path,
            )?,
            worksheet_name: args
                .excel_worksheet_name
                .clone()
                .or_else(|| ss.worksheet_name.clone()),
        }),
        (None, None) => None,
    };

    let deltas = args.deltas.clone().or_else(|| {
        config
            .as_ref()
            .and_then(|c| c.delta_source.as_ref())
            .map(|ds| relative_to(&root, &ds.file_path))
    });

    let mut options = match args.gap_seconds.or(rules.gap_threshold_seconds) {
        Some(seconds) => ClusterOptions::with_gap_seconds(seconds)
            .context(InvalidGapThresholdSnafu { seconds })?,
        None => ClusterOptions::default(),
    };
    options.assume_sorted_input = !args.sort_input && rules.assume_sorted_input.unwrap_or(true);

    let out = args.out.clone().or_else(|| {
        output_settings
            .as_ref()
            .and_then(|o| o.output_directory.as_ref())
            .map(|dir| relative_to(&relative_to(&root, dir), &format!("{}.csv", report.name())))
    });

    Ok(ReportSettings {
        report,
        sheet,
        deltas,
        filter_user: args.user.clone().or(rules.filter_user),
        options,
        out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportError;
    use chrono::Duration;

    fn empty_args() -> Args {
        Args {
            config: None,
            sheet: None,
            sheet_type: None,
            excel_worksheet_name: None,
            deltas: None,
            report: None,
            user: None,
            gap_seconds: None,
            sort_input: false,
            out: None,
            reference: None,
            verbose: false,
        }
    }

    fn config() -> ReportConfig {
        serde_json::from_str(
            r#"{
            "outputSettings": { "reportName": "users", "outputDirectory": "out" },
            "sheetSource": { "provider": "xlsx", "filePath": "sheet.xlsx", "worksheetName": "Voters" },
            "deltaSource": { "filePath": "data/deltas.json" },
            "rules": { "gapThresholdSeconds": 600, "assumeSortedInput": false, "filterUser": "alice" }
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn defaults() {
        let s = merge_settings(&empty_args(), None).unwrap();
        assert_eq!(s.report, ReportKind::Clusters);
        assert_eq!(s.sheet, None);
        assert_eq!(s.deltas, None);
        assert_eq!(s.options, ClusterOptions::default());
        assert_eq!(s.out, None);
    }

    #[test]
    fn config_paths_are_relative() {
        let s = merge_settings(&empty_args(), Some((config(), "/work".to_string()))).unwrap();
        assert_eq!(s.report, ReportKind::Users);
        assert_eq!(
            s.sheet,
            Some(SheetFile {
                path: "/work/sheet.xlsx".to_string(),
                provider: SheetProvider::Xlsx,
                worksheet_name: Some("Voters".to_string()),
            })
        );
        assert_eq!(s.deltas.as_deref(), Some("/work/data/deltas.json"));
        assert_eq!(s.filter_user.as_deref(), Some("alice"));
        assert_eq!(s.options.gap_threshold, Duration::seconds(600));
        assert!(!s.options.assume_sorted_input);
        assert_eq!(s.out.as_deref(), Some("/work/out/users.csv"));
    }

    #[test]
    fn args_override_config() {
        let mut args = empty_args();
        args.report = Some("days".to_string());
        args.sheet = Some("other.csv".to_string());
        args.gap_seconds = Some(60);
        args.user = Some("bob".to_string());
        args.out = Some("stdout".to_string());
        let s = merge_settings(&args, Some((config(), "/work".to_string()))).unwrap();
        assert_eq!(s.report, ReportKind::Days);
        assert_eq!(
            s.sheet.map(|f| (f.path, f.provider)),
            Some(("other.csv".to_string(), SheetProvider::Csv))
        );
        assert_eq!(s.options.gap_threshold, Duration::seconds(60));
        assert_eq!(s.filter_user.as_deref(), Some("bob"));
        assert_eq!(s.out.as_deref(), Some("stdout"));
    }

    #[test]
    fn unknown_provider() {
        let mut args = empty_args();
        args.sheet = Some("sheet.ods".to_string());
        args.sheet_type = Some("ods".to_string());
        assert!(merge_settings(&args, None).is_err());
    }

    #[test]
    fn gap_threshold_is_validated() {
        let mut args = empty_args();
        args.gap_seconds = Some(-5);
        assert!(matches!(
            merge_settings(&args, None),
            Err(ReportError::InvalidGapThreshold { seconds: -5 })
        ));
        args.gap_seconds = Some(i64::MAX);
        assert!(matches!(
            merge_settings(&args, None),
            Err(ReportError::InvalidGapThreshold { .. })
        ));

        let mut config = config();
        if let Some(rules) = config.rules.as_mut() {
            rules.gap_threshold_seconds = Some(-1);
        }
        assert!(matches!(
            merge_settings(&empty_args(), Some((config, "/work".to_string()))),
            Err(ReportError::InvalidGapThreshold { seconds: -1 })
        ));
    }
}
