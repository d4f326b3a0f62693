use crate::config::OutputFormat;
use crate::error::SpiderError;
use crate::model::{HoldingsReport, Ticker};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

const CURRENT_HEADER: [&str; 4] = [
    "institution_name",
    "shares",
    "market_value",
    "percent_of_portfolio",
];

const HISTORICAL_HEADER: [&str; 5] = [
    "quarter",
    "institution_name",
    "shares",
    "market_value",
    "percent_of_portfolio",
];

/// Somewhere serialized artifacts end up.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()>;
}

/// The files a run can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Json,
    CurrentCsv,
    HistoricalCsv,
}

impl ArtifactKind {
    /// `holdings_<TICKER>[_current|_historical].<ext>`
    pub fn file_name(&self, ticker: &Ticker) -> String {
        match self {
            Self::Json => format!("holdings_{ticker}.json"),
            Self::CurrentCsv => format!("holdings_{ticker}_current.csv"),
            Self::HistoricalCsv => format!("holdings_{ticker}_historical.csv"),
        }
    }

    pub fn format(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::CurrentCsv | Self::HistoricalCsv => "csv",
        }
    }

    fn for_formats(formats: OutputFormat) -> Vec<Self> {
        let mut kinds = Vec::with_capacity(3);
        if formats.json() {
            kinds.push(Self::Json);
        }
        if formats.csv() {
            kinds.push(Self::CurrentCsv);
            kinds.push(Self::HistoricalCsv);
        }
        kinds
    }

    fn render(&self, report: &HoldingsReport) -> Result<Vec<u8>, SpiderError> {
        match self {
            Self::Json => to_json(report),
            Self::CurrentCsv => current_csv(report),
            Self::HistoricalCsv => historical_csv(report),
        }
    }
}

/// One attempted output file and how it went.
#[derive(Debug)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub result: Result<(), SpiderError>,
}

impl Artifact {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Write every artifact `formats` asks for. Each one is rendered and written on its own, so
/// one failing never stops the others.
pub async fn serialize<S: Sink + ?Sized>(
    report: &HoldingsReport,
    formats: OutputFormat,
    output_dir: &Path,
    sink: &S,
) -> Vec<Artifact> {
    let mut artifacts = Vec::new();
    for kind in ArtifactKind::for_formats(formats) {
        let path = output_dir.join(kind.file_name(&report.ticker));
        let result = match kind.render(report) {
            Ok(bytes) => sink
                .write(&path, &bytes)
                .await
                .map_err(|source| SpiderError::Write {
                    path: path.clone(),
                    source,
                }),
            Err(err) => Err(err),
        };

        match &result {
            Ok(()) => info!("{} saved to {}", kind.format(), path.display()),
            Err(err) => error!("failed to save {}, error({err})", path.display()),
        }
        artifacts.push(Artifact { kind, path, result });
    }
    artifacts
}

/// The whole report as a pretty-printed JSON document.
pub fn to_json(report: &HoldingsReport) -> Result<Vec<u8>, SpiderError> {
    serde_json::to_vec_pretty(report).map_err(|err| SpiderError::Render {
        format: "json",
        message: err.to_string(),
    })
}

/// One row per current holding.
pub fn current_csv(report: &HoldingsReport) -> Result<Vec<u8>, SpiderError> {
    write_csv(&CURRENT_HEADER, &report.current_holdings)
}

/// One row per (quarter, holding) pair, most recent quarter first.
pub fn historical_csv(report: &HoldingsReport) -> Result<Vec<u8>, SpiderError> {
    let rows = report.historical_holdings.iter().flat_map(|quarter| {
        quarter.holdings.iter().map(|holding| HistoricalRow {
            quarter: &quarter.quarter,
            institution_name: &holding.institution_name,
            shares: &holding.shares,
            market_value: &holding.market_value,
            percent_of_portfolio: &holding.percent_of_portfolio,
        })
    });
    write_csv(&HISTORICAL_HEADER, rows)
}

#[derive(Serialize)]
struct HistoricalRow<'a> {
    quarter: &'a str,
    institution_name: &'a str,
    shares: &'a str,
    market_value: &'a str,
    percent_of_portfolio: &'a str,
}

// the header goes out by hand so a table with no rows still has one
fn write_csv<R: Serialize>(
    header: &[&str],
    rows: impl IntoIterator<Item = R>,
) -> Result<Vec<u8>, SpiderError> {
    let render = |message: String| SpiderError::Render {
        format: "csv",
        message,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|err| render(err.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| render(err.to_string()))?;
    }
    writer.into_inner().map_err(|err| render(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HoldingRecord, QuarterHoldings};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Keeps artifacts in memory; refuses paths ending in `deny`.
    #[derive(Default)]
    struct MemorySink {
        files: Mutex<HashMap<PathBuf, Vec<u8>>>,
        deny: Option<&'static str>,
    }

    #[async_trait]
    impl Sink for MemorySink {
        async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
            if let Some(suffix) = self.deny {
                if path.to_string_lossy().ends_with(suffix) {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::PermissionDenied,
                        "permission denied",
                    ));
                }
            }
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), bytes.to_vec());
            Ok(())
        }
    }

    fn holding(name: &str, shares: &str, value: &str, percent: &str) -> HoldingRecord {
        HoldingRecord {
            institution_name: name.into(),
            shares: shares.into(),
            market_value: value.into(),
            percent_of_portfolio: percent.into(),
        }
    }

    fn report() -> HoldingsReport {
        let vanguard = holding("Vanguard Group", "1,400,790,809", "$311,157,662,351", "5.63%");
        let blackrock = holding("Blackrock Inc.", "1,038,438,316", "$230,555,432,123", "4.12%");
        HoldingsReport {
            ticker: Ticker::parse("AAPL").unwrap(),
            current_holdings: vec![vanguard.clone(), blackrock.clone()],
            historical_holdings: vec![
                QuarterHoldings {
                    quarter: "Q2 2026".into(),
                    holdings: vec![vanguard.clone(), blackrock],
                },
                QuarterHoldings {
                    quarter: "Q1 2026".into(),
                    holdings: vec![vanguard],
                },
            ],
        }
    }

    #[test]
    fn json_round_trip_keeps_every_string() {
        let report = report();
        let bytes = to_json(&report).unwrap();
        let parsed: HoldingsReport = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, report);

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["ticker"], "AAPL");
        assert_eq!(value["current_holdings"][0]["shares"], "1,400,790,809");
        assert_eq!(value["current_holdings"][1]["market_value"], "$230,555,432,123");
        assert_eq!(value["historical_holdings"][1]["quarter"], "Q1 2026");
    }

    #[test]
    fn historical_csv_has_one_row_per_quarter_holding() {
        let report = report();
        let csv = String::from_utf8(historical_csv(&report).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), report.historical_rows() + 1);
        assert_eq!(
            lines[0],
            "quarter,institution_name,shares,market_value,percent_of_portfolio"
        );
        assert_eq!(
            lines[1],
            "Q2 2026,Vanguard Group,\"1,400,790,809\",\"$311,157,662,351\",5.63%"
        );
        assert!(lines[3].starts_with("Q1 2026,Vanguard Group,"));
    }

    #[test]
    fn current_csv_reads_back_verbatim() {
        let report = report();
        let bytes = current_csv(&report).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let rows: Vec<HoldingRecord> = reader.deserialize().map(|row| row.unwrap()).collect();
        assert_eq!(rows, report.current_holdings);
    }

    #[test]
    fn empty_tables_still_get_headers() {
        let report = HoldingsReport::new(Ticker::parse("AAPL").unwrap());
        let csv = String::from_utf8(historical_csv(&report).unwrap()).unwrap();
        assert_eq!(
            csv.trim_end(),
            "quarter,institution_name,shares,market_value,percent_of_portfolio"
        );
    }

    #[tokio::test]
    async fn writes_deterministic_paths() {
        let sink = MemorySink::default();
        let artifacts = serialize(&report(), OutputFormat::Both, Path::new("out"), &sink).await;
        let paths: Vec<PathBuf> = artifacts.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("out/holdings_AAPL.json"),
                PathBuf::from("out/holdings_AAPL_current.csv"),
                PathBuf::from("out/holdings_AAPL_historical.csv"),
            ]
        );
        assert!(artifacts.iter().all(Artifact::is_ok));
        assert_eq!(sink.files.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn one_failed_format_does_not_block_the_other() {
        let sink = MemorySink {
            deny: Some(".csv"),
            ..MemorySink::default()
        };
        let artifacts = serialize(&report(), OutputFormat::Both, Path::new("out"), &sink).await;

        assert_eq!(artifacts.len(), 3);
        assert!(artifacts[0].is_ok());
        assert_eq!(artifacts[0].kind, ArtifactKind::Json);
        assert!(artifacts[1..]
            .iter()
            .all(|a| matches!(a.result, Err(SpiderError::Write { .. }))));

        let files = sink.files.lock().unwrap();
        assert!(files.contains_key(Path::new("out/holdings_AAPL.json")));
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn json_only_writes_a_single_document() {
        let sink = MemorySink::default();
        let artifacts = serialize(&report(), OutputFormat::Json, Path::new("out"), &sink).await;
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].kind.format(), "json");
    }
}
