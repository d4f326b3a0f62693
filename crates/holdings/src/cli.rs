use clap::{ArgAction, Parser, ValueEnum};
use holdings_spider::config::{OutputFormat, DEFAULT_MAX_QUARTERS, MAX_QUARTERS};
use holdings_spider::quarter::Quarter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Scrape institutional holdings data for a stock ticker",
    long_about = None,
    after_help = "Examples:\n  holdings --ticker AAPL\n  holdings --ticker MSFT --output-format csv\n  holdings --ticker GOOGL --headless false"
)]
pub struct Cli {
    /// Stock ticker symbol (e.g., AAPL, MSFT, GOOGL).
    #[arg(short, long)]
    pub ticker: String,

    /// Output format for the scraped data.
    #[arg(short = 'f', long, value_enum, default_value_t = Format::Json)]
    pub output_format: Format,

    /// Run the browser in headless mode.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub headless: bool,

    /// Output directory for data files.
    #[arg(short, long, default_value = holdings_spider::config::DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Sets the level of logging.
    #[arg(short, long, value_enum, default_value_t = LogLevel::INFO)]
    pub log_level: LogLevel,

    /// Number of past quarters to collect (0 skips the historical pass).
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_MAX_QUARTERS as u32,
        value_parser = clap::value_parser!(u32).range(..=MAX_QUARTERS as i64)
    )]
    pub quarters: u32,

    /// Most recent quarter to collect, e.g. "Q2 2026".
    ///
    /// If not provided, the latest completed quarter is used.
    #[arg(long)]
    pub from_quarter: Option<Quarter>,

    /// Seconds to wait for each page to load.
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Attempts per page before giving up on it.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub attempts: u32,

    /// Show progress bars while collecting quarters.
    #[arg(short, long)]
    pub progress: bool,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum LogLevel {
    DEBUG,
    INFO,
    WARNING,
    ERROR,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    /// A single JSON document.
    Json,

    /// Current and historical CSV tables.
    Csv,

    /// JSON and CSV.
    Both,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Csv => OutputFormat::Csv,
            Format::Both => OutputFormat::Both,
        }
    }
}
