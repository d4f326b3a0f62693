use crate::error::SpiderError;
use crate::extract::Extractor;
use crate::fetch::RetryPolicy;
use crate::model::Ticker;
use crate::quarter::Quarter;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.insidermonkey.com";
pub const DEFAULT_OUTPUT_DIR: &str = "../data";
pub const DEFAULT_MAX_QUARTERS: usize = 8;
/// The furthest back the command line lets a historical pass reach.
pub const MAX_QUARTERS: usize = 80;
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Login identifier and secret; only ever handed to the session provider.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read `USERNAME` and `PASSWORD` from the process environment (including a loaded
    /// `.env` file).
    pub fn from_env() -> Result<Self, SpiderError> {
        let username = dotenv::var("USERNAME").unwrap_or_default();
        let password = dotenv::var("PASSWORD").unwrap_or_default();
        let credentials = Self::new(username, password);
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn validate(&self) -> Result<(), SpiderError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(SpiderError::Config(
                "USERNAME and PASSWORD must be set in the environment or .env file".into(),
            ));
        }
        Ok(())
    }
}

// never print the secret
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Where the data source lives; path templates take `{ticker}`, `{year}` and `{quarter}`.
#[derive(Debug, Clone)]
pub struct Site {
    pub base_url: String,
    pub login_path: String,
    pub current_path: String,
    pub historical_path: String,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: "/login".to_string(),
            current_path: "/insider-trading/company/{ticker}/institutional-investors/".to_string(),
            historical_path:
                "/insider-trading/company/{ticker}/institutional-investors/?quarter={year}-Q{quarter}"
                    .to_string(),
        }
    }
}

impl Site {
    /// The default site, with the base URL overridable through `HOLDINGS_BASE_URL`.
    pub fn from_env() -> Self {
        let mut site = Self::default();
        if let Ok(base_url) = dotenv::var("HOLDINGS_BASE_URL") {
            site.base_url = base_url;
        }
        site
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn login_url(&self) -> String {
        self.join(&self.login_path)
    }

    pub fn current_url(&self, ticker: &Ticker) -> String {
        self.join(&self.current_path.replace("{ticker}", ticker.as_str()))
    }

    pub fn historical_url(&self, ticker: &Ticker, quarter: Quarter) -> String {
        let path = self
            .historical_path
            .replace("{ticker}", ticker.as_str())
            .replace("{year}", &quarter.year().to_string())
            .replace("{quarter}", &quarter.number().to_string());
        self.join(&path)
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Which artifacts to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Both,
}

impl OutputFormat {
    pub fn json(&self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }

    pub fn csv(&self) -> bool {
        matches!(self, Self::Csv | Self::Both)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = SpiderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "both" => Ok(Self::Both),
            other => Err(SpiderError::Config(format!(
                "unknown output format: {other}"
            ))),
        }
    }
}

/// Everything one run needs, built once at startup and passed down by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub ticker: Ticker,
    pub formats: OutputFormat,
    pub headless: bool,
    pub output_dir: PathBuf,
    pub max_quarters: usize,
    /// Offset 0 of the historical pass; the latest completed quarter when unset.
    pub reference_quarter: Option<Quarter>,
    pub page_timeout: Duration,
    pub retry: RetryPolicy,
    pub site: Site,
    /// Where holdings tables are looked for on every page.
    pub extractor: Extractor,
    pub credentials: Credentials,
}

impl Config {
    /// A config with defaults for everything but the ticker and credentials.
    pub fn new(ticker: Ticker, credentials: Credentials) -> Self {
        Self {
            ticker,
            formats: OutputFormat::default(),
            headless: true,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_quarters: DEFAULT_MAX_QUARTERS,
            reference_quarter: None,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            retry: RetryPolicy::default(),
            site: Site::default(),
            extractor: Extractor::default(),
            credentials,
        }
    }
}

impl Config {
    pub fn reference_quarter(&self) -> Quarter {
        self.reference_quarter
            .unwrap_or_else(|| Quarter::latest_completed(&chrono::Local::now()))
    }
}
