use std::path::PathBuf;
use thiserror::Error;

/// Fatal and retry-classified failures of a holdings run.
///
/// Extraction problems are not part of this enum; see [`ExtractionWarning`], which is
/// recoverable and travels alongside whatever records could be read.
#[derive(Error, Debug)]
pub enum SpiderError {
    /// The source rejected the credentials, or the login form could not be found or submitted.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The automation capability could not be initialised.
    #[error("browsing environment unavailable: {0}")]
    Environment(String),

    /// The page did not settle within the bounded wait, on every attempt.
    #[error("timed out fetching {url} after {attempts} attempt(s)")]
    FetchTimeout { url: String, attempts: u32 },

    /// A non-transient failure, or transient failures that exhausted the retry budget.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: BrowseError,
    },

    /// The source bounced a page request back to its login form.
    #[error("session expired while fetching {url}")]
    SessionExpired { url: String },

    /// Invalid or missing configuration, detected before any browsing starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An output artifact could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output artifact could not be rendered.
    #[error("failed to render {format}: {message}")]
    Render {
        format: &'static str,
        message: String,
    },
}

/// Errors raised by a [`Browser`](crate::browser::Browser) for a single request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowseError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl BrowseError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
            Self::InvalidUrl(_) => false,
        }
    }
}

impl From<reqwest::Error> for BrowseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// The four fields every holding row must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Institution,
    Shares,
    MarketValue,
    PercentOfPortfolio,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Institution => "institution_name",
            Self::Shares => "shares",
            Self::MarketValue => "market_value",
            Self::PercentOfPortfolio => "percent_of_portfolio",
        })
    }
}

/// Recoverable problems met while reading a holdings table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// No holdings table could be located in the document.
    AnchorNotFound,

    /// A data row (1-based) was dropped because a required field was absent.
    MalformedRow { row: usize, missing: Field },
}

impl std::fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnchorNotFound => f.write_str("holdings table not found"),
            Self::MalformedRow { row, missing } => {
                write!(f, "row {row} dropped, missing {missing}")
            }
        }
    }
}

/// A fatal error that cut the historical pass short, with the quarters gathered before it.
#[derive(Error, Debug)]
#[error("historical collection interrupted after {} quarter(s)", .collected.len())]
pub struct Interrupted {
    pub collected: Vec<crate::model::QuarterHoldings>,
    #[source]
    pub source: SpiderError,
}
