use crate::error::SpiderError;
use serde::{Deserialize, Serialize};

/// A validated stock symbol: uppercase ASCII alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    const MAX_LEN: usize = 10;

    pub fn parse(raw: &str) -> Result<Self, SpiderError> {
        let ticker = raw.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(SpiderError::Config("ticker cannot be empty".into()));
        }
        if ticker.len() > Self::MAX_LEN || !ticker.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SpiderError::Config(format!(
                "invalid ticker format: {ticker}"
            )));
        }
        Ok(Self(ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One institution's stake, with every field kept exactly as the source displays it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub institution_name: String,
    pub shares: String,
    pub market_value: String,
    pub percent_of_portfolio: String,
}

/// The holdings reported for one past quarter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterHoldings {
    pub quarter: String,
    pub holdings: Vec<HoldingRecord>,
}

/// Everything gathered for a ticker in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingsReport {
    pub ticker: Ticker,
    pub current_holdings: Vec<HoldingRecord>,
    pub historical_holdings: Vec<QuarterHoldings>,
}

impl HoldingsReport {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            current_holdings: Vec::new(),
            historical_holdings: Vec::new(),
        }
    }

    /// Total number of (quarter, holding) pairs across the historical pass.
    pub fn historical_rows(&self) -> usize {
        self.historical_holdings
            .iter()
            .map(|quarter| quarter.holdings.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.current_holdings.is_empty() && self.historical_holdings.is_empty()
    }
}
