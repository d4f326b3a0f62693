use crate::browser::Browser;
use crate::config::{Config, Site};
use crate::error::SpiderError;
use crate::extract::{Extraction, Extractor};
use crate::fetch::PageFetcher;
use crate::model::Ticker;
use crate::quarter::Quarter;
use crate::session::Session;
use tracing::{info, warn};

/// The source's holdings pages, read through one borrowed session.
pub struct HoldingsPages<'s, B: Browser> {
    session: &'s Session<B>,
    fetcher: PageFetcher,
    extractor: Extractor,
    site: Site,
}

impl<'s, B: Browser> HoldingsPages<'s, B> {
    pub fn new(
        session: &'s Session<B>,
        fetcher: PageFetcher,
        extractor: Extractor,
        site: Site,
    ) -> Self {
        Self {
            session,
            fetcher,
            extractor,
            site,
        }
    }

    pub fn from_config(session: &'s Session<B>, config: &Config) -> Self {
        Self::new(
            session,
            PageFetcher::new(config.retry.clone(), config.page_timeout),
            config.extractor.clone(),
            config.site.clone(),
        )
    }

    /// Holdings as of the latest filing.
    pub async fn current(&self, ticker: &Ticker) -> Result<Extraction, SpiderError> {
        let url = self.site.current_url(ticker);
        info!("[{ticker}] fetching current holdings from {url}");
        let html = self.fetcher.fetch(self.session, &url).await?;
        Ok(self.extractor.extract(&html))
    }

    /// Holdings reported for one past quarter.
    pub async fn quarter(
        &self,
        ticker: &Ticker,
        quarter: Quarter,
    ) -> Result<Extraction, SpiderError> {
        let url = self.site.historical_url(ticker, quarter);
        info!("[{ticker}] fetching {quarter} holdings from {url}");
        let html = self.fetcher.fetch(self.session, &url).await?;

        if let Some(shown) = self.extractor.page_quarter(&html) {
            if shown != quarter {
                warn!("[{ticker}] asked for {quarter} but the page is labelled {shown}");
            }
        }
        Ok(self.extractor.extract(&html))
    }
}
