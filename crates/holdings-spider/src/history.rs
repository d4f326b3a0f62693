use crate::browser::Browser;
use crate::error::{Interrupted, SpiderError};
use crate::model::{QuarterHoldings, Ticker};
use crate::pages::HoldingsPages;
use crate::quarter::Quarter;
use crate::tui::Progress;
use tracing::{error, info, warn};

/// Walk back `max_quarters` quarters from `reference`, most recent first.
///
/// A quarter that cannot be fetched, or whose page has no holdings table, is logged and
/// left out. An expired session stops the walk, handing back what was already collected.
pub async fn collect<B: Browser>(
    pages: &HoldingsPages<'_, B>,
    ticker: &Ticker,
    reference: Quarter,
    max_quarters: usize,
) -> Result<Vec<QuarterHoldings>, Interrupted> {
    collect_with_progress(pages, ticker, reference, max_quarters, &Progress::hidden()).await
}

pub(crate) async fn collect_with_progress<B: Browser>(
    pages: &HoldingsPages<'_, B>,
    ticker: &Ticker,
    reference: Quarter,
    max_quarters: usize,
    progress: &Progress,
) -> Result<Vec<QuarterHoldings>, Interrupted> {
    let time = std::time::Instant::now();
    info!("[{ticker}] collecting {max_quarters} quarter(s) back from {reference}");

    let mut collected = Vec::new();
    for offset in 0..max_quarters {
        let quarter = reference.back(offset);

        match pages.quarter(ticker, quarter).await {
            Ok(extraction) if !extraction.anchor_found() => {
                warn!("[{ticker}] {quarter} skipped, holdings table not found");
                progress.fail();
            }
            Ok(extraction) => {
                info!(
                    "[{ticker}] {quarter}: {} holding(s), {} row(s) dropped",
                    extraction.records.len(),
                    extraction.dropped_rows()
                );
                collected.push(QuarterHoldings {
                    quarter: quarter.to_string(),
                    holdings: extraction.records,
                });
                progress.succeed();
            }
            Err(err @ SpiderError::SessionExpired { .. }) => {
                error!("[{ticker}] {quarter} aborted the historical pass, error({err})");
                progress.finish();
                return Err(Interrupted {
                    collected,
                    source: err,
                });
            }
            Err(err) => {
                warn!("[{ticker}] {quarter} skipped, error({err})");
                progress.fail();
            }
        }
    }
    progress.finish();

    info!(
        "[{ticker}] {} of {max_quarters} quarter(s) collected, time elapsed: {:?}",
        collected.len(),
        time.elapsed()
    );
    Ok(collected)
}
