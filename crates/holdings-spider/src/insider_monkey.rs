use crate::browser::Browser;
use crate::config::Config;
use crate::error::{Interrupted, SpiderError};
use crate::history;
use crate::model::HoldingsReport;
use crate::pages::HoldingsPages;
use crate::serialize::{serialize, Artifact, Sink};
use crate::session::Session;
use crate::tui::Progress;
use tracing::{error, info, warn};

// scrape
// ----------------------------------------------------------------------------

/// What one run produced, including anything that went wrong after login.
#[derive(Debug)]
pub struct Run {
    pub report: HoldingsReport,
    pub artifacts: Vec<Artifact>,
    /// The error that stopped gathering early, if any; the report holds what came before it.
    pub fatal: Option<SpiderError>,
}

impl Run {
    pub fn succeeded(&self) -> bool {
        self.fatal.is_none() && self.artifacts.iter().all(Artifact::is_ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SpiderError> {
        self.fatal.iter().chain(
            self.artifacts
                .iter()
                .filter_map(|artifact| artifact.result.as_ref().err()),
        )
    }
}

/// Log in, gather current and historical holdings for `config.ticker`, and write the
/// configured artifacts through `sink`.
///
/// A failed login returns `Err` and writes nothing. Past login, whatever was gathered is
/// always flushed and the session is always released; a fatal error is reported on the
/// returned [`Run`].
pub async fn scrape<B, S>(
    config: &Config,
    browser: B,
    sink: &S,
    tui: bool,
) -> Result<Run, SpiderError>
where
    B: Browser,
    S: Sink + ?Sized,
{
    let time = std::time::Instant::now();
    let ticker = &config.ticker;
    info!("[{ticker}] starting holdings run ...");

    let session = Session::acquire(browser, &config.credentials, &config.site).await?;

    let mut report = HoldingsReport::new(ticker.clone());
    let fatal = gather(&session, config, &mut report, tui).await.err();
    session.release().await;

    if let Some(err) = &fatal {
        error!("[{ticker}] run stopped early, flushing what was gathered, error({err})");
    }
    if report.is_empty() {
        warn!("[{ticker}] no holdings data found");
    }

    let artifacts = serialize(&report, config.formats, &config.output_dir, sink).await;

    info!(
        "[{ticker}] holdings run finished, time elapsed: {:?}",
        time.elapsed()
    );
    Ok(Run {
        report,
        artifacts,
        fatal,
    })
}

async fn gather<B: Browser>(
    session: &Session<B>,
    config: &Config,
    report: &mut HoldingsReport,
    tui: bool,
) -> Result<(), SpiderError> {
    let ticker = &config.ticker;
    let pages = HoldingsPages::from_config(session, config);

    // 1. current holdings; failing here is fatal
    let current = pages.current(ticker).await.map_err(|err| {
        error!("[{ticker}] failed to fetch current holdings, error({err})");
        err
    })?;
    if !current.anchor_found() {
        warn!("[{ticker}] current page has no holdings table; reporting zero holders");
    }
    info!(
        "[{ticker}] {} current holding(s), {} row(s) dropped",
        current.records.len(),
        current.dropped_rows()
    );
    report.current_holdings = current.records;

    // 2. historical holdings; quarters fail independently
    let progress = Progress::new(config.max_quarters, tui).unwrap_or_else(|err| {
        warn!("progress bars unavailable, error({err})");
        Progress::hidden()
    });
    let collected = history::collect_with_progress(
        &pages,
        ticker,
        config.reference_quarter(),
        config.max_quarters,
        &progress,
    )
    .await;

    match collected {
        Ok(quarters) => {
            report.historical_holdings = quarters;
            Ok(())
        }
        Err(Interrupted { collected, source }) => {
            report.historical_holdings = collected;
            Err(source)
        }
    }
}
