use crate::cli::Cli;
use colored::Colorize;
use holdings_spider::browser::HttpBrowser;
use holdings_spider::config::{Config, Credentials, Site};
use holdings_spider::extract::Extractor;
use holdings_spider::fetch::RetryPolicy;
use holdings_spider::fs::FileSink;
use holdings_spider::insider_monkey::{self, Run};
use holdings_spider::model::Ticker;
use std::time::Duration;
use tracing::{debug, error, info};

/// Build the run config from the command line and environment, then scrape the ticker.
pub(crate) async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = configure(&cli)?;
    let ticker = config.ticker.clone();

    info!("starting scraping process for ticker: {ticker}");
    info!("output directory: {}", config.output_dir.display());
    info!("output format: {:?}", config.formats);
    info!("headless mode: {}", config.headless);

    trace_config(&config);

    let browser = HttpBrowser::new(config.headless, config.page_timeout).map_err(|err| {
        error!("failed to set up the browser, error({err})");
        err
    })?;

    let run = insider_monkey::scrape(&config, browser, &FileSink, cli.progress)
        .await
        .map_err(|err| {
            error!("login failed, check the credentials in your .env file, error({err})");
            err
        })?;

    summarise(&run);

    if !run.succeeded() {
        anyhow::bail!(
            "holdings run for {ticker} finished with {} failure(s)",
            run.failures().count()
        );
    }

    info!("scraping process completed successfully");
    Ok(())
}

fn configure(cli: &Cli) -> anyhow::Result<Config> {
    let ticker = Ticker::parse(&cli.ticker).map_err(|err| {
        error!("invalid ticker, error({err})");
        err
    })?;
    let credentials = Credentials::from_env().map_err(|err| {
        error!("{err}");
        err
    })?;

    let mut config = Config::new(ticker, credentials);
    config.formats = cli.output_format.into();
    config.headless = cli.headless;
    config.output_dir = cli.output_dir.clone();
    config.max_quarters = cli.quarters as usize;
    config.reference_quarter = cli.from_quarter;
    config.page_timeout = Duration::from_secs(cli.timeout);
    config.retry = RetryPolicy {
        max_attempts: cli.attempts,
        ..RetryPolicy::default()
    };
    config.site = Site::from_env();
    config.extractor = Extractor::from_env().map_err(|err| {
        error!("invalid HOLDINGS_ANCHORS, error({err})");
        err
    })?;
    Ok(config)
}

fn trace_config(config: &Config) {
    debug!(
        "site {}, {} quarter(s) back from {}, {} attempt(s) per page, timeout {:?}",
        config.site.base_url,
        config.max_quarters,
        config.reference_quarter(),
        config.retry.max_attempts,
        config.page_timeout
    );
}

fn summarise(run: &Run) {
    let report = &run.report;
    println!(
        "\n{bar}\n{name:^40}\n{bar}",
        bar = "=".repeat(40),
        name = format!("{} institutional holdings", report.ticker)
    );
    println!(
        "   current holdings: {} institutions",
        report.current_holdings.len()
    );
    println!(
        "   historical data:  {} quarters",
        report.historical_holdings.len()
    );

    if !report.current_holdings.is_empty() {
        println!("\n   top {} current holdings:", report.current_holdings.len().min(3));
        for (i, holding) in report.current_holdings.iter().take(3).enumerate() {
            println!("   {}. {}", i + 1, holding.institution_name.bold());
            println!("      shares: {}", holding.shares);
            println!("      value:  {}", holding.market_value);
        }
    }

    println!();
    for artifact in &run.artifacts {
        match &artifact.result {
            Ok(()) => println!(
                "   {} {} saved to {}",
                "✓".green(),
                artifact.kind.format(),
                artifact.path.display()
            ),
            Err(err) => println!("   {} {}", "✗".red(), err.to_string().red()),
        }
    }
    if let Some(err) = &run.fatal {
        println!("   {} stopped early: {}", "✗".red(), err.to_string().red());
    }
}
