mod cli;
mod spider;

// remote imports
use clap::Parser;
use cli::{Cli, LogLevel};
use tracing::{subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

////////////////////////////////////////////////////////////////////////////

// preprocess the log level, and open the .env file
fn preprocess(log_level: LogLevel) -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(match log_level {
            LogLevel::DEBUG => Level::DEBUG,
            LogLevel::INFO => Level::INFO,
            LogLevel::WARNING => Level::WARN,
            LogLevel::ERROR => Level::ERROR,
        })
        .finish();
    subscriber::set_global_default(my_subscriber)?;
    Ok(())
}

////////////////////////////////////////////////////////////////////////////

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    preprocess(cli.log_level)?;
    trace!("command line input recorded: {cli:?}");

    // `holdings --ticker <TICKER> [OPTIONS]`: scrape one ticker
    spider::run(cli).await
}
