pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fs;
pub mod history;
pub mod model;
pub mod pages;
pub mod quarter;
pub mod serialize;
pub mod session;
mod tui;

/// Institutional holdings from [Insider Monkey]: login, current and quarterly holdings pages.
///
/// [Insider Monkey]: https://www.insidermonkey.com/
pub mod insider_monkey;

/// Shortcut for required API elements.
pub(crate) mod http {
    pub(crate) use reqwest::Client as HttpClient;
}
