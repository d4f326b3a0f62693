#![allow(dead_code)]

use async_trait::async_trait;
use holdings_spider::browser::{Browser, Page};
use holdings_spider::config::{Config, Credentials, OutputFormat, Site};
use holdings_spider::error::BrowseError;
use holdings_spider::fetch::RetryPolicy;
use holdings_spider::model::{HoldingRecord, Ticker};
use holdings_spider::quarter::Quarter;
use holdings_spider::serialize::Sink;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE: &str = "https://holdings.test";
pub const USERNAME: &str = "analyst@example.com";
pub const PASSWORD: &str = "correct horse";

pub const LOGIN_PAGE: &str = r#"<html><body>
  <form method="post" action="/login">
    <input type="hidden" name="_token" value="t0k3n">
    <input type="email" name="email">
    <input type="password" name="password">
    <button type="submit">Log in</button>
  </form>
</body></html>"#;

/// What the fake site saw; shared with the test after the browser moves into a session.
#[derive(Default)]
pub struct Observed {
    pub requests: Mutex<Vec<String>>,
    pub logins: Mutex<Vec<Vec<(String, String)>>>,
    pub closed: AtomicBool,
}

impl Observed {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A scripted holdings site: a login form plus canned pages keyed by URL.
pub struct FakeSite {
    pages: HashMap<String, Result<Page, BrowseError>>,
    pub observed: Arc<Observed>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            observed: Arc::new(Observed::default()),
        }
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        self.pages.insert(
            url.clone(),
            Ok(Page {
                url,
                status: 200,
                html: html.into(),
            }),
        );
        self
    }

    pub fn with_failure(mut self, url: impl Into<String>, err: BrowseError) -> Self {
        self.pages.insert(url.into(), Err(err));
        self
    }

    /// Serve `url` by bouncing to the login page, the way an expired session looks.
    pub fn with_expired(mut self, url: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            Ok(Page {
                url: format!("{BASE}/login"),
                status: 200,
                html: LOGIN_PAGE.to_string(),
            }),
        );
        self
    }
}

#[async_trait]
impl Browser for FakeSite {
    async fn get(&self, url: &str) -> Result<Page, BrowseError> {
        self.observed.requests.lock().unwrap().push(url.to_string());
        if url == format!("{BASE}/login") {
            return Ok(Page {
                url: url.to_string(),
                status: 200,
                html: LOGIN_PAGE.to_string(),
            });
        }
        self.pages
            .get(url)
            .cloned()
            .unwrap_or(Err(BrowseError::Status(404)))
    }

    async fn submit_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<Page, BrowseError> {
        self.observed.logins.lock().unwrap().push(fields.to_vec());
        let field = |name: &str| {
            fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };
        let accepted = url == format!("{BASE}/login")
            && field("_token") == Some("t0k3n")
            && field("email") == Some(USERNAME)
            && field("password") == Some(PASSWORD);

        Ok(if accepted {
            Page {
                url: format!("{BASE}/dashboard"),
                status: 200,
                html: r#"<a href="/logout">Logout</a>"#.to_string(),
            }
        } else {
            Page {
                url: format!("{BASE}/login"),
                status: 200,
                html: "<p>Invalid email or password.</p>".to_string(),
            }
        })
    }

    async fn close(&self) {
        self.observed.closed.store(true, Ordering::SeqCst);
    }
}

/// Keeps artifacts in memory; refuses any path ending in one of `deny`.
#[derive(Default)]
pub struct MemorySink {
    pub files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    pub deny: Vec<&'static str>,
}

impl MemorySink {
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|(path, _)| path.ends_with(name))
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let name = path.to_string_lossy();
        if self.deny.iter().any(|suffix| name.ends_with(suffix)) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            ));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}

pub fn ticker() -> Ticker {
    Ticker::parse("AAPL").unwrap()
}

pub fn reference() -> Quarter {
    Quarter::new(2026, 3).unwrap()
}

pub fn site() -> Site {
    Site::with_base_url(BASE)
}

pub fn config(formats: OutputFormat) -> Config {
    let mut config = Config::new(ticker(), Credentials::new(USERNAME, PASSWORD));
    config.formats = formats;
    config.output_dir = PathBuf::from("data");
    config.site = site();
    config.reference_quarter = Some(reference());
    config.page_timeout = Duration::from_secs(5);
    config.retry = RetryPolicy {
        max_attempts: 3,
        backoff: Duration::ZERO,
        multiplier: 2,
    };
    config
}

pub fn current_url() -> String {
    site().current_url(&ticker())
}

pub fn quarter_url(offset: usize) -> String {
    site().historical_url(&ticker(), reference().back(offset))
}

pub fn vanguard() -> HoldingRecord {
    HoldingRecord {
        institution_name: "Vanguard Group".into(),
        shares: "1,400,790,809".into(),
        market_value: "$311,157,662,351".into(),
        percent_of_portfolio: "5.63%".into(),
    }
}

pub fn blackrock() -> HoldingRecord {
    HoldingRecord {
        institution_name: "Blackrock Inc.".into(),
        shares: "1,038,438,316".into(),
        market_value: "$230,555,432,123".into(),
        percent_of_portfolio: "4.12%".into(),
    }
}

/// A holdings page in the source's layout.
pub fn holdings_page(title: &str, records: &[HoldingRecord]) -> String {
    let rows: String = records
        .iter()
        .map(|r| {
            format!(
                "<tr><td><a href=\"/fund\">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>",
                r.institution_name, r.shares, r.market_value, r.percent_of_portfolio
            )
        })
        .collect();
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <nav><a href="/logout">Logout</a></nav>
        <div id="institutional-holdings">
          <table>
            <thead><tr><th>Institution</th><th>Shares</th><th>Market Value</th><th>% of Portfolio</th></tr></thead>
            <tbody>{rows}</tbody>
          </table>
        </div></body></html>"#
    )
}

/// A site serving the current page plus `quarters` historical pages, each with one holder.
pub fn full_site(quarters: usize) -> FakeSite {
    let mut site = FakeSite::new().with_page(
        current_url(),
        holdings_page("AAPL institutional holders", &[vanguard(), blackrock()]),
    );
    for offset in 0..quarters {
        let quarter = reference().back(offset);
        site = site.with_page(
            quarter_url(offset),
            holdings_page(&format!("AAPL holders {quarter}"), &[vanguard()]),
        );
    }
    site
}
