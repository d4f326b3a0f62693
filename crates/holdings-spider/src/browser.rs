use crate::error::{BrowseError, SpiderError};
use crate::http::*;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, trace};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A loaded page: where the request finally landed, and its markup.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub html: String,
}

/// The one capability the core needs from an automation engine: load pages (and submit forms)
/// inside a single browsing context whose cookies persist between calls.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn get(&self, url: &str) -> Result<Page, BrowseError>;

    async fn submit_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<Page, BrowseError>;

    /// Tear the browsing context down.
    async fn close(&self);
}

/// A [`Browser`] backed by a cookie-keeping `reqwest` client.
///
/// The HTTP engine renders nothing, so it is always headless; asking for a visible window
/// is acknowledged in the log and otherwise ignored.
#[derive(Debug)]
pub struct HttpBrowser {
    client: HttpClient,
}

impl HttpBrowser {
    pub fn new(headless: bool, timeout: Duration) -> Result<Self, SpiderError> {
        trace!("building http browsing context, timeout {timeout:?}");
        let client = reqwest::ClientBuilder::new()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|err| {
                error!("failed to build http client, error({err})");
                SpiderError::Environment(format!("failed to build http client, {err}"))
            })?;

        if !headless {
            info!("the http engine has no visible window; continuing headless");
        }

        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<Page, BrowseError> {
        let url = response.url().to_string();
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(BrowseError::Status(status.as_u16()));
        }
        let html = response.text().await?;
        trace!("loaded {url} ({} bytes)", html.len());
        Ok(Page {
            url,
            status: status.as_u16(),
            html,
        })
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn get(&self, url: &str) -> Result<Page, BrowseError> {
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }

    async fn submit_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<Page, BrowseError> {
        debug!("POST {url} ({} fields)", fields.len());
        let response = self.client.post(url).form(fields).send().await?;
        Self::read(response).await
    }

    async fn close(&self) {
        debug!("http browsing context closed");
    }
}
