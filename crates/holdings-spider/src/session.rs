use crate::browser::{Browser, Page};
use crate::config::{Credentials, Site};
use crate::error::SpiderError;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, error, info, trace};

const USER_FIELDS: [&str; 4] = ["email", "username", "user", "login"];

/// An authenticated browsing context. Page fetches borrow it; [`Session::release`] consumes it.
#[derive(Debug)]
pub struct Session<B: Browser> {
    browser: B,
    login_path: String,
}

impl<B: Browser> Session<B> {
    /// Log in exactly once. On failure the browsing context is closed before returning.
    pub async fn acquire(
        browser: B,
        credentials: &Credentials,
        site: &Site,
    ) -> Result<Self, SpiderError> {
        info!("logging in as {} ...", credentials.username);
        match login(&browser, credentials, site).await {
            Ok(()) => {
                info!("login successful");
                Ok(Self {
                    browser,
                    login_path: site.login_path.clone(),
                })
            }
            Err(err) => {
                error!("login failed, error({err})");
                browser.close().await;
                Err(err)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(browser: B, login_path: &str) -> Self {
        Self {
            browser,
            login_path: login_path.to_string(),
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// Whether a page request was bounced back to the login form.
    pub fn landed_on_login(&self, page: &Page) -> bool {
        is_login_url(&page.url, &self.login_path)
    }

    pub async fn release(self) {
        self.browser.close().await;
        info!("session released");
    }
}

async fn login<B: Browser>(
    browser: &B,
    credentials: &Credentials,
    site: &Site,
) -> Result<(), SpiderError> {
    if credentials.validate().is_err() {
        return Err(SpiderError::Authentication("credentials are empty".into()));
    }

    let login_url = site.login_url();
    let page = browser.get(&login_url).await.map_err(|err| {
        SpiderError::Authentication(format!("login page {login_url} unavailable, {err}"))
    })?;

    let form = LoginForm::locate(&page.html, &page.url).ok_or_else(|| {
        SpiderError::Authentication(format!("login form not found on {}", page.url))
    })?;
    trace!("login form found, action {}", form.action);

    let fields = form.fill(credentials);
    let landed = browser
        .submit_form(&form.action, &fields)
        .await
        .map_err(|err| {
            SpiderError::Authentication(format!("login form submission failed, {err}"))
        })?;
    debug!("login submitted, landed on {}", landed.url);

    if is_logged_in(&landed, &site.login_path) {
        Ok(())
    } else {
        Err(SpiderError::Authentication(
            "credentials rejected by the source".into(),
        ))
    }
}

// any path mentioning the login segment counts, so `/login/submit` or `/Login?next=..` still do
fn is_login_url(url: &str, login_path: &str) -> bool {
    let login_path = login_path.trim_matches('/').to_lowercase();
    let segment = login_path.rsplit('/').next().unwrap_or_default();
    if segment.is_empty() {
        return false;
    }
    let path = match Url::parse(url) {
        Ok(url) => url.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };
    path.contains(segment)
}

fn is_logged_in(page: &Page, login_path: &str) -> bool {
    if !is_login_url(&page.url, login_path) {
        return true;
    }

    // some sources answer the POST in place; look for a logout affordance instead
    let document = Html::parse_document(&page.html);
    let Ok(links) = Selector::parse("a") else {
        return false;
    };
    document.select(&links).any(|link| {
        let href = link.value().attr("href").unwrap_or_default().to_lowercase();
        let text = link.text().collect::<String>().to_lowercase();
        href.contains("logout") || text.contains("logout") || text.contains("log out")
    })
}

/// The parts of a login form needed to submit it.
#[derive(Debug, PartialEq, Eq)]
struct LoginForm {
    action: String,
    user_field: String,
    password_field: String,
    hidden: Vec<(String, String)>,
}

impl LoginForm {
    fn locate(html: &str, page_url: &str) -> Option<Self> {
        let document = Html::parse_document(html);
        let forms = Selector::parse("form").ok()?;
        let inputs = Selector::parse("input[name]").ok()?;

        document.select(&forms).find_map(|form| {
            let mut user_field = None;
            let mut password_field = None;
            let mut hidden = Vec::new();

            for input in form.select(&inputs) {
                let input = input.value();
                let name = input.attr("name").unwrap_or_default();
                let kind = input.attr("type").unwrap_or("text").to_lowercase();
                match kind.as_str() {
                    "password" => password_field = Some(name.to_string()),
                    "hidden" => hidden.push((
                        name.to_string(),
                        input.attr("value").unwrap_or_default().to_string(),
                    )),
                    _ if user_field.is_none()
                        && USER_FIELDS.contains(&name.to_lowercase().as_str()) =>
                    {
                        user_field = Some(name.to_string())
                    }
                    _ => {}
                }
            }

            let action = form.value().attr("action").unwrap_or_default();
            let action = Url::parse(page_url)
                .and_then(|base| base.join(action))
                .map(|url| url.to_string())
                .unwrap_or_else(|_| page_url.to_string());

            Some(Self {
                action,
                user_field: user_field?,
                password_field: password_field?,
                hidden,
            })
        })
    }

    fn fill(&self, credentials: &Credentials) -> Vec<(String, String)> {
        let mut fields = self.hidden.clone();
        fields.push((self.user_field.clone(), credentials.username.clone()));
        fields.push((self.password_field.clone(), credentials.password.clone()));
        fields
    }
}
