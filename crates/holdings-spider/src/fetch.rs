use crate::browser::Browser;
use crate::error::{BrowseError, SpiderError};
use crate::session::Session;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry with exponential backoff, applied to transient fetch failures only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before the attempt following failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor)
    }
}

/// Loads pages through a borrowed [`Session`], with a bounded wait per attempt.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    policy: RetryPolicy,
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Self {
        Self { policy, timeout }
    }

    /// Return the markup at `url`, retrying transient failures per the policy.
    pub async fn fetch<B: Browser>(
        &self,
        session: &Session<B>,
        url: &str,
    ) -> Result<String, SpiderError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.timeout, session.browser().get(url)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(BrowseError::Timeout),
            };

            let err = match outcome {
                Ok(page) if session.landed_on_login(&page) => {
                    return Err(SpiderError::SessionExpired {
                        url: url.to_string(),
                    })
                }
                Ok(page) => {
                    debug!("fetched {url} on attempt {attempt}");
                    return Ok(page.html);
                }
                Err(BrowseError::Status(401)) => {
                    return Err(SpiderError::SessionExpired {
                        url: url.to_string(),
                    })
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(SpiderError::Fetch {
                    url: url.to_string(),
                    source: err,
                });
            }
            if attempt >= attempts {
                return Err(match err {
                    BrowseError::Timeout => SpiderError::FetchTimeout {
                        url: url.to_string(),
                        attempts,
                    },
                    err => SpiderError::Fetch {
                        url: url.to_string(),
                        source: err,
                    },
                });
            }

            let delay = self.policy.delay(attempt);
            warn!(
                "attempt {attempt}/{attempts} for {url} failed, error({err}); retrying in {delay:?}"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
