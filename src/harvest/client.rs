//! Blocking HTTP session with the platform's required headers and an optional
//! politeness delay. One attempt per request; the pipeline has no retries.

use crate::harvest::error::HarvestError;
use crate::harvest::PageSource;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, REFERER};
use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko)";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const MAX_REDIRECTS: usize = 10;

/// Blocking client carrying the clearance cookie on every request.
#[derive(Debug)]
pub struct SessionClient {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Option<Instant>,
}

impl SessionClient {
    /// Builder for token, User-Agent, referer, timeout, and delay.
    pub fn builder() -> SessionClientBuilder {
        SessionClientBuilder::default()
    }

    /// GET a URL and return the raw response. Sleeps until the configured
    /// delay has passed since the last request.
    pub fn get(&mut self, url: &str) -> Result<reqwest::blocking::Response, reqwest::Error> {
        self.wait_delay();
        let response = self.inner.get(url).send()?;
        self.last_request = Some(Instant::now());
        Ok(response)
    }

    /// GET a URL and return its body bytes. Used for asset downloads (font).
    pub fn get_bytes(&mut self, url: &str) -> Result<Vec<u8>, HarvestError> {
        let response = self.get(url).map_err(|e| HarvestError::Network {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                context: None,
            });
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| HarvestError::BodyRead { source: e })
    }

    fn wait_delay(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
    }
}

impl PageSource for SessionClient {
    fn fetch(&mut self, url: &str) -> Result<String, HarvestError> {
        let response = self.get(url).map_err(|e| HarvestError::Network {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                context: None,
            });
        }
        response
            .text()
            .map_err(|e| HarvestError::BodyRead { source: e })
    }
}

/// Builder for [SessionClient].
#[derive(Debug)]
pub struct SessionClientBuilder {
    token: Option<String>,
    user_agent: Option<String>,
    referer: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
}

impl Default for SessionClientBuilder {
    fn default() -> Self {
        Self {
            token: None,
            user_agent: None,
            referer: None,
            delay_secs: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SessionClientBuilder {
    /// Cloudflare clearance token, sent as `cf_clearance=<token>` cookie.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Referer header, normally the platform root URL.
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Delay between requests in seconds. Default 0.
    pub fn delay_secs(mut self, secs: u64) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Per-request timeout in seconds. Default 15. Applies to every request,
    /// listing pages included.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<SessionClient, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        if let Some(ref referer) = self.referer {
            let value =
                HeaderValue::from_str(referer).map_err(|e| HarvestError::ClientBuild {
                    reason: format!("invalid referer {:?}: {}", referer, e),
                })?;
            headers.insert(REFERER, value);
        }
        if let Some(ref token) = self.token {
            let cookie = format!("cf_clearance={}", token);
            let value = HeaderValue::from_str(&cookie).map_err(|e| HarvestError::ClientBuild {
                reason: format!("invalid clearance token: {}", e),
            })?;
            headers.insert(COOKIE, value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| HarvestError::ClientBuild {
                reason: e.to_string(),
            })?;
        Ok(SessionClient {
            inner,
            delay: Duration::from_secs(self.delay_secs),
            last_request: None,
        })
    }
}
