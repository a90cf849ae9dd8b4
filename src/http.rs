//! HTTP page fetching.
//!
//! Every outbound page request in the pipeline goes through [`PageFetcher`],
//! so sources and enrichment can be exercised against canned pages in tests.
//! [`HttpClient`] is the `reqwest`-backed implementation.
//!
//! # Header Profiles
//!
//! | Profile | Used for | User-Agent |
//! |---------|----------|------------|
//! | [`HeaderProfile::Browser`] | HTML news pages, site search | desktop Chrome |
//! | [`HeaderProfile::SearchBot`] | article enrichment | Googlebot |
//! | [`HeaderProfile::Feed`] | RSS feeds | desktop Chrome, feed `Accept` |

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::GatherError;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SEARCH_BOT_UA: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// Which header set a request presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    Browser,
    SearchBot,
    Feed,
}

impl HeaderProfile {
    pub fn headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self {
            HeaderProfile::Browser => {
                headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
                headers.insert(
                    ACCEPT,
                    HeaderValue::from_static(
                        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
                    ),
                );
                headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
            }
            HeaderProfile::SearchBot => {
                headers.insert(USER_AGENT, HeaderValue::from_static(SEARCH_BOT_UA));
                headers.insert(
                    ACCEPT,
                    HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
                );
            }
            HeaderProfile::Feed => {
                headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
                headers.insert(
                    ACCEPT,
                    HeaderValue::from_static("application/rss+xml, application/xml, text/xml;q=0.9, */*;q=0.8"),
                );
            }
        }
        headers
    }
}

/// Fetches a page body as text.
pub trait PageFetcher {
    async fn fetch(
        &self,
        url: &str,
        profile: HeaderProfile,
        timeout: Duration,
    ) -> Result<String, GatherError>;
}

/// `reqwest`-backed [`PageFetcher`].
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl PageFetcher for HttpClient {
    #[instrument(level = "debug", skip_all, fields(%url, ?profile))]
    async fn fetch(
        &self,
        url: &str,
        profile: HeaderProfile,
        timeout: Duration,
    ) -> Result<String, GatherError> {
        let response = self
            .client
            .get(url)
            .headers(profile.headers())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatherError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
