//! News source scrapers.
//!
//! This module turns configured sources into [`NewsCandidate`]s. Each source
//! is read in one of two ways:
//!
//! | Kind | Module | Method | Notes |
//! |------|--------|--------|-------|
//! | RSS | [`rss`] | `quick-xml` serde | summary from description or content |
//! | HTML | [`html`] | `scraper` selectors | structural anchor strategy |
//!
//! Sites with bespoke markup get a rule from [`overrides`] that runs before
//! the generic HTML strategy.
//!
//! # Failure Handling
//!
//! A failed source (network, timeout, non-2xx, malformed feed) is logged and
//! contributes nothing; the remaining sources for the same entity are still
//! read.

pub mod html;
pub mod overrides;
pub mod rss;

use futures::stream::{self, StreamExt};
use scraper::Html;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cancel::CancelToken;
use crate::error::GatherError;
use crate::http::{HeaderProfile, PageFetcher};
use crate::models::{NewsCandidate, SourceDescriptor, SourceKind};
use overrides::OverrideRegistry;

/// Reads configured sources through a [`PageFetcher`].
pub struct SourceFetcher<'a, F> {
    fetcher: &'a F,
    overrides: &'a OverrideRegistry,
    html_timeout: Duration,
    feed_timeout: Duration,
    cancel: CancelToken,
}

impl<'a, F: PageFetcher> SourceFetcher<'a, F> {
    pub fn new(fetcher: &'a F, overrides: &'a OverrideRegistry) -> Self {
        Self {
            fetcher,
            overrides,
            html_timeout: Duration::from_secs(15),
            feed_timeout: Duration::from_secs(10),
            cancel: CancelToken::never(),
        }
    }

    /// Stop reading further sources once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeouts(mut self, html: Duration, feed: Duration) -> Self {
        self.html_timeout = html;
        self.feed_timeout = feed;
        self
    }

    /// Base for resolving relative links: the configured base URL, else the
    /// source URL's origin.
    pub fn base_url(source: &SourceDescriptor, configured: Option<&str>) -> Result<Url, GatherError> {
        if let Some(base) = configured {
            return Ok(Url::parse(base)?);
        }
        let source_url = Url::parse(&source.url)?;
        Ok(Url::parse(&source_url.origin().ascii_serialization())?)
    }

    /// Read one source. Never fails: errors are logged and yield nothing.
    #[instrument(level = "info", skip_all, fields(url = %source.url, kind = ?source.kind))]
    pub async fn fetch_source(
        &self,
        source: &SourceDescriptor,
        base_url: Option<&str>,
    ) -> Vec<NewsCandidate> {
        match self.try_fetch_source(source, base_url).await {
            Ok(candidates) => {
                info!(count = candidates.len(), "Read source");
                candidates
            }
            Err(e) => {
                warn!(error = %e, "Source failed; skipping");
                Vec::new()
            }
        }
    }

    async fn try_fetch_source(
        &self,
        source: &SourceDescriptor,
        base_url: Option<&str>,
    ) -> Result<Vec<NewsCandidate>, GatherError> {
        let base = Self::base_url(source, base_url)?;
        match source.kind {
            SourceKind::Rss => {
                let body = self
                    .fetcher
                    .fetch(&source.url, HeaderProfile::Feed, self.feed_timeout)
                    .await?;
                rss::parse_feed(&body, &base)
            }
            SourceKind::Html => {
                let body = self
                    .fetcher
                    .fetch(&source.url, HeaderProfile::Browser, self.html_timeout)
                    .await?;
                let source_url = Url::parse(&source.url)?;
                self.parse_page(&body, &source_url, &base)
            }
        }
    }

    /// Site-specific rule first (if any), then the structural strategy.
    pub fn parse_page(
        &self,
        body: &str,
        source_url: &Url,
        base: &Url,
    ) -> Result<Vec<NewsCandidate>, GatherError> {
        let document = Html::parse_document(body);
        let mut candidates = Vec::new();
        if let Some(rule) = self.overrides.lookup(source_url) {
            let found = rule.extract(&document, base)?;
            debug!(count = found.len(), "Site-specific rule matched");
            candidates.extend(found);
        }
        candidates.extend(html::extract_article_links(&document, base));
        Ok(candidates)
    }

    /// Read every source for one entity in configured order.
    ///
    /// # Arguments
    ///
    /// * `sources` - The entity's configured sources
    /// * `base_url` - Base for relative links; defaults to each source's origin
    /// * `delay` - Pause between consecutive sources; none after the last
    ///
    /// # Returns
    ///
    /// All candidates, in source order and then emission order. Sources not
    /// yet read when the run is cancelled contribute nothing.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn fetch_all(
        &self,
        sources: &[SourceDescriptor],
        base_url: Option<&str>,
        delay: Duration,
    ) -> Vec<NewsCandidate> {
        let last = sources.len().saturating_sub(1);
        let per_source: Vec<Vec<NewsCandidate>> = stream::iter(sources.iter().enumerate())
            .then(|(i, source)| async move {
                if self.cancel.is_cancelled() {
                    debug!(url = %source.url, "Run cancelled; skipping source");
                    return Vec::new();
                }
                let found = self.fetch_source(source, base_url).await;
                if i < last {
                    self.cancel.sleep(delay).await;
                }
                found
            })
            .collect()
            .await;

        let candidates: Vec<NewsCandidate> = per_source.into_iter().flatten().collect();
        info!(count = candidates.len(), "Read all sources");
        candidates
    }
}
