//! Article content enrichment.
//!
//! Given a candidate's link, fetch the page and pull out a bounded plain-text
//! excerpt. Extraction walks an ordered list of CSS selector strategies; the
//! first whose text is longer than the acceptance minimum wins, otherwise the
//! whole `<body>` text is used. Enrichment never fails: external links get a
//! placeholder and fetch errors become an [`Excerpt::Failed`].

use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::EnricherSettings;
use crate::error::GatherError;
use crate::http::{HeaderProfile, PageFetcher};
use crate::scrapers::html::element_text;
use crate::utils::{cap_with_marker, collapse_whitespace};

/// One extraction strategy: a selector and the CSS it came from.
#[derive(Debug, Clone)]
pub struct SelectorStrategy {
    pub css: String,
    selector: Selector,
}

impl SelectorStrategy {
    pub fn parse(css: &str) -> Result<Self, GatherError> {
        let selector =
            Selector::parse(css).map_err(|e| GatherError::Selector(format!("{css}: {e:?}")))?;
        Ok(Self {
            css: css.to_string(),
            selector,
        })
    }

    /// Text of the first element matching this strategy.
    fn text(&self, document: &Html) -> Option<String> {
        document.select(&self.selector).next().map(|e| element_text(&e))
    }
}

/// Result of enriching one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Excerpt {
    /// Extracted, capped and marked page text.
    Text(String),
    /// The link was outside the known domains and was not fetched.
    External(String),
    /// Fetching or parsing failed; carries a bounded description.
    Failed(String),
}

impl Excerpt {
    pub fn as_str(&self) -> &str {
        match self {
            Excerpt::Text(s) | Excerpt::External(s) | Excerpt::Failed(s) => s,
        }
    }

    /// The extracted text, or `fallback` when nothing was extracted.
    pub fn text_or(self, fallback: String) -> String {
        match self {
            Excerpt::Text(s) => s,
            Excerpt::External(_) | Excerpt::Failed(_) => fallback,
        }
    }
}

/// Fetches pages and extracts bounded excerpts.
#[derive(Debug, Clone)]
pub struct ContentEnricher {
    strategies: Vec<SelectorStrategy>,
    body: Selector,
    known_domains: Vec<String>,
    external_placeholder: String,
    min_length: usize,
    cap: usize,
    marker: String,
    timeout: Duration,
}

impl ContentEnricher {
    pub fn new(settings: &EnricherSettings) -> Result<Self, GatherError> {
        let strategies = settings
            .selectors
            .iter()
            .map(|css| SelectorStrategy::parse(css))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            strategies,
            body: SelectorStrategy::parse("body")?.selector,
            known_domains: settings.known_domains.clone(),
            external_placeholder: settings.external_placeholder.clone(),
            min_length: settings.min_length,
            cap: settings.cap,
            marker: settings.marker.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Links outside every known domain pattern are not fetched. An empty
    /// pattern list treats every link as known.
    pub fn is_external(&self, url: &str) -> bool {
        !self.known_domains.is_empty() && !self.known_domains.iter().any(|d| url.contains(d.as_str()))
    }

    /// Apply the strategies to a page, falling back to the body text, and
    /// bound the result.
    pub fn extract_excerpt(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let chosen = self.strategies.iter().find_map(|strategy| {
            strategy
                .text(&document)
                .filter(|text| text.chars().count() > self.min_length)
                .inspect(|_| debug!(selector = %strategy.css, "Content strategy accepted"))
        });
        let text = chosen.unwrap_or_else(|| {
            let body = document
                .select(&self.body)
                .next()
                .map(|b| element_text(&b))
                .unwrap_or_else(|| {
                    collapse_whitespace(&document.root_element().text().collect::<Vec<_>>().join(" "))
                });
            debug!("No content strategy accepted; using body text");
            body
        });
        self.bound(&text)
    }

    /// Collapse whitespace, cap and append the marker.
    pub fn bound(&self, text: &str) -> String {
        cap_with_marker(&collapse_whitespace(text), self.cap, &self.marker)
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn enrich<F: PageFetcher>(&self, fetcher: &F, url: &str) -> Excerpt {
        if self.is_external(url) {
            debug!("External link; not fetching");
            return Excerpt::External(self.external_placeholder.clone());
        }
        match fetcher.fetch(url, HeaderProfile::SearchBot, self.timeout).await {
            Ok(html) => Excerpt::Text(self.extract_excerpt(&html)),
            Err(e) => {
                warn!(error = %e, "Content fetch failed");
                Excerpt::Failed(self.bound(&format!("Failed to fetch content: {e}")))
            }
        }
    }
}
