//! Web search API access.
//!
//! - [`SearchApi`]: the seam the pipeline searches through
//! - [`google`]: the Google Custom Search JSON API client
//! - [`adapters`]: entity-specific query building and result filtering

pub mod adapters;
pub mod google;

use crate::error::GatherError;
use crate::models::SearchResult;
use crate::utils::truncate_chars;

/// Queries longer than this are truncated before being sent.
pub const MAX_QUERY_CHARS: usize = 500;

/// Recency qualifier understood by the search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRestrict {
    Day,
    Week,
    Month,
}

impl DateRestrict {
    /// `≤1 → d1`, `≤7 → w1`, `≤30 → m1`, anything longer defaults to `w1`.
    pub fn from_days_back(days_back: i64) -> Self {
        if days_back <= 1 {
            DateRestrict::Day
        } else if days_back <= 7 {
            DateRestrict::Week
        } else if days_back <= 30 {
            DateRestrict::Month
        } else {
            DateRestrict::Week
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateRestrict::Day => "d1",
            DateRestrict::Week => "w1",
            DateRestrict::Month => "m1",
        }
    }
}

/// One search call. Built with [`SearchRequest::new`] and the chained setters.
///
/// ```
/// use goodnews_gather::search::{DateRestrict, SearchRequest};
///
/// let request = SearchRequest::new("\"Jane Doe\" award")
///     .date_restrict(DateRestrict::Week)
///     .num(3)
///     .site("example.edu");
/// assert_eq!(request.effective_query(), "\"Jane Doe\" award site:example.edu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Raw query text; bounded when sent.
    pub query: String,
    pub date_restrict: Option<DateRestrict>,
    /// Requested result count; see [`SearchRequest::clamped_num`].
    pub num: u8,
    /// Restrict hits to this domain.
    pub site: Option<String>,
}

impl SearchRequest {
    /// A request for five results with no date or site restriction.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            date_restrict: None,
            num: 5,
            site: None,
        }
    }

    pub fn date_restrict(mut self, restrict: DateRestrict) -> Self {
        self.date_restrict = Some(restrict);
        self
    }

    pub fn num(mut self, num: u8) -> Self {
        self.num = num;
        self
    }

    pub fn site(mut self, site: &str) -> Self {
        self.site = Some(site.to_string());
        self
    }

    /// Result count clamped to what the API accepts.
    pub fn clamped_num(&self) -> u8 {
        self.num.clamp(1, 10)
    }

    /// The query as sent: trimmed, bounded, with the site restriction appended.
    pub fn effective_query(&self) -> String {
        let mut query = bound_query(&self.query);
        if let Some(site) = &self.site {
            let site_query = format!("site:{site}");
            if !query.contains(&site_query) {
                query = format!("{query} {site_query}");
            }
        }
        query
    }
}

/// Trim and cut a query to [`MAX_QUERY_CHARS`].
pub fn bound_query(query: &str) -> String {
    truncate_chars(query.trim(), MAX_QUERY_CHARS).to_string()
}

/// A web search API. Missing credentials are a detectable state, not an error.
pub trait SearchApi {
    /// Whether credentials are present. An unconfigured API is skipped.
    fn is_configured(&self) -> bool;

    /// Run one query.
    ///
    /// # Arguments
    ///
    /// * `request` - Query, result count, recency and site restriction
    ///
    /// # Returns
    ///
    /// The hits in API order, or [`GatherError::Search`] on an API or
    /// transport failure.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, GatherError>;
}
