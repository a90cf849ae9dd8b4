//! Google Custom Search JSON API client.
//!
//! Credentials come from `GOOGLE_SEARCH_API_KEY` and `GOOGLE_SEARCH_ENGINE_ID`.
//! Without both, the client is unconfigured: [`SearchApi::is_configured`]
//! returns `false` and searches return nothing.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::error::GatherError;
use crate::models::SearchResult;
use crate::search::{SearchApi, SearchRequest};
use crate::utils::truncate_for_log;

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    pagemap: Option<PageMap>,
}

#[derive(Debug, Deserialize)]
struct PageMap {
    #[serde(default)]
    metatags: Vec<HashMap<String, Value>>,
}

impl Item {
    fn published_date(&self) -> Option<String> {
        let tags = self.pagemap.as_ref()?.metatags.first()?;
        ["article:published_time", "pubdate"]
            .iter()
            .find_map(|key| tags.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    }
}

fn parse_response(body: &str) -> Result<Vec<SearchResult>, GatherError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .items
        .into_iter()
        .map(|item| {
            let published_date = item.published_date();
            SearchResult {
                title: item.title,
                link: item.link,
                snippet: item.snippet,
                published_date,
            }
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct GoogleSearchClient {
    client: reqwest::Client,
    api_key: String,
    engine_id: String,
    endpoint: String,
}

impl GoogleSearchClient {
    pub fn new(api_key: Option<String>, engine_id: Option<String>) -> Self {
        let client = Self {
            client: reqwest::Client::new(),
            api_key: api_key.unwrap_or_default(),
            engine_id: engine_id.unwrap_or_default(),
            endpoint: ENDPOINT.to_string(),
        };
        if !client.is_configured() {
            warn!("Search API credentials not found; set GOOGLE_SEARCH_API_KEY and GOOGLE_SEARCH_ENGINE_ID");
        }
        client
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("GOOGLE_SEARCH_API_KEY").ok(),
            std::env::var("GOOGLE_SEARCH_ENGINE_ID").ok(),
        )
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Issue a one-result query to check the credentials.
    pub async fn test_connection(&self) -> bool {
        if !self.is_configured() {
            error!("Search API not configured");
            return false;
        }
        match self.search(&SearchRequest::new("test").num(1)).await {
            Ok(_) => {
                info!("Search API connection successful");
                true
            }
            Err(e) => {
                error!(error = %e, "Search API connection failed");
                false
            }
        }
    }
}

impl SearchApi for GoogleSearchClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.engine_id.is_empty()
    }

    #[instrument(level = "info", skip_all, fields(num = request.clamped_num()))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, GatherError> {
        if !self.is_configured() {
            return Ok(Vec::new());
        }
        if request.query.trim().chars().count() > super::MAX_QUERY_CHARS {
            warn!(
                chars = request.query.chars().count(),
                "Query too long; truncating to {}",
                super::MAX_QUERY_CHARS
            );
        }

        let query = request.effective_query();
        let num = request.clamped_num().to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("key", self.api_key.as_str()),
            ("cx", self.engine_id.as_str()),
            ("q", query.as_str()),
            ("num", num.as_str()),
        ];
        if let Some(restrict) = request.date_restrict {
            params.push(("dateRestrict", restrict.as_str()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .timeout(Duration::from_secs(15))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            match status.as_u16() {
                429 => error!("Search API quota exceeded"),
                400 => error!(
                    query = %truncate_for_log(&query, 100),
                    body = %truncate_for_log(&body, 500),
                    "Search API bad request"
                ),
                code => error!(status = code, body = %truncate_for_log(&body, 500), "Search API error"),
            }
            return Err(GatherError::Search(format!("HTTP {}", status.as_u16())));
        }

        let results = parse_response(&body)?;
        info!(count = results.len(), "Search returned results");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_with_metatags() {
        let body = r#"{
            "items": [
                {
                    "title": "Professor named fellow",
                    "link": "https://news.example.edu/a",
                    "snippet": "Named a fellow of the academy",
                    "pagemap": { "metatags": [ { "article:published_time": "2025-05-06T10:00:00Z" } ] }
                },
                {
                    "title": "Second",
                    "link": "https://news.example.edu/b",
                    "pagemap": { "metatags": [ { "pubdate": "2025-05-01", "og:image": "x" } ] }
                },
                { "link": "https://news.example.edu/c" }
            ]
        }"#;
        let results = parse_response(body).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].published_date.as_deref(), Some("2025-05-06T10:00:00Z"));
        assert_eq!(results[1].published_date.as_deref(), Some("2025-05-01"));
        assert_eq!(results[1].snippet, "");
        assert_eq!(results[2].title, "");
        assert_eq!(results[2].published_date, None);
    }

    #[test]
    fn test_response_without_items_is_empty() {
        let results = parse_response(r#"{"kind": "customsearch#search"}"#).unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_client_returns_nothing() {
        let client = GoogleSearchClient::new(Some("key".into()), None);
        assert!(!client.is_configured());
        let results = client.search(&SearchRequest::new("anything")).await.unwrap();
        assert!(results.is_empty());
        assert!(!client.test_connection().await);
    }
}
