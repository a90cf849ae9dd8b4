//! Error taxonomy for the gathering pipeline.
//!
//! Most of these never escape the crate's public entry points: source fetch
//! and enrichment errors degrade to empty results or fallback strings, and
//! per-entity errors become entries in [`crate::models::CohortGatherResult::errors`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatherError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed feed: {0}")]
    Feed(#[from] quick_xml::DeError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid selector {0}")]
    Selector(String),

    #[error("search API error: {0}")]
    Search(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("summarizer error: {0}")]
    Summarizer(String),

    #[error("roster lookup failed: {0}")]
    Roster(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("run cancelled")]
    Cancelled,
}

impl From<serde_yaml::Error> for GatherError {
    fn from(e: serde_yaml::Error) -> Self {
        GatherError::Config(e.to_string())
    }
}
