//! # Good News Gather
//!
//! Collects good news about a program's faculty, its partner universities and
//! its participants, and hands each item to a storage collaborator.
//!
//! ## Pipeline
//!
//! 1. **Fetching**: read configured RSS feeds and HTML news pages
//!    ([`scrapers`]) or query a web search API ([`search`])
//! 2. **Filtering**: keep candidates whose title or summary mention a
//!    positive-news keyword ([`relevance`]), without duplicates ([`dedup`])
//! 3. **Enrichment**: fetch each surviving article and extract a bounded
//!    excerpt ([`enricher`])
//! 4. **Persistence**: save a structured record through a [`collaborators::NewsStore`]
//!
//! [`orchestrator::Orchestrator`] runs the pipeline for a cohort;
//! [`sweep`] holds the stand-alone university and faculty site sweeps.

pub mod cancel;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod dedup;
pub mod enricher;
pub mod error;
pub mod http;
pub mod models;
pub mod orchestrator;
pub mod outputs;
pub mod relevance;
pub mod scrapers;
pub mod search;
pub mod sweep;
pub mod utils;
