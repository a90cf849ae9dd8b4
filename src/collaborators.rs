//! Interfaces to the services this pipeline depends on but does not own.
//!
//! # Architecture
//!
//! - [`NewsStore`]: persists a [`NewsRecord`] and returns its id
//! - [`Summarizer`]: turns a title and content into a short highlight
//! - [`RosterSource`]: looks up cohorts and academic partners
//! - [`ProfileTextExtractor`]: turns a profile or document into plain text
//!
//! [`SummarizingStore`] is a decorator that summarizes long content before
//! delegating to any other store. [`MemoryStore`] and [`StaticRoster`] are
//! in-process implementations for dry runs and tests.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::GatherError;
use crate::models::{AcademicPartner, Cohort, CohortStatus, NewsRecord};
use crate::utils::truncate_chars;

/// Content longer than this is summarized by a [`SummarizingStore`].
pub const SUMMARY_THRESHOLD_CHARS: usize = 200;
/// Length of the fallback summary when the summarizer fails.
pub const FALLBACK_SUMMARY_CHARS: usize = 500;

pub trait NewsStore {
    async fn save_news_item(&self, record: &NewsRecord) -> Result<String, GatherError>;
}

pub trait Summarizer {
    async fn summarize(&self, title: &str, content: &str) -> Result<String, GatherError>;
}

pub trait RosterSource {
    /// Cohorts with status `ACTIVE` whose date range contains `now`.
    async fn active_cohorts(&self, now: DateTime<Utc>) -> Result<Vec<Cohort>, GatherError>;

    /// Find a partner whose name contains `name`'s first word, case-insensitively.
    async fn find_university(&self, name: &str) -> Result<Option<AcademicPartner>, GatherError>;
}

pub trait ProfileTextExtractor {
    async fn extract_text(&self, source: &str) -> Result<String, GatherError>;
}

/// Whether `cohort` is active at `now`: status `ACTIVE` and `start ≤ now ≤ end`.
/// A cohort with a missing start or end date is never active.
pub fn is_active(cohort: &Cohort, now: DateTime<Utc>) -> bool {
    cohort.status == CohortStatus::Active
        && matches!((cohort.start_date, cohort.end_date), (Some(start), Some(end)) if start <= now && now <= end)
}

pub fn active_cohorts(cohorts: &[Cohort], now: DateTime<Utc>) -> Vec<&Cohort> {
    cohorts.iter().filter(|c| is_active(c, now)).collect()
}

/// Case-insensitive first-word match, e.g. "Cornell University" finds "Cornell SC Johnson".
pub fn first_word_matches(query: &str, candidate: &str) -> bool {
    match query.split_whitespace().next() {
        Some(word) => candidate.to_lowercase().contains(&word.to_lowercase()),
        None => false,
    }
}

/// Decorator: summarize long content, then delegate to `inner`.
#[derive(Debug)]
pub struct SummarizingStore<S, Z> {
    inner: S,
    summarizer: Z,
}

impl<S, Z> SummarizingStore<S, Z> {
    pub fn new(inner: S, summarizer: Z) -> Self {
        Self { inner, summarizer }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: NewsStore, Z: Summarizer> NewsStore for SummarizingStore<S, Z> {
    #[instrument(level = "debug", skip_all, fields(url = %record.sourceUrl))]
    async fn save_news_item(&self, record: &NewsRecord) -> Result<String, GatherError> {
        let mut record = record.clone();
        let mut summary = truncate_chars(&record.content, FALLBACK_SUMMARY_CHARS).to_string();
        if record.content.chars().count() > SUMMARY_THRESHOLD_CHARS {
            match self.summarizer.summarize(&record.title, &record.content).await {
                Ok(s) => summary = s,
                Err(e) => warn!(error = %e, "Summarization failed; using truncated content"),
            }
        }
        record.summary = Some(summary);
        self.inner.save_news_item(&record).await
    }
}

/// Keeps records in memory. Ids are sequential.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<NewsRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<NewsRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl NewsStore for MemoryStore {
    async fn save_news_item(&self, record: &NewsRecord) -> Result<String, GatherError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| GatherError::Storage(e.to_string()))?;
        records.push(record.clone());
        let id = format!("news-{}", records.len());
        debug!(%id, "Stored record in memory");
        Ok(id)
    }
}

/// A fixed roster, typically loaded from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    cohorts: Vec<Cohort>,
}

impl StaticRoster {
    pub fn new(cohorts: Vec<Cohort>) -> Self {
        Self { cohorts }
    }

    fn partners(&self) -> impl Iterator<Item = &AcademicPartner> {
        self.cohorts.iter().flat_map(|c| {
            c.program
                .academic_partner
                .iter()
                .chain(c.faculty.iter().filter_map(|f| f.academic_partner.as_ref()))
        })
    }
}

impl RosterSource for StaticRoster {
    async fn active_cohorts(&self, now: DateTime<Utc>) -> Result<Vec<Cohort>, GatherError> {
        Ok(active_cohorts(&self.cohorts, now).into_iter().cloned().collect())
    }

    async fn find_university(&self, name: &str) -> Result<Option<AcademicPartner>, GatherError> {
        Ok(self
            .partners()
            .find(|p| first_word_matches(name, &p.name))
            .cloned())
    }
}
