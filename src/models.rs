//! Data models for news candidates, persisted records and the cohort roster.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`SourceDescriptor`]: A configured RSS feed or HTML news page
//! - [`NewsCandidate`]: An unvalidated title/link/summary tuple from a source or search
//! - [`EnrichedCandidate`]: A candidate with fetched content and matched keywords
//! - [`NewsRecord`]: The structured item handed to the storage collaborator
//! - [`CohortGatherResult`]: Counts and errors of one cohort run
//! - Roster types: [`Cohort`], [`Program`], [`AcademicPartner`], [`Faculty`], [`Participant`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a configured source is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rss,
    Html,
}

/// A configured news source. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceDescriptor {
    pub url: String,
    pub kind: SourceKind,
}

impl SourceDescriptor {
    pub fn rss(url: &str) -> Self {
        Self {
            url: url.to_string(),
            kind: SourceKind::Rss,
        }
    }

    pub fn html(url: &str) -> Self {
        Self {
            url: url.to_string(),
            kind: SourceKind::Html,
        }
    }
}

/// A candidate news item prior to filtering and persistence.
///
/// `link` is always absolute; it is resolved against the source's base URL
/// before the candidate is created and serves as the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsCandidate {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsCandidate {
    pub fn new(title: impl Into<String>, link: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            summary: summary.into(),
            published_at: None,
        }
    }

    /// Text the relevance filter looks at.
    pub fn relevance_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

/// A candidate that passed the relevance filter, with the keywords it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevantCandidate {
    pub candidate: NewsCandidate,
    pub matched_keywords: Vec<String>,
}

/// A relevant candidate with its bounded plain-text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedCandidate {
    #[serde(flatten)]
    pub candidate: NewsCandidate,
    pub content: String,
    pub matched_keywords: Vec<String>,
}

/// Which roster a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Faculty,
    University,
    Participant,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityType::Faculty => "faculty",
            EntityType::University => "university",
            EntityType::Participant => "participant",
        };
        f.write_str(s)
    }
}

/// The entity a record is about. Exactly one id is ever set, and it always
/// agrees with the record's [`EntityType`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "entityType", content = "entityId", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityRef {
    Faculty(String),
    University(String),
    Participant(String),
}

impl EntityRef {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityRef::Faculty(_) => EntityType::Faculty,
            EntityRef::University(_) => EntityType::University,
            EntityRef::Participant(_) => EntityType::Participant,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            EntityRef::Faculty(id) | EntityRef::University(id) | EntityRef::Participant(id) => id,
        }
    }
}

/// The structured news item handed to the storage collaborator.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsRecord {
    #[serde(flatten)]
    pub entity: EntityRef,
    pub sourceUrl: String,
    pub title: String,
    pub content: String,
    /// Short summary; filled in by a summarizing store, if any.
    pub summary: Option<String>,
    pub publishedAt: Option<DateTime<Utc>>,
    /// Absent for records gathered outside a cohort run (site sweeps).
    pub cohortId: Option<String>,
    pub keywords: Vec<String>,
}

impl NewsRecord {
    pub fn entity_type(&self) -> EntityType {
        self.entity.entity_type()
    }
}

/// Outcome of one entity-type sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepResult {
    pub saved_count: usize,
}

/// Outcome of one cohort run. A run never fails; `errors` explains any shortfall.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CohortGatherResult {
    pub facultyNewsCount: usize,
    pub universityNewsCount: usize,
    pub participantNewsCount: usize,
    pub errors: Vec<String>,
}

impl CohortGatherResult {
    /// Items saved across all three entity types.
    pub fn total(&self) -> usize {
        self.facultyNewsCount + self.universityNewsCount + self.participantNewsCount
    }

    /// Add one entity's saved count to the counter for its type.
    pub fn record(&mut self, entity_type: EntityType, sweep: SweepResult) {
        match entity_type {
            EntityType::Faculty => self.facultyNewsCount += sweep.saved_count,
            EntityType::University => self.universityNewsCount += sweep.saved_count,
            EntityType::Participant => self.participantNewsCount += sweep.saved_count,
        }
    }
}

/// A single hit returned by the search API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub published_date: Option<String>,
}

impl From<SearchResult> for NewsCandidate {
    fn from(hit: SearchResult) -> Self {
        let published_at = hit.published_date.as_deref().and_then(parse_timestamp);
        NewsCandidate {
            title: hit.title,
            link: hit.link,
            summary: hit.snippet,
            published_at,
        }
    }
}

/// Parse the timestamp formats seen in feeds and page metadata (RFC 3339, RFC 2822).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Lifecycle state of a cohort. Only `Active` cohorts inside their date range
/// are gathered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CohortStatus {
    Draft,
    Active,
    Completed,
    Archived,
}

/// A university or institute participating in a program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AcademicPartner {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl AcademicPartner {
    /// Name used when searching for news about the partner.
    pub fn search_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A program a cohort runs under. Its academic partner, when present, is the
/// university swept in the university phase.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Program {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub academic_partner: Option<AcademicPartner>,
}

/// A faculty member teaching in a cohort.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Faculty {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub preferred_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub academic_partner: Option<AcademicPartner>,
}

impl Faculty {
    /// Preferred name if set, else the full name.
    pub fn search_name(&self) -> &str {
        self.preferred_name.as_deref().unwrap_or(&self.name)
    }
}

/// A cohort participant. News is searched by name only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

/// A time-boxed group of participants and faculty tied to one program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Cohort {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub status: CohortStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub program: Program,
    #[serde(default)]
    pub faculty: Vec<Faculty>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl Cohort {
    /// Name for logs and error messages; the id when unnamed.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_matches_type() {
        let r = EntityRef::University("u-1".to_string());
        assert_eq!(r.entity_type(), EntityType::University);
        assert_eq!(r.id(), "u-1");
    }

    #[test]
    fn test_news_record_serialization_has_single_entity_id() {
        let record = NewsRecord {
            entity: EntityRef::Faculty("f-1".to_string()),
            sourceUrl: "https://news.example.edu/stories/x".to_string(),
            title: "Professor wins award".to_string(),
            content: "Body...".to_string(),
            summary: None,
            publishedAt: None,
            cohortId: Some("c-1".to_string()),
            keywords: vec!["award".to_string()],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["entityType"], "FACULTY");
        assert_eq!(json["entityId"], "f-1");
        assert_eq!(json["cohortId"], "c-1");
        assert!(json.get("Faculty").is_none());
    }

    #[test]
    fn test_search_result_into_candidate_parses_date() {
        let hit = SearchResult {
            title: "Named fellow".to_string(),
            link: "https://news.example.edu/a".to_string(),
            snippet: "She was named a fellow".to_string(),
            published_date: Some("2025-05-06T14:30:00Z".to_string()),
        };
        let c: NewsCandidate = hit.into();
        assert_eq!(c.summary, "She was named a fellow");
        assert_eq!(
            c.published_at.map(|d| d.to_rfc3339()),
            Some("2025-05-06T14:30:00+00:00".to_string())
        );
    }

    #[test]
    fn test_parse_timestamp_rfc2822() {
        let ts = parse_timestamp("Tue, 06 May 2025 14:30:00 GMT").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-05-06T14:30:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_cohort_result_record_and_total() {
        let mut result = CohortGatherResult::default();
        result.record(EntityType::Faculty, SweepResult { saved_count: 2 });
        result.record(EntityType::Participant, SweepResult { saved_count: 1 });
        assert_eq!(result.facultyNewsCount, 2);
        assert_eq!(result.universityNewsCount, 0);
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn test_search_names_prefer_display_fields() {
        let partner = AcademicPartner {
            id: "u".into(),
            name: "Cornell University".into(),
            display_name: Some("Cornell".into()),
        };
        assert_eq!(partner.search_name(), "Cornell");

        let faculty = Faculty {
            id: "f".into(),
            name: "Margaret Diane Burton".into(),
            preferred_name: None,
            title: None,
            academic_partner: None,
        };
        assert_eq!(faculty.search_name(), "Margaret Diane Burton");
    }
}
