//! Entity search adapters.
//!
//! Each adapter quotes the entity's identifying terms, appends a disjunction of
//! positive-news terms, restricts recency by the days-back window, and then
//! re-applies the keyword filter to the returned titles and snippets. Results
//! are therefore filtered twice: once by the query, once explicitly.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument, warn};

use crate::config::Vocabularies;
use crate::error::GatherError;
use crate::models::{AcademicPartner, Faculty, NewsCandidate, Participant, RelevantCandidate};
use crate::relevance::{KeywordVocabulary, filter_good_news};
use crate::search::{DateRestrict, SearchApi, SearchRequest, bound_query};

const FACULTY_TERMS: &str = "(award OR honor OR prize OR grant OR publish OR research OR named OR appointed OR recognition OR achievement OR success OR breakthrough OR new book OR speaking engagement OR conference)";
const UNIVERSITY_TERMS: &str = "(award OR honor OR ranking OR research OR breakthrough OR innovation OR new program OR grant OR donation OR gift OR partnership OR achievement OR success OR student OR faculty achievement)";
const PARTICIPANT_TERMS: &str = "(site:linkedin.com/in OR \"promoted\" OR \"new role\" OR \"award\" OR \"achievement\" OR \"recognition\" OR \"published\" OR \"speaking\" OR \"certification\" OR \"leadership\")";

pub const FACULTY_RESULTS: u8 = 5;
pub const UNIVERSITY_RESULTS: u8 = 5;
/// Participants get fewer results to conserve the search quota.
pub const PARTICIPANT_RESULTS: u8 = 3;

pub fn faculty_query(name: &str, title: Option<&str>, university: Option<&str>) -> String {
    let mut query = format!("\"{name}\"");
    if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
        query.push_str(&format!(" \"{title}\""));
    }
    if let Some(university) = university.filter(|u| !u.trim().is_empty()) {
        query.push(' ');
        query.push_str(university);
    }
    query.push(' ');
    query.push_str(FACULTY_TERMS);
    bound_query(&query)
}

pub fn university_query(name: &str) -> String {
    bound_query(&format!("\"{name}\" {UNIVERSITY_TERMS}"))
}

pub fn participant_query(name: &str) -> String {
    bound_query(&format!("\"{name}\" {PARTICIPANT_TERMS}"))
}

/// Runs entity searches against a [`SearchApi`].
#[derive(Debug)]
pub struct EntitySearch<S> {
    api: S,
    vocabularies: Vocabularies,
    warned: AtomicBool,
}

impl<S: SearchApi> EntitySearch<S> {
    pub fn new(api: S, vocabularies: Vocabularies) -> Self {
        Self {
            api,
            vocabularies,
            warned: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> &S {
        &self.api
    }

    /// `false` when the API is unconfigured; warns the first time only.
    fn ready(&self) -> bool {
        if self.api.is_configured() {
            return true;
        }
        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!("Search API not configured; entity searches return no results");
        }
        false
    }

    async fn run(
        &self,
        query: String,
        num: u8,
        days_back: i64,
        vocabulary: &KeywordVocabulary,
    ) -> Result<Vec<RelevantCandidate>, GatherError> {
        let request = SearchRequest::new(query)
            .date_restrict(DateRestrict::from_days_back(days_back))
            .num(num);
        let hits = self.api.search(&request).await?;
        let total = hits.len();
        let candidates: Vec<NewsCandidate> = hits.into_iter().map(NewsCandidate::from).collect();
        let kept = filter_good_news(candidates, vocabulary);
        debug!(total, kept = kept.len(), "Filtered search results");
        Ok(kept)
    }

    /// Search by preferred name, plus title and affiliated university when known.
    #[instrument(level = "info", skip_all, fields(faculty = %faculty.name))]
    pub async fn search_faculty_news(
        &self,
        faculty: &Faculty,
        university: Option<&str>,
        days_back: i64,
    ) -> Result<Vec<RelevantCandidate>, GatherError> {
        if !self.ready() {
            return Ok(Vec::new());
        }
        let query = faculty_query(faculty.search_name(), faculty.title.as_deref(), university);
        self.run(query, FACULTY_RESULTS, days_back, &self.vocabularies.faculty)
            .await
    }

    #[instrument(level = "info", skip_all, fields(university = %university.name))]
    pub async fn search_university_news(
        &self,
        university: &AcademicPartner,
        days_back: i64,
    ) -> Result<Vec<RelevantCandidate>, GatherError> {
        if !self.ready() {
            return Ok(Vec::new());
        }
        let query = university_query(university.search_name());
        self.run(query, UNIVERSITY_RESULTS, days_back, &self.vocabularies.university)
            .await
    }

    #[instrument(level = "info", skip_all, fields(participant = %participant.name))]
    pub async fn search_participant_news(
        &self,
        participant: &Participant,
        days_back: i64,
    ) -> Result<Vec<RelevantCandidate>, GatherError> {
        if !self.ready() {
            return Ok(Vec::new());
        }
        let query = participant_query(&participant.name);
        self.run(query, PARTICIPANT_RESULTS, days_back, &self.vocabularies.participant)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        configured: bool,
        requests: Mutex<Vec<SearchRequest>>,
        hits: Vec<SearchResult>,
    }

    impl SearchApi for RecordingApi {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, GatherError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.hits.clone())
        }
    }

    fn hit(title: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            link: format!("https://news.example.edu/{}", title.len()),
            snippet: snippet.to_string(),
            published_date: None,
        }
    }

    fn faculty() -> Faculty {
        Faculty {
            id: "f-1".into(),
            name: "Margaret Burton".into(),
            preferred_name: Some("Diane Burton".into()),
            title: Some("Professor".into()),
            academic_partner: None,
        }
    }

    #[test]
    fn test_faculty_query_embeds_title_and_university() {
        let q = faculty_query("Diane Burton", Some("Professor"), Some("Cornell University"));
        assert!(q.starts_with("\"Diane Burton\" \"Professor\" Cornell University (award OR"));
        let q = faculty_query("Diane Burton", None, None);
        assert!(q.starts_with("\"Diane Burton\" (award OR"));
    }

    #[test]
    fn test_queries_are_bounded() {
        let q = university_query(&"x".repeat(600));
        assert!(q.chars().count() <= crate::search::MAX_QUERY_CHARS);
    }

    #[tokio::test]
    async fn test_faculty_search_double_filters() {
        let api = RecordingApi {
            configured: true,
            hits: vec![
                hit("Burton receives teaching award", ""),
                hit("Campus weather", "Rain expected this week"),
                hit("Talk", "Burton gives conference keynote"),
            ],
            ..Default::default()
        };
        let search = EntitySearch::new(api, Vocabularies::default());
        let found = search
            .search_faculty_news(&faculty(), Some("Cornell University"), 7)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].matched_keywords, ["award"]);
        assert_eq!(found[1].matched_keywords, ["conference"]);

        let requests = search.api().requests.lock().unwrap();
        assert_eq!(requests[0].num, FACULTY_RESULTS);
        assert_eq!(requests[0].date_restrict, Some(DateRestrict::Week));
        assert!(requests[0].query.starts_with("\"Diane Burton\""));
    }

    #[tokio::test]
    async fn test_participant_search_is_narrower() {
        let api = RecordingApi {
            configured: true,
            hits: vec![hit("Sam Roe promoted to VP", "")],
            ..Default::default()
        };
        let search = EntitySearch::new(api, Vocabularies::default());
        let participant = Participant {
            id: "p-1".into(),
            name: "Sam Roe".into(),
            linkedin_url: None,
        };
        let found = search.search_participant_news(&participant, 30).await.unwrap();
        assert_eq!(found.len(), 1);
        let requests = search.api().requests.lock().unwrap();
        assert_eq!(requests[0].num, PARTICIPANT_RESULTS);
        assert_eq!(requests[0].date_restrict, Some(DateRestrict::Month));
    }

    #[tokio::test]
    async fn test_unconfigured_api_short_circuits() {
        let api = RecordingApi::default();
        let search = EntitySearch::new(api, Vocabularies::default());
        let partner = AcademicPartner {
            id: "u".into(),
            name: "Cornell University".into(),
            display_name: None,
        };
        assert!(search.search_university_news(&partner, 7).await.unwrap().is_empty());
        assert!(search.search_faculty_news(&faculty(), None, 7).await.unwrap().is_empty());
        assert!(search.api().requests.lock().unwrap().is_empty());
        assert!(search.warned.load(Ordering::Relaxed));
    }
}
