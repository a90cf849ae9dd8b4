use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use goodnews_gather::cancel::cancel_pair;
use goodnews_gather::collaborators::{MemoryStore, StaticRoster};
use goodnews_gather::config::{EnricherSettings, Pacing, Vocabularies};
use goodnews_gather::enricher::ContentEnricher;
use goodnews_gather::error::GatherError;
use goodnews_gather::http::{HeaderProfile, PageFetcher};
use goodnews_gather::models::{
    AcademicPartner, Cohort, CohortStatus, EntityRef, Faculty, Participant, Program, SearchResult,
    SourceDescriptor,
};
use goodnews_gather::orchestrator::{GatherWindow, Orchestrator};
use goodnews_gather::relevance::KeywordVocabulary;
use goodnews_gather::scrapers::overrides::OverrideRegistry;
use goodnews_gather::search::{SearchApi, SearchRequest};
use goodnews_gather::search::adapters::EntitySearch;

#[derive(Default)]
struct CannedPages(HashMap<String, String>);

impl CannedPages {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.0.insert(url.to_string(), body.to_string());
        self
    }
}

impl PageFetcher for CannedPages {
    async fn fetch(&self, url: &str, _profile: HeaderProfile, _timeout: Duration) -> Result<String, GatherError> {
        self.0.get(url).cloned().ok_or_else(|| GatherError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Returns one good-news hit per query, except for queries naming `fail_on`.
/// Every hit points at `link` when it is set.
#[derive(Default)]
struct ScriptedSearch {
    fail_on: Option<String>,
    link: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl SearchApi for ScriptedSearch {
    fn is_configured(&self) -> bool {
        true
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, GatherError> {
        let n = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(request.query.clone());
            queries.len()
        };
        if let Some(name) = &self.fail_on {
            if request.query.contains(name.as_str()) {
                return Err(GatherError::Search("HTTP 500".to_string()));
            }
        }
        Ok(vec![SearchResult {
            title: format!("Faculty member receives award #{n}"),
            link: self
                .link
                .clone()
                .unwrap_or_else(|| format!("https://press.example.com/story-{n}")),
            snippet: "Recognized for outstanding research.".to_string(),
            published_date: Some("2025-05-06T10:00:00Z".to_string()),
        }])
    }
}

fn enricher(cap: usize) -> ContentEnricher {
    ContentEnricher::new(&EnricherSettings {
        selectors: vec!["article".to_string(), "main".to_string()],
        known_domains: vec![".edu".to_string()],
        external_placeholder: "External link (content not fetched).".to_string(),
        min_length: 200,
        cap,
        marker: "...".to_string(),
        timeout_secs: 10,
    })
    .unwrap()
}

fn faculty(id: &str, name: &str) -> Faculty {
    Faculty {
        id: id.to_string(),
        name: name.to_string(),
        preferred_name: None,
        title: None,
        academic_partner: None,
    }
}

fn cohort(faculty: Vec<Faculty>, participants: Vec<Participant>, partner: Option<AcademicPartner>) -> Cohort {
    Cohort {
        id: "cohort-1".to_string(),
        name: Some("Spring 2025".to_string()),
        status: CohortStatus::Active,
        start_date: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
        end_date: Some(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()),
        program: Program {
            id: "program-1".to_string(),
            name: "Executive Leadership".to_string(),
            academic_partner: partner,
        },
        faculty,
        participants,
    }
}

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Campus News</title>
    <item>
      <title>Chemist wins national award</title>
      <link>https://news.example.edu/news/chemist-award</link>
      <description>The chemistry department celebrates.</description>
    </item>
    <item>
      <title>Chemist wins national award (update)</title>
      <link>https://news.example.edu/news/chemist-award</link>
    </item>
    <item>
      <title>Hi</title>
      <link>https://news.example.edu/news/hi</link>
    </item>
  </channel>
</rss>"#;

const NEWS_PAGE: &str = r#"<html><body>
  <a href="/news/lab-grant">Lab receives major federal grant</a>
  <a href="/news/parking">Parking garage closes for repairs</a>
  <a href="/about">About the university office</a>
</body></html>"#;

fn article(topic: &str) -> String {
    format!(
        "<html><body><nav>Home</nav><article>{}</article></body></html>",
        format!("The {topic} story continues with plenty of detail. ").repeat(10)
    )
}

#[tokio::test]
async fn test_sources_to_records_end_to_end() {
    let fetcher = CannedPages::default()
        .with("https://news.example.edu/feed", FEED)
        .with("https://news.example.edu/news/", NEWS_PAGE)
        .with("https://news.example.edu/news/chemist-award", &article("chemist"))
        .with("https://news.example.edu/news/lab-grant", &article("lab"));
    let orchestrator = Orchestrator::new(
        EntitySearch::new(ScriptedSearch::default(), Vocabularies::default()),
        MemoryStore::new(),
        fetcher,
        enricher(100),
        Pacing::none(),
    );
    let sources = [
        SourceDescriptor::rss("https://news.example.edu/feed"),
        SourceDescriptor::html("https://news.example.edu/news/"),
    ];

    let result = orchestrator
        .sweep_sources(
            &sources,
            None,
            &OverrideRegistry::empty(),
            &KeywordVocabulary::new(["award", "grant"]),
            EntityRef::University("u-1".to_string()),
            None,
        )
        .await;

    assert_eq!(result.saved_count, 2);
    let records = orchestrator.store().records();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].title, "Chemist wins national award");
    assert_eq!(records[0].keywords, ["award"]);
    assert_eq!(records[1].sourceUrl, "https://news.example.edu/news/lab-grant");
    assert_eq!(records[1].keywords, ["grant"]);
    for record in &records {
        assert!(record.content.ends_with("..."));
        assert_eq!(record.content.chars().count(), 103);
        assert_eq!(record.entity, EntityRef::University("u-1".to_string()));
        assert!(record.cohortId.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn test_one_failing_entity_does_not_stop_the_sweep() {
    let roster = vec![
        faculty("f-1", "Ann Lee"),
        faculty("f-2", "Bo Park"),
        faculty("f-3", "Carol Diaz"),
        faculty("f-4", "Dev Shah"),
        faculty("f-5", "Eve Moss"),
    ];
    let api = ScriptedSearch {
        fail_on: Some("Carol Diaz".to_string()),
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(
        EntitySearch::new(api, Vocabularies::default()),
        MemoryStore::new(),
        CannedPages::default(),
        enricher(1000),
        Pacing::default(),
    );
    let now = Utc::now();

    let result = orchestrator
        .gather_news_for_cohort(&cohort(roster, vec![], None), GatherWindow::last_week(now))
        .await;

    assert_eq!(result.facultyNewsCount, 4);
    assert_eq!(result.universityNewsCount, 0);
    assert_eq!(result.participantNewsCount, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Error gathering news for faculty Carol Diaz:"));

    let records = orchestrator.store().records();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.cohortId.as_deref() == Some("cohort-1")));
    assert!(records.iter().all(|r| r.entity.id() != "f-3"));
    // External link: content falls back to the search snippet.
    assert_eq!(records[0].content, "Recognized for outstanding research.");
    assert!(records[0].publishedAt.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_all_three_sweeps_run_in_order() {
    let partner = AcademicPartner {
        id: "u-1".to_string(),
        name: "Cornell University".to_string(),
        display_name: None,
    };
    let participants = vec![Participant {
        id: "p-1".to_string(),
        name: "Sam Roe".to_string(),
        linkedin_url: None,
    }];
    let orchestrator = Orchestrator::new(
        EntitySearch::new(ScriptedSearch::default(), Vocabularies::default()),
        MemoryStore::new(),
        CannedPages::default(),
        enricher(1000),
        Pacing::default(),
    );
    let roster = StaticRoster::new(vec![cohort(
        vec![faculty("f-1", "Ann Lee")],
        participants,
        Some(partner),
    )]);
    let now = Utc::now();

    let results = orchestrator
        .gather_active(&roster, GatherWindow::new(now - ChronoDuration::days(30), now))
        .await;

    assert_eq!(results.len(), 1);
    let (id, result) = &results[0];
    assert_eq!(id, "cohort-1");
    assert_eq!(result.facultyNewsCount, 1);
    assert_eq!(result.universityNewsCount, 1);
    assert_eq!(result.participantNewsCount, 1);
    assert!(result.errors.is_empty());

    let records = orchestrator.store().records();
    let kinds: Vec<_> = records.iter().map(|r| r.entity.clone()).collect();
    assert_eq!(
        kinds,
        [
            EntityRef::Faculty("f-1".to_string()),
            EntityRef::University("u-1".to_string()),
            EntityRef::Participant("p-1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_cancelled_run_returns_partial_result() {
    let (handle, token) = cancel_pair();
    let orchestrator = Orchestrator::new(
        EntitySearch::new(ScriptedSearch::default(), Vocabularies::default()),
        MemoryStore::new(),
        CannedPages::default(),
        enricher(1000),
        Pacing::none(),
    )
    .with_cancel(token);
    handle.cancel();

    let result = orchestrator
        .gather_news_for_cohort(
            &cohort(vec![faculty("f-1", "Ann Lee")], vec![], None),
            GatherWindow::last_week(Utc::now()),
        )
        .await;

    assert_eq!(result.total(), 0);
    assert_eq!(result.errors, ["run cancelled"]);
    assert!(orchestrator.store().records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_a_sweep_is_recorded_once() {
    let (handle, token) = cancel_pair();
    let pacing = Pacing {
        faculty_delay_ms: 300,
        ..Pacing::none()
    };
    let orchestrator = Orchestrator::new(
        EntitySearch::new(ScriptedSearch::default(), Vocabularies::default()),
        MemoryStore::new(),
        CannedPages::default(),
        enricher(1000),
        pacing,
    )
    .with_cancel(token);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let result = orchestrator
        .gather_news_for_cohort(
            &cohort(vec![faculty("f-1", "Ann Lee"), faculty("f-2", "Bo Park")], vec![], None),
            GatherWindow::last_week(Utc::now()),
        )
        .await;

    assert_eq!(result.facultyNewsCount, 1);
    assert_eq!(result.errors, ["run cancelled"]);
    assert_eq!(orchestrator.store().records().len(), 1);
}

#[tokio::test]
async fn test_same_link_is_saved_once_per_entity_type() {
    let api = ScriptedSearch {
        link: Some("https://press.example.com/shared-story".to_string()),
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(
        EntitySearch::new(api, Vocabularies::default()),
        MemoryStore::new(),
        CannedPages::default(),
        enricher(1000),
        Pacing::none(),
    );

    let result = orchestrator
        .gather_news_for_cohort(
            &cohort(vec![faculty("f-1", "Ann Lee"), faculty("f-2", "Bo Park")], vec![], None),
            GatherWindow::last_week(Utc::now()),
        )
        .await;

    assert_eq!(result.facultyNewsCount, 1);
    assert!(result.errors.is_empty());
    let records = orchestrator.store().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sourceUrl, "https://press.example.com/shared-story");
    assert_eq!(records[0].entity, EntityRef::Faculty("f-1".to_string()));
}
