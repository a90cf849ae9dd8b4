//! Stand-alone site sweeps.
//!
//! Two runs that work off the configuration instead of a cohort:
//!
//! - [`SiteSweep`]: read every configured university's own news pages and
//!   feeds, keep the good news, enrich it and persist it as university news.
//! - [`FacultySiteSearch`]: query each university's site search for every
//!   member of the flat faculty roster and report the relevant hits.

use futures::future::join_all;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cancel::CancelToken;
use crate::collaborators::{NewsStore, RosterSource};
use crate::config::{GatherConfig, RosterFaculty, SiteSearchConfig, SiteSearchStrategy, UniversitySources};
use crate::dedup::{DedupPolicy, dedup_by_link, deduplicate};
use crate::enricher::ContentEnricher;
use crate::error::GatherError;
use crate::http::{HeaderProfile, PageFetcher};
use crate::models::{AcademicPartner, EntityRef, NewsCandidate, NewsRecord, RelevantCandidate};
use crate::relevance::{KeywordVocabulary, filter_good_news};
use crate::scrapers::SourceFetcher;
use crate::scrapers::html::{element_text, resolve_link};
use crate::scrapers::overrides::OverrideRegistry;
use crate::utils::{collapse_whitespace, jitter, truncate_chars};

/// One item a university sweep kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepItem {
    pub title: String,
    pub link: String,
    pub content: String,
    pub keywords: Vec<String>,
    pub saved: bool,
}

/// What a sweep found for one university.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UniversityReport {
    pub university: String,
    pub found: usize,
    pub relevant: usize,
    pub items: Vec<SweepItem>,
    pub saved_count: usize,
}

/// Sweeps the configured university news sites.
pub struct SiteSweep<'a, F, N, R> {
    config: &'a GatherConfig,
    fetcher: &'a F,
    overrides: OverrideRegistry,
    store: &'a N,
    roster: &'a R,
    enricher: ContentEnricher,
    cancel: CancelToken,
}

impl<'a, F, N, R> SiteSweep<'a, F, N, R>
where
    F: PageFetcher,
    N: NewsStore,
    R: RosterSource,
{
    pub fn new(config: &'a GatherConfig, fetcher: &'a F, store: &'a N, roster: &'a R) -> Result<Self, GatherError> {
        Ok(Self {
            config,
            fetcher,
            overrides: OverrideRegistry::with_overrides(&config.overrides),
            store,
            roster,
            enricher: ContentEnricher::new(&config.enrichment.site)?,
            cancel: CancelToken::never(),
        })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sweep every configured university in order.
    #[instrument(level = "info", skip_all, fields(universities = self.config.universities.len()))]
    pub async fn run(&self) -> Vec<UniversityReport> {
        let mut reports = Vec::new();
        for university in &self.config.universities {
            if self.cancel.is_cancelled() {
                warn!("Sweep cancelled; skipping remaining universities");
                break;
            }
            reports.push(self.sweep_university(university).await);
            if !self.cancel.sleep(self.config.pacing.university_delay()).await {
                break;
            }
        }
        let saved: usize = reports.iter().map(|r| r.saved_count).sum();
        info!(saved, "Site sweep complete");
        reports
    }

    #[instrument(level = "info", skip_all, fields(university = %university.name))]
    pub async fn sweep_university(&self, university: &UniversitySources) -> UniversityReport {
        let pacing = &self.config.pacing;
        let vocabulary = &self.config.vocabularies.site_sweep;

        let raw = SourceFetcher::new(self.fetcher, &self.overrides)
            .with_cancel(self.cancel.clone())
            .fetch_all(
                &university.sources,
                university.article_base_url.as_deref(),
                pacing.source_delay(),
            )
            .await;
        let candidates = dedup_by_link(raw);
        let found = candidates.len();
        let relevant = filter_good_news(candidates, vocabulary);
        let relevant_count = relevant.len();
        let kept = deduplicate(relevant, DedupPolicy::site_sweep(self.config.site_sweep_cap));
        info!(found, relevant = relevant_count, kept = kept.len(), "Filtered site candidates");

        let mut report = UniversityReport {
            university: university.name.clone(),
            found,
            relevant: relevant_count,
            ..Default::default()
        };
        if kept.is_empty() {
            info!("No good news found");
            return report;
        }

        let partner = self.resolve_partner(&university.name).await;
        for relevant in kept {
            if self.cancel.is_cancelled() {
                break;
            }
            let item = self.settle_item(relevant, partner.as_ref(), vocabulary).await;
            if item.saved {
                report.saved_count += 1;
            }
            report.items.push(item);
            if !self.cancel.sleep(pacing.item_delay()).await {
                break;
            }
        }
        report
    }

    async fn resolve_partner(&self, name: &str) -> Option<AcademicPartner> {
        match self.roster.find_university(name).await {
            Ok(Some(partner)) => Some(partner),
            Ok(None) => {
                warn!(university = %name, "University not found in roster; items will not be saved");
                None
            }
            Err(e) => {
                warn!(university = %name, error = %e, "University lookup failed; items will not be saved");
                None
            }
        }
    }

    /// Summaries too short to stand alone are replaced by fetched content.
    async fn content_for(&self, candidate: &NewsCandidate) -> String {
        let enrichment = &self.config.enrichment;
        if candidate.summary.chars().count() < enrichment.min_summary_chars {
            self.enricher
                .enrich(self.fetcher, &candidate.link)
                .await
                .as_str()
                .to_string()
        } else {
            truncate_chars(&collapse_whitespace(&candidate.summary), enrichment.summary_cap).to_string()
        }
    }

    async fn settle_item(
        &self,
        relevant: RelevantCandidate,
        partner: Option<&AcademicPartner>,
        vocabulary: &KeywordVocabulary,
    ) -> SweepItem {
        let candidate = relevant.candidate;
        let content = self.content_for(&candidate).await;
        let keywords = vocabulary.matches(&format!("{} {} {}", candidate.title, candidate.summary, content));
        let mut item = SweepItem {
            title: candidate.title.clone(),
            link: candidate.link.clone(),
            content,
            keywords,
            saved: false,
        };
        let Some(partner) = partner else {
            return item;
        };

        let record = NewsRecord {
            entity: EntityRef::University(partner.id.clone()),
            sourceUrl: item.link.clone(),
            title: item.title.clone(),
            content: item.content.clone(),
            summary: None,
            publishedAt: candidate.published_at,
            cohortId: None,
            keywords: item.keywords.clone(),
        };
        match self.store.save_news_item(&record).await {
            Ok(id) => {
                debug!(%id, url = %item.link, "Saved university news item");
                item.saved = true;
            }
            Err(e) => warn!(url = %item.link, error = %e, "Failed to save university news item"),
        }
        item
    }
}

static FALLBACK_ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("main a, #content a").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static CONTAINER_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h3, h2").unwrap());
static DDG_RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse(".result").unwrap());
static DDG_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".result__title a").unwrap());

const SNIPPET_CHARS: usize = 150;
const FALLBACK_MIN_TEXT_CHARS: usize = 20;
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Fill the `QUERY` placeholder of a search-page template.
pub fn search_url(template: &str, name: &str) -> String {
    template.replace("QUERY", &urlencoding::encode(name))
}

pub fn duckduckgo_url(site: &str, name: &str) -> String {
    let query = format!("site:{site} \"{name}\" news award");
    format!("{DUCKDUCKGO_ENDPOINT}?q={}", urlencoding::encode(&query))
}

/// Parse a site's search results page.
///
/// Each element matching `containers` yields its first anchor (or, lacking
/// anchor text, its `h3`/`h2` text) plus a short snippet. When nothing
/// matches, any reasonably long anchor inside `main` or `#content` that is not
/// a search or tag link is taken instead. Relative links resolve against the
/// origin of `page`.
pub fn parse_site_search_results(html: &str, containers: &Selector, page: &Url) -> Vec<NewsCandidate> {
    let document = Html::parse_document(html);
    let origin = Url::parse(&page.origin().ascii_serialization()).unwrap_or_else(|_| page.clone());
    let mut items = Vec::new();

    let mut matched = document.select(containers).peekable();
    if matched.peek().is_some() {
        for container in matched {
            let Some(anchor) = container.select(&ANCHOR).next() else {
                continue;
            };
            let mut title = element_text(&anchor);
            if title.is_empty() {
                title = collapse_whitespace(
                    &container
                        .select(&CONTAINER_HEADING)
                        .map(|h| element_text(&h))
                        .collect::<Vec<_>>()
                        .join(" "),
                );
            }
            let Some(link) = anchor.value().attr("href").and_then(|h| resolve_link(&origin, h)) else {
                continue;
            };
            if title.is_empty() {
                continue;
            }
            let snippet = truncate_chars(&element_text(&container), SNIPPET_CHARS).to_string();
            items.push(NewsCandidate::new(title, link, snippet));
        }
        return items;
    }

    for anchor in document.select(&FALLBACK_ANCHORS) {
        let text = element_text(&anchor);
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if text.chars().count() <= FALLBACK_MIN_TEXT_CHARS || href.contains("search") || href.contains("tag") {
            continue;
        }
        if let Some(link) = resolve_link(&origin, href) {
            items.push(NewsCandidate::new(text, link, ""));
        }
    }
    items
}

/// Parse DuckDuckGo's HTML results, dropping links back into DuckDuckGo.
pub fn parse_duckduckgo_results(html: &str) -> Vec<NewsCandidate> {
    let document = Html::parse_document(html);
    document
        .select(&DDG_RESULT)
        .filter_map(|result| {
            let anchor = result.select(&DDG_TITLE).next()?;
            let title = element_text(&anchor);
            let link = anchor.value().attr("href")?.trim();
            if title.is_empty() || link.is_empty() || link.contains("duckduckgo") {
                return None;
            }
            Some(NewsCandidate::new(title, link, ""))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedItem {
    pub title: String,
    pub link: String,
    pub keywords: Vec<String>,
}

/// Site-search outcome for one faculty member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacultyReport {
    pub name: String,
    pub university: String,
    pub raw_count: usize,
    pub relevant_count: usize,
    pub top: Vec<ReportedItem>,
    /// The first raw hit, reported when nothing was relevant.
    pub latest: Option<ReportedItem>,
}

/// Looks faculty up through their universities' own site search.
pub struct FacultySiteSearch<'a, F> {
    config: &'a GatherConfig,
    fetcher: &'a F,
    cancel: CancelToken,
}

impl<'a, F: PageFetcher> FacultySiteSearch<'a, F> {
    pub fn new(config: &'a GatherConfig, fetcher: &'a F) -> Self {
        Self {
            config,
            fetcher,
            cancel: CancelToken::never(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn search_config(&self, university: &str) -> Option<&SiteSearchConfig> {
        self.config.site_searches.iter().find(|s| s.university == university)
    }

    /// Search the roster in concurrent batches with jittered pacing.
    #[instrument(level = "info", skip_all, fields(members = roster.len()))]
    pub async fn run(&self, roster: &[RosterFaculty]) -> Vec<FacultyReport> {
        let pacing = &self.config.pacing;
        let (min, max) = pacing.jitter_bounds();
        let mut reports = Vec::new();

        for (i, batch) in roster.chunks(pacing.batch_size.max(1)).enumerate() {
            if self.cancel.is_cancelled() {
                warn!("Search cancelled; skipping remaining batches");
                break;
            }
            info!(batch = i + 1, size = batch.len(), "Searching batch");
            let results = join_all(batch.iter().map(|member| async move {
                let report = self.search_member(member).await;
                self.cancel.sleep(jitter(min, max)).await;
                report
            }))
            .await;
            reports.extend(results.into_iter().flatten());

            if !self.cancel.sleep(pacing.batch_delay()).await {
                break;
            }
        }
        reports
    }

    /// `None` when the member's university has no search configured.
    #[instrument(level = "info", skip_all, fields(name = %member.name, university = %member.university))]
    pub async fn search_member(&self, member: &RosterFaculty) -> Option<FacultyReport> {
        let Some(config) = self.search_config(&member.university) else {
            info!("No site search configured; skipping");
            return None;
        };

        let items = match self.fetch_results(&config.strategy, &member.name).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Site search failed");
                Vec::new()
            }
        };
        let raw_count = items.len();
        let latest = items.first().map(|c| ReportedItem {
            title: c.title.clone(),
            link: c.link.clone(),
            keywords: Vec::new(),
        });
        let relevant = filter_good_news(items, &self.config.vocabularies.faculty_site);
        let relevant_count = relevant.len();
        let top: Vec<ReportedItem> = relevant
            .into_iter()
            .take(self.config.faculty_report_cap)
            .map(|r| ReportedItem {
                title: r.candidate.title,
                link: r.candidate.link,
                keywords: r.matched_keywords,
            })
            .collect();

        if top.is_empty() {
            info!(raw_count, "No relevant items");
        } else {
            info!(relevant = relevant_count, "Found relevant items");
        }
        Some(FacultyReport {
            name: member.name.clone(),
            university: member.university.clone(),
            raw_count,
            relevant_count,
            latest: if top.is_empty() { latest } else { None },
            top,
        })
    }

    async fn fetch_results(
        &self,
        strategy: &SiteSearchStrategy,
        name: &str,
    ) -> Result<Vec<NewsCandidate>, GatherError> {
        match strategy {
            SiteSearchStrategy::Direct { url_template, selector } => {
                let containers = Selector::parse(selector)
                    .map_err(|e| GatherError::Selector(format!("{selector}: {e:?}")))?;
                let url = search_url(url_template, name);
                let page = Url::parse(&url)?;
                let body = self.fetcher.fetch(&url, HeaderProfile::Browser, SEARCH_TIMEOUT).await?;
                Ok(parse_site_search_results(&body, &containers, &page))
            }
            SiteSearchStrategy::DuckDuckGo { site } => {
                let url = duckduckgo_url(site, name);
                let body = self.fetcher.fetch(&url, HeaderProfile::Browser, SEARCH_TIMEOUT).await?;
                Ok(parse_duckduckgo_results(&body))
            }
        }
    }
}
