//! Gathering configuration.
//!
//! Everything that used to be a constant sprinkled through the pipeline
//! (source lists, keyword vocabularies, pacing, enrichment limits) lives in
//! [`GatherConfig`]. It loads from YAML; any section left out takes the
//! built-in default, so an empty file is a valid configuration.
//!
//! ```yaml
//! pacing:
//!   participant_delay_ms: 2000
//! universities:
//!   - name: Cornell University
//!     article_base_url: https://news.cornell.edu
//!     sources:
//!       - { url: "https://news.cornell.edu", kind: html }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::GatherError;
use crate::models::{Cohort, SourceDescriptor};
use crate::relevance::KeywordVocabulary;
use crate::scrapers::overrides::SourceOverride;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GatherConfig {
    pub universities: Vec<UniversitySources>,
    pub overrides: Vec<SourceOverride>,
    pub site_searches: Vec<SiteSearchConfig>,
    pub faculty_roster: Vec<RosterFaculty>,
    pub cohorts: Vec<Cohort>,
    pub vocabularies: Vocabularies,
    pub pacing: Pacing,
    pub enrichment: EnrichmentSettings,
    /// Maximum items kept per university in a site sweep.
    pub site_sweep_cap: usize,
    /// Maximum relevant items reported per faculty member in a site search.
    pub faculty_report_cap: usize,
}

impl GatherConfig {
    /// Built-in defaults with the stock university sources and site searches.
    pub fn builtin() -> Self {
        Self {
            universities: default_universities(),
            site_searches: default_site_searches(),
            site_sweep_cap: 4,
            faculty_report_cap: 3,
            ..Self::default()
        }
    }

    /// Load from `path`, or return [`GatherConfig::builtin`] when no path is given.
    #[instrument(level = "info", skip_all)]
    pub fn load(path: Option<&Path>) -> Result<Self, GatherError> {
        let Some(path) = path else {
            info!("No config file given; using built-in configuration");
            return Ok(Self::builtin());
        };
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        info!(
            path = %path.display(),
            universities = config.universities.len(),
            cohorts = config.cohorts.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse YAML; empty lists for sources and searches fall back to the built-ins.
    pub fn from_yaml(text: &str) -> Result<Self, GatherError> {
        let mut config: GatherConfig = if text.trim().is_empty() {
            GatherConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };
        let builtin = Self::builtin();
        if config.universities.is_empty() {
            config.universities = builtin.universities;
        }
        if config.site_searches.is_empty() {
            config.site_searches = builtin.site_searches;
        }
        if config.site_sweep_cap == 0 {
            config.site_sweep_cap = builtin.site_sweep_cap;
        }
        if config.faculty_report_cap == 0 {
            config.faculty_report_cap = builtin.faculty_report_cap;
        }
        Ok(config)
    }
}

/// The news sources of one university.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UniversitySources {
    pub name: String,
    pub sources: Vec<SourceDescriptor>,
    #[serde(default)]
    pub article_base_url: Option<String>,
}

/// How faculty are looked up on one university's own site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiteSearchConfig {
    pub university: String,
    #[serde(flatten)]
    pub strategy: SiteSearchStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SiteSearchStrategy {
    /// `url_template` contains `QUERY`, replaced by the URL-encoded name.
    Direct { url_template: String, selector: String },
    /// The site blocks direct search; query DuckDuckGo's HTML endpoint with `site:`.
    DuckDuckGo { site: String },
}

/// A faculty member on the flat roster used by site searches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RosterFaculty {
    pub name: String,
    pub university: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Keyword vocabularies, one per call site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Vocabularies {
    pub site_sweep: KeywordVocabulary,
    pub faculty_site: KeywordVocabulary,
    pub faculty: KeywordVocabulary,
    pub university: KeywordVocabulary,
    pub participant: KeywordVocabulary,
}

impl Default for Vocabularies {
    fn default() -> Self {
        Self {
            site_sweep: KeywordVocabulary::new([
                "award", "honor", "breakthrough", "success", "win", "grant", "new", "innovation",
                "achievement", "student", "research", "discovery", "celebrate", "gift", "donation",
                "publish", "launch", "partner", "rank", "top", "appoint", "elect", "fellow",
                "leader", "program", "impact",
            ]),
            faculty_site: KeywordVocabulary::new([
                "award", "honor", "prize", "grant", "research", "publish", "named", "appointed",
                "success", "gift", "chair", "fellow",
            ]),
            faculty: KeywordVocabulary::new([
                "award", "honor", "prize", "grant", "publish", "research", "named", "appointed",
                "recognition", "achievement", "success", "breakthrough", "book", "speaking",
                "conference", "fellowship", "chair", "professor",
            ]),
            university: KeywordVocabulary::new([
                "award", "honor", "ranking", "research", "breakthrough", "innovation", "program",
                "grant", "donation", "gift", "partnership", "achievement", "success", "student",
                "faculty",
            ]),
            participant: KeywordVocabulary::new([
                "promoted", "new role", "award", "achievement", "recognition", "published",
                "speaking", "certification", "leadership", "success", "appointed", "named",
                "grant", "fellowship",
            ]),
        }
    }
}

/// Delays between external calls, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Pacing {
    pub faculty_delay_ms: u64,
    pub university_delay_ms: u64,
    pub participant_delay_ms: u64,
    pub source_delay_ms: u64,
    pub item_delay_ms: u64,
    pub batch_size: usize,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub batch_delay_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            faculty_delay_ms: 1000,
            university_delay_ms: 1000,
            participant_delay_ms: 1500,
            source_delay_ms: 500,
            item_delay_ms: 400,
            batch_size: 5,
            jitter_min_ms: 1000,
            jitter_max_ms: 3000,
            batch_delay_ms: 3000,
        }
    }
}

impl Pacing {
    /// No delays at all; for tests and dry runs.
    pub fn none() -> Self {
        Self {
            faculty_delay_ms: 0,
            university_delay_ms: 0,
            participant_delay_ms: 0,
            source_delay_ms: 0,
            item_delay_ms: 0,
            jitter_min_ms: 0,
            jitter_max_ms: 0,
            batch_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn faculty_delay(&self) -> Duration {
        Duration::from_millis(self.faculty_delay_ms)
    }

    pub fn university_delay(&self) -> Duration {
        Duration::from_millis(self.university_delay_ms)
    }

    pub fn participant_delay(&self) -> Duration {
        Duration::from_millis(self.participant_delay_ms)
    }

    pub fn source_delay(&self) -> Duration {
        Duration::from_millis(self.source_delay_ms)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn jitter_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.jitter_min_ms),
            Duration::from_millis(self.jitter_max_ms),
        )
    }
}

/// Settings for one [`crate::enricher::ContentEnricher`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnricherSettings {
    pub selectors: Vec<String>,
    pub known_domains: Vec<String>,
    pub external_placeholder: String,
    pub min_length: usize,
    pub cap: usize,
    pub marker: String,
    pub timeout_secs: u64,
}

/// Enrichment for cohort runs (`search`) and stand-alone site sweeps (`site`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    pub search: EnricherSettings,
    pub site: EnricherSettings,
    /// Site-sweep items with a shorter summary are enriched.
    pub min_summary_chars: usize,
    /// Site-sweep summaries used as content are capped to this.
    pub summary_cap: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        let selectors = [
            ".field-name-body",
            ".entry-content",
            "article",
            ".post-content",
            "main",
            ".node__content",
            ".news-body",
            "#main-content",
        ];
        let mut search_selectors = strings(&selectors);
        search_selectors.push(".article-content".to_string());

        Self {
            search: EnricherSettings {
                selectors: search_selectors,
                known_domains: strings(&[".edu", "linkedin.com", "news.", "press."]),
                external_placeholder: "External link (content not fetched).".to_string(),
                min_length: 200,
                cap: 1000,
                marker: "...".to_string(),
                timeout_secs: 10,
            },
            site: EnricherSettings {
                selectors: strings(&selectors),
                known_domains: strings(&[".edu", "xedinstitute.org", "ox.ac.uk"]),
                external_placeholder: "External Link (Content not fetched automatically).".to_string(),
                min_length: 200,
                cap: 500,
                marker: "...".to_string(),
                timeout_secs: 10,
            },
            min_summary_chars: 50,
            summary_cap: 200,
        }
    }
}

fn default_universities() -> Vec<UniversitySources> {
    vec![
        UniversitySources {
            name: "Cornell University".to_string(),
            sources: vec![
                SourceDescriptor::html("https://news.cornell.edu"),
                SourceDescriptor::html("https://business.cornell.edu/news/"),
            ],
            article_base_url: Some("https://news.cornell.edu".to_string()),
        },
        UniversitySources {
            name: "Michigan Ross School of Business".to_string(),
            sources: vec![
                SourceDescriptor::rss("http://michiganross.umich.edu/ross-news-blog/feed"),
                SourceDescriptor::html("https://michiganross.umich.edu/news"),
            ],
            article_base_url: Some("https://michiganross.umich.edu".to_string()),
        },
        UniversitySources {
            name: "Saïd Business School (Oxford)".to_string(),
            sources: vec![SourceDescriptor::html("https://www.sbs.ox.ac.uk/news")],
            article_base_url: Some("https://www.sbs.ox.ac.uk".to_string()),
        },
        UniversitySources {
            name: "XED".to_string(),
            sources: vec![SourceDescriptor::html("https://xedinstitute.org/knowledge-hub")],
            article_base_url: Some("https://xedinstitute.org".to_string()),
        },
        UniversitySources {
            name: "Darden School of Business".to_string(),
            sources: vec![SourceDescriptor::html("https://news.darden.virginia.edu/")],
            article_base_url: Some("https://news.darden.virginia.edu".to_string()),
        },
    ]
}

fn default_site_searches() -> Vec<SiteSearchConfig> {
    let direct = |university: &str, url_template: &str, selector: &str| SiteSearchConfig {
        university: university.to_string(),
        strategy: SiteSearchStrategy::Direct {
            url_template: url_template.to_string(),
            selector: selector.to_string(),
        },
    };
    vec![
        direct(
            "Cornell University",
            "https://news.cornell.edu/search?q=QUERY",
            ".search-result, .views-row",
        ),
        direct(
            "Saïd Business School (Oxford)",
            "https://www.sbs.ox.ac.uk/search?search=QUERY",
            ".search-result, .node--type-news",
        ),
        direct(
            "Darden School of Business",
            "https://news.darden.virginia.edu/?s=QUERY",
            "article, .post",
        ),
        direct("XED", "https://xedinstitute.org/?s=QUERY", "article, .search-result"),
        SiteSearchConfig {
            university: "Michigan Ross School of Business".to_string(),
            strategy: SiteSearchStrategy::DuckDuckGo {
                site: "michiganross.umich.edu".to_string(),
            },
        },
    ]
}
