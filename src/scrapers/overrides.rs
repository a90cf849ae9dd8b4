//! Per-source extraction rules for sites with bespoke markup.
//!
//! Rules are looked up by the host of the source URL and run before the
//! generic structural strategy; their candidates come first in the output.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::error::GatherError;
use crate::models::NewsCandidate;
use crate::scrapers::html::{element_text, is_meaningful_title, resolve_link};

/// A site-specific extraction rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ExtractionRule {
    /// Card listings where each story is introduced by a heading tag. The
    /// link is found inside the heading, on an enclosing anchor, in the next
    /// sibling element, or in the enclosing `div`, in that order.
    HeadingCards { heading: String },
}

/// Binds a rule to a source host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceOverride {
    pub host: String,
    #[serde(flatten)]
    pub rule: ExtractionRule,
}

fn first_link_in(element: &ElementRef<'_>, anchor: &Selector) -> Option<String> {
    if element.value().name() == "a" {
        return element.value().attr("href").map(str::to_string);
    }
    element
        .select(anchor)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

fn closest<'a>(element: &ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == tag)
}

impl ExtractionRule {
    pub fn extract(&self, document: &Html, base: &Url) -> Result<Vec<NewsCandidate>, GatherError> {
        match self {
            ExtractionRule::HeadingCards { heading } => {
                let heading_sel = Selector::parse(heading)
                    .map_err(|e| GatherError::Selector(format!("{heading}: {e:?}")))?;
                let anchor = Selector::parse("a[href]")
                    .map_err(|e| GatherError::Selector(format!("a[href]: {e:?}")))?;

                let mut out = Vec::new();
                for card in document.select(&heading_sel) {
                    let title = element_text(&card);
                    if !is_meaningful_title(&title) {
                        continue;
                    }
                    let href = first_link_in(&card, &anchor)
                        .or_else(|| closest(&card, "a").and_then(|a| a.value().attr("href").map(str::to_string)))
                        .or_else(|| {
                            card.next_siblings()
                                .find_map(ElementRef::wrap)
                                .and_then(|sib| first_link_in(&sib, &anchor))
                        })
                        .or_else(|| closest(&card, "div").and_then(|d| first_link_in(&d, &anchor)));

                    if let Some(link) = href.and_then(|h| resolve_link(base, &h)) {
                        out.push(NewsCandidate::new(title, link, ""));
                    }
                }
                Ok(out)
            }
        }
    }
}

/// Source-identity keyed lookup of extraction rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRegistry {
    rules: HashMap<String, ExtractionRule>,
}

impl Default for OverrideRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "xedinstitute.org",
            ExtractionRule::HeadingCards {
                heading: "h5".to_string(),
            },
        );
        registry
    }
}

impl OverrideRegistry {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Built-in rules plus the configured ones; configured rules win.
    pub fn with_overrides(overrides: &[SourceOverride]) -> Self {
        let mut registry = Self::default();
        for o in overrides {
            registry.register(&o.host, o.rule.clone());
        }
        registry
    }

    pub fn register(&mut self, host: &str, rule: ExtractionRule) {
        self.rules.insert(normalize_host(host), rule);
    }

    pub fn lookup(&self, source_url: &Url) -> Option<&ExtractionRule> {
        source_url
            .host_str()
            .and_then(|h| self.rules.get(&normalize_host(h)))
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XED_PAGE: &str = r#"
<html><body>
  <div class="card"><h5><a href="/knowledge-hub/award-winning-program">Award-winning program expands</a></h5></div>
  <a href="/knowledge-hub/fellows"><h5>New fellows join the institute</h5></a>
  <div class="card">
    <h5>Leadership research published today</h5>
    <p><a href="https://xedinstitute.org/knowledge-hub/leadership">Read</a></p>
  </div>
  <div class="card"><h5>Tiny</h5><a href="/x">x</a></div>
</body></html>"#;

    fn base() -> Url {
        Url::parse("https://xedinstitute.org").unwrap()
    }

    #[test]
    fn test_heading_cards_find_links_in_all_positions() {
        let doc = Html::parse_document(XED_PAGE);
        let rule = ExtractionRule::HeadingCards {
            heading: "h5".to_string(),
        };
        let items = rule.extract(&doc, &base()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].link, "https://xedinstitute.org/knowledge-hub/award-winning-program");
        assert_eq!(items[1].link, "https://xedinstitute.org/knowledge-hub/fellows");
        assert_eq!(items[2].title, "Leadership research published today");
        assert_eq!(items[2].link, "https://xedinstitute.org/knowledge-hub/leadership");
    }

    #[test]
    fn test_registry_lookup_by_host() {
        let registry = OverrideRegistry::default();
        let xed = Url::parse("https://www.xedinstitute.org/knowledge-hub").unwrap();
        let other = Url::parse("https://news.cornell.edu").unwrap();
        assert!(registry.lookup(&xed).is_some());
        assert!(registry.lookup(&other).is_none());
    }

    #[test]
    fn test_configured_override_deserializes() {
        let yaml = "host: news.example.edu\nrule: heading_cards\nheading: h4\n";
        let o: SourceOverride = serde_yaml::from_str(yaml).unwrap();
        let registry = OverrideRegistry::with_overrides(&[o]);
        let url = Url::parse("https://news.example.edu/").unwrap();
        assert_eq!(
            registry.lookup(&url),
            Some(&ExtractionRule::HeadingCards {
                heading: "h4".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_heading_selector_is_an_error() {
        let doc = Html::parse_document(XED_PAGE);
        let rule = ExtractionRule::HeadingCards {
            heading: "h5[".to_string(),
        };
        assert!(matches!(rule.extract(&doc, &base()), Err(GatherError::Selector(_))));
    }
}
