//! Generic HTML news page scraping.
//!
//! News listing pages are scanned for anchors that look like article links:
//! either the `href` follows a known article path (`/news/`, `/stories/`,
//! `/blog/`, `/article/`, `/ideas/`, or a `/YYYY/MM/` date segment), or the
//! anchor sits directly inside an `h1`–`h5` heading.
//!
//! # URL Pattern
//!
//! Relative hrefs are resolved against the source's base URL, so
//! `/stories/2025/x` on `https://news.example.edu` becomes
//! `https://news.example.edu/stories/2025/x`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::NewsCandidate;
use crate::utils::collapse_whitespace;

/// Anchor text shorter than this is navigation, not a headline.
pub const MIN_TITLE_CHARS: usize = 10;

static ARTICLE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/news/|/stories/|/blog/|/article/|/ideas/|/\d{4}/\d{2}/").unwrap());

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

const HEADINGS: [&str; 5] = ["h1", "h2", "h3", "h4", "h5"];

/// Whether anchor text is worth keeping as a candidate title.
pub fn is_meaningful_title(title: &str) -> bool {
    title.chars().count() >= MIN_TITLE_CHARS && !title.eq_ignore_ascii_case("read more")
}

pub fn looks_like_article_path(href: &str) -> bool {
    ARTICLE_PATH.is_match(href)
}

/// Resolve `href` against `base`, dropping fragments-only, `mailto:` and
/// `javascript:` links.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("mailto:") || lower.starts_with("javascript:") || lower.starts_with("tel:") {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

/// The text of an element, whitespace-collapsed.
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn parent_is_heading(anchor: &ElementRef<'_>) -> bool {
    anchor
        .parent()
        .and_then(ElementRef::wrap)
        .map(|p| HEADINGS.contains(&p.value().name()))
        .unwrap_or(false)
}

/// Structural strategy: article-path anchors and anchors under headings.
pub fn extract_article_links(document: &Html, base: &Url) -> Vec<NewsCandidate> {
    let mut out = Vec::new();
    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let title = element_text(&anchor);
        if !is_meaningful_title(&title) {
            continue;
        }
        if !(looks_like_article_path(href) || parent_is_heading(&anchor)) {
            continue;
        }
        if let Some(link) = resolve_link(base, href) {
            out.push(NewsCandidate::new(title, link, ""));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <nav><a href="/about">About the university</a><a href="/news/">News</a></nav>
  <main>
    <div class="card"><a href="/stories/2025/05/faculty-award">Faculty member wins national award</a></div>
    <h3><a href="/features/lab-grant">New lab funded by research grant</a></h3>
    <a href="https://other.example.com/2025/04/partner-story">Partner school celebrates graduates</a>
    <a href="/stories/2025/05/faculty-award#comments">Read more</a>
    <a href="/events/open-house">Open house this weekend for families</a>
    <a href="mailto:news@example.edu">news@example.edu/news/contact</a>
  </main>
</body></html>"#;

    fn base() -> Url {
        Url::parse("https://news.example.edu").unwrap()
    }

    #[test]
    fn test_relative_link_resolution() {
        assert_eq!(
            resolve_link(&base(), "/stories/2025/x").as_deref(),
            Some("https://news.example.edu/stories/2025/x")
        );
        assert_eq!(
            resolve_link(&base(), "https://cdn.example.org/a").as_deref(),
            Some("https://cdn.example.org/a")
        );
        assert_eq!(resolve_link(&base(), "#top"), None);
        assert_eq!(resolve_link(&base(), "javascript:void(0)"), None);
    }

    #[test]
    fn test_article_path_patterns() {
        assert!(looks_like_article_path("/news/item"));
        assert!(looks_like_article_path("/ideas/leadership"));
        assert!(looks_like_article_path("https://x.edu/2024/11/story"));
        assert!(!looks_like_article_path("/events/open-house"));
        assert!(!looks_like_article_path("/2024/story"));
    }

    #[test]
    fn test_title_filter() {
        assert!(!is_meaningful_title("News"));
        assert!(!is_meaningful_title("Read More"));
        assert!(is_meaningful_title("Faculty member wins"));
    }

    #[test]
    fn test_extract_article_links() {
        let doc = Html::parse_document(PAGE);
        let links = extract_article_links(&doc, &base());
        let titles: Vec<&str> = links.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            [
                "Faculty member wins national award",
                "New lab funded by research grant",
                "Partner school celebrates graduates",
            ]
        );
        assert_eq!(links[0].link, "https://news.example.edu/stories/2025/05/faculty-award");
        assert_eq!(links[1].link, "https://news.example.edu/features/lab-grant");
    }
}
