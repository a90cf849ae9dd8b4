//! RSS feed parsing.
//!
//! Feeds are deserialized with `quick-xml`'s serde support. Each `<item>` with
//! both a title and a link becomes a [`NewsCandidate`]; the summary is the
//! tag-stripped `<description>`, falling back to `<content:encoded>`.

use once_cell::sync::Lazy;
use quick_xml::escape::{escape, resolve_html5_entity};
use regex::{Captures, Regex};
use scraper::Html;
use serde::Deserialize;
use std::borrow::Cow;
use tracing::debug;
use url::Url;

use crate::error::GatherError;
use crate::models::{NewsCandidate, parse_timestamp};
use crate::scrapers::html::{is_meaningful_title, resolve_link};
use crate::utils::collapse_whitespace;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "content:encoded", alias = "encoded")]
    content: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Text content of an HTML fragment, whitespace-collapsed.
fn strip_tags(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    collapse_whitespace(&doc.root_element().text().collect::<Vec<_>>().join(" "))
}

static NAMED_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());

/// Rewrite HTML named entities, which XML does not declare, into text the
/// XML parser accepts. The five XML entities pass through untouched; an
/// unknown name is escaped so it survives as literal text.
fn decode_html_entities(xml: &str) -> Cow<'_, str> {
    NAMED_ENTITY.replace_all(xml, |caps: &Captures| {
        let name = &caps[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return caps[0].to_string();
        }
        match resolve_html5_entity(name) {
            Some(text) => escape(text).into_owned(),
            None => format!("&amp;{name};"),
        }
    })
}

/// Parse an RSS document into candidates, resolving links against `base`.
///
/// Items without a title or link, or whose title is too short or boilerplate,
/// are skipped. A malformed document is an error; the caller decides whether
/// that aborts anything.
pub fn parse_feed(xml: &str, base: &Url) -> Result<Vec<NewsCandidate>, GatherError> {
    let rss: Rss = quick_xml::de::from_str(&decode_html_entities(xml))?;
    let total = rss.channel.items.len();

    let candidates: Vec<NewsCandidate> = rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let title = collapse_whitespace(item.title.as_deref()?);
            let href = item.link.as_deref()?.trim().to_string();
            if href.is_empty() || !is_meaningful_title(&title) {
                return None;
            }
            let link = resolve_link(base, &href)?;
            let summary = item
                .description
                .as_deref()
                .or(item.content.as_deref())
                .map(strip_tags)
                .unwrap_or_default();
            Some(NewsCandidate {
                title,
                link,
                summary,
                published_at: item.pub_date.as_deref().and_then(parse_timestamp),
            })
        })
        .collect();

    debug!(total, kept = candidates.len(), "Parsed RSS feed");
    Ok(candidates)
}
