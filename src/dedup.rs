//! Within-run deduplication.
//!
//! Candidates are collapsed by link first. Entity-wide site sweeps also
//! collapse by title, so the same story reached through two sources is kept
//! once. In both passes the first occurrence in processing order wins.

use itertools::Itertools;

use crate::models::{NewsCandidate, RelevantCandidate};

/// Anything that carries a link and a title.
pub trait Dedupable {
    fn link(&self) -> &str;
    fn title(&self) -> &str;
}

impl Dedupable for NewsCandidate {
    fn link(&self) -> &str {
        &self.link
    }

    fn title(&self) -> &str {
        &self.title
    }
}

impl Dedupable for RelevantCandidate {
    fn link(&self) -> &str {
        &self.candidate.link
    }

    fn title(&self) -> &str {
        &self.candidate.title
    }
}

/// How a call site deduplicates its candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupPolicy {
    pub by_title: bool,
    pub cap: Option<usize>,
}

impl DedupPolicy {
    pub fn links_only() -> Self {
        Self::default()
    }

    /// Link and title passes, capped at `cap` results.
    pub fn site_sweep(cap: usize) -> Self {
        Self {
            by_title: true,
            cap: Some(cap),
        }
    }
}

pub fn dedup_by_link<T: Dedupable>(items: Vec<T>) -> Vec<T> {
    items
        .into_iter()
        .unique_by(|item| item.link().to_string())
        .collect()
}

pub fn dedup_by_title<T: Dedupable>(items: Vec<T>) -> Vec<T> {
    items
        .into_iter()
        .unique_by(|item| item.title().to_string())
        .collect()
}

pub fn deduplicate<T: Dedupable>(items: Vec<T>, policy: DedupPolicy) -> Vec<T> {
    let mut out = dedup_by_link(items);
    if policy.by_title {
        out = dedup_by_title(out);
    }
    if let Some(cap) = policy.cap {
        out.truncate(cap);
    }
    out
}
