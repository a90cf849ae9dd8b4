//! Keyword relevance filter.
//!
//! A candidate is "good news" when its title and summary contain at least one
//! term of a fixed vocabulary (case-insensitive substring match). Vocabularies
//! are passed in per call site; there is no weighting, stemming or negation
//! handling, so "lost the award" still matches `award`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collaborators::ProfileTextExtractor;
use crate::error::GatherError;
use crate::models::{NewsCandidate, RelevantCandidate};

/// An ordered, duplicate-free list of lowercase keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordVocabulary {
    terms: Vec<String>,
}

impl KeywordVocabulary {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for term in terms {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && !out.contains(&term) {
                out.push(term);
            }
        }
        Self { terms: out }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms present in `text`, in vocabulary order.
    pub fn matches(&self, text: &str) -> Vec<String> {
        match_keywords(text, self)
    }

    pub fn is_good_news(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.terms.iter().any(|t| lower.contains(t.as_str()))
    }
}

impl From<Vec<String>> for KeywordVocabulary {
    fn from(terms: Vec<String>) -> Self {
        KeywordVocabulary::new(terms)
    }
}

impl From<KeywordVocabulary> for Vec<String> {
    fn from(v: KeywordVocabulary) -> Self {
        v.terms
    }
}

/// Case-insensitive substring match of every vocabulary term against `text`.
pub fn match_keywords(text: &str, vocabulary: &KeywordVocabulary) -> Vec<String> {
    let lower = text.to_lowercase();
    vocabulary
        .terms
        .iter()
        .filter(|t| lower.contains(t.as_str()))
        .cloned()
        .collect()
}

/// Keep the candidates whose title and summary match the vocabulary.
pub fn filter_good_news(
    candidates: Vec<NewsCandidate>,
    vocabulary: &KeywordVocabulary,
) -> Vec<RelevantCandidate> {
    let total = candidates.len();
    let kept: Vec<RelevantCandidate> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let matched = vocabulary.matches(&candidate.relevance_text());
            if matched.is_empty() {
                None
            } else {
                Some(RelevantCandidate {
                    candidate,
                    matched_keywords: matched,
                })
            }
        })
        .collect();
    debug!(total, kept = kept.len(), "Applied keyword filter");
    kept
}

/// Extract a profile's text through the collaborator and match it.
pub async fn scan_profile<P: ProfileTextExtractor>(
    extractor: &P,
    source: &str,
    vocabulary: &KeywordVocabulary,
) -> Result<Vec<String>, GatherError> {
    let text = extractor.extract_text(source).await?;
    Ok(vocabulary.matches(&text))
}
