//! Per-cohort news gathering.
//!
//! One run walks a fixed sequence of phases:
//!
//! ```text
//! Idle -> FacultySweep -> UniversitySweep -> ParticipantSweep -> Done
//! ```
//!
//! Within a sweep, entities are processed one at a time in roster order:
//! search, enrich each surviving candidate, persist, then pause before the
//! next entity. Sweeps are sequential on purpose so that the pace of calls to
//! the scraped sites and the rate-limited search API stays predictable.
//!
//! # Failure Handling
//!
//! A run never fails. An error while handling one entity becomes a
//! human-readable entry in [`CohortGatherResult::errors`] and the sweep moves
//! on; a failed save is logged and the candidate is dropped.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::dedup::{DedupPolicy, deduplicate};
use crate::collaborators::{NewsStore, RosterSource};
use crate::config::Pacing;
use crate::enricher::ContentEnricher;
use crate::error::GatherError;
use crate::http::PageFetcher;
use crate::models::{
    Cohort, CohortGatherResult, EnrichedCandidate, EntityRef, EntityType, NewsRecord, RelevantCandidate,
    SourceDescriptor, SweepResult,
};
use crate::relevance::{KeywordVocabulary, filter_good_news};
use crate::scrapers::SourceFetcher;
use crate::scrapers::overrides::OverrideRegistry;
use crate::search::SearchApi;
use crate::search::adapters::EntitySearch;

/// Phases of a cohort run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FacultySweep,
    UniversitySweep,
    ParticipantSweep,
    Done,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Idle => Phase::FacultySweep,
            Phase::FacultySweep => Phase::UniversitySweep,
            Phase::UniversitySweep => Phase::ParticipantSweep,
            Phase::ParticipantSweep | Phase::Done => Phase::Done,
        }
    }
}

/// The time window a run gathers news for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatherWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl GatherWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The week ending at `now`.
    pub fn last_week(now: DateTime<Utc>) -> Self {
        Self::new(now - chrono::Duration::days(7), now)
    }

    /// Whole days from the window start to `now`, rounded up.
    pub fn days_back(&self, now: DateTime<Utc>) -> i64 {
        let secs = (now - self.start).num_seconds().max(0);
        (secs + 86_399) / 86_400
    }
}

/// Drives cohort runs over injected collaborators.
pub struct Orchestrator<S, N, F> {
    search: EntitySearch<S>,
    store: N,
    fetcher: F,
    enricher: ContentEnricher,
    pacing: Pacing,
    cancel: CancelToken,
}

impl<S, N, F> Orchestrator<S, N, F>
where
    S: SearchApi,
    N: NewsStore,
    F: PageFetcher,
{
    pub fn new(
        search: EntitySearch<S>,
        store: N,
        fetcher: F,
        enricher: ContentEnricher,
        pacing: Pacing,
    ) -> Self {
        Self {
            search,
            store,
            fetcher,
            enricher,
            pacing,
            cancel: CancelToken::never(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &N {
        &self.store
    }

    /// Run every active cohort in roster order.
    #[instrument(level = "info", skip_all)]
    pub async fn gather_active<R: RosterSource>(
        &self,
        roster: &R,
        window: GatherWindow,
    ) -> Vec<(String, CohortGatherResult)> {
        let cohorts = match roster.active_cohorts(Utc::now()).await {
            Ok(cohorts) => cohorts,
            Err(e) => {
                error!(error = %e, "Roster lookup failed; nothing to gather");
                return Vec::new();
            }
        };
        info!(count = cohorts.len(), "Gathering news for active cohorts");

        let mut results = Vec::with_capacity(cohorts.len());
        for cohort in &cohorts {
            if self.cancel.is_cancelled() {
                warn!("Run cancelled; skipping remaining cohorts");
                break;
            }
            let result = self.gather_news_for_cohort(cohort, window).await;
            results.push((cohort.id.clone(), result));
        }
        results
    }

    /// Gather faculty, university and participant news for one cohort.
    ///
    /// # Arguments
    ///
    /// * `cohort` - Roster of faculty and participants, plus the program's
    ///   academic partner
    /// * `window` - Gathering window; its length sets the search recency
    ///
    /// # Returns
    ///
    /// Saved counts per entity type and one message per failed entity. A
    /// cancelled run adds a single `"run cancelled"` entry and keeps the
    /// counts gathered so far.
    #[instrument(level = "info", skip_all, fields(cohort = %cohort.label()))]
    pub async fn gather_news_for_cohort(&self, cohort: &Cohort, window: GatherWindow) -> CohortGatherResult {
        let mut result = CohortGatherResult::default();
        let days_back = window.days_back(Utc::now());
        let partner = cohort.program.academic_partner.as_ref();
        let mut phase = Phase::Idle;

        info!(
            days_back,
            faculty = cohort.faculty.len(),
            participants = cohort.participants.len(),
            has_partner = partner.is_some(),
            "Gathering news for cohort"
        );

        let mut cancelled = false;
        while !cancelled {
            phase = phase.next();
            if phase == Phase::Done {
                break;
            }
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            debug!(?phase, "Entering phase");
            match phase {
                Phase::FacultySweep => {
                    let mut seen = HashSet::new();
                    for faculty in &cohort.faculty {
                        let outcome = async {
                            let found = self
                                .search
                                .search_faculty_news(faculty, partner.map(|p| p.name.as_str()), days_back)
                                .await?;
                            Ok::<_, GatherError>(self
                                .persist(found, EntityRef::Faculty(faculty.id.clone()), Some(cohort.id.as_str()), &mut seen)
                                .await)
                        }
                        .await;
                        if !self
                            .settle(&mut result, EntityType::Faculty, &faculty.name, outcome, self.pacing.faculty_delay())
                            .await
                        {
                            cancelled = true;
                            break;
                        }
                    }
                }
                Phase::UniversitySweep => {
                    if let Some(university) = partner {
                        let mut seen = HashSet::new();
                        let outcome = async {
                            let found = self.search.search_university_news(university, days_back).await?;
                            Ok::<_, GatherError>(self
                                .persist(found, EntityRef::University(university.id.clone()), Some(cohort.id.as_str()), &mut seen)
                                .await)
                        }
                        .await;
                        cancelled = !self
                            .settle(
                                &mut result,
                                EntityType::University,
                                &university.name,
                                outcome,
                                self.pacing.university_delay(),
                            )
                            .await;
                    }
                }
                Phase::ParticipantSweep => {
                    let mut seen = HashSet::new();
                    for participant in &cohort.participants {
                        let outcome = async {
                            let found = self.search.search_participant_news(participant, days_back).await?;
                            Ok::<_, GatherError>(self
                                .persist(
                                    found,
                                    EntityRef::Participant(participant.id.clone()),
                                    Some(cohort.id.as_str()),
                                    &mut seen,
                                )
                                .await)
                        }
                        .await;
                        if !self
                            .settle(
                                &mut result,
                                EntityType::Participant,
                                &participant.name,
                                outcome,
                                self.pacing.participant_delay(),
                            )
                            .await
                        {
                            cancelled = true;
                            break;
                        }
                    }
                }
                Phase::Idle | Phase::Done => {}
            }
        }
        if cancelled {
            warn!(?phase, "Run cancelled; returning partial result");
            result.errors.push(GatherError::Cancelled.to_string());
        }

        info!(
            faculty = result.facultyNewsCount,
            university = result.universityNewsCount,
            participants = result.participantNewsCount,
            errors = result.errors.len(),
            "Completed cohort"
        );
        result
    }

    /// Read one entity's configured sources, keep the unique good news and
    /// persist it.
    #[instrument(level = "info", skip_all, fields(entity = %entity.entity_type(), sources = sources.len()))]
    pub async fn sweep_sources(
        &self,
        sources: &[SourceDescriptor],
        base_url: Option<&str>,
        overrides: &OverrideRegistry,
        vocabulary: &KeywordVocabulary,
        entity: EntityRef,
        cohort_id: Option<&str>,
    ) -> SweepResult {
        let raw = SourceFetcher::new(&self.fetcher, overrides)
            .with_cancel(self.cancel.clone())
            .fetch_all(sources, base_url, self.pacing.source_delay())
            .await;
        let unique = deduplicate(raw, DedupPolicy::links_only());
        let relevant = filter_good_news(unique, vocabulary);
        info!(relevant = relevant.len(), "Filtered source candidates");
        self.persist(relevant, entity, cohort_id, &mut HashSet::new()).await
    }

    /// Fold one entity's outcome into the result and pause. Returns `false`
    /// when the run was cancelled during the pause.
    async fn settle(
        &self,
        result: &mut CohortGatherResult,
        entity_type: EntityType,
        name: &str,
        outcome: Result<SweepResult, GatherError>,
        delay: Duration,
    ) -> bool {
        match outcome {
            Ok(sweep) => {
                if sweep.saved_count > 0 {
                    info!(%entity_type, %name, saved = sweep.saved_count, "Found news items");
                }
                result.record(entity_type, sweep);
            }
            Err(e) => {
                let msg = format!("Error gathering news for {entity_type} {name}: {e}");
                error!(%entity_type, %name, error = %e, "Entity failed; continuing sweep");
                result.errors.push(msg);
            }
        }
        self.cancel.sleep(delay).await
    }

    /// Enrich each candidate and hand it to the store. Links already saved
    /// for this entity type in this run are skipped.
    async fn persist(
        &self,
        found: Vec<RelevantCandidate>,
        entity: EntityRef,
        cohort_id: Option<&str>,
        seen: &mut HashSet<String>,
    ) -> SweepResult {
        let mut saved = SweepResult::default();
        for relevant in found {
            if self.cancel.is_cancelled() {
                break;
            }
            if seen.contains(&relevant.candidate.link) {
                debug!(url = %relevant.candidate.link, "Already saved in this run; skipping");
                continue;
            }
            let enriched = self.enrich(relevant).await;
            let record = NewsRecord {
                entity: entity.clone(),
                sourceUrl: enriched.candidate.link.clone(),
                title: enriched.candidate.title.clone(),
                content: enriched.content,
                summary: None,
                publishedAt: enriched.candidate.published_at,
                cohortId: cohort_id.map(str::to_string),
                keywords: enriched.matched_keywords,
            };
            match self.store.save_news_item(&record).await {
                Ok(id) => {
                    debug!(%id, url = %record.sourceUrl, "Saved news item");
                    seen.insert(record.sourceUrl);
                    saved.saved_count += 1;
                }
                Err(e) => error!(url = %record.sourceUrl, error = %e, "Failed to save news item"),
            }
        }
        saved
    }

    /// Fetched content when available, otherwise the bounded snippet.
    async fn enrich(&self, relevant: RelevantCandidate) -> EnrichedCandidate {
        let excerpt = self.enricher.enrich(&self.fetcher, &relevant.candidate.link).await;
        let snippet = &relevant.candidate.summary;
        let fallback = if snippet.chars().count() > self.enricher.cap() {
            self.enricher.bound(snippet)
        } else {
            snippet.clone()
        };
        EnrichedCandidate {
            content: excerpt.text_or(fallback),
            candidate: relevant.candidate,
            matched_keywords: relevant.matched_keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_phase_order() {
        let mut phase = Phase::Idle;
        let mut seen = vec![phase];
        while phase != Phase::Done {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            [
                Phase::Idle,
                Phase::FacultySweep,
                Phase::UniversitySweep,
                Phase::ParticipantSweep,
                Phase::Done
            ]
        );
        assert_eq!(Phase::Done.next(), Phase::Done);
    }

    #[test]
    fn test_days_back_rounds_up() {
        let now = Utc.with_ymd_and_hms(2025, 5, 8, 12, 0, 0).unwrap();
        let window = GatherWindow::new(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(), now);
        assert_eq!(window.days_back(now), 8);
        assert_eq!(GatherWindow::last_week(now).days_back(now), 7);
        assert_eq!(GatherWindow::new(now, now).days_back(now), 0);
    }
}
