//! Candidate resolver: picks the single best catalog record for a query.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::SearchCandidate;
use crate::metrics::MATCH_SCORE;

use super::scorer::{CandidateScorer, ScoreBreakdown};
use super::MatchError;

/// Receives the resolver's decision trace. Diagnostic only.
pub trait DecisionObserver: Send + Sync {
    /// Called once per candidate, in input order.
    fn candidate_scored(
        &self,
        query: &str,
        index: usize,
        candidate: &SearchCandidate,
        breakdown: &ScoreBreakdown,
    );

    /// Called once with the winner.
    fn candidate_selected(
        &self,
        query: &str,
        candidate: &SearchCandidate,
        breakdown: &ScoreBreakdown,
        total: usize,
    );
}

/// Logs the decision trace through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DecisionObserver for TracingObserver {
    fn candidate_scored(
        &self,
        query: &str,
        index: usize,
        candidate: &SearchCandidate,
        breakdown: &ScoreBreakdown,
    ) {
        debug!(
            query,
            index,
            candidate = %candidate.name,
            catalog_id = candidate.id,
            score = breakdown.score,
            reasoning = %breakdown.reasoning(),
            "Scored candidate"
        );
    }

    fn candidate_selected(
        &self,
        query: &str,
        candidate: &SearchCandidate,
        breakdown: &ScoreBreakdown,
        total: usize,
    ) {
        info!(
            query,
            candidate = %candidate.name,
            catalog_id = candidate.id,
            score = format_args!("{:.2}", breakdown.score),
            total,
            "Best match selected"
        );
    }
}

/// Discards the decision trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DecisionObserver for NoopObserver {
    fn candidate_scored(&self, _: &str, _: usize, _: &SearchCandidate, _: &ScoreBreakdown) {}

    fn candidate_selected(&self, _: &str, _: &SearchCandidate, _: &ScoreBreakdown, _: usize) {}
}

/// Result of resolving a query against a candidate set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub query: String,
    /// The selected candidate.
    pub candidate: SearchCandidate,
    /// Position of the selected candidate in the input.
    pub selected_index: usize,
    /// One breakdown per input candidate, in input order.
    pub breakdowns: Vec<ScoreBreakdown>,
}

impl Resolution {
    /// Breakdown of the selected candidate.
    pub fn selected(&self) -> &ScoreBreakdown {
        &self.breakdowns[self.selected_index]
    }

    /// Final score of the selected candidate.
    pub fn score(&self) -> f32 {
        self.selected().score
    }
}

/// Selects the highest-scoring candidate.
///
/// Ties go to the candidate seen first. There is no minimum score: a lone
/// candidate that scores zero is still returned.
pub struct CandidateResolver {
    scorer: CandidateScorer,
    observer: Arc<dyn DecisionObserver>,
}

impl CandidateResolver {
    /// Create a resolver that logs its decisions via `tracing`.
    pub fn new(scorer: CandidateScorer) -> Self {
        Self {
            scorer,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the decision observer.
    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn scorer(&self) -> &CandidateScorer {
        &self.scorer
    }

    /// Resolve using the current wall clock.
    pub fn resolve(
        &self,
        query: &str,
        candidates: &[SearchCandidate],
    ) -> Result<Resolution, MatchError> {
        self.resolve_at(query, candidates, Utc::now())
    }

    /// Resolve as of `now`.
    pub fn resolve_at(
        &self,
        query: &str,
        candidates: &[SearchCandidate],
        now: DateTime<Utc>,
    ) -> Result<Resolution, MatchError> {
        if candidates.is_empty() {
            return Err(MatchError::NotFound {
                query: query.to_string(),
            });
        }

        let mut breakdowns = Vec::with_capacity(candidates.len());
        let mut best: Option<(usize, f32)> = None;

        for (index, candidate) in candidates.iter().enumerate() {
            let breakdown = self.scorer.score_at(query, candidate, now);
            self.observer
                .candidate_scored(query, index, candidate, &breakdown);

            // Strictly greater: the first of equal scores wins
            if best.map_or(true, |(_, score)| breakdown.score > score) {
                best = Some((index, breakdown.score));
            }
            breakdowns.push(breakdown);
        }

        let (selected_index, _) = best.ok_or_else(|| MatchError::NotFound {
            query: query.to_string(),
        })?;
        let candidate = candidates[selected_index].clone();

        self.observer.candidate_selected(
            query,
            &candidate,
            &breakdowns[selected_index],
            candidates.len(),
        );
        MATCH_SCORE.observe(breakdowns[selected_index].score as f64);

        Ok(Resolution {
            query: query.to_string(),
            candidate,
            selected_index,
            breakdowns,
        })
    }
}

impl Default for CandidateResolver {
    fn default() -> Self {
        Self::new(CandidateScorer::default())
    }
}
