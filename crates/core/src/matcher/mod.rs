//! Candidate matching.
//!
//! Turns a noisy release title into the single best catalog record. The
//! [`CandidateScorer`] is a pure function of (query, candidate, now); the
//! [`CandidateResolver`] runs it over a result set and reports its decision
//! through a [`DecisionObserver`].

mod config;
mod resolver;
mod scorer;

pub use config::ScorerConfig;
pub use resolver::{
    CandidateResolver, DecisionObserver, NoopObserver, Resolution, TracingObserver,
};
pub use scorer::{normalize, CandidateScorer, MatchKind, ScoreBreakdown};

use thiserror::Error;

/// Errors from candidate resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The catalog returned nothing to choose from.
    #[error("no catalog candidates for '{query}'")]
    NotFound { query: String },
}
