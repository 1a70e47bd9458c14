//! Scoring configuration.

use serde::{Deserialize, Serialize};

/// Immutable configuration for the candidate scorer.
///
/// Every constant the scorer uses lives here so tests and deployments can
/// swap them without touching the algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Case-insensitive exact name match.
    pub exact_score: f32,
    /// Query is a prefix of the candidate name.
    pub prefix_score: f32,
    /// Candidate name contains the query elsewhere.
    pub contains_score: f32,
    /// Candidate name is contained in the query.
    pub contained_in_score: f32,
    /// Word-overlap fraction must exceed this to count at all.
    pub word_overlap_threshold: f32,
    /// Multiplier applied to a qualifying word-overlap fraction.
    pub word_overlap_weight: f32,

    /// Recency bonus for releases within two years of now.
    pub recency_max_bonus: f32,
    /// Recency bonus at the middle band boundary (2 years ahead, 5 years ago).
    pub recency_mid_bonus: f32,
    /// Recency bonus far from now (more than 2 years ahead, 10 years ago).
    pub recency_floor_bonus: f32,

    /// Additive bonus for main-game records.
    pub main_game_bonus: f32,
    /// Releases before this year are penalized.
    pub old_release_year: i32,
    /// Multiplier applied to old releases.
    pub old_release_factor: f32,

    /// Markers of collections, editions and bundles.
    pub noise_keywords: Vec<String>,
    /// Multiplier applied when a noise keyword is present.
    pub noise_keyword_factor: f32,
    /// Require alphanumeric keywords to match a whole word instead of any
    /// substring of the name. Symbol keywords always match anywhere.
    pub whole_word_keywords: bool,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            exact_score: 1.0,
            prefix_score: 0.9,
            contains_score: 0.8,
            contained_in_score: 0.7,
            word_overlap_threshold: 0.5,
            // Keeps partial word matches below full containment
            word_overlap_weight: 0.6,
            recency_max_bonus: 0.2,
            recency_mid_bonus: 0.1,
            recency_floor_bonus: 0.05,
            main_game_bonus: 0.1,
            old_release_year: 2010,
            old_release_factor: 0.5,
            noise_keywords: default_noise_keywords(),
            noise_keyword_factor: 0.3,
            whole_word_keywords: false,
        }
    }
}

fn default_noise_keywords() -> Vec<String> {
    [
        "pack",
        "collection",
        "bundle",
        "double",
        "triple",
        "quadruple",
        "complete",
        "ultimate",
        "deluxe",
        "edition",
        "remastered",
        "remaster",
        "definitive",
        "anniversary",
        "gold",
        "platinum",
        "plus",
        "+",
        "&",
        "with",
        "featuring",
        "including",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
