//! Heuristic candidate scorer.
//!
//! Scores a catalog record against a noisy query string. Pure and
//! deterministic: the only time input is the explicit `now` argument.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{GameCategory, SearchCandidate};

use super::config::ScorerConfig;

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 60.0 * 60.0;

/// How the candidate name relates to the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix,
    Contains,
    ContainedInQuery,
    WordOverlap,
    None,
}

/// Full breakdown of one candidate's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub match_kind: MatchKind,
    /// Textual score before modifiers.
    pub base: f32,
    pub recency_bonus: f32,
    pub category_bonus: f32,
    pub old_release_penalty: bool,
    /// The first noise keyword found in the name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_keyword: Option<String>,
    /// Final score in [0, 1].
    pub score: f32,
}

impl ScoreBreakdown {
    fn unmatched() -> Self {
        Self {
            match_kind: MatchKind::None,
            base: 0.0,
            recency_bonus: 0.0,
            category_bonus: 0.0,
            old_release_penalty: false,
            noise_keyword: None,
            score: 0.0,
        }
    }

    /// Human-readable summary of the score.
    pub fn reasoning(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        parts.push(match self.match_kind {
            MatchKind::Exact => "exact name match".to_string(),
            MatchKind::Prefix => "query starts the name".to_string(),
            MatchKind::Contains => "name contains query".to_string(),
            MatchKind::ContainedInQuery => "query contains name".to_string(),
            MatchKind::WordOverlap => format!("word overlap ({:.2})", self.base),
            MatchKind::None => "no textual match".to_string(),
        });

        if self.recency_bonus > 0.0 {
            parts.push(format!("recency +{:.3}", self.recency_bonus));
        }
        if self.category_bonus > 0.0 {
            parts.push(format!("main game +{:.2}", self.category_bonus));
        }
        if self.old_release_penalty {
            parts.push("old release".to_string());
        }
        if let Some(keyword) = &self.noise_keyword {
            parts.push(format!("noise keyword '{}'", keyword));
        }

        parts.join(", ")
    }
}

/// Scores catalog candidates against a query.
#[derive(Debug, Clone, Default)]
pub struct CandidateScorer {
    config: ScorerConfig,
}

impl CandidateScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score using the current wall clock.
    pub fn score(&self, query: &str, candidate: &SearchCandidate) -> ScoreBreakdown {
        self.score_at(query, candidate, Utc::now())
    }

    /// Score a candidate as of `now`.
    pub fn score_at(
        &self,
        query: &str,
        candidate: &SearchCandidate,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let query = normalize(query);
        let name = normalize(&candidate.name);

        let (match_kind, base) = self.base_match(&query, &name);
        if base <= 0.0 {
            return ScoreBreakdown::unmatched();
        }

        let recency_bonus = self.recency_bonus(candidate.first_release_date, now);
        let category_bonus = if candidate.category == GameCategory::MainGame {
            self.config.main_game_bonus
        } else {
            0.0
        };

        let mut score = base + recency_bonus + category_bonus;

        let old_release_penalty = candidate
            .release_date()
            .map(|date| date.year() < self.config.old_release_year)
            .unwrap_or(false);
        if old_release_penalty {
            score *= self.config.old_release_factor;
        }

        let noise_keyword = self.noise_keyword(&name).map(str::to_string);
        if noise_keyword.is_some() {
            score *= self.config.noise_keyword_factor;
        }

        ScoreBreakdown {
            match_kind,
            base,
            recency_bonus,
            category_bonus,
            old_release_penalty,
            noise_keyword,
            score: score.clamp(0.0, 1.0),
        }
    }

    /// Textual score of normalized strings.
    fn base_match(&self, query: &str, name: &str) -> (MatchKind, f32) {
        if query.is_empty() || name.is_empty() {
            return (MatchKind::None, 0.0);
        }

        if name == query {
            return (MatchKind::Exact, self.config.exact_score);
        }
        if name.starts_with(query) {
            return (MatchKind::Prefix, self.config.prefix_score);
        }
        if name.contains(query) {
            return (MatchKind::Contains, self.config.contains_score);
        }
        if query.contains(name) {
            return (MatchKind::ContainedInQuery, self.config.contained_in_score);
        }

        let name_words: Vec<&str> = name.split_whitespace().collect();
        let query_words: Vec<&str> = query.split_whitespace().collect();
        let matched = query_words
            .iter()
            .filter(|word| name_words.contains(word))
            .count();

        let fraction = matched as f32 / query_words.len() as f32;
        if fraction > self.config.word_overlap_threshold {
            (MatchKind::WordOverlap, fraction * self.config.word_overlap_weight)
        } else {
            (MatchKind::None, 0.0)
        }
    }

    /// Additive bonus for releases close to `now`, in either direction.
    ///
    /// Unknown release dates (timestamp 0) get no bonus.
    pub fn recency_bonus(&self, release_timestamp: i64, now: DateTime<Utc>) -> f32 {
        if release_timestamp == 0 {
            return 0.0;
        }

        let max = self.config.recency_max_bonus as f64;
        let mid = self.config.recency_mid_bonus as f64;
        let floor = self.config.recency_floor_bonus as f64;

        let delta_years = (release_timestamp - now.timestamp()) as f64 / SECONDS_PER_YEAR;

        let bonus = if delta_years > 0.0 {
            // Upcoming release
            if delta_years <= 1.0 {
                max
            } else if delta_years <= 2.0 {
                max - (max - mid) * (delta_years - 1.0)
            } else {
                floor
            }
        } else {
            let years_ago = -delta_years;
            if years_ago <= 2.0 {
                max
            } else if years_ago <= 5.0 {
                max - (max - mid) * (years_ago - 2.0) / 3.0
            } else if years_ago <= 10.0 {
                mid - (mid - floor) * (years_ago - 5.0) / 5.0
            } else {
                floor
            }
        };

        bonus as f32
    }

    /// First configured noise keyword present in a normalized name.
    ///
    /// Keywords match as substrings unless `whole_word_keywords` is set, in
    /// which case alphanumeric keywords must match a whole word.
    fn noise_keyword<'a>(&'a self, name: &str) -> Option<&'a str> {
        let words: Vec<&str> = if self.config.whole_word_keywords {
            name.split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        self.config
            .noise_keywords
            .iter()
            .map(String::as_str)
            .find(|keyword| {
                if self.config.whole_word_keywords && keyword.chars().all(char::is_alphanumeric) {
                    words.contains(keyword)
                } else {
                    name.contains(keyword)
                }
            })
    }
}

/// Trim and case-fold.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{candidate, timestamp, NOW};

    fn scorer() -> CandidateScorer {
        CandidateScorer::default()
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(NOW, 0).unwrap()
    }

    #[test]
    fn test_base_match_kinds() {
        let scorer = scorer();
        assert_eq!(scorer.base_match("subnautica", "subnautica"), (MatchKind::Exact, 1.0));
        assert_eq!(
            scorer.base_match("subnautica", "subnautica below zero"),
            (MatchKind::Prefix, 0.9)
        );
        assert_eq!(
            scorer.base_match("below zero", "subnautica below zero"),
            (MatchKind::Contains, 0.8)
        );
        assert_eq!(
            scorer.base_match("subnautica gog repack", "subnautica"),
            (MatchKind::ContainedInQuery, 0.7)
        );
    }

    #[test]
    fn test_word_overlap_threshold() {
        let scorer = scorer();

        let (kind, base) = scorer.base_match("wild hunt", "the witcher 3: wild hunt");
        assert_eq!(kind, MatchKind::Contains);
        assert_eq!(base, 0.8);

        // All query words present, out of order
        let (kind, base) = scorer.base_match("hunt wild witcher", "the witcher 3: wild hunt");
        assert_eq!(kind, MatchKind::WordOverlap);
        assert!((base - 0.6).abs() < 1e-6, "got {}", base);

        // 2 of 3 query words present
        let (kind, base) = scorer.base_match("hunt witcher zzz", "the witcher 3: wild hunt");
        assert_eq!(kind, MatchKind::WordOverlap);
        assert!((base - 0.4).abs() < 1e-6, "got {}", base);

        // Exactly half is not enough
        let (kind, base) = scorer.base_match("witcher zzz", "the witcher 3");
        assert_eq!(kind, MatchKind::None);
        assert_eq!(base, 0.0);
    }

    #[test]
    fn test_normalization_is_case_and_whitespace_insensitive() {
        let scorer = scorer();
        let c = candidate(1, "Hollow Knight", timestamp(2017, 2, 24));
        let a = scorer.score_at("  HOLLOW knight ", &c, now());
        assert_eq!(a.match_kind, MatchKind::Exact);
    }

    #[test]
    fn test_empty_query_never_matches() {
        let scorer = scorer();
        let c = candidate(1, "Hollow Knight", timestamp(2017, 2, 24));
        let breakdown = scorer.score_at("   ", &c, now());
        assert_eq!(breakdown.match_kind, MatchKind::None);
        assert_eq!(breakdown.score, 0.0);
    }

    #[test]
    fn test_recency_bands() {
        let scorer = scorer();
        let now = now();
        let years = |y: f64| NOW + (y * SECONDS_PER_YEAR) as i64;

        assert_eq!(scorer.recency_bonus(0, now), 0.0);
        assert_eq!(scorer.recency_bonus(years(0.5), now), 0.2);
        assert!((scorer.recency_bonus(years(1.5), now) - 0.15).abs() < 1e-4);
        assert_eq!(scorer.recency_bonus(years(3.0), now), 0.05);
        assert_eq!(scorer.recency_bonus(years(-1.0), now), 0.2);
        assert!((scorer.recency_bonus(years(-3.5), now) - 0.15).abs() < 1e-4);
        assert!((scorer.recency_bonus(years(-5.0), now) - 0.1).abs() < 1e-4);
        assert!((scorer.recency_bonus(years(-7.5), now) - 0.075).abs() < 1e-4);
        assert_eq!(scorer.recency_bonus(years(-20.0), now), 0.05);
    }

    #[test]
    fn test_recency_monotonic_with_distance() {
        let scorer = scorer();
        let now = now();
        let step = SECONDS_PER_YEAR / 12.0;

        let mut previous = f32::MAX;
        for month in 0..=180 {
            let bonus = scorer.recency_bonus(NOW - (month as f64 * step) as i64 - 1, now);
            assert!(bonus <= previous, "past bonus rose at month {}", month);
            previous = bonus;
        }

        let mut previous = f32::MAX;
        for month in 1..=60 {
            let bonus = scorer.recency_bonus(NOW + (month as f64 * step) as i64, now);
            assert!(bonus <= previous, "future bonus rose at month {}", month);
            previous = bonus;
        }
    }

    #[test]
    fn test_score_stays_in_unit_range() {
        let scorer = scorer();
        let now = now();
        let names = ["Doom", "Doom Eternal", "DOOM 64", "Doom & Destiny", "Ultimate Doom"];
        let queries = ["doom", "doom eternal repack", "", "eternal doom", "x"];
        let dates = [0, timestamp(1993, 12, 10), timestamp(2020, 3, 20), NOW + 1000];

        for name in names {
            for date in dates {
                let c = candidate(1, name, date);
                for query in queries {
                    let s = scorer.score_at(query, &c, now).score;
                    assert!((0.0..=1.0).contains(&s), "{} / {} -> {}", query, name, s);
                }
            }
        }
    }

    #[test]
    fn test_bonuses_are_clamped() {
        let scorer = scorer();
        let c = candidate(1, "Hades II", NOW - 1000);
        let breakdown = scorer.score_at("hades ii", &c, now());
        assert_eq!(breakdown.match_kind, MatchKind::Exact);
        assert_eq!(breakdown.recency_bonus, 0.2);
        assert_eq!(breakdown.score, 1.0);
    }

    #[test]
    fn test_old_release_penalty() {
        let scorer = scorer();
        let c = candidate(1, "Doom", timestamp(1993, 12, 10));
        let breakdown = scorer.score_at("doom", &c, now());
        assert!(breakdown.old_release_penalty);
        // (1.0 + 0.05 + 0.1) * 0.5
        assert!((breakdown.score - 0.575).abs() < 1e-4, "got {}", breakdown.score);
    }

    #[test]
    fn test_unknown_date_is_not_old() {
        let scorer = scorer();
        let c = candidate(1, "Doom", 0);
        let breakdown = scorer.score_at("doom", &c, now());
        assert!(!breakdown.old_release_penalty);
        assert_eq!(breakdown.recency_bonus, 0.0);
        assert_eq!(breakdown.score, 1.0);
    }

    #[test]
    fn test_noise_keyword_penalty() {
        let scorer = scorer();
        let date = timestamp(2023, 9, 26);
        let plain = candidate(1, "Cyberpunk 2077 Phantom Liberty", date);
        let noisy = candidate(2, "Cyberpunk 2077 Ultimate Edition", date);

        let plain_score = scorer.score_at("cyberpunk 2077", &plain, now());
        let noisy_score = scorer.score_at("cyberpunk 2077", &noisy, now());

        assert_eq!(plain_score.match_kind, noisy_score.match_kind);
        assert_eq!(noisy_score.noise_keyword.as_deref(), Some("ultimate"));
        assert!(noisy_score.score < plain_score.score);
    }

    #[test]
    fn test_noise_keyword_matches_substrings() {
        let scorer = scorer();
        assert_eq!(scorer.noise_keyword("goldeneye 007"), Some("gold"));
        assert_eq!(scorer.noise_keyword("packmaster"), Some("pack"));
        assert_eq!(scorer.noise_keyword("surplus simulator"), Some("plus"));
        assert_eq!(scorer.noise_keyword("hollow knight"), None);
        assert_eq!(scorer.noise_keyword("ratchet & clank"), Some("&"));
        // Scanning stops at the first configured keyword
        assert_eq!(scorer.noise_keyword("complete collection"), Some("collection"));
    }

    #[test]
    fn test_substring_keyword_penalizes_exact_match() {
        let scorer = scorer();
        let game = candidate(1, "GoldenEye 007", timestamp(2023, 1, 1));

        let noisy = scorer.score_at("goldeneye 007", &game, now());

        assert_eq!(noisy.match_kind, MatchKind::Exact);
        assert_eq!(noisy.noise_keyword.as_deref(), Some("gold"));
        let unpenalized = noisy.base + noisy.recency_bonus + noisy.category_bonus;
        assert!((noisy.score - unpenalized * 0.3).abs() < 1e-6);
        assert!(noisy.score < 0.5);
    }

    #[test]
    fn test_whole_word_keywords_opt_in() {
        let scorer = CandidateScorer::new(ScorerConfig {
            whole_word_keywords: true,
            ..ScorerConfig::default()
        });
        assert_eq!(scorer.noise_keyword("golden axe"), None);
        assert_eq!(scorer.noise_keyword("surplus simulator"), None);
        assert_eq!(scorer.noise_keyword("sonic gold"), Some("gold"));
        assert_eq!(scorer.noise_keyword("ratchet & clank"), Some("&"));
        // Scanning stops at the first configured keyword
        assert_eq!(scorer.noise_keyword("complete collection"), Some("collection"));
    }

    #[test]
    fn test_main_game_bonus() {
        let scorer = scorer();
        let date = timestamp(2022, 2, 25);
        let main = candidate(1, "Elden Ring", date);
        let mut dlc = candidate(2, "Elden Ring", date);
        dlc.category = GameCategory::DlcAddon;

        let query = "elden ring nightreign";
        let main_score = scorer.score_at(query, &main, now());
        let dlc_score = scorer.score_at(query, &dlc, now());
        assert_eq!(main_score.category_bonus, 0.1);
        assert_eq!(dlc_score.category_bonus, 0.0);
        assert!(main_score.score > dlc_score.score);
    }

    #[test]
    fn test_exact_match_never_scores_below_other_tiers() {
        let scorer = scorer();
        let query = "Stardew Valley";
        let dates = [
            0,
            timestamp(2010, 1, 1),
            timestamp(2016, 2, 26),
            timestamp(2022, 6, 1),
            timestamp(2025, 5, 1),
            timestamp(2026, 9, 1),
            timestamp(2029, 1, 1),
        ];
        let categories = [
            GameCategory::MainGame,
            GameCategory::DlcAddon,
            GameCategory::Bundle,
            GameCategory::Remaster,
        ];
        let others = [
            ("Stardew Valley Expanded", MatchKind::Prefix),
            ("Return to Stardew Valley", MatchKind::Contains),
            ("Stardew", MatchKind::ContainedInQuery),
            ("Valley Stardew Tales", MatchKind::WordOverlap),
        ];

        for &exact_date in &dates {
            for exact_category in categories {
                let mut exact = candidate(1, "Stardew Valley", exact_date);
                exact.category = exact_category;
                let exact_score = scorer.score_at(query, &exact, now());
                assert_eq!(exact_score.match_kind, MatchKind::Exact);

                for &other_date in &dates {
                    for other_category in categories {
                        for (name, kind) in &others {
                            let mut other = candidate(2, name, other_date);
                            other.category = other_category;
                            let other_score = scorer.score_at(query, &other, now());
                            assert_eq!(&other_score.match_kind, kind, "{}", name);
                            assert!(
                                exact_score.score >= other_score.score,
                                "exact {:?}/{} scored {} below {} {:?}/{} at {}",
                                exact_category,
                                exact_date,
                                exact_score.score,
                                name,
                                other_category,
                                other_date,
                                other_score.score
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_custom_config_is_used() {
        let config = ScorerConfig {
            noise_keywords: vec!["liberty".to_string()],
            noise_keyword_factor: 0.1,
            ..Default::default()
        };
        let scorer = CandidateScorer::new(config);
        let c = candidate(1, "Cyberpunk 2077 Phantom Liberty", timestamp(2023, 9, 26));
        let breakdown = scorer.score_at("cyberpunk 2077", &c, now());
        assert_eq!(breakdown.noise_keyword.as_deref(), Some("liberty"));
        assert!(breakdown.score < 0.2);
    }

    #[test]
    fn test_reasoning_mentions_modifiers() {
        let scorer = scorer();
        let c = candidate(1, "Doom Collection", timestamp(2005, 1, 1));
        let reasoning = scorer.score_at("doom", &c, now()).reasoning();
        assert!(reasoning.contains("query starts the name"));
        assert!(reasoning.contains("old release"));
        assert!(reasoning.contains("noise keyword 'collection'"));
    }
}
