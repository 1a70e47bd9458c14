//! Announcer implementation.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::catalog::{GameCatalog, SearchCandidate};
use crate::feed::{extract_game_name, FeedItem, FeedSource};
use crate::ledger::DedupLedger;
use crate::matcher::{CandidateResolver, MatchError};
use crate::metrics::{CANDIDATES_FOUND, FEED_POLLS, ITEMS_PROCESSED};
use crate::notify::{format_game_html, format_game_text, format_plain_notice};
use crate::thread::{GamePost, ThreadComposer, ThreadOutcome};

use super::types::{AnnounceError, AnnouncerConfig, ItemOutcome, RunSummary};

/// Turns feed items into chat announcements.
pub struct Announcer {
    catalog: Arc<dyn GameCatalog>,
    ledger: Arc<dyn DedupLedger>,
    resolver: CandidateResolver,
    composer: ThreadComposer,
    config: AnnouncerConfig,
}

impl Announcer {
    pub fn new(
        catalog: Arc<dyn GameCatalog>,
        ledger: Arc<dyn DedupLedger>,
        resolver: CandidateResolver,
        composer: ThreadComposer,
        config: AnnouncerConfig,
    ) -> Self {
        Self {
            catalog,
            ledger,
            resolver,
            composer,
            config,
        }
    }

    /// Fetch the feed and process every item in order.
    ///
    /// Per-item failures are logged and counted; only a failed feed fetch
    /// is returned as an error.
    pub async fn run_once(&self, feed: &dyn FeedSource) -> Result<RunSummary, AnnounceError> {
        let items = match feed.fetch().await {
            Ok(items) => {
                FEED_POLLS.with_label_values(&["success"]).inc();
                items
            }
            Err(e) => {
                FEED_POLLS.with_label_values(&["failed"]).inc();
                return Err(e.into());
            }
        };

        let mut summary = RunSummary {
            fetched: items.len(),
            ..RunSummary::default()
        };

        for (index, item) in items.iter().enumerate() {
            match self.process_item(item).await {
                Ok(ItemOutcome::Skipped) => {
                    summary.skipped += 1;
                    continue;
                }
                Ok(outcome) => {
                    info!(
                        item_id = %item.id,
                        outcome = outcome.label(),
                        "Announced feed item"
                    );
                    summary.announced += 1;
                }
                Err(e) => {
                    error!(item_id = %item.id, title = %item.title, error = %e, "Failed to announce item");
                    ITEMS_PROCESSED.with_label_values(&["failed"]).inc();
                    summary.failed += 1;
                }
            }

            if index + 1 < items.len() && !self.config.item_delay.is_zero() {
                tokio::time::sleep(self.config.item_delay).await;
            }
        }

        info!(
            fetched = summary.fetched,
            announced = summary.announced,
            skipped = summary.skipped,
            failed = summary.failed,
            "Feed pass complete"
        );
        Ok(summary)
    }

    /// Announce one feed item unless it was announced before.
    pub async fn process_item(&self, item: &FeedItem) -> Result<ItemOutcome, AnnounceError> {
        if self.ledger.exists(&item.id)? {
            debug!(item_id = %item.id, "Already processed, skipping");
            ITEMS_PROCESSED.with_label_values(&["skipped"]).inc();
            return Ok(ItemOutcome::Skipped);
        }

        let query = extract_game_name(&item.title);
        debug!(item_id = %item.id, title = %item.title, query = %query, "Processing feed item");

        let candidates = self.search(&query).await;
        let outcome = match self.resolver.resolve(&query, &candidates) {
            Ok(resolution) => {
                let score = resolution.score();
                self.announce_game(item, &resolution.candidate, score).await?
            }
            Err(MatchError::NotFound { .. }) => {
                info!(query = %query, "No catalog match, posting plain notice");
                let text = format_plain_notice(&query, item.link_or_empty());
                let event_id = self.composer.post_text(&text, None).await?;
                ItemOutcome::PlainNotice { event_id }
            }
        };

        self.ledger.mark_processed(&item.id)?;
        ITEMS_PROCESSED.with_label_values(&[outcome.label()]).inc();
        Ok(outcome)
    }

    /// Catalog search; a failed search counts as no candidates.
    async fn search(&self, query: &str) -> Vec<SearchCandidate> {
        match self.catalog.search(query, self.config.search_limit).await {
            Ok(candidates) => {
                CANDIDATES_FOUND.observe(candidates.len() as f64);
                candidates
            }
            Err(e) => {
                warn!(
                    catalog = self.catalog.name(),
                    query = %query,
                    error = %e,
                    "Catalog search failed"
                );
                Vec::new()
            }
        }
    }

    async fn announce_game(
        &self,
        item: &FeedItem,
        game: &SearchCandidate,
        score: f32,
    ) -> Result<ItemOutcome, AnnounceError> {
        let post = self.build_post(item, game).await;

        let outcome = match self.composer.publish(&post).await? {
            ThreadOutcome::Threaded { root, replies, .. } => ItemOutcome::Threaded {
                event_id: root,
                game: game.name.clone(),
                score,
                replies,
            },
            ThreadOutcome::TextFallback { event_id, reason } => ItemOutcome::TextFallback {
                event_id,
                game: game.name.clone(),
                reason,
            },
        };
        Ok(outcome)
    }

    /// Assemble the announcement, resolving image references to URLs.
    /// References that cannot be resolved are left out.
    async fn build_post(&self, item: &FeedItem, game: &SearchCandidate) -> GamePost {
        let cover_url = match &game.cover {
            Some(cover) => match self.catalog.asset_url(cover).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(game = %game.name, asset_id = cover.id, error = %e, "Could not resolve cover");
                    None
                }
            },
            None => None,
        };

        let mut screenshot_urls = Vec::with_capacity(game.screenshots.len());
        for screenshot in &game.screenshots {
            match self.catalog.asset_url(screenshot).await {
                Ok(url) => screenshot_urls.push(url),
                Err(e) => {
                    warn!(game = %game.name, asset_id = screenshot.id, error = %e, "Could not resolve screenshot");
                }
            }
        }

        let link = item.link.as_deref();
        GamePost {
            title: game.name.clone(),
            text: format_game_text(game, link),
            html: Some(format_game_html(game, link)),
            cover_url,
            screenshot_urls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatError, MessageType};
    use crate::feed::FeedError;
    use crate::media::MediaConfig;
    use crate::testing::fixtures::{candidate, candidate_with_media, timestamp};
    use crate::testing::{MockCatalog, MockChatBackend, MockLedger, MockMediaFetcher};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Harness {
        catalog: Arc<MockCatalog>,
        chat: Arc<MockChatBackend>,
        fetcher: Arc<MockMediaFetcher>,
        ledger: Arc<MockLedger>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                catalog: Arc::new(MockCatalog::new()),
                chat: Arc::new(MockChatBackend::new()),
                fetcher: Arc::new(MockMediaFetcher::new()),
                ledger: Arc::new(MockLedger::new()),
            }
        }

        fn announcer(&self) -> Announcer {
            let composer = ThreadComposer::new(
                self.chat.clone(),
                self.fetcher.clone(),
                MediaConfig::default(),
            );
            Announcer::new(
                self.catalog.clone(),
                self.ledger.clone(),
                CandidateResolver::default(),
                composer,
                AnnouncerConfig {
                    item_delay: Duration::ZERO,
                    search_limit: 10,
                },
            )
        }
    }

    fn item(id: &str, title: &str) -> FeedItem {
        FeedItem::new(
            Some(id.to_string()),
            title,
            Some(format!("https://tracker.test/{}", id)),
        )
    }

    struct StaticFeed(Result<Vec<FeedItem>, u16>);

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
            self.0.clone().map_err(FeedError::Status)
        }
    }

    #[tokio::test]
    async fn test_skips_processed_item() {
        let h = Harness::new();
        h.ledger.insert("post-1");

        let outcome = h
            .announcer()
            .process_item(&item("post-1", "Hades II [FitGirl Repack]"))
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Skipped);
        assert!(h.catalog.recorded_searches().await.is_empty());
        assert!(h.chat.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_searches_with_extracted_name() {
        let h = Harness::new();
        h.announcer()
            .process_item(&item("post-1", "Hades II [FitGirl Repack]"))
            .await
            .unwrap();

        let searches = h.catalog.recorded_searches().await;
        assert_eq!(searches[0].query, "Hades II");
        assert_eq!(searches[0].limit, 10);
    }

    #[tokio::test]
    async fn test_no_match_posts_plain_notice() {
        let h = Harness::new();

        let outcome = h
            .announcer()
            .process_item(&item("post-1", "Obscure Game (v1.2)"))
            .await
            .unwrap();

        assert!(matches!(outcome, ItemOutcome::PlainNotice { .. }));
        let messages = h.chat.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].body,
            "🎮 New Game: Obscure Game\n🔗 https://tracker.test/post-1"
        );
        assert!(h.fetcher.requests().await.is_empty());
        assert!(h.ledger.contains("post-1"));
    }

    #[tokio::test]
    async fn test_catalog_failure_degrades_to_plain_notice() {
        let h = Harness::new();
        h.catalog
            .set_next_error(crate::catalog::CatalogError::RateLimitExceeded)
            .await;

        let outcome = h
            .announcer()
            .process_item(&item("post-1", "Hades II"))
            .await
            .unwrap();

        assert!(matches!(outcome, ItemOutcome::PlainNotice { .. }));
    }

    #[tokio::test]
    async fn test_match_with_media_is_threaded() {
        let h = Harness::new();
        h.catalog
            .set_results(vec![candidate_with_media(
                7,
                "Hades II",
                timestamp(2024, 5, 6),
                2,
            )])
            .await;

        let outcome = h
            .announcer()
            .process_item(&item("post-1", "Hades II [FitGirl Repack]"))
            .await
            .unwrap();

        let ItemOutcome::Threaded { game, replies, .. } = &outcome else {
            panic!("expected a thread, got {:?}", outcome);
        };
        assert_eq!(game, "Hades II");
        assert_eq!(*replies, 2);

        let requests = h.fetcher.requests().await;
        assert_eq!(requests[0], "https://images.mock/upload/t_original/co7.webp");
        assert_eq!(requests.len(), 3);

        let messages = h.chat.messages().await;
        assert_eq!(messages[0].msgtype, MessageType::Image);
        assert!(messages[0].body.starts_with("🎮 **Hades II**"));
        assert!(messages[0].body.ends_with("🔗 https://tracker.test/post-1"));
        assert!(h.ledger.contains("post-1"));
    }

    #[tokio::test]
    async fn test_match_without_cover_is_text_fallback() {
        let h = Harness::new();
        h.catalog
            .set_results(vec![candidate(7, "Hades II", timestamp(2024, 5, 6))])
            .await;

        let outcome = h
            .announcer()
            .process_item(&item("post-1", "Hades II"))
            .await
            .unwrap();

        assert!(matches!(outcome, ItemOutcome::TextFallback { .. }));
        assert!(h.chat.uploads().await.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_cover_is_left_out() {
        let h = Harness::new();
        let mut game = candidate(7, "Hades II", timestamp(2024, 5, 6));
        game.cover = Some(crate::catalog::AssetRef {
            kind: crate::catalog::AssetKind::Cover,
            id: 700,
            image_id: None,
        });
        h.catalog.set_results(vec![game]).await;

        let outcome = h
            .announcer()
            .process_item(&item("post-1", "Hades II"))
            .await
            .unwrap();

        assert!(matches!(outcome, ItemOutcome::TextFallback { .. }));
        assert!(h.fetcher.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_post_is_not_marked() {
        let h = Harness::new();
        h.chat
            .fail_all_sends(ChatError::Transport("homeserver down".into()))
            .await;

        let result = h
            .announcer()
            .process_item(&item("post-1", "Obscure Game"))
            .await;

        assert!(matches!(result, Err(AnnounceError::Chat(_))));
        assert!(!h.ledger.contains("post-1"));
    }

    #[tokio::test]
    async fn test_ledger_failure_stops_item() {
        let h = Harness::new();
        h.ledger.set_fail_exists(true);

        let result = h
            .announcer()
            .process_item(&item("post-1", "Obscure Game"))
            .await;

        assert!(matches!(result, Err(AnnounceError::Ledger(_))));
        assert!(h.chat.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_once_counts_outcomes() {
        let h = Harness::new();
        h.ledger.insert("old");
        let feed = StaticFeed(Ok(vec![
            item("old", "Old Game"),
            item("new-1", "New Game One"),
            item("new-2", "New Game Two"),
        ]));

        let summary = h.announcer().run_once(&feed).await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                fetched: 3,
                skipped: 1,
                announced: 2,
                failed: 0,
            }
        );
        assert_eq!(h.ledger.marks(), vec!["new-1", "new-2"]);
    }

    #[tokio::test]
    async fn test_run_once_continues_after_item_failure() {
        let h = Harness::new();
        h.chat
            .fail_next_send(ChatError::Api {
                status: 500,
                message: "M_UNKNOWN".into(),
            })
            .await;
        let feed = StaticFeed(Ok(vec![item("a", "Game A"), item("b", "Game B")]));

        let summary = h.announcer().run_once(&feed).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.announced, 1);
        assert!(!h.ledger.contains("a"));
        assert!(h.ledger.contains("b"));
    }

    #[tokio::test]
    async fn test_run_once_feed_failure() {
        let h = Harness::new();
        let result = h.announcer().run_once(&StaticFeed(Err(503))).await;
        assert!(matches!(
            result,
            Err(AnnounceError::Feed(FeedError::Status(503)))
        ));
    }
}
