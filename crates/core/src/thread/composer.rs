//! Posts a game as a cover image with a chain of screenshot replies.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::state::ThreadState;
use crate::chat::{AssetUploader, ChatBackend, ChatError, EventId, RoomMessage, UploadedAsset};
use crate::media::{
    fetch_and_prepare, MediaConfig, MediaError, MediaFetcher, PreparedImage, ScreenshotOrder,
};
use crate::metrics::{ASSETS_PROCESSED, THREAD_REPLIES};
use crate::notify::screenshot_caption;

/// Everything needed to announce one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePost {
    /// Display title, used in captions and filenames.
    pub title: String,
    /// Plain-text announcement.
    pub text: String,
    /// HTML announcement.
    pub html: Option<String>,
    pub cover_url: Option<String>,
    pub screenshot_urls: Vec<String>,
}

/// Why a game was announced without a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoCover,
    CoverFailed,
}

/// Terminal state of one publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadOutcome {
    /// Cover posted as the thread root; screenshots chained beneath it.
    Threaded {
        root: EventId,
        replies: usize,
        failed: usize,
    },
    /// A single formatted text message was posted instead.
    TextFallback {
        event_id: EventId,
        reason: FallbackReason,
    },
}

impl ThreadOutcome {
    /// The first event posted for the game.
    pub fn first_event(&self) -> &EventId {
        match self {
            Self::Threaded { root, .. } => root,
            Self::TextFallback { event_id, .. } => event_id,
        }
    }
}

/// One screenshot's fetch result, tagged with its original position.
struct ScreenshotResult {
    index: usize,
    url: String,
    result: Result<PreparedImage, MediaError>,
}

/// Builds and posts threads.
pub struct ThreadComposer {
    chat: Arc<dyn ChatBackend>,
    uploader: AssetUploader,
    fetcher: Arc<dyn MediaFetcher>,
    config: MediaConfig,
    batch_timeout: Duration,
}

impl ThreadComposer {
    pub fn new(
        chat: Arc<dyn ChatBackend>,
        fetcher: Arc<dyn MediaFetcher>,
        config: MediaConfig,
    ) -> Self {
        let batch_timeout = config.batch_timeout();
        Self {
            uploader: AssetUploader::new(Arc::clone(&chat)),
            chat,
            fetcher,
            config,
            batch_timeout,
        }
    }

    /// Override the screenshot batch deadline.
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    /// Post the thread root.
    pub async fn post_root(
        &self,
        caption: &str,
        html: Option<String>,
        asset: &UploadedAsset,
    ) -> Result<EventId, ChatError> {
        self.chat
            .send(&RoomMessage::for_asset(caption, html, asset))
            .await
    }

    /// Post a reply. A root without a parent is rejected before anything
    /// is sent.
    pub async fn post_reply(
        &self,
        caption: &str,
        asset: &UploadedAsset,
        root: Option<EventId>,
        parent: Option<EventId>,
    ) -> Result<EventId, ChatError> {
        let relation = crate::chat::Relation::from_parts(root, parent)?;
        let message = RoomMessage::for_asset(caption, None, asset).with_relation(relation);
        self.chat.send(&message).await
    }

    /// Post a standalone text message.
    pub async fn post_text(&self, text: &str, html: Option<String>) -> Result<EventId, ChatError> {
        self.chat.send(&RoomMessage::text(text, html)).await
    }

    /// Announce a game.
    ///
    /// Without a usable cover the game is announced as text and screenshots
    /// are skipped. Screenshot failures never abort the thread. Only a
    /// failed text fallback is returned as an error.
    pub async fn publish(&self, post: &GamePost) -> Result<ThreadOutcome, ChatError> {
        let cover_url = match &post.cover_url {
            Some(url) => url,
            None => {
                debug!(title = %post.title, "No cover, posting text");
                return self.fallback(post, FallbackReason::NoCover).await;
            }
        };

        let root = match self.post_cover(post, cover_url).await {
            Ok(root) => root,
            Err(e) => {
                warn!(title = %post.title, url = %cover_url, error = %e, "Cover failed, posting text");
                ASSETS_PROCESSED.with_label_values(&["cover", "failed"]).inc();
                return self.fallback(post, FallbackReason::CoverFailed).await;
            }
        };
        ASSETS_PROCESSED.with_label_values(&["cover", "posted"]).inc();

        let mut state = ThreadState::new();
        state.record_post(root.clone());

        let (replies, failed) = self.post_screenshots(post, &mut state).await;

        info!(
            title = %post.title,
            root = %root,
            replies,
            failed,
            "Published game thread"
        );

        Ok(ThreadOutcome::Threaded {
            root,
            replies,
            failed,
        })
    }

    async fn fallback(
        &self,
        post: &GamePost,
        reason: FallbackReason,
    ) -> Result<ThreadOutcome, ChatError> {
        let event_id = self.post_text(&post.text, post.html.clone()).await?;
        Ok(ThreadOutcome::TextFallback { event_id, reason })
    }

    async fn post_cover(&self, post: &GamePost, url: &str) -> Result<EventId, AssetError> {
        let image = fetch_and_prepare(
            self.fetcher.as_ref(),
            url,
            self.config.thumbnail_width,
            self.config.thumbnail_height,
        )
        .await?;

        let basename = format!("{} cover", post.title);
        let asset = self.uploader.upload_image(&image, &basename).await?;
        Ok(self.post_root(&post.text, post.html.clone(), &asset).await?)
    }

    /// Returns (posted, failed).
    async fn post_screenshots(&self, post: &GamePost, state: &mut ThreadState) -> (usize, usize) {
        let urls: Vec<String> = post
            .screenshot_urls
            .iter()
            .take(self.config.max_screenshots)
            .cloned()
            .collect();
        if post.screenshot_urls.len() > urls.len() {
            debug!(
                available = post.screenshot_urls.len(),
                kept = urls.len(),
                "Dropping excess screenshots"
            );
        }
        if urls.is_empty() {
            return (0, 0);
        }

        let expected = urls.len();
        let collected = self.collect_screenshots(urls).await;
        let timed_out = expected - collected.len();
        if timed_out > 0 {
            ASSETS_PROCESSED
                .with_label_values(&["screenshot", "timed_out"])
                .inc_by(timed_out as u64);
        }

        let mut posted = 0;
        let mut failed = timed_out;

        for shot in order_results(collected, expected, self.config.screenshot_order) {
            let caption = screenshot_caption(shot.index, &post.title);
            match self.post_screenshot(&caption, shot.result, state).await {
                Ok(event_id) => {
                    debug!(index = shot.index, event_id = %event_id, "Posted screenshot");
                    posted += 1;
                    THREAD_REPLIES.inc();
                    ASSETS_PROCESSED
                        .with_label_values(&["screenshot", "posted"])
                        .inc();
                }
                Err(e) => {
                    warn!(index = shot.index, url = %shot.url, error = %e, "Screenshot skipped");
                    failed += 1;
                    ASSETS_PROCESSED
                        .with_label_values(&["screenshot", "failed"])
                        .inc();
                }
            }
        }

        (posted, failed)
    }

    async fn post_screenshot(
        &self,
        caption: &str,
        result: Result<PreparedImage, MediaError>,
        state: &mut ThreadState,
    ) -> Result<EventId, AssetError> {
        let image = result?;
        let asset = self.uploader.upload_image(&image, caption).await?;
        let event_id = self
            .post_reply(
                caption,
                &asset,
                state.root().cloned(),
                state.reply_target().cloned(),
            )
            .await?;
        state.record_post(event_id.clone());
        Ok(event_id)
    }

    /// Fetch and prepare every screenshot concurrently under one shared
    /// deadline. Results come back in arrival order; anything still running
    /// at the deadline is aborted.
    async fn collect_screenshots(&self, urls: Vec<String>) -> Vec<ScreenshotResult> {
        let expected = urls.len();
        let (tx, mut rx) = mpsc::channel(expected);
        let mut handles = Vec::with_capacity(expected);

        for (index, url) in urls.into_iter().enumerate() {
            let tx = tx.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let (width, height) = (self.config.thumbnail_width, self.config.thumbnail_height);

            handles.push(tokio::spawn(async move {
                let result = fetch_and_prepare(fetcher.as_ref(), &url, width, height).await;
                let _ = tx.send(ScreenshotResult { index, url, result }).await;
            }));
        }
        drop(tx);

        let mut arrived = Vec::with_capacity(expected);
        let timed_out = tokio::time::timeout(self.batch_timeout, async {
            while let Some(result) = rx.recv().await {
                arrived.push(result);
            }
        })
        .await
        .is_err();

        if timed_out {
            warn!(
                collected = arrived.len(),
                expected,
                timeout_ms = self.batch_timeout.as_millis() as u64,
                "Screenshot batch timed out"
            );
            for handle in &handles {
                handle.abort();
            }
        }

        arrived
    }
}

/// Arrange collected results for posting.
fn order_results(
    arrived: Vec<ScreenshotResult>,
    expected: usize,
    order: ScreenshotOrder,
) -> Vec<ScreenshotResult> {
    match order {
        ScreenshotOrder::Arrival => arrived,
        ScreenshotOrder::Index => {
            let mut slots: Vec<Option<ScreenshotResult>> = (0..expected).map(|_| None).collect();
            for result in arrived {
                let index = result.index;
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(result);
                }
            }
            slots.into_iter().flatten().collect()
        }
    }
}

/// Failure of one image on its way into the thread.
#[derive(Debug, thiserror::Error)]
enum AssetError {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Chat(#[from] ChatError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Relation;
    use crate::testing::{MockChatBackend, MockMediaFetcher};

    fn composer(chat: &Arc<MockChatBackend>, fetcher: &Arc<MockMediaFetcher>) -> ThreadComposer {
        ThreadComposer::new(chat.clone(), fetcher.clone(), MediaConfig::default())
    }

    fn post(cover: Option<&str>, screenshots: usize) -> GamePost {
        GamePost {
            title: "Doom".to_string(),
            text: "🎮 **Doom**".to_string(),
            html: Some("<h3>Doom</h3>".to_string()),
            cover_url: cover.map(String::from),
            screenshot_urls: (0..screenshots)
                .map(|i| format!("https://img.test/shot{}.png", i))
                .collect(),
        }
    }

    #[test]
    fn test_order_results_by_index() {
        let arrived = vec![2, 0, 1]
            .into_iter()
            .map(|index| ScreenshotResult {
                index,
                url: String::new(),
                result: Err(MediaError::Decode("x".into())),
            })
            .collect();
        let ordered: Vec<usize> = order_results(arrived, 3, ScreenshotOrder::Index)
            .into_iter()
            .map(|r| r.index)
            .collect();
        assert_eq!(ordered, vec![0, 1, 2]);
    }

    #[test]
    fn test_order_results_by_arrival() {
        let arrived = vec![2, 0]
            .into_iter()
            .map(|index| ScreenshotResult {
                index,
                url: String::new(),
                result: Err(MediaError::Decode("x".into())),
            })
            .collect();
        let ordered: Vec<usize> = order_results(arrived, 3, ScreenshotOrder::Arrival)
            .into_iter()
            .map(|r| r.index)
            .collect();
        assert_eq!(ordered, vec![2, 0]);
    }

    #[tokio::test]
    async fn test_post_reply_rejects_root_without_parent() {
        let chat = Arc::new(MockChatBackend::new());
        let fetcher = Arc::new(MockMediaFetcher::new());
        let composer = composer(&chat, &fetcher);
        let asset = UploadedAsset {
            uri: crate::chat::ContentUri::new("mxc://hs/a"),
            descriptor: crate::chat::AssetDescriptor::new("image/png", 1, 1, 1),
            filename: "a.png".to_string(),
        };

        let result = composer
            .post_reply("caption", &asset, Some(EventId::new("$root")), None)
            .await;

        assert!(matches!(result, Err(ChatError::InvalidRelation(_))));
        assert!(chat.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_cover_falls_back_to_text() {
        let chat = Arc::new(MockChatBackend::new());
        let fetcher = Arc::new(MockMediaFetcher::new());

        let outcome = composer(&chat, &fetcher)
            .publish(&post(None, 3))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ThreadOutcome::TextFallback {
                reason: FallbackReason::NoCover,
                ..
            }
        ));
        assert!(chat.uploads().await.is_empty());
        assert!(fetcher.requests().await.is_empty());
        let messages = chat.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].relation(), &Relation::None);
        assert!(messages[0].is_formatted());
    }

    #[tokio::test]
    async fn test_cover_fetch_failure_falls_back_and_skips_screenshots() {
        let chat = Arc::new(MockChatBackend::new());
        let fetcher = Arc::new(MockMediaFetcher::new());
        fetcher
            .fail_url("https://img.test/cover.png", MediaError::Http {
                status: 404,
                url: "https://img.test/cover.png".into(),
            })
            .await;

        let outcome = composer(&chat, &fetcher)
            .publish(&post(Some("https://img.test/cover.png"), 2))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ThreadOutcome::TextFallback {
                reason: FallbackReason::CoverFailed,
                ..
            }
        ));
        assert_eq!(fetcher.requests().await.len(), 1);
        assert_eq!(chat.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cover_post_failure_falls_back() {
        let chat = Arc::new(MockChatBackend::new());
        chat.fail_next_send(ChatError::Api {
            status: 403,
            message: "M_FORBIDDEN".into(),
        })
        .await;
        let fetcher = Arc::new(MockMediaFetcher::new());

        let outcome = composer(&chat, &fetcher)
            .publish(&post(Some("https://img.test/cover.png"), 2))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ThreadOutcome::TextFallback {
                reason: FallbackReason::CoverFailed,
                ..
            }
        ));
        let messages = chat.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].msgtype, crate::chat::MessageType::Text);
    }

    #[tokio::test]
    async fn test_replies_form_a_chain() {
        let chat = Arc::new(MockChatBackend::new());
        let fetcher = Arc::new(MockMediaFetcher::new());

        let outcome = composer(&chat, &fetcher)
            .publish(&post(Some("https://img.test/cover.png"), 3))
            .await
            .unwrap();

        let ThreadOutcome::Threaded {
            root,
            replies,
            failed,
        } = outcome
        else {
            panic!("expected a thread");
        };
        assert_eq!((replies, failed), (3, 0));

        let messages = chat.messages().await;
        let events = chat.event_ids().await;
        assert_eq!(messages.len(), 4);
        assert_eq!(events[0], root);
        assert_eq!(messages[0].relation(), &Relation::None);

        // Each reply points at the previous post, all under the same root
        for i in 1..4 {
            assert_eq!(
                messages[i].relation(),
                &Relation::Thread {
                    root: root.clone(),
                    parent: events[i - 1].clone(),
                }
            );
        }
        assert_eq!(messages[1].body, "Screenshot 1 of Doom");
        assert_eq!(messages[3].body, "Screenshot 3 of Doom");
    }

    #[tokio::test]
    async fn test_screenshots_capped() {
        let chat = Arc::new(MockChatBackend::new());
        let fetcher = Arc::new(MockMediaFetcher::new());

        let outcome = composer(&chat, &fetcher)
            .publish(&post(Some("https://img.test/cover.png"), 8))
            .await
            .unwrap();

        assert!(matches!(outcome, ThreadOutcome::Threaded { replies: 5, .. }));
        // Cover plus five screenshots
        assert_eq!(fetcher.requests().await.len(), 6);
    }

    #[tokio::test]
    async fn test_failed_screenshot_is_skipped() {
        let chat = Arc::new(MockChatBackend::new());
        let fetcher = Arc::new(MockMediaFetcher::new());
        fetcher
            .fail_url(
                "https://img.test/shot1.png",
                MediaError::Transport("connection reset".into()),
            )
            .await;

        let outcome = composer(&chat, &fetcher)
            .publish(&post(Some("https://img.test/cover.png"), 3))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ThreadOutcome::Threaded {
                replies: 2,
                failed: 1,
                ..
            }
        ));
        let bodies: Vec<String> = chat.messages().await.into_iter().map(|m| m.body).collect();
        assert_eq!(bodies[1], "Screenshot 1 of Doom");
        assert_eq!(bodies[2], "Screenshot 3 of Doom");
    }

    #[tokio::test]
    async fn test_index_order_despite_slow_first_screenshot() {
        let chat = Arc::new(MockChatBackend::new());
        let fetcher = Arc::new(MockMediaFetcher::new());
        fetcher
            .delay_url("https://img.test/shot0.png", Duration::from_millis(150))
            .await;

        composer(&chat, &fetcher)
            .publish(&post(Some("https://img.test/cover.png"), 2))
            .await
            .unwrap();

        let bodies: Vec<String> = chat.messages().await.into_iter().map(|m| m.body).collect();
        assert_eq!(bodies[1], "Screenshot 1 of Doom");
        assert_eq!(bodies[2], "Screenshot 2 of Doom");
    }

    #[tokio::test]
    async fn test_arrival_order_follows_completion() {
        let chat = Arc::new(MockChatBackend::new());
        let fetcher = Arc::new(MockMediaFetcher::new());
        fetcher
            .delay_url("https://img.test/shot0.png", Duration::from_millis(300))
            .await;
        let config = MediaConfig {
            screenshot_order: ScreenshotOrder::Arrival,
            ..MediaConfig::default()
        };

        ThreadComposer::new(chat.clone(), fetcher.clone(), config)
            .publish(&post(Some("https://img.test/cover.png"), 2))
            .await
            .unwrap();

        let bodies: Vec<String> = chat.messages().await.into_iter().map(|m| m.body).collect();
        assert_eq!(bodies[1], "Screenshot 2 of Doom");
        assert_eq!(bodies[2], "Screenshot 1 of Doom");
    }

    #[tokio::test]
    async fn test_batch_timeout_posts_partial_results() {
        let chat = Arc::new(MockChatBackend::new());
        let fetcher = Arc::new(MockMediaFetcher::new());
        fetcher
            .delay_url("https://img.test/shot2.png", Duration::from_secs(30))
            .await;

        let outcome = composer(&chat, &fetcher)
            .with_batch_timeout(Duration::from_millis(500))
            .publish(&post(Some("https://img.test/cover.png"), 3))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ThreadOutcome::Threaded {
                replies: 2,
                failed: 1,
                ..
            }
        ));
    }
}
