// Event handling tests for WatermarkBot
//
// Compositors are replaced with spies that record every call, and media
// retrieval with an in-memory fetcher, so these tests exercise the session
// flow without decoding any real media.

use async_trait::async_trait;
use bytes::Bytes;
use markbot::bot::{InboundEvent, MediaFetcher, Outbound, WatermarkBot};
use markbot::error::{WatermarkError, PROCESSING_FAILED_MESSAGE};
use markbot::session::{MediaKind, MediaRef, SessionState, SessionStore};
use markbot::watermark::{
    ColorName, PhotoRenderer, VideoRenderer, WatermarkPosition, WatermarkSettings,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const USER: i64 = 1001;
const CHAT: i64 = 2002;
const LIMIT: u64 = 1000;

#[derive(Default)]
struct FakeFetcher {
    files: HashMap<String, Bytes>,
}

impl FakeFetcher {
    fn with(mut self, id: &str, data: &'static [u8]) -> Self {
        self.files.insert(id.to_string(), Bytes::from_static(data));
        self
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch_media(&self, media_ref: &MediaRef) -> Result<Bytes, WatermarkError> {
        self.files
            .get(media_ref.as_str())
            .cloned()
            .ok_or_else(|| WatermarkError::Fetch(format!("no such file: {media_ref}")))
    }
}

/// Records calls and returns a fixed payload (or a decode failure).
#[derive(Default)]
struct SpyRenderer {
    calls: AtomicUsize,
    seen: Mutex<Vec<(Vec<u8>, WatermarkSettings)>>,
    fail: bool,
}

impl SpyRenderer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, data: &[u8], settings: &WatermarkSettings) -> Result<Vec<u8>, WatermarkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push((data.to_vec(), settings.clone()));
        if self.fail {
            return Err(WatermarkError::Decode("not an image".to_string()));
        }
        Ok(b"rendered".to_vec())
    }
}

impl PhotoRenderer for SpyRenderer {
    fn render_photo(
        &self,
        data: &[u8],
        settings: &WatermarkSettings,
    ) -> Result<Vec<u8>, WatermarkError> {
        self.record(data, settings)
    }
}

impl VideoRenderer for SpyRenderer {
    fn render_video(
        &self,
        data: &[u8],
        settings: &WatermarkSettings,
    ) -> Result<Vec<u8>, WatermarkError> {
        self.record(data, settings)
    }
}

struct Harness {
    bot: WatermarkBot,
    photo: Arc<SpyRenderer>,
    video: Arc<SpyRenderer>,
}

impl Harness {
    fn new(fetcher: FakeFetcher) -> Self {
        Self::with_renderers(fetcher, SpyRenderer::default(), SpyRenderer::default())
    }

    fn with_renderers(fetcher: FakeFetcher, photo: SpyRenderer, video: SpyRenderer) -> Self {
        let photo = Arc::new(photo);
        let video = Arc::new(video);
        let bot = WatermarkBot::new(
            SessionStore::default(),
            Arc::new(fetcher),
            photo.clone(),
            video.clone(),
            LIMIT,
        );
        Self { bot, photo, video }
    }

    async fn send(&self, event: InboundEvent) -> Vec<Outbound> {
        self.bot.handle_event(event).await
    }

    async fn photo(&self, id: &str) -> Vec<Outbound> {
        self.send(InboundEvent::Photo {
            user_id: USER,
            chat_id: CHAT,
            media_ref: MediaRef::new(id),
            size_bytes: None,
        })
        .await
    }

    async fn video(&self, id: &str, size_bytes: u64) -> Vec<Outbound> {
        self.send(InboundEvent::Video {
            user_id: USER,
            chat_id: CHAT,
            media_ref: MediaRef::new(id),
            size_bytes,
        })
        .await
    }

    async fn menu(&self, token: &str) -> Vec<Outbound> {
        self.send(InboundEvent::Menu {
            user_id: USER,
            chat_id: CHAT,
            token: token.to_string(),
        })
        .await
    }

    async fn text(&self, text: &str) -> Vec<Outbound> {
        self.send(InboundEvent::Text {
            user_id: USER,
            chat_id: CHAT,
            text: text.to_string(),
        })
        .await
    }

    async fn command(&self, name: &str) -> Vec<Outbound> {
        self.send(InboundEvent::Command {
            user_id: USER,
            chat_id: CHAT,
            name: name.to_string(),
        })
        .await
    }

    async fn state(&self) -> SessionState {
        self.bot.store().get(USER).await.lock().state().clone()
    }

    async fn settings(&self) -> WatermarkSettings {
        self.bot.store().get(USER).await.lock().settings.clone()
    }
}

fn only_text(out: &[Outbound]) -> &str {
    assert_eq!(out.len(), 1, "expected one delivery, got {out:?}");
    out[0].as_text().expect("expected a text delivery")
}

/// Test: photo → confirm → compositor runs once → Idle; second confirm is a no-op
#[tokio::test]
async fn test_photo_confirm_end_to_end() {
    let h = Harness::new(FakeFetcher::default().with("p1", b"photo-bytes"));

    h.photo("p1").await;
    match h.state().await {
        SessionState::MediaPending(media) => {
            assert_eq!(media.kind, MediaKind::Photo);
            assert_eq!(media.media_ref, MediaRef::new("p1"));
        }
        other => panic!("expected pending photo, got {other:?}"),
    }

    h.menu("color:red").await;
    let out = h.menu("confirm").await;

    assert_eq!(h.photo.calls(), 1);
    assert_eq!(h.video.calls(), 0);
    {
        let seen = h.photo.seen.lock();
        assert_eq!(seen[0].0, b"photo-bytes");
        assert_eq!(seen[0].1.color, ColorName::Red);
    }
    assert_eq!(
        out,
        vec![Outbound::Image {
            chat_id: CHAT,
            bytes: Bytes::from_static(b"rendered"),
            caption: markbot::bot::messages::PHOTO_CAPTION.to_string(),
        }]
    );
    assert_eq!(h.state().await, SessionState::Idle);

    let out = h.menu("confirm").await;
    assert_eq!(only_text(&out), markbot::bot::messages::NOTHING_PENDING);
    assert_eq!(h.photo.calls(), 1);
    assert_eq!(h.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_video_confirm_delivers_video() {
    let h = Harness::new(FakeFetcher::default().with("v1", b"video-bytes"));

    h.video("v1", 11).await;
    let out = h.menu("confirm").await;

    assert_eq!(h.video.calls(), 1);
    assert!(matches!(&out[..], [Outbound::Video { chat_id: CHAT, .. }]));
    assert_eq!(h.state().await, SessionState::Idle);
}

/// Test: a video of exactly the limit is accepted, one byte more is rejected
#[tokio::test]
async fn test_video_size_ceiling_boundary() {
    static AT_LIMIT: [u8; LIMIT as usize] = [7; LIMIT as usize];
    let h = Harness::new(FakeFetcher::default().with("exact", &AT_LIMIT));

    let out = h.video("too-big", LIMIT + 1).await;
    assert_eq!(
        only_text(&out),
        WatermarkError::SizeLimitExceeded {
            size: LIMIT + 1,
            limit: LIMIT
        }
        .user_message()
    );
    assert_eq!(h.state().await, SessionState::Idle);

    // Nothing pending, so confirm cannot reach the compositor
    h.menu("confirm").await;
    assert_eq!(h.video.calls(), 0);

    h.video("exact", LIMIT).await;
    assert!(matches!(h.state().await, SessionState::MediaPending(_)));
    h.menu("confirm").await;
    assert_eq!(h.video.calls(), 1);
}

#[tokio::test]
async fn test_fetched_video_over_limit_is_rejected() {
    static OVERSIZED: [u8; LIMIT as usize + 1] = [0; LIMIT as usize + 1];
    let h = Harness::new(FakeFetcher::default().with("liar", &OVERSIZED));

    // Reported size passes, the actual download does not
    h.video("liar", 10).await;
    let out = h.menu("confirm").await;

    assert!(only_text(&out).starts_with("File is too large"));
    assert_eq!(h.video.calls(), 0);
    assert_eq!(h.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_rejected_video_keeps_previous_pending_media() {
    let h = Harness::new(FakeFetcher::default().with("p1", b"photo"));

    h.photo("p1").await;
    h.video("huge", LIMIT * 10).await;

    assert!(matches!(
        h.state().await,
        SessionState::MediaPending(media) if media.kind == MediaKind::Photo
    ));
}

#[tokio::test]
async fn test_new_media_replaces_pending() {
    let h = Harness::new(
        FakeFetcher::default()
            .with("first", b"first")
            .with("second", b"second"),
    );

    h.photo("first").await;
    h.photo("second").await;
    h.menu("confirm").await;

    assert_eq!(h.photo.calls(), 1);
    assert_eq!(h.photo.seen.lock()[0].0, b"second");
}

/// Test: render failure yields the generic message and still clears pending media
#[tokio::test]
async fn test_render_failure_reports_and_returns_to_idle() {
    let h = Harness::with_renderers(
        FakeFetcher::default().with("bad", b"garbage"),
        SpyRenderer::failing(),
        SpyRenderer::default(),
    );

    h.photo("bad").await;
    let out = h.menu("confirm").await;

    assert_eq!(only_text(&out), PROCESSING_FAILED_MESSAGE);
    assert_eq!(h.photo.calls(), 1);
    assert_eq!(h.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_fetch_failure_reports_and_returns_to_idle() {
    let h = Harness::new(FakeFetcher::default());

    h.photo("missing").await;
    let out = h.menu("confirm").await;

    assert_eq!(only_text(&out), PROCESSING_FAILED_MESSAGE);
    assert_eq!(h.photo.calls(), 0);
    assert_eq!(h.state().await, SessionState::Idle);
}

/// Test: 50 characters accepted, 51 rejected with state and text unchanged
#[tokio::test]
async fn test_text_length_boundary() {
    let h = Harness::new(FakeFetcher::default());

    h.menu("change_text").await;
    assert!(h.state().await.is_awaiting_text());

    let out = h.text(&"a".repeat(51)).await;
    assert!(only_text(&out).contains("too long"));
    assert_eq!(h.settings().await.text, "Watermark");
    assert!(h.state().await.is_awaiting_text());

    let fifty = "b".repeat(50);
    h.text(&fifty).await;
    assert_eq!(h.settings().await.text, fifty);
    assert_eq!(h.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_change_text_with_pending_photo_resumes_it() {
    let h = Harness::new(FakeFetcher::default().with("p1", b"photo"));

    h.photo("p1").await;
    h.menu("change_text").await;

    // Confirm waits for the text
    let out = h.menu("confirm").await;
    assert_eq!(only_text(&out), markbot::bot::messages::FINISH_TEXT_FIRST);
    assert_eq!(h.photo.calls(), 0);

    let out = h.text("Studio").await;
    assert!(only_text(&out).contains("Press Confirm"));
    assert!(matches!(h.state().await, SessionState::MediaPending(_)));

    h.menu("confirm").await;
    assert_eq!(h.photo.seen.lock()[0].1.text, "Studio");
}

#[tokio::test]
async fn test_plain_text_when_idle_is_informational() {
    let h = Harness::new(FakeFetcher::default());

    let out = h.text("hello there").await;
    assert_eq!(only_text(&out), markbot::bot::messages::TEXT_HINT);
    assert_eq!(h.settings().await, WatermarkSettings::default());
    assert_eq!(h.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_setting_actions_keep_session_state() {
    let h = Harness::new(FakeFetcher::default().with("p1", b"photo"));
    h.photo("p1").await;

    for token in [
        "size:64",
        "opacity:50",
        "position:top_left",
        "color:blue",
        "outline:toggle",
        "outline_width:4",
    ] {
        h.menu(token).await;
    }

    let settings = h.settings().await;
    assert_eq!(settings.font_size, 64);
    assert_eq!(settings.opacity, 128);
    assert_eq!(settings.position, WatermarkPosition::TopLeft);
    assert_eq!(settings.color, ColorName::Blue);
    assert!(!settings.outline);
    assert_eq!(settings.outline_width, 4);
    assert!(matches!(h.state().await, SessionState::MediaPending(_)));
}

#[tokio::test]
async fn test_unknown_and_out_of_range_actions_change_nothing() {
    let h = Harness::new(FakeFetcher::default());

    for token in ["explode", "size:33", "opacity:30", "outline_width:0", "color:pink"] {
        let out = h.menu(token).await;
        assert_eq!(only_text(&out), markbot::bot::messages::UNKNOWN_ACTION, "{token}");
    }
    assert_eq!(h.settings().await, WatermarkSettings::default());
}

#[tokio::test]
async fn test_cancel_drops_pending_media() {
    let h = Harness::new(FakeFetcher::default().with("p1", b"photo"));

    h.photo("p1").await;
    h.menu("cancel").await;
    assert_eq!(h.state().await, SessionState::Idle);

    h.menu("confirm").await;
    assert_eq!(h.photo.calls(), 0);
}

#[tokio::test]
async fn test_reset_restores_defaults() {
    let h = Harness::new(FakeFetcher::default());

    h.menu("color:green").await;
    h.menu("size:80").await;
    h.menu("reset").await;
    assert_eq!(h.settings().await, WatermarkSettings::default());

    h.menu("position:center").await;
    h.command("reset").await;
    assert_eq!(h.settings().await, WatermarkSettings::default());
}

#[tokio::test]
async fn test_commands() {
    let h = Harness::new(FakeFetcher::default());

    let start = h.command("start").await;
    assert!(only_text(&start).contains("Current settings"));

    let help = h.command("help").await;
    assert!(only_text(&help).contains("/settings"));

    let settings = h.command("settings").await;
    assert!(only_text(&settings).contains("Text: Watermark"));

    let unknown = h.command("launch").await;
    assert_eq!(only_text(&unknown), markbot::bot::messages::UNKNOWN_COMMAND);

    assert_eq!(h.state().await, SessionState::Idle);
}

/// Test: first access yields the documented defaults, later access the same object
#[tokio::test]
async fn test_settings_defaults_are_created_once() {
    let h = Harness::new(FakeFetcher::default());

    let first = h.bot.store().get(USER).await;
    assert_eq!(
        first.lock().settings,
        WatermarkSettings {
            text: "Watermark".to_string(),
            font_size: 48,
            opacity: 180,
            position: WatermarkPosition::BottomRight,
            color: ColorName::White,
            outline: true,
            outline_width: 2,
        }
    );

    h.menu("color:black").await;
    let again = h.bot.store().get(USER).await;
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(again.lock().settings.color, ColorName::Black);
}

#[tokio::test]
async fn test_users_do_not_share_sessions() {
    let h = Harness::new(FakeFetcher::default().with("p1", b"photo"));

    h.photo("p1").await;
    let other = h
        .send(InboundEvent::Menu {
            user_id: USER + 1,
            chat_id: CHAT + 1,
            token: "confirm".to_string(),
        })
        .await;

    assert_eq!(other[0].chat_id(), CHAT + 1);
    assert_eq!(h.photo.calls(), 0);
    assert!(matches!(h.state().await, SessionState::MediaPending(_)));
}
