//! Per-user session state.
//!
//! Each user owns one [`UserSession`]: their [`WatermarkSettings`] plus an
//! explicit [`SessionState`]. Sessions live in a [`SessionStore`] keyed by
//! user id, created lazily with default settings and evicted after a
//! configurable idle period.
//!
//! # State machine
//!
//! ```text
//!              photo/video                     confirm / cancel
//!   Idle ──────────────────────▶ MediaPending ─────────────────▶ Idle
//!    │                              │    ▲
//!    │ change_text      change_text │    │ valid text
//!    ▼                              ▼    │
//!   AwaitingTextInput ◀───────── AwaitingTextInput { resume }
//! ```
//!
//! Valid text leaves `AwaitingTextInput` for `MediaPending` when media was
//! pending before the edit started, otherwise for `Idle`. Rejected text
//! leaves the state untouched.

use crate::config::SessionConfig;
use crate::error::WatermarkError;
use crate::watermark::WatermarkSettings;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Chat-service user identifier.
pub type UserId = i64;

/// Shared handle to one user's session.
///
/// Lock only for short synchronous sections; never hold the guard across
/// an `.await`.
pub type SharedSession = Arc<Mutex<UserSession>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Photo => write!(f, "photo"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Opaque handle the chat service uses to identify an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media accepted from the user and waiting for a confirm action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMedia {
    pub kind: MediaKind,
    pub media_ref: MediaRef,
    /// Size reported by the chat service, when known
    pub size_bytes: Option<u64>,
}

impl PendingMedia {
    pub fn photo(media_ref: MediaRef, size_bytes: Option<u64>) -> Self {
        Self {
            kind: MediaKind::Photo,
            media_ref,
            size_bytes,
        }
    }

    pub fn video(media_ref: MediaRef, size_bytes: u64) -> Self {
        Self {
            kind: MediaKind::Video,
            media_ref,
            size_bytes: Some(size_bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Next plain-text message becomes the watermark text.
    AwaitingTextInput {
        /// Media that was pending when the edit started
        resume: Option<PendingMedia>,
    },
    MediaPending(PendingMedia),
}

impl SessionState {
    /// Media held for this user, including media parked behind a text edit.
    pub fn pending(&self) -> Option<&PendingMedia> {
        match self {
            Self::Idle => None,
            Self::AwaitingTextInput { resume } => resume.as_ref(),
            Self::MediaPending(media) => Some(media),
        }
    }

    pub fn is_awaiting_text(&self) -> bool {
        matches!(self, Self::AwaitingTextInput { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingTextInput { .. } => "awaiting_text_input",
            Self::MediaPending(_) => "media_pending",
        }
    }
}

/// Result of feeding a plain-text message to a session.
#[derive(Debug)]
pub enum TextOutcome {
    /// No text edit in progress; nothing changed
    NotAwaiting,
    /// Text stored; carries the media that is pending again, if any
    Accepted { resumed: Option<MediaKind> },
    /// Text rejected; still awaiting text
    Rejected(WatermarkError),
}

/// One user's settings and interaction state.
#[derive(Debug, Clone, Default)]
pub struct UserSession {
    pub settings: WatermarkSettings,
    state: SessionState,
}

impl UserSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Accept new media, returning whatever it replaced.
    pub fn media_received(&mut self, media: PendingMedia) -> Option<PendingMedia> {
        let previous = std::mem::replace(&mut self.state, SessionState::MediaPending(media));
        match previous {
            SessionState::Idle => None,
            SessionState::AwaitingTextInput { resume } => resume,
            SessionState::MediaPending(media) => Some(media),
        }
    }

    /// Start a text edit, parking any pending media.
    pub fn begin_text_input(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            SessionState::Idle => SessionState::AwaitingTextInput { resume: None },
            SessionState::MediaPending(media) => SessionState::AwaitingTextInput {
                resume: Some(media),
            },
            awaiting @ SessionState::AwaitingTextInput { .. } => awaiting,
        };
    }

    pub fn text_received(&mut self, text: &str) -> TextOutcome {
        if !self.state.is_awaiting_text() {
            return TextOutcome::NotAwaiting;
        }

        if let Err(e) = self.settings.set_text(text) {
            return TextOutcome::Rejected(e);
        }

        self.state = match std::mem::take(&mut self.state) {
            SessionState::AwaitingTextInput {
                resume: Some(media),
            } => SessionState::MediaPending(media),
            _ => SessionState::Idle,
        };

        TextOutcome::Accepted {
            resumed: self.state.pending().map(|m| m.kind),
        }
    }

    /// Take the pending media for processing and return to `Idle`.
    ///
    /// Only a `MediaPending` session yields media; any other state is left
    /// as it is.
    pub fn take_pending(&mut self) -> Option<PendingMedia> {
        match std::mem::take(&mut self.state) {
            SessionState::MediaPending(media) => Some(media),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Drop pending media and any text edit in progress.
    pub fn cancel(&mut self) -> Option<PendingMedia> {
        match std::mem::take(&mut self.state) {
            SessionState::Idle => None,
            SessionState::AwaitingTextInput { resume } => resume,
            SessionState::MediaPending(media) => Some(media),
        }
    }

    pub fn reset_settings(&mut self) {
        self.settings = WatermarkSettings::default();
    }
}

/// Concurrent keyed store of user sessions.
///
/// Entries are independent; the cache makes insert-if-absent atomic so two
/// first accesses for the same user observe the same session.
#[derive(Clone)]
pub struct SessionStore {
    cache: moka::future::Cache<UserId, SharedSession>,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_idle(Duration::from_secs(config.idle_ttl_seconds))
            .eviction_listener(|user_id, _session, cause| {
                tracing::debug!(user_id = *user_id, ?cause, "Session evicted");
            })
            .build();

        Self { cache }
    }

    /// Session for `user_id`, created with defaults on first access.
    pub async fn get(&self, user_id: UserId) -> SharedSession {
        self.cache
            .get_with(user_id, async move {
                tracing::debug!(user_id, "Creating session with default settings");
                Arc::new(Mutex::new(UserSession::new()))
            })
            .await
    }

    /// Session for `user_id` if one is live. Does not create one.
    pub async fn peek(&self, user_id: UserId) -> Option<SharedSession> {
        self.cache.get(&user_id).await
    }

    pub async fn remove(&self, user_id: UserId) {
        self.cache.invalidate(&user_id).await;
    }

    /// Approximate number of live sessions.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Process pending evictions and expirations.
    pub async fn run_pending(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
