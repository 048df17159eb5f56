//! Event handling between the chat transport and the watermark engine.
//!
//! [`WatermarkBot::handle_event`] consumes one [`InboundEvent`], drives the
//! user's session, and returns the deliveries the transport should perform.
//! Network I/O stays with the caller, except media retrieval through the
//! [`MediaFetcher`] seam.
//!
//! Rendering is blocking; it runs on tokio's blocking pool so a long video
//! job does not stall other users.

pub mod events;
pub mod menu;
pub mod messages;

use crate::config::Config;
use crate::error::WatermarkError;
use crate::session::{
    MediaKind, MediaRef, PendingMedia, SessionStore, TextOutcome, UserId, UserSession,
};
use crate::watermark::{
    PhotoCompositor, PhotoRenderer, VideoCompositor, VideoRenderer, WatermarkSettings,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

pub use events::{ChatId, InboundEvent, Outbound};
pub use menu::{MenuAction, UnknownAction};

/// Retrieves uploaded media from the chat service.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch_media(&self, media_ref: &MediaRef) -> Result<Bytes, WatermarkError>;
}

/// Enforce the video byte ceiling. A video of exactly `limit` bytes passes.
pub fn check_video_size(size: u64, limit: u64) -> Result<(), WatermarkError> {
    if size > limit {
        return Err(WatermarkError::SizeLimitExceeded { size, limit });
    }
    Ok(())
}

pub struct WatermarkBot {
    store: SessionStore,
    fetcher: Arc<dyn MediaFetcher>,
    photo: Arc<dyn PhotoRenderer>,
    video: Arc<dyn VideoRenderer>,
    max_video_bytes: u64,
}

impl WatermarkBot {
    pub fn new(
        store: SessionStore,
        fetcher: Arc<dyn MediaFetcher>,
        photo: Arc<dyn PhotoRenderer>,
        video: Arc<dyn VideoRenderer>,
        max_video_bytes: u64,
    ) -> Self {
        Self {
            store,
            fetcher,
            photo,
            video,
            max_video_bytes,
        }
    }

    /// Wire the real compositors from configuration.
    pub fn from_config(config: &Config, fetcher: Arc<dyn MediaFetcher>) -> Self {
        let fonts = config.fonts.chain();
        let photo = PhotoCompositor::new(&fonts, config.photo.jpeg_quality);
        let video = VideoCompositor::new(&fonts, config.video.clone());

        Self::new(
            SessionStore::new(&config.sessions),
            fetcher,
            Arc::new(photo),
            Arc::new(video),
            config.limits.max_video_bytes,
        )
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn handle_event(&self, event: InboundEvent) -> Vec<Outbound> {
        tracing::debug!(
            user_id = event.user_id(),
            chat_id = event.chat_id(),
            kind = event.kind(),
            "Handling event"
        );

        match event {
            InboundEvent::Text {
                user_id,
                chat_id,
                text,
            } => self.on_text(user_id, chat_id, &text).await,
            InboundEvent::Photo {
                user_id,
                chat_id,
                media_ref,
                size_bytes,
            } => {
                self.on_media(user_id, chat_id, PendingMedia::photo(media_ref, size_bytes))
                    .await
            }
            InboundEvent::Video {
                user_id,
                chat_id,
                media_ref,
                size_bytes,
            } => {
                if let Err(e) = check_video_size(size_bytes, self.max_video_bytes) {
                    tracing::info!(user_id, size_bytes, limit = self.max_video_bytes, "Video rejected");
                    return vec![Outbound::text(chat_id, e.user_message())];
                }
                self.on_media(user_id, chat_id, PendingMedia::video(media_ref, size_bytes))
                    .await
            }
            InboundEvent::Menu {
                user_id,
                chat_id,
                token,
            } => self.on_menu(user_id, chat_id, &token).await,
            InboundEvent::Command {
                user_id,
                chat_id,
                name,
            } => self.on_command(user_id, chat_id, &name).await,
        }
    }

    async fn on_text(&self, user_id: UserId, chat_id: ChatId, text: &str) -> Vec<Outbound> {
        let session = self.store.get(user_id).await;
        let outcome = session.lock().text_received(text);

        let reply = match outcome {
            TextOutcome::NotAwaiting => messages::TEXT_HINT.to_string(),
            TextOutcome::Accepted { resumed } => {
                tracing::debug!(user_id, "Watermark text updated");
                let mut reply = messages::text_updated(text);
                if let Some(kind) = resumed {
                    reply.push_str(&format!(" Press Confirm to process your {kind}."));
                }
                reply
            }
            TextOutcome::Rejected(e) => e.user_message(),
        };

        vec![Outbound::text(chat_id, reply)]
    }

    async fn on_media(&self, user_id: UserId, chat_id: ChatId, media: PendingMedia) -> Vec<Outbound> {
        let kind = media.kind;
        let session = self.store.get(user_id).await;
        let replaced = session.lock().media_received(media);

        if let Some(previous) = replaced {
            tracing::debug!(user_id, previous = %previous.media_ref, "Replaced pending media");
        }

        let reply = match kind {
            MediaKind::Photo => messages::PHOTO_RECEIVED,
            MediaKind::Video => messages::VIDEO_RECEIVED,
        };
        vec![Outbound::text(chat_id, reply)]
    }

    async fn on_menu(&self, user_id: UserId, chat_id: ChatId, token: &str) -> Vec<Outbound> {
        let action = match token.parse::<MenuAction>() {
            Ok(action) => action,
            Err(UnknownAction(token)) => {
                tracing::debug!(user_id, %token, "Unknown menu action");
                return vec![Outbound::text(chat_id, messages::UNKNOWN_ACTION)];
            }
        };

        let session = self.store.get(user_id).await;
        let reply = apply_menu_action(&mut session.lock(), action);

        match reply {
            Some(text) => vec![Outbound::text(chat_id, text)],
            None => self.confirm(user_id, chat_id).await,
        }
    }

    async fn on_command(&self, user_id: UserId, chat_id: ChatId, name: &str) -> Vec<Outbound> {
        let session = self.store.get(user_id).await;
        let reply = match name {
            "start" => format!("{}\n\n{}", messages::GREETING, session.lock().settings.summary()),
            "help" => messages::HELP.to_string(),
            "settings" => session.lock().settings.summary(),
            "reset" => {
                session.lock().reset_settings();
                messages::SETTINGS_RESET.to_string()
            }
            _ => messages::UNKNOWN_COMMAND.to_string(),
        };
        vec![Outbound::text(chat_id, reply)]
    }

    async fn confirm(&self, user_id: UserId, chat_id: ChatId) -> Vec<Outbound> {
        let session = self.store.get(user_id).await;
        let (media, settings) = {
            let mut session = session.lock();
            if session.state().is_awaiting_text() {
                return vec![Outbound::text(chat_id, messages::FINISH_TEXT_FIRST)];
            }
            let Some(media) = session.take_pending() else {
                return vec![Outbound::text(chat_id, messages::NOTHING_PENDING)];
            };
            (media, session.settings.clone())
        };

        let started = Instant::now();
        let kind = media.kind;
        match self.process(&media, settings, chat_id).await {
            Ok(delivery) => {
                tracing::info!(
                    user_id,
                    %kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Media watermarked"
                );
                vec![delivery]
            }
            Err(e) => {
                tracing::error!(user_id, %kind, error = %e, "Media processing failed");
                vec![Outbound::text(chat_id, e.user_message())]
            }
        }
    }

    async fn process(
        &self,
        media: &PendingMedia,
        settings: WatermarkSettings,
        chat_id: ChatId,
    ) -> Result<Outbound, WatermarkError> {
        let data = self.fetcher.fetch_media(&media.media_ref).await?;

        match media.kind {
            MediaKind::Photo => {
                let renderer = Arc::clone(&self.photo);
                let bytes = run_blocking(move || renderer.render_photo(&data, &settings)).await?;
                Ok(Outbound::Image {
                    chat_id,
                    bytes: Bytes::from(bytes),
                    caption: messages::PHOTO_CAPTION.to_string(),
                })
            }
            MediaKind::Video => {
                // The reported size may be absent or wrong; check what arrived
                check_video_size(data.len() as u64, self.max_video_bytes)?;
                let renderer = Arc::clone(&self.video);
                let bytes = run_blocking(move || renderer.render_video(&data, &settings)).await?;
                Ok(Outbound::Video {
                    chat_id,
                    bytes: Bytes::from(bytes),
                    caption: messages::VIDEO_CAPTION.to_string(),
                })
            }
        }
    }
}

/// Apply a menu action to a session, returning the reply text.
///
/// Returns `None` for [`MenuAction::Confirm`], which needs async processing.
fn apply_menu_action(session: &mut UserSession, action: MenuAction) -> Option<String> {
    let applied = match action {
        MenuAction::Confirm => return None,
        MenuAction::Size(px) => session.settings.set_font_size(px),
        MenuAction::OpacityPercent(percent) => session.settings.set_opacity_percent(percent),
        MenuAction::Position(position) => {
            session.settings.position = position;
            Ok(())
        }
        MenuAction::Color(color) => {
            session.settings.color = color;
            Ok(())
        }
        MenuAction::ToggleOutline => {
            session.settings.toggle_outline();
            Ok(())
        }
        MenuAction::OutlineWidth(width) => session.settings.set_outline_width(width),
        MenuAction::ChangeText => {
            session.begin_text_input();
            return Some(messages::SEND_NEW_TEXT.to_string());
        }
        MenuAction::Cancel => {
            if let Some(dropped) = session.cancel() {
                tracing::debug!(media = %dropped.media_ref, "Pending media cancelled");
            }
            return Some(messages::CANCELLED.to_string());
        }
        MenuAction::Reset => {
            session.reset_settings();
            return Some(messages::SETTINGS_RESET.to_string());
        }
        MenuAction::ShowSettings => return Some(session.settings.summary()),
    };

    let reply = match applied {
        Ok(()) => messages::setting_updated(&session.settings.summary()),
        Err(e) => {
            tracing::debug!(?action, error = %e, "Menu value out of range");
            messages::UNKNOWN_ACTION.to_string()
        }
    };
    Some(reply)
}

async fn run_blocking<F>(job: F) -> Result<Vec<u8>, WatermarkError>
where
    F: FnOnce() -> Result<Vec<u8>, WatermarkError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| WatermarkError::Encode(format!("render task failed: {e}")))?
}
