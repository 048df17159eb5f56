// Inbound and outbound event types exchanged with the chat transport

use crate::session::{MediaRef, UserId};
use bytes::Bytes;

/// Chat-service conversation identifier.
pub type ChatId = i64;

/// An event delivered by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text {
        user_id: UserId,
        chat_id: ChatId,
        text: String,
    },
    Photo {
        user_id: UserId,
        chat_id: ChatId,
        media_ref: MediaRef,
        size_bytes: Option<u64>,
    },
    Video {
        user_id: UserId,
        chat_id: ChatId,
        media_ref: MediaRef,
        size_bytes: u64,
    },
    /// Button press carrying an action token such as `size:64`
    Menu {
        user_id: UserId,
        chat_id: ChatId,
        token: String,
    },
    /// Slash command without the leading slash
    Command {
        user_id: UserId,
        chat_id: ChatId,
        name: String,
    },
}

impl InboundEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Text { user_id, .. }
            | Self::Photo { user_id, .. }
            | Self::Video { user_id, .. }
            | Self::Menu { user_id, .. }
            | Self::Command { user_id, .. } => *user_id,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Text { chat_id, .. }
            | Self::Photo { chat_id, .. }
            | Self::Video { chat_id, .. }
            | Self::Menu { chat_id, .. }
            | Self::Command { chat_id, .. } => *chat_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Photo { .. } => "photo",
            Self::Video { .. } => "video",
            Self::Menu { .. } => "menu",
            Self::Command { .. } => "command",
        }
    }
}

/// A delivery the transport performs on the core's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Image {
        chat_id: ChatId,
        bytes: Bytes,
        caption: String,
    },
    Video {
        chat_id: ChatId,
        bytes: Bytes,
        caption: String,
    },
    Text {
        chat_id: ChatId,
        text: String,
    },
}

impl Outbound {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self::Text {
            chat_id,
            text: text.into(),
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Image { chat_id, .. } | Self::Video { chat_id, .. } | Self::Text { chat_id, .. } => {
                *chat_id
            }
        }
    }

    /// Text body for text deliveries.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}
