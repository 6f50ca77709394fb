//! Platform-neutral message, event, and dialog types.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Year the platform reports for a mute-until that means "never muted".
const NEVER_MUTED_YEAR: i32 = 1970;

// ── Identifiers ─────────────────────────────────────────────────────

/// Identifier of a source or target conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl ConversationId {
    /// Canonical (negative-signed) identifier of a basic group.
    pub fn group(raw: i64) -> Self {
        Self(-raw.abs())
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// A message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    /// Conversation the message lives in.
    pub chat: ConversationId,
    pub media: Option<Media>,
    /// Body text, or caption for media messages.
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    /// Set when the message is one item of an album.
    pub grouped_id: Option<String>,
}

impl Message {
    pub fn new(id: i64, chat: ConversationId) -> Self {
        Self {
            id,
            chat,
            media: None,
            text: None,
            entities: Vec::new(),
            grouped_id: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_entities(mut self, entities: Vec<MessageEntity>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_grouped_id(mut self, grouped_id: impl Into<String>) -> Self {
        self.grouped_id = Some(grouped_id.into());
        self
    }

    pub fn poll(&self) -> Option<&Poll> {
        match &self.media {
            Some(Media::Poll(poll)) => Some(poll),
            _ => None,
        }
    }
}

/// Media attached to a message. File variants carry the platform file reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Media {
    Photo { file: String },
    Video { file: String },
    Document { file: String },
    Audio { file: String },
    Animation { file: String },
    Poll(Poll),
    /// Anything the transport can forward but not re-send (stickers, voice notes, ...).
    Other,
}

impl Media {
    pub fn label(&self) -> &'static str {
        match self {
            Media::Photo { .. } => "photo",
            Media::Video { .. } => "video",
            Media::Document { .. } => "document",
            Media::Audio { .. } => "audio",
            Media::Animation { .. } => "animation",
            Media::Poll(_) => "poll",
            Media::Other => "other",
        }
    }
}

/// A poll payload, sufficient to reconstruct an equivalent poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub question: String,
    pub options: Vec<String>,
    pub is_anonymous: bool,
    pub allows_multiple_answers: bool,
    pub kind: PollKind,
    pub correct_option_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollKind {
    #[default]
    Regular,
    Quiz,
}

impl PollKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PollKind::Regular => "regular",
            PollKind::Quiz => "quiz",
        }
    }
}

/// Formatting or link entity over a span of message text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntity {
    /// Platform entity type, e.g. `bold`, `url`, `text_link`.
    pub kind: String,
    pub offset: i64,
    pub length: i64,
    /// Target of a `text_link` entity.
    pub url: Option<String>,
}

// ── Events ──────────────────────────────────────────────────────────

/// Event delivered by the transport's dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    NewMessage {
        conversation: ConversationId,
        message: Message,
    },
    EditedMessage {
        conversation: ConversationId,
        message: Message,
    },
    Album {
        conversation: ConversationId,
        messages: Vec<Message>,
    },
}

impl InboundEvent {
    pub fn conversation(&self) -> ConversationId {
        match self {
            InboundEvent::NewMessage { conversation, .. }
            | InboundEvent::EditedMessage { conversation, .. }
            | InboundEvent::Album { conversation, .. } => *conversation,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InboundEvent::NewMessage { .. } => "new_message",
            InboundEvent::EditedMessage { .. } => "edited_message",
            InboundEvent::Album { .. } => "album",
        }
    }
}

// ── Transport results ───────────────────────────────────────────────

/// A message created in the target conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub id: i64,
    pub chat: ConversationId,
}

/// The authorized account the transport runs as.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub username: Option<String>,
}

/// A conversation known to the account, with its notification state.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialog {
    pub id: ConversationId,
    pub mute_until: Option<DateTime<Utc>>,
}

impl Dialog {
    pub fn unmuted(id: ConversationId) -> Self {
        Self {
            id,
            mute_until: None,
        }
    }

    /// True when notifications are on: no mute-until, or the "never muted" sentinel.
    pub fn is_unmuted(&self) -> bool {
        match self.mute_until {
            None => true,
            Some(until) => until.year() == NEVER_MUTED_YEAR,
        }
    }
}

/// A named, user-defined grouping of conversations.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogFilter {
    pub title: String,
    pub include_peers: Vec<PeerRef>,
}

/// Member reference inside a dialog filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRef {
    User(i64),
    Channel(i64),
    /// Basic group; needs resolving before it can be compared to event conversations.
    Group(i64),
}

/// Result of resolving a peer reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    pub id: i64,
}
