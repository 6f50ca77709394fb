//! Telegram transport — long-polls the Bot API for updates.
//!
//! Mirroring maps onto `forwardMessage`, `copyMessage`, `sendPoll`,
//! `sendMediaGroup` and `sendMessage`. The Bot API reports no mute state
//! and no dialog filters, so dialogs are the chats seen so far plus the
//! configured seed chats.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::transport::{
    Account, ConversationId, Dialog, DialogFilter, Entity, EventStream, InboundEvent, Media,
    Message, MessageEntity, Poll, PollKind, SentMessage, Transport,
};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Long-poll timeout while nothing is buffered.
const LONG_POLL_TIMEOUT_SECS: u64 = 30;

/// Short poll used while an album is waiting for its remaining items.
const ALBUM_POLL_TIMEOUT_SECS: u64 = 1;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default quiet period before a buffered album is flushed.
pub const DEFAULT_ALBUM_QUIET_PERIOD: Duration = Duration::from_secs(1);

const ALLOWED_UPDATES: [&str; 4] = [
    "message",
    "edited_message",
    "channel_post",
    "edited_channel_post",
];

/// Bot API transport settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    /// Chats reported as dialogs before the bot has seen any update from them.
    pub seed_chats: Vec<ConversationId>,
    /// How long an album must stay quiet before it is flushed.
    pub album_quiet_period: Duration,
}

/// Telegram transport over the Bot API.
pub struct TelegramTransport {
    config: TelegramConfig,
    client: reqwest::Client,
    known_chats: Arc<RwLock<BTreeMap<ConversationId, Dialog>>>,
}

impl TelegramTransport {
    pub fn new(config: TelegramConfig) -> Self {
        let known_chats = config
            .seed_chats
            .iter()
            .map(|id| (*id, Dialog::unmuted(*id)))
            .collect();
        Self {
            config,
            client: reqwest::Client::new(),
            known_chats: Arc::new(RwLock::new(known_chats)),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{TELEGRAM_API_BASE}/bot{}/{method}",
            self.config.bot_token.expose_secret()
        )
    }

    /// POST a Bot API method and decode its `result`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, TransportError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(format!("{method}: {}", e.without_url())))?;

        let data: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| TransportError::Http(format!("{method}: {}", e.without_url())))?;

        api_result(method, data)
    }

    async fn send_text(
        &self,
        target: ConversationId,
        text: &str,
        entities: &[MessageEntity],
    ) -> Result<SentMessage, TransportError> {
        let mut body = json!({
            "chat_id": target.get(),
            "text": text,
        });
        if !entities.is_empty() {
            body["entities"] = entities_payload(entities);
        }
        let sent: BotMessage = self.call("sendMessage", &body).await?;
        Ok(sent.sent())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn authorize(&self) -> Result<Account, TransportError> {
        let me: BotUser =
            self.call("getMe", &json!({}))
                .await
                .map_err(|e| TransportError::AuthFailed {
                    name: "telegram".into(),
                    reason: e.to_string(),
                })?;
        Ok(Account {
            id: me.id,
            username: me.username,
        })
    }

    async fn start(&self) -> Result<EventStream, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let updates_url = self.api_url("getUpdates");
        let known_chats = Arc::clone(&self.known_chats);
        let mut albums = AlbumBuffer::new(self.config.album_quiet_period);

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            info!("Telegram transport listening for updates...");

            loop {
                let timeout = if albums.is_empty() {
                    LONG_POLL_TIMEOUT_SECS
                } else {
                    ALBUM_POLL_TIMEOUT_SECS
                };
                let body = json!({
                    "offset": offset,
                    "timeout": timeout,
                    "allowed_updates": ALLOWED_UPDATES,
                });

                let updates = match fetch_updates(&client, &updates_url, &body).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        warn!("Telegram poll error: {e}");
                        tokio::time::sleep(RETRY_DELAY).await;
                        continue;
                    }
                };

                let mut events = Vec::new();
                for update in updates {
                    offset = update.update_id + 1;

                    let Some(parsed) = parse_update(update) else {
                        continue;
                    };

                    let chat = parsed.message().chat;
                    known_chats
                        .write()
                        .await
                        .entry(chat)
                        .or_insert_with(|| Dialog::unmuted(chat));

                    match parsed {
                        ParsedUpdate::New(message) => {
                            if let Some(group) = message.grouped_id.clone() {
                                albums.push(group, message.clone(), Instant::now());
                            }
                            events.push(InboundEvent::NewMessage {
                                conversation: chat,
                                message,
                            });
                        }
                        ParsedUpdate::Edited(message) => {
                            events.push(InboundEvent::EditedMessage {
                                conversation: chat,
                                message,
                            });
                        }
                    }
                }
                events.extend(albums.drain_ready(Instant::now()));

                for event in events {
                    if tx.send(event).is_err() {
                        info!("Telegram event receiver closed");
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn send_forward(
        &self,
        target: ConversationId,
        message: &Message,
    ) -> Result<SentMessage, TransportError> {
        let body = json!({
            "chat_id": target.get(),
            "from_chat_id": message.chat.get(),
            "message_id": message.id,
        });
        let sent: BotMessage = self.call("forwardMessage", &body).await?;
        Ok(sent.sent())
    }

    async fn send_copy(
        &self,
        target: ConversationId,
        message: &Message,
        text: &str,
        entities: &[MessageEntity],
    ) -> Result<SentMessage, TransportError> {
        match &message.media {
            None => self.send_text(target, text, entities).await,
            Some(Media::Poll(_)) => Err(TransportError::Unsupported(
                "polls cannot be copied with a new caption".into(),
            )),
            Some(_) => {
                let mut body = json!({
                    "chat_id": target.get(),
                    "from_chat_id": message.chat.get(),
                    "message_id": message.id,
                    "caption": text,
                });
                if !entities.is_empty() {
                    body["caption_entities"] = entities_payload(entities);
                }
                let copied: BotMessageId = self.call("copyMessage", &body).await?;
                Ok(SentMessage {
                    id: copied.message_id,
                    chat: target,
                })
            }
        }
    }

    async fn send_poll(
        &self,
        target: ConversationId,
        poll: &Poll,
    ) -> Result<SentMessage, TransportError> {
        let body = poll_payload(target, poll);
        let sent: BotMessage = self.call("sendPoll", &body).await?;
        Ok(sent.sent())
    }

    async fn send_file(
        &self,
        target: ConversationId,
        files: &[Media],
        captions: &[Option<String>],
    ) -> Result<Vec<SentMessage>, TransportError> {
        let body = json!({
            "chat_id": target.get(),
            "media": media_group_payload(files, captions)?,
        });
        let sent: Vec<BotMessage> = self.call("sendMediaGroup", &body).await?;
        Ok(sent.into_iter().map(BotMessage::sent).collect())
    }

    async fn send_message(
        &self,
        target: ConversationId,
        text: &str,
    ) -> Result<SentMessage, TransportError> {
        self.send_text(target, text, &[]).await
    }

    async fn get_dialogs(&self) -> Result<Vec<Dialog>, TransportError> {
        Ok(self.known_chats.read().await.values().cloned().collect())
    }

    async fn get_dialog_filters(&self) -> Result<Vec<DialogFilter>, TransportError> {
        debug!("Bot API exposes no dialog filters");
        Ok(Vec::new())
    }

    async fn resolve_entity(&self, id: i64) -> Result<Entity, TransportError> {
        let chat: BotChat = self
            .call("getChat", &json!({ "chat_id": ConversationId::group(id).get() }))
            .await
            .map_err(|e| TransportError::ResolveFailed {
                id,
                reason: e.to_string(),
            })?;
        Ok(Entity { id: chat.id })
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<BotMessage>,
    #[serde(default)]
    edited_message: Option<BotMessage>,
    #[serde(default)]
    channel_post: Option<BotMessage>,
    #[serde(default)]
    edited_channel_post: Option<BotMessage>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct BotMessageId {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct BotFile {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct BotEntity {
    #[serde(rename = "type")]
    kind: String,
    offset: i64,
    length: i64,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotPollOption {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BotPoll {
    question: String,
    options: Vec<BotPollOption>,
    #[serde(default = "default_true")]
    is_anonymous: bool,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    allows_multiple_answers: bool,
    #[serde(default)]
    correct_option_id: Option<i64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct BotMessage {
    message_id: i64,
    chat: BotChat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    entities: Vec<BotEntity>,
    #[serde(default)]
    caption_entities: Vec<BotEntity>,
    #[serde(default)]
    media_group_id: Option<String>,
    #[serde(default)]
    photo: Option<Vec<BotFile>>,
    #[serde(default)]
    video: Option<BotFile>,
    #[serde(default)]
    animation: Option<BotFile>,
    #[serde(default)]
    document: Option<BotFile>,
    #[serde(default)]
    audio: Option<BotFile>,
    #[serde(default)]
    poll: Option<BotPoll>,
    #[serde(default)]
    sticker: Option<Value>,
    #[serde(default)]
    voice: Option<Value>,
    #[serde(default)]
    video_note: Option<Value>,
}

impl BotMessage {
    fn sent(self) -> SentMessage {
        SentMessage {
            id: self.message_id,
            chat: ConversationId(self.chat.id),
        }
    }

    fn into_message(self) -> Message {
        // `animation` messages also carry `document`, so check it first.
        let media = if let Some(poll) = self.poll {
            Some(Media::Poll(Poll {
                question: poll.question,
                options: poll.options.into_iter().map(|o| o.text).collect(),
                is_anonymous: poll.is_anonymous,
                allows_multiple_answers: poll.allows_multiple_answers,
                kind: match poll.kind.as_deref() {
                    Some("quiz") => PollKind::Quiz,
                    _ => PollKind::Regular,
                },
                correct_option_id: poll.correct_option_id,
            }))
        } else if let Some(sizes) = self.photo {
            // Sizes are ordered smallest first.
            sizes
                .into_iter()
                .last()
                .map(|largest| Media::Photo {
                    file: largest.file_id,
                })
        } else if let Some(f) = self.animation {
            Some(Media::Animation { file: f.file_id })
        } else if let Some(f) = self.video {
            Some(Media::Video { file: f.file_id })
        } else if let Some(f) = self.audio {
            Some(Media::Audio { file: f.file_id })
        } else if let Some(f) = self.document {
            Some(Media::Document { file: f.file_id })
        } else if self.sticker.is_some() || self.voice.is_some() || self.video_note.is_some() {
            Some(Media::Other)
        } else {
            None
        };

        let (text, entities) = if self.text.is_some() {
            (self.text, self.entities)
        } else {
            (self.caption, self.caption_entities)
        };

        Message {
            id: self.message_id,
            chat: ConversationId(self.chat.id),
            media,
            text,
            entities: entities
                .into_iter()
                .map(|e| MessageEntity {
                    kind: e.kind,
                    offset: e.offset,
                    length: e.length,
                    url: e.url,
                })
                .collect(),
            grouped_id: self.media_group_id,
        }
    }
}

enum ParsedUpdate {
    New(Message),
    Edited(Message),
}

impl ParsedUpdate {
    fn message(&self) -> &Message {
        match self {
            ParsedUpdate::New(m) | ParsedUpdate::Edited(m) => m,
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_result<T>(method: &str, data: ApiResponse<T>) -> Result<T, TransportError> {
    if !data.ok {
        return Err(TransportError::Api {
            method: method.to_string(),
            description: data
                .description
                .unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    data.result.ok_or_else(|| TransportError::Api {
        method: method.to_string(),
        description: "response has no result".to_string(),
    })
}

async fn fetch_updates(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
) -> Result<Vec<Update>, TransportError> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| TransportError::Http(e.without_url().to_string()))?;
    let data: ApiResponse<Vec<Update>> = resp
        .json()
        .await
        .map_err(|e| TransportError::Http(e.without_url().to_string()))?;
    api_result("getUpdates", data)
}

fn parse_update(update: Update) -> Option<ParsedUpdate> {
    if let Some(m) = update.message.or(update.channel_post) {
        return Some(ParsedUpdate::New(m.into_message()));
    }
    update
        .edited_message
        .or(update.edited_channel_post)
        .map(|m| ParsedUpdate::Edited(m.into_message()))
}

fn entities_payload(entities: &[MessageEntity]) -> Value {
    Value::Array(
        entities
            .iter()
            .map(|e| {
                let mut v = json!({
                    "type": e.kind,
                    "offset": e.offset,
                    "length": e.length,
                });
                if let Some(url) = &e.url {
                    v["url"] = Value::String(url.clone());
                }
                v
            })
            .collect(),
    )
}

fn poll_payload(target: ConversationId, poll: &Poll) -> Value {
    let mut body = json!({
        "chat_id": target.get(),
        "question": poll.question,
        "options": poll.options.iter().map(|o| json!({ "text": o })).collect::<Vec<_>>(),
        "is_anonymous": poll.is_anonymous,
        "type": poll.kind.as_str(),
        "allows_multiple_answers": poll.allows_multiple_answers,
    });
    if let Some(correct) = poll.correct_option_id {
        body["correct_option_id"] = json!(correct);
    }
    body
}

/// Build the `media` array for `sendMediaGroup`.
fn media_group_payload(
    files: &[Media],
    captions: &[Option<String>],
) -> Result<Value, TransportError> {
    let mut items = Vec::with_capacity(files.len());
    for (idx, media) in files.iter().enumerate() {
        let (kind, file) = match media {
            Media::Photo { file } => ("photo", file),
            Media::Video { file } => ("video", file),
            Media::Document { file } => ("document", file),
            Media::Audio { file } => ("audio", file),
            other => {
                return Err(TransportError::Unsupported(format!(
                    "{} cannot be part of a media group",
                    other.label()
                )));
            }
        };
        let mut item = json!({ "type": kind, "media": file });
        if let Some(Some(caption)) = captions.get(idx) {
            item["caption"] = Value::String(caption.clone());
        }
        items.push(item);
    }
    Ok(Value::Array(items))
}

// ── Album buffering ─────────────────────────────────────────────────

/// Collects album items that arrive as separate updates.
struct AlbumBuffer {
    quiet: Duration,
    pending: HashMap<String, PendingAlbum>,
}

struct PendingAlbum {
    conversation: ConversationId,
    messages: Vec<Message>,
    last_seen: Instant,
}

impl AlbumBuffer {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: HashMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn push(&mut self, group: String, message: Message, now: Instant) {
        let conversation = message.chat;
        let album = self.pending.entry(group).or_insert_with(|| PendingAlbum {
            conversation,
            messages: Vec::new(),
            last_seen: now,
        });
        album.messages.push(message);
        album.last_seen = now;
    }

    /// Remove and return every album that has been quiet long enough.
    fn drain_ready(&mut self, now: Instant) -> Vec<InboundEvent> {
        let ready: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, album)| now.duration_since(album.last_seen) >= self.quiet)
            .map(|(group, _)| group.clone())
            .collect();

        ready
            .into_iter()
            .filter_map(|group| self.pending.remove(&group))
            .map(|mut album| {
                album.messages.sort_by_key(|m| m.id);
                InboundEvent::Album {
                    conversation: album.conversation,
                    messages: album.messages,
                }
            })
            .collect()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> TelegramTransport {
        TelegramTransport::new(TelegramConfig {
            bot_token: SecretString::from("123:ABC"),
            seed_chats: vec![ConversationId(-1001)],
            album_quiet_period: Duration::from_secs(1),
        })
    }

    fn update(json: Value) -> Update {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn telegram_transport_name() {
        assert_eq!(transport().name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            transport().api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[tokio::test]
    async fn seed_chats_are_reported_as_unmuted_dialogs() {
        let dialogs = transport().get_dialogs().await.unwrap();
        assert_eq!(dialogs, vec![Dialog::unmuted(ConversationId(-1001))]);
    }

    #[tokio::test]
    async fn bot_api_has_no_dialog_filters() {
        assert!(transport().get_dialog_filters().await.unwrap().is_empty());
    }

    #[test]
    fn parse_channel_post_photo_with_caption() {
        let parsed = parse_update(update(json!({
            "update_id": 10,
            "channel_post": {
                "message_id": 5,
                "chat": { "id": -1001 },
                "caption": "look https://example.com",
                "caption_entities": [{ "type": "url", "offset": 5, "length": 19 }],
                "photo": [{ "file_id": "small" }, { "file_id": "large" }]
            }
        })))
        .unwrap();

        let ParsedUpdate::New(msg) = parsed else {
            panic!("expected a new message");
        };
        assert_eq!(msg.id, 5);
        assert_eq!(msg.chat, ConversationId(-1001));
        assert_eq!(
            msg.media,
            Some(Media::Photo {
                file: "large".into()
            })
        );
        assert_eq!(msg.text.as_deref(), Some("look https://example.com"));
        assert_eq!(msg.entities.len(), 1);
        assert!(msg.grouped_id.is_none());
    }

    #[test]
    fn parse_edited_message() {
        let parsed = parse_update(update(json!({
            "update_id": 11,
            "edited_message": {
                "message_id": 7,
                "chat": { "id": 100 },
                "text": "fixed typo"
            }
        })))
        .unwrap();
        assert!(matches!(parsed, ParsedUpdate::Edited(ref m) if m.id == 7 && m.media.is_none()));
    }

    #[test]
    fn parse_quiz_poll() {
        let parsed = parse_update(update(json!({
            "update_id": 12,
            "message": {
                "message_id": 8,
                "chat": { "id": 100 },
                "poll": {
                    "question": "2+2?",
                    "options": [{ "text": "3" }, { "text": "4" }],
                    "is_anonymous": true,
                    "type": "quiz",
                    "allows_multiple_answers": false,
                    "correct_option_id": 1
                }
            }
        })))
        .unwrap();
        let poll = parsed.message().poll().cloned().unwrap();
        assert_eq!(poll.options, vec!["3", "4"]);
        assert_eq!(poll.kind, PollKind::Quiz);
        assert_eq!(poll.correct_option_id, Some(1));
    }

    #[test]
    fn parse_animation_prefers_animation_over_document() {
        let parsed = parse_update(update(json!({
            "update_id": 13,
            "message": {
                "message_id": 9,
                "chat": { "id": 100 },
                "animation": { "file_id": "anim" },
                "document": { "file_id": "doc" }
            }
        })))
        .unwrap();
        assert_eq!(
            parsed.message().media,
            Some(Media::Animation {
                file: "anim".into()
            })
        );
    }

    #[test]
    fn parse_sticker_is_other_media() {
        let parsed = parse_update(update(json!({
            "update_id": 14,
            "message": {
                "message_id": 10,
                "chat": { "id": 100 },
                "sticker": { "file_id": "s" }
            }
        })))
        .unwrap();
        assert_eq!(parsed.message().media, Some(Media::Other));
    }

    #[test]
    fn parse_ignores_updates_without_messages() {
        assert!(parse_update(update(json!({ "update_id": 15 }))).is_none());
    }

    #[test]
    fn album_buffer_waits_for_quiet_period() {
        let mut albums = AlbumBuffer::new(Duration::from_secs(1));
        let start = Instant::now();
        let chat = ConversationId(100);

        albums.push("g1".into(), Message::new(2, chat), start);
        albums.push("g1".into(), Message::new(1, chat), start);
        assert!(albums.drain_ready(start).is_empty());

        let events = albums.drain_ready(start + Duration::from_secs(1));
        assert_eq!(events.len(), 1);
        let InboundEvent::Album {
            conversation,
            messages,
        } = &events[0]
        else {
            panic!("expected an album");
        };
        assert_eq!(*conversation, chat);
        let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(albums.is_empty());
    }

    #[test]
    fn media_group_payload_zips_captions() {
        let files = vec![
            Media::Photo { file: "a".into() },
            Media::Video { file: "b".into() },
        ];
        let captions = vec![Some("first".to_string()), None];
        let payload = media_group_payload(&files, &captions).unwrap();
        assert_eq!(
            payload,
            json!([
                { "type": "photo", "media": "a", "caption": "first" },
                { "type": "video", "media": "b" }
            ])
        );
    }

    #[test]
    fn media_group_rejects_polls() {
        let poll = Poll {
            question: "q".into(),
            options: vec!["a".into(), "b".into()],
            is_anonymous: true,
            allows_multiple_answers: false,
            kind: PollKind::Regular,
            correct_option_id: None,
        };
        assert!(media_group_payload(&[Media::Poll(poll)], &[None]).is_err());
    }

    #[test]
    fn poll_payload_includes_correct_option_for_quiz() {
        let poll = Poll {
            question: "q".into(),
            options: vec!["a".into(), "b".into()],
            is_anonymous: true,
            allows_multiple_answers: false,
            kind: PollKind::Quiz,
            correct_option_id: Some(0),
        };
        let body = poll_payload(ConversationId(999), &poll);
        assert_eq!(body["chat_id"], json!(999));
        assert_eq!(body["type"], json!("quiz"));
        assert_eq!(body["correct_option_id"], json!(0));
        assert_eq!(body["options"], json!([{ "text": "a" }, { "text": "b" }]));
    }

    #[test]
    fn api_result_surfaces_description() {
        let data: ApiResponse<BotUser> = serde_json::from_value(json!({
            "ok": false,
            "description": "Unauthorized"
        }))
        .unwrap();
        let err = api_result("getMe", data).unwrap_err();
        assert_eq!(err.to_string(), "getMe rejected by the platform: Unauthorized");
    }

    #[tokio::test]
    async fn telegram_authorize_with_fake_token_fails() {
        let t = TelegramTransport::new(TelegramConfig {
            bot_token: SecretString::from("fake-token"),
            seed_chats: vec![],
            album_quiet_period: Duration::from_secs(1),
        });
        let err = t.authorize().await.unwrap_err();
        assert!(matches!(err, TransportError::AuthFailed { .. }));
    }
}
