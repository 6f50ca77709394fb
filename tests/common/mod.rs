//! Recording fake transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use telemirror::error::{DatabaseError, TransportError};
use telemirror::mirror::{ActivityFilter, ActivityPolicy, IdentityMap, MirrorPipeline, RateLimiter};
use telemirror::store::{LibSqlBackend, MirrorRecord, MirrorStore};
use telemirror::transport::{
    Account, ConversationId, Dialog, DialogFilter, Entity, EventStream, InboundEvent, Media,
    Message, MessageEntity, Poll, SentMessage, Transport,
};

pub const SOURCE: ConversationId = ConversationId(100);
pub const TARGET: ConversationId = ConversationId(999);

/// One outbound call observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Forward {
        target: ConversationId,
        message_id: i64,
    },
    Copy {
        target: ConversationId,
        message_id: i64,
        text: String,
    },
    Poll {
        target: ConversationId,
        question: String,
    },
    File {
        target: ConversationId,
        items: usize,
        captions: Vec<Option<String>>,
    },
    Message {
        target: ConversationId,
        text: String,
    },
}

impl Call {
    pub fn target(&self) -> ConversationId {
        match self {
            Call::Forward { target, .. }
            | Call::Copy { target, .. }
            | Call::Poll { target, .. }
            | Call::File { target, .. }
            | Call::Message { target, .. } => *target,
        }
    }
}

pub struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    dialogs: Mutex<Vec<Dialog>>,
    filters: Mutex<Vec<DialogFilter>>,
    unresolvable: Mutex<HashSet<i64>>,
    album_limit: Mutex<Option<usize>>,
    events: Mutex<Option<Vec<InboundEvent>>>,
    fail_sends: AtomicBool,
    fail_dialogs: AtomicBool,
    fail_filters: AtomicBool,
    learn_chats: AtomicBool,
    authorized: AtomicBool,
    started: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            dialogs: Mutex::new(Vec::new()),
            filters: Mutex::new(Vec::new()),
            unresolvable: Mutex::new(HashSet::new()),
            album_limit: Mutex::new(None),
            events: Mutex::new(None),
            fail_sends: AtomicBool::new(false),
            fail_dialogs: AtomicBool::new(false),
            fail_filters: AtomicBool::new(false),
            learn_chats: AtomicBool::new(false),
            authorized: AtomicBool::new(true),
            started: AtomicBool::new(false),
        }
    }

    pub fn with_dialogs(self, dialogs: Vec<Dialog>) -> Self {
        *self.dialogs.lock().unwrap() = dialogs;
        self
    }

    pub fn with_filters(self, filters: Vec<DialogFilter>) -> Self {
        *self.filters.lock().unwrap() = filters;
        self
    }

    pub fn with_unresolvable(self, id: i64) -> Self {
        self.unresolvable.lock().unwrap().insert(id);
        self
    }

    /// Return at most `limit` mirrors from `send_file`.
    pub fn with_album_limit(self, limit: usize) -> Self {
        *self.album_limit.lock().unwrap() = Some(limit);
        self
    }

    pub fn with_events(self, events: Vec<InboundEvent>) -> Self {
        *self.events.lock().unwrap() = Some(events);
        self
    }

    /// Report each event's chat as an unmuted dialog once the stream starts,
    /// the way a bot only learns of chats from their updates.
    pub fn learning_chats(self) -> Self {
        self.learn_chats.store(true, Ordering::SeqCst);
        self
    }

    pub fn unauthorized(self) -> Self {
        self.authorized.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_dialogs(&self, fail: bool) {
        self.fail_dialogs.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_filters(&self, fail: bool) {
        self.fail_filters.store(fail, Ordering::SeqCst);
    }

    pub fn set_dialogs(&self, dialogs: Vec<Dialog>) {
        *self.dialogs.lock().unwrap() = dialogs;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Id the next successful send will return.
    pub fn peek_next_id(&self) -> i64 {
        self.next_id.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) -> Result<SentMessage, TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                method: "fake".into(),
                description: "Bad Request: chat not found".into(),
            });
        }
        let chat = call.target();
        self.calls.lock().unwrap().push(call);
        Ok(SentMessage {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            chat,
        })
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn name(&self) -> &str {
        "fake"
    }

    async fn authorize(&self) -> Result<Account, TransportError> {
        if self.authorized.load(Ordering::SeqCst) {
            Ok(Account {
                id: 1,
                username: Some("mirror_bot".into()),
            })
        } else {
            Err(TransportError::AuthFailed {
                name: "fake".into(),
                reason: "Unauthorized".into(),
            })
        }
    }

    async fn start(&self) -> Result<EventStream, TransportError> {
        self.started.store(true, Ordering::SeqCst);
        let events = self.events.lock().unwrap().take().unwrap_or_default();
        if self.learn_chats.load(Ordering::SeqCst) {
            let mut dialogs = self.dialogs.lock().unwrap();
            for event in &events {
                let chat = event.conversation();
                if !dialogs.iter().any(|d| d.id == chat) {
                    dialogs.push(Dialog::unmuted(chat));
                }
            }
        }
        Ok(Box::pin(stream::iter(events)))
    }

    async fn send_forward(
        &self,
        target: ConversationId,
        message: &Message,
    ) -> Result<SentMessage, TransportError> {
        self.record(Call::Forward {
            target,
            message_id: message.id,
        })
    }

    async fn send_copy(
        &self,
        target: ConversationId,
        message: &Message,
        text: &str,
        _entities: &[MessageEntity],
    ) -> Result<SentMessage, TransportError> {
        self.record(Call::Copy {
            target,
            message_id: message.id,
            text: text.to_string(),
        })
    }

    async fn send_poll(
        &self,
        target: ConversationId,
        poll: &Poll,
    ) -> Result<SentMessage, TransportError> {
        self.record(Call::Poll {
            target,
            question: poll.question.clone(),
        })
    }

    async fn send_file(
        &self,
        target: ConversationId,
        files: &[Media],
        captions: &[Option<String>],
    ) -> Result<Vec<SentMessage>, TransportError> {
        let first = self.record(Call::File {
            target,
            items: files.len(),
            captions: captions.to_vec(),
        })?;
        let returned = self
            .album_limit
            .lock()
            .unwrap()
            .map_or(files.len(), |limit| limit.min(files.len()));
        if returned == 0 {
            return Ok(Vec::new());
        }
        let mut sent = vec![first];
        for _ in 1..returned {
            sent.push(SentMessage {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                chat: target,
            });
        }
        Ok(sent)
    }

    async fn send_message(
        &self,
        target: ConversationId,
        text: &str,
    ) -> Result<SentMessage, TransportError> {
        self.record(Call::Message {
            target,
            text: text.to_string(),
        })
    }

    async fn get_dialogs(&self) -> Result<Vec<Dialog>, TransportError> {
        if self.fail_dialogs.load(Ordering::SeqCst) {
            return Err(TransportError::Http("connection reset".into()));
        }
        Ok(self.dialogs.lock().unwrap().clone())
    }

    async fn get_dialog_filters(&self) -> Result<Vec<DialogFilter>, TransportError> {
        if self.fail_filters.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                method: "getDialogFilters".into(),
                description: "FLOOD_WAIT_5".into(),
            });
        }
        Ok(self.filters.lock().unwrap().clone())
    }

    async fn resolve_entity(&self, id: i64) -> Result<Entity, TransportError> {
        if self.unresolvable.lock().unwrap().contains(&id) {
            return Err(TransportError::ResolveFailed {
                id,
                reason: "CHAT_ID_INVALID".into(),
            });
        }
        Ok(Entity { id })
    }
}

/// Store wrapper whose inserts or lookups can be switched to fail.
pub struct FlakyStore {
    inner: LibSqlBackend,
    fail_inserts: AtomicBool,
    fail_lookups: AtomicBool,
}

impl FlakyStore {
    pub async fn new() -> Self {
        Self {
            inner: LibSqlBackend::new_memory().await.unwrap(),
            fail_inserts: AtomicBool::new(false),
            fail_lookups: AtomicBool::new(false),
        }
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MirrorStore for FlakyStore {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.inner.run_migrations().await
    }

    async fn insert_mirror(&self, record: &MirrorRecord) -> Result<(), DatabaseError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DatabaseError::Query("database is locked".into()));
        }
        self.inner.insert_mirror(record).await
    }

    async fn find_by_original(
        &self,
        original_id: i64,
        original_channel: ConversationId,
    ) -> Result<Vec<MirrorRecord>, DatabaseError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(DatabaseError::Query("disk I/O error".into()));
        }
        self.inner.find_by_original(original_id, original_channel).await
    }

    async fn count_mirrors(&self) -> Result<usize, DatabaseError> {
        self.inner.count_mirrors().await
    }
}

/// Everything a pipeline test needs, wired to one in-memory store.
pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub activity: Arc<ActivityFilter>,
    pub identity: IdentityMap,
    pub limiter: Arc<RateLimiter>,
}

impl Harness {
    /// Unmuted `active` dialogs, refreshed once.
    pub async fn new(active: &[ConversationId]) -> Self {
        let transport = FakeTransport::new()
            .with_dialogs(active.iter().copied().map(Dialog::unmuted).collect());
        Self::with_transport(transport).await
    }

    pub async fn with_transport(transport: FakeTransport) -> Self {
        let store = LibSqlBackend::new_memory().await.unwrap();
        Self::with_parts(transport, Arc::new(store)).await
    }

    pub async fn with_parts(transport: FakeTransport, store: Arc<dyn MirrorStore>) -> Self {
        let transport = Arc::new(transport);
        let activity = Arc::new(ActivityFilter::new(
            Arc::clone(&transport) as Arc<dyn Transport>,
            ActivityPolicy::UnmutedAndFolder,
            "Personal",
        ));
        activity.refresh().await;
        Self {
            transport,
            activity,
            identity: IdentityMap::new(store),
            limiter: Arc::new(RateLimiter::default()),
        }
    }

    pub fn pipeline(&self, target: Option<ConversationId>) -> MirrorPipeline {
        MirrorPipeline::new(
            Arc::clone(&self.transport) as Arc<dyn Transport>,
            Arc::clone(&self.activity),
            self.identity.clone(),
            Arc::clone(&self.limiter),
            target,
        )
    }
}

pub fn photo(id: i64, chat: ConversationId, caption: Option<&str>) -> Message {
    let message = Message::new(id, chat)
        .with_media(Media::Photo {
            file: format!("photo-{id}"),
        })
        .with_grouped_id("album-1");
    match caption {
        Some(c) => message.with_text(c),
        None => message,
    }
}

pub fn new_message(message: Message) -> InboundEvent {
    InboundEvent::NewMessage {
        conversation: message.chat,
        message,
    }
}

pub fn edited(message: Message) -> InboundEvent {
    InboundEvent::EditedMessage {
        conversation: message.chat,
        message,
    }
}

pub fn album(conversation: ConversationId, messages: Vec<Message>) -> InboundEvent {
    InboundEvent::Album {
        conversation,
        messages,
    }
}
