//! Transport abstraction — how the mirror talks to the messaging platform.

pub mod telegram;
pub mod types;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::TransportError;

pub use telegram::{TelegramConfig, TelegramTransport};
pub use types::*;

/// Stream of inbound events. Ends when the transport disconnects.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// A connection to the messaging platform.
///
/// Implementations must be safe to call from concurrent event handlers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logs.
    fn name(&self) -> &str;

    /// Verify the session is authorized. Failure is fatal at startup.
    async fn authorize(&self) -> Result<Account, TransportError>;

    /// Start delivering inbound events.
    async fn start(&self) -> Result<EventStream, TransportError>;

    /// Forward `message` verbatim into `target`.
    async fn send_forward(
        &self,
        target: ConversationId,
        message: &Message,
    ) -> Result<SentMessage, TransportError>;

    /// Re-send `message` into `target` with replacement text and entities.
    async fn send_copy(
        &self,
        target: ConversationId,
        message: &Message,
        text: &str,
        entities: &[MessageEntity],
    ) -> Result<SentMessage, TransportError>;

    /// Post a new poll equivalent to `poll`.
    async fn send_poll(
        &self,
        target: ConversationId,
        poll: &Poll,
    ) -> Result<SentMessage, TransportError>;

    /// Send several media items as one grouped message, captions zipped by position.
    async fn send_file(
        &self,
        target: ConversationId,
        files: &[Media],
        captions: &[Option<String>],
    ) -> Result<Vec<SentMessage>, TransportError>;

    /// Send a plain text message.
    async fn send_message(
        &self,
        target: ConversationId,
        text: &str,
    ) -> Result<SentMessage, TransportError>;

    /// Enumerate all conversations known to the account.
    async fn get_dialogs(&self) -> Result<Vec<Dialog>, TransportError>;

    /// Enumerate the account's user-defined dialog filters.
    async fn get_dialog_filters(&self) -> Result<Vec<DialogFilter>, TransportError>;

    /// Look up an entity by raw id.
    async fn resolve_entity(&self, id: i64) -> Result<Entity, TransportError>;
}
