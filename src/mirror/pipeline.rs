//! Mirror pipeline — classifies inbound events and mirrors them.
//!
//! Flow per event:
//! 1. `plan()` — pure classification against the active-set snapshot
//! 2. `execute()` — send, record into the identity map, throttle
//! 3. `handle()` — bulkhead: any failure is logged and swallowed
//!
//! One bad event never stops the ones after it.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{Error, PipelineError};
use crate::mirror::activity::{ActiveSet, ActivityFilter};
use crate::mirror::identity::IdentityMap;
use crate::mirror::rate_limit::RateLimiter;
use crate::store::MirrorRecord;
use crate::text::{StrippedText, UrlStripper};
use crate::transport::{ConversationId, InboundEvent, Media, Message, Poll, SentMessage, Transport};

/// Why an event was not mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Source conversation is not in the active set.
    Inactive,
    /// Album item delivered as a single message; the album event covers it.
    Grouped,
    /// Event came from the target conversation itself.
    OwnTarget,
    /// No target conversation is configured.
    NoTarget,
    /// Edit of a message that was never mirrored.
    Unmapped,
    /// Text-only message with nothing left after URL removal.
    EmptyAfterStrip,
}

impl SkipReason {
    pub fn label(self) -> &'static str {
        match self {
            SkipReason::Inactive => "inactive",
            SkipReason::Grouped => "grouped",
            SkipReason::OwnTarget => "own_target",
            SkipReason::NoTarget => "no_target",
            SkipReason::Unmapped => "unmapped",
            SkipReason::EmptyAfterStrip => "empty_after_strip",
        }
    }
}

/// Final state of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// `sent` outbound operations were made and `recorded` mirror records written.
    Forwarded { sent: usize, recorded: usize },
}

/// What to do with an event, decided without side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Skip(SkipReason),
    /// Forward the message verbatim.
    Forward {
        target: ConversationId,
        message: Message,
    },
    /// Re-send the message with stripped text.
    Copy {
        target: ConversationId,
        message: Message,
        stripped: StrippedText,
    },
    /// Post a reconstructed poll; live polls cannot be forwarded.
    Poll {
        target: ConversationId,
        original_id: i64,
        poll: Poll,
    },
    /// One multi-item send, results zipped by position onto `originals`.
    Album {
        target: ConversationId,
        originals: Vec<i64>,
        files: Vec<Media>,
        captions: Vec<Option<String>>,
    },
    /// Re-propagate an edit to every recorded mirror.
    Edit { message: Message },
}

/// Classify an event against a snapshot of the active set.
pub fn plan(
    event: &InboundEvent,
    active: &ActiveSet,
    target: Option<ConversationId>,
    stripper: Option<&UrlStripper>,
) -> Result<Plan, PipelineError> {
    if let InboundEvent::NewMessage { message, .. } = event
        && message.grouped_id.is_some()
    {
        return Ok(Plan::Skip(SkipReason::Grouped));
    }

    let source = event.conversation();
    if !active.contains(source) {
        return Ok(Plan::Skip(SkipReason::Inactive));
    }
    if target == Some(source) {
        return Ok(Plan::Skip(SkipReason::OwnTarget));
    }
    let Some(target) = target else {
        return Ok(Plan::Skip(SkipReason::NoTarget));
    };

    match event {
        InboundEvent::NewMessage { message, .. } => {
            if let Some(poll) = message.poll() {
                return Ok(Plan::Poll {
                    target,
                    original_id: message.id,
                    poll: poll.clone(),
                });
            }
            match stripper.and_then(|s| s.strip(message)) {
                Some(stripped) if message.media.is_none() && stripped.text.trim().is_empty() => {
                    Ok(Plan::Skip(SkipReason::EmptyAfterStrip))
                }
                Some(stripped) => Ok(Plan::Copy {
                    target,
                    message: message.clone(),
                    stripped,
                }),
                None => Ok(Plan::Forward {
                    target,
                    message: message.clone(),
                }),
            }
        }
        InboundEvent::EditedMessage { message, .. } => Ok(Plan::Edit {
            message: message.clone(),
        }),
        InboundEvent::Album { messages, .. } => {
            if messages.is_empty() {
                return Err(PipelineError::InvalidEvent("album has no items".into()));
            }
            let mut originals = Vec::with_capacity(messages.len());
            let mut files = Vec::with_capacity(messages.len());
            let mut captions = Vec::with_capacity(messages.len());
            for item in messages {
                let Some(media) = item.media.clone() else {
                    return Err(PipelineError::InvalidEvent(format!(
                        "album item {} has no media",
                        item.id
                    )));
                };
                originals.push(item.id);
                files.push(media);
                let caption = match (stripper, item.text.as_deref()) {
                    (Some(s), Some(text)) => Some(s.strip_text(text)),
                    (None, Some(text)) => Some(text.to_string()),
                    (_, None) => None,
                };
                captions.push(caption.filter(|c| !c.trim().is_empty()));
            }
            Ok(Plan::Album {
                target,
                originals,
                files,
                captions,
            })
        }
    }
}

/// The mirroring engine.
pub struct MirrorPipeline {
    transport: Arc<dyn Transport>,
    activity: Arc<ActivityFilter>,
    identity: IdentityMap,
    limiter: Arc<RateLimiter>,
    target: Option<ConversationId>,
    stripper: Option<UrlStripper>,
}

impl MirrorPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        activity: Arc<ActivityFilter>,
        identity: IdentityMap,
        limiter: Arc<RateLimiter>,
        target: Option<ConversationId>,
    ) -> Self {
        Self {
            transport,
            activity,
            identity,
            limiter,
            target,
            stripper: None,
        }
    }

    /// Strip URLs from mirrored text and captions.
    pub fn with_url_stripper(mut self, stripper: UrlStripper) -> Self {
        self.stripper = Some(stripper);
        self
    }

    pub fn target(&self) -> Option<ConversationId> {
        self.target
    }

    /// Process one event behind a bulkhead. Failures are logged, never returned.
    pub async fn handle(&self, event: InboundEvent) -> Option<Outcome> {
        let conversation = event.conversation();
        let kind = event.label();

        match self.process(event).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(
                    conversation = %conversation,
                    event = kind,
                    error = ?e,
                    "Failed to mirror event: {e}"
                );
                None
            }
        }
    }

    /// Classify and execute one event.
    pub async fn process(&self, event: InboundEvent) -> Result<Outcome, Error> {
        let active = self.activity.snapshot().await;
        let conversation = event.conversation();
        let plan = plan(&event, &active, self.target, self.stripper.as_ref())?;

        if !matches!(plan, Plan::Skip(SkipReason::Inactive | SkipReason::Grouped)) {
            debug!(conversation = %conversation, event = event.label(), "Received event");
        }

        self.execute(conversation, plan).await
    }

    async fn execute(&self, source: ConversationId, plan: Plan) -> Result<Outcome, Error> {
        match plan {
            Plan::Skip(reason) => {
                match reason {
                    SkipReason::Inactive => {}
                    SkipReason::NoTarget => {
                        warn!(conversation = %source, "No target conversation configured, skipping");
                    }
                    SkipReason::EmptyAfterStrip => {
                        info!(
                            conversation = %source,
                            reason = reason.label(),
                            "Message was only URLs, not mirroring"
                        );
                    }
                    SkipReason::Grouped | SkipReason::OwnTarget | SkipReason::Unmapped => {
                        debug!(conversation = %source, reason = reason.label(), "Skipping event");
                    }
                }
                Ok(Outcome::Skipped(reason))
            }
            Plan::Forward { target, message } => {
                let sent = self.transport.send_forward(target, &message).await?;
                self.record_single(message.id, source, sent).await
            }
            Plan::Copy {
                target,
                message,
                stripped,
            } => {
                let sent = self
                    .transport
                    .send_copy(target, &message, &stripped.text, &stripped.entities)
                    .await?;
                self.record_single(message.id, source, sent).await
            }
            Plan::Poll {
                target,
                original_id,
                poll,
            } => {
                let sent = self.transport.send_poll(target, &poll).await?;
                self.record_single(original_id, source, sent).await
            }
            Plan::Album {
                target,
                originals,
                files,
                captions,
            } => {
                let sent = self.transport.send_file(target, &files, &captions).await?;
                self.limiter.throttle().await;

                if sent.len() < originals.len() {
                    warn!(
                        conversation = %source,
                        items = originals.len(),
                        returned = sent.len(),
                        "Album returned fewer mirrors than items; tail not recorded"
                    );
                }

                let mut recorded = 0;
                for (original_id, mirror) in originals.iter().zip(&sent) {
                    self.identity
                        .insert(record(*original_id, source, *mirror))
                        .await?;
                    recorded += 1;
                }
                info!(conversation = %source, recorded, "Mirrored album");
                Ok(Outcome::Forwarded { sent: 1, recorded })
            }
            Plan::Edit { message } => {
                let mirrors = self.identity.find_by_original(message.id, source).await?;
                if mirrors.is_empty() {
                    warn!(
                        conversation = %source,
                        message_id = message.id,
                        "Edited message has no mirror, dropping"
                    );
                    return Ok(Outcome::Skipped(SkipReason::Unmapped));
                }

                let mut sent = 0;
                for mirror in &mirrors {
                    self.transport
                        .send_forward(mirror.mirror_channel, &message)
                        .await?;
                    self.limiter.throttle().await;
                    sent += 1;
                }
                info!(conversation = %source, message_id = message.id, sent, "Propagated edit");
                Ok(Outcome::Forwarded { sent, recorded: 0 })
            }
        }
    }

    /// Record a one-to-one mirror and count the send.
    async fn record_single(
        &self,
        original_id: i64,
        source: ConversationId,
        sent: SentMessage,
    ) -> Result<Outcome, Error> {
        let recorded = self.identity.insert(record(original_id, source, sent)).await;
        self.limiter.throttle().await;
        recorded?;
        info!(
            conversation = %source,
            original_id,
            mirror_id = sent.id,
            "Mirrored message"
        );
        Ok(Outcome::Forwarded {
            sent: 1,
            recorded: 1,
        })
    }
}

fn record(original_id: i64, source: ConversationId, mirror: SentMessage) -> MirrorRecord {
    MirrorRecord {
        original_id,
        original_channel: source,
        mirror_id: mirror.id,
        mirror_channel: mirror.chat,
    }
}
