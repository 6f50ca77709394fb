//! Process supervisor — authorizes the transport, then runs the activity
//! refresh loop alongside event dispatch until the stream ends or Ctrl+C.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinSet;

use crate::error::Error;
use crate::mirror::{ActivityFilter, MirrorPipeline};
use crate::transport::{ConversationId, Transport};

/// Refresh the active set every `interval`. The first refresh happens
/// one interval after spawning.
pub fn spawn_refresh_loop(
    filter: Arc<ActivityFilter>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip immediate first tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            filter.refresh().await;
        }
    })
}

pub struct Supervisor {
    transport: Arc<dyn Transport>,
    activity: Arc<ActivityFilter>,
    pipeline: Arc<MirrorPipeline>,
    refresh_interval: Duration,
}

impl Supervisor {
    pub fn new(
        transport: Arc<dyn Transport>,
        activity: Arc<ActivityFilter>,
        pipeline: Arc<MirrorPipeline>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            transport,
            activity,
            pipeline,
            refresh_interval,
        }
    }

    /// Run until the transport disconnects or Ctrl+C. Returns the number of
    /// events dispatched.
    ///
    /// Authorization runs first; its failure is returned before anything
    /// else starts.
    pub async fn run(self) -> Result<usize, Error> {
        let account = self.transport.authorize().await?;
        tracing::info!(
            transport = self.transport.name(),
            account_id = account.id,
            username = account.username.as_deref().unwrap_or("-"),
            "Authorized"
        );

        let active = self.activity.refresh().await;
        tracing::info!(
            active,
            policy = ?self.activity.policy(),
            target = ?self.pipeline.target(),
            "Initial active set loaded"
        );

        let mut events = self.transport.start().await?;
        let refresh_handle = spawn_refresh_loop(Arc::clone(&self.activity), self.refresh_interval);

        let mut seen: HashSet<ConversationId> =
            self.activity.snapshot().await.iter().copied().collect();
        let mut handlers = JoinSet::new();
        let mut dispatched = 0usize;
        let mut interrupted = false;

        tracing::info!("Mirror ready and listening");

        loop {
            let event = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    interrupted = true;
                    break;
                }
                event = events.next() => match event {
                    Some(event) => event,
                    None => {
                        tracing::info!("Event stream ended, shutting down...");
                        break;
                    }
                },
            };

            // Chats learned mid-interval are inactive until refreshed.
            let conversation = event.conversation();
            if seen.insert(conversation) && !self.activity.is_active(conversation).await {
                let active = self.activity.refresh().await;
                tracing::debug!(
                    conversation = %conversation,
                    active,
                    "Refreshed for new conversation"
                );
            }

            let pipeline = Arc::clone(&self.pipeline);
            handlers.spawn(async move { pipeline.handle(event).await });
            dispatched += 1;

            while let Some(joined) = handlers.try_join_next() {
                reap(joined);
            }
        }

        refresh_handle.abort();

        if interrupted {
            handlers.abort_all();
        }
        while let Some(joined) = handlers.join_next().await {
            reap(joined);
        }

        tracing::info!(dispatched, "Mirror stopped");
        Ok(dispatched)
    }
}

fn reap<T>(joined: Result<T, tokio::task::JoinError>) {
    if let Err(e) = joined
        && e.is_panic()
    {
        tracing::error!(error = %e, "Event handler panicked");
    }
}
