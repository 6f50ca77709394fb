//! Identity map — original message → mirrored copies.

use std::sync::Arc;

use tracing::debug;

use crate::error::DatabaseError;
use crate::store::{MirrorRecord, MirrorStore};
use crate::transport::ConversationId;

/// Routes edits by remembering where each original was mirrored.
///
/// No caching: every lookup goes to the store, so writes are visible to
/// the next lookup.
#[derive(Clone)]
pub struct IdentityMap {
    store: Arc<dyn MirrorStore>,
}

impl IdentityMap {
    pub fn new(store: Arc<dyn MirrorStore>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, record: MirrorRecord) -> Result<(), DatabaseError> {
        self.store.insert_mirror(&record).await?;
        debug!(
            original_id = record.original_id,
            original_channel = %record.original_channel,
            mirror_id = record.mirror_id,
            mirror_channel = %record.mirror_channel,
            "Recorded mirror"
        );
        Ok(())
    }

    pub async fn find_by_original(
        &self,
        original_id: i64,
        original_channel: ConversationId,
    ) -> Result<Vec<MirrorRecord>, DatabaseError> {
        self.store
            .find_by_original(original_id, original_channel)
            .await
    }
}
