//! `MirrorStore` trait — async interface for the original→mirror mapping.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::transport::ConversationId;

/// Linkage between an original message and its mirrored copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorRecord {
    pub original_id: i64,
    pub original_channel: ConversationId,
    pub mirror_id: i64,
    pub mirror_channel: ConversationId,
}

/// Backend-agnostic mapping store.
///
/// Records are append-only: nothing here updates or deletes them.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Append a mapping record.
    async fn insert_mirror(&self, record: &MirrorRecord) -> Result<(), DatabaseError>;

    /// All records for an original message, in insertion order.
    async fn find_by_original(
        &self,
        original_id: i64,
        original_channel: ConversationId,
    ) -> Result<Vec<MirrorRecord>, DatabaseError>;

    /// Total number of stored records.
    async fn count_mirrors(&self) -> Result<usize, DatabaseError>;
}
