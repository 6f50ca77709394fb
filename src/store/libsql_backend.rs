//! libSQL backend — async `MirrorStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{MirrorRecord, MirrorStore};
use crate::transport::ConversationId;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Map a libsql Row to a MirrorRecord.
///
/// Column order matches MIRROR_COLUMNS.
fn row_to_record(row: &libsql::Row) -> Result<MirrorRecord, libsql::Error> {
    Ok(MirrorRecord {
        original_id: row.get(0)?,
        original_channel: ConversationId(row.get(1)?),
        mirror_id: row.get(2)?,
        mirror_channel: ConversationId(row.get(3)?),
    })
}

const MIRROR_COLUMNS: &str = "original_id, original_channel, mirror_id, mirror_channel";

#[async_trait]
impl MirrorStore for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn insert_mirror(&self, record: &MirrorRecord) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO mirror_messages (original_id, original_channel, mirror_id, mirror_channel)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.original_id,
                    record.original_channel.get(),
                    record.mirror_id,
                    record.mirror_channel.get(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_mirror: {e}")))?;

        debug!(
            original_id = record.original_id,
            original_channel = %record.original_channel,
            mirror_id = record.mirror_id,
            "Mirror record inserted into DB"
        );
        Ok(())
    }

    async fn find_by_original(
        &self,
        original_id: i64,
        original_channel: ConversationId,
    ) -> Result<Vec<MirrorRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MIRROR_COLUMNS} FROM mirror_messages
                     WHERE original_id = ?1 AND original_channel = ?2 ORDER BY id ASC"
                ),
                params![original_id, original_channel.get()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_by_original: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("find_by_original: {e}")))?
        {
            let record =
                row_to_record(&row).map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
            records.push(record);
        }
        Ok(records)
    }

    async fn count_mirrors(&self) -> Result<usize, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM mirror_messages", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_mirrors: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(count as usize)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count_mirrors: {e}"))),
        }
    }
}
