//! Local note store shared by the sync engine and the presentation layer.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, LibSqlNoteRepository, NoteRepository, StoreOp};
use crate::models::{NoteId, NoteRecord};
use crate::Result;

/// Thread-safe handle to the durable note store.
///
/// Every call takes the connection lock for its whole duration, so batches
/// are never interleaved with other writes.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
}

impl LocalStore {
    /// Open the store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::info!("Using local note store at {}", db_path.display());
        Ok(Self::from_database(db))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db))
    }

    fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Non-deleted notes matching the optional query, newest first.
    pub async fn query(&self, text: Option<&str>) -> Result<Vec<NoteRecord>> {
        let db = self.db.lock().await;
        LibSqlNoteRepository::new(db.connection()).query(text).await
    }

    /// Fetch a note by id, tombstones included.
    pub async fn find_by_id(&self, id: NoteId) -> Result<Option<NoteRecord>> {
        let db = self.db.lock().await;
        LibSqlNoteRepository::new(db.connection()).get(id).await
    }

    /// Notes that still have to be pushed.
    pub async fn find_unsynced(&self) -> Result<Vec<NoteRecord>> {
        let db = self.db.lock().await;
        LibSqlNoteRepository::new(db.connection())
            .list_unsynced()
            .await
    }

    /// Insert or replace a note.
    pub async fn upsert(&self, note: &NoteRecord) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlNoteRepository::new(db.connection()).upsert(note).await
    }

    /// Physically remove a note.
    pub async fn delete(&self, id: NoteId) -> Result<bool> {
        let db = self.db.lock().await;
        LibSqlNoteRepository::new(db.connection()).delete(id).await
    }

    /// Apply a set of writes atomically.
    pub async fn apply_batch(&self, ops: &[StoreOp]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlNoteRepository::new(db.connection())
            .apply_batch(ops)
            .await
    }

    /// Replace all synced notes with the first page of a full refresh.
    pub async fn replace_with_remote_page(&self, notes: &[NoteRecord]) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlNoteRepository::new(db.connection())
            .replace_with_remote_page(notes)
            .await
    }

    /// Append a further page of server notes.
    pub async fn merge_remote_page(&self, notes: &[NoteRecord]) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlNoteRepository::new(db.connection())
            .merge_remote_page(notes)
            .await
    }

    /// Mint a local id that is not already used by a stored note.
    pub async fn mint_unused_local_id(&self) -> Result<NoteId> {
        const MAX_ATTEMPTS: usize = 8;

        for _ in 0..MAX_ATTEMPTS {
            let candidate = NoteId::mint_local();
            if self.find_by_id(candidate).await?.is_none() {
                return Ok(candidate);
            }
            tracing::warn!("Minted local id {} collides with a stored note", candidate);
        }

        Err(crate::Error::Storage(
            "could not mint an unused local note id".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_upsert_and_query_roundtrip() {
        let store = LocalStore::open_in_memory().await.unwrap();

        let note = NoteRecord::local("hello", "core");
        store.upsert(&note).await.unwrap();

        let notes = store.query(None).await.unwrap();
        assert_eq!(notes, vec![note.clone()]);
        assert_eq!(store.find_unsynced().await.unwrap(), vec![note]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn file_store_survives_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("notes.db");

        let note = NoteRecord::local("durable", "");
        {
            let store = LocalStore::open_path(&db_path).await.unwrap();
            store.upsert(&note).await.unwrap();
        }

        let store = LocalStore::open_path(&db_path).await.unwrap();
        assert_eq!(store.find_by_id(note.id).await.unwrap(), Some(note));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn minted_ids_are_unused_and_local() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let id = store.mint_unused_local_id().await.unwrap();
        assert!(id.is_local());
        assert!(store.find_by_id(id).await.unwrap().is_none());
    }
}
