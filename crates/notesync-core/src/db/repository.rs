//! Note repository implementation

use crate::error::Result;
use crate::models::{NoteId, NoteRecord};
use crate::util::contains_folded;
use libsql::params::Params;
use libsql::{params, Connection, Row, Value};

const NOTE_COLUMNS: &str = "id, title, body, created_at, updated_at, creator_name, creator_username, sync_state, is_deleted";

const UPSERT_SQL: &str = "INSERT INTO notes (id, title, body, created_at, updated_at, creator_name, creator_username, sync_state, is_deleted)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
     ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        body = excluded.body,
        created_at = excluded.created_at,
        updated_at = excluded.updated_at,
        creator_name = excluded.creator_name,
        creator_username = excluded.creator_username,
        sync_state = excluded.sync_state,
        is_deleted = excluded.is_deleted";

/// A single write inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Upsert(NoteRecord),
    Delete(NoteId),
}

/// Trait for note storage operations (async)
#[allow(async_fn_in_trait)]
pub trait NoteRepository {
    /// Non-deleted notes, optionally filtered by a case-insensitive substring
    /// of title or body, most recently updated first
    async fn query(&self, text: Option<&str>) -> Result<Vec<NoteRecord>>;

    /// Get a note by id, tombstones included
    async fn get(&self, id: NoteId) -> Result<Option<NoteRecord>>;

    /// Insert or replace a note
    async fn upsert(&self, note: &NoteRecord) -> Result<()>;

    /// Physically remove a note; returns whether a row existed
    async fn delete(&self, id: NoteId) -> Result<bool>;

    /// Notes waiting to be pushed, tombstones included
    async fn list_unsynced(&self) -> Result<Vec<NoteRecord>>;

    /// Apply all operations or none
    async fn apply_batch(&self, ops: &[StoreOp]) -> Result<()>;

    /// Drop every synced note and merge the given page, atomically
    async fn replace_with_remote_page(&self, notes: &[NoteRecord]) -> Result<usize>;

    /// Merge a page of server notes without touching pending local changes
    async fn merge_remote_page(&self, notes: &[NoteRecord]) -> Result<usize>;
}

/// libSQL implementation of `NoteRepository`
pub struct LibSqlNoteRepository<'a> {
    conn: &'a Connection,
}

enum Step<'n> {
    ClearSynced,
    Upsert(&'n NoteRecord),
    Delete(NoteId),
    MergeRemote(&'n NoteRecord),
}

impl<'a> LibSqlNoteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a note from a database row
    fn parse_note(row: &Row) -> Result<NoteRecord> {
        let id: i64 = row.get(0)?;
        let sync_state: String = row.get(7)?;
        Ok(NoteRecord {
            id: NoteId::try_from(id)?,
            title: row.get(1)?,
            body: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            creator_name: row.get(5)?,
            creator_username: row.get(6)?,
            sync_state: sync_state.parse()?,
            is_deleted: row.get::<i32>(8)? != 0,
        })
    }

    async fn collect_notes(mut rows: libsql::Rows) -> Result<Vec<NoteRecord>> {
        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(Self::parse_note(&row)?);
        }
        Ok(notes)
    }

    async fn execute_step(&self, step: &Step<'_>) -> Result<u64> {
        let changed = match step {
            Step::ClearSynced => {
                self.conn
                    .execute("DELETE FROM notes WHERE sync_state = 'synced'", ())
                    .await?
            }
            Step::Upsert(note) => self.conn.execute(UPSERT_SQL, note_params(note)).await?,
            Step::Delete(id) => {
                self.conn
                    .execute("DELETE FROM notes WHERE id = ?1", params![id.get()])
                    .await?
            }
            Step::MergeRemote(note) => {
                let sql = format!("{UPSERT_SQL} WHERE notes.sync_state = 'synced'");
                self.conn.execute(&sql, note_params(note)).await?
            }
        };
        Ok(changed)
    }

    /// Run the steps inside one transaction, rolling back on the first failure.
    ///
    /// Returns the number of rows written by upsert, delete and merge steps.
    async fn apply_steps(&self, steps: &[Step<'_>]) -> Result<u64> {
        for step in steps {
            if let Step::Upsert(note) | Step::MergeRemote(note) = step {
                note.validate()?;
            }
        }

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let mut changed = 0;
        for step in steps {
            match self.execute_step(step).await {
                Ok(_) if matches!(step, Step::ClearSynced) => {}
                Ok(count) => changed += count,
                Err(e) => {
                    self.conn.execute("ROLLBACK", ()).await.ok();
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(changed)
    }
}

fn note_params(note: &NoteRecord) -> Params {
    Params::Positional(vec![
        Value::Integer(note.id.get()),
        Value::Text(note.title.clone()),
        Value::Text(note.body.clone()),
        Value::Integer(note.created_at),
        Value::Integer(note.updated_at),
        Value::Text(note.creator_name.clone()),
        Value::Text(note.creator_username.clone()),
        Value::Text(note.sync_state.as_str().to_string()),
        Value::Integer(i64::from(note.is_deleted)),
    ])
}

fn count(changed: u64) -> usize {
    usize::try_from(changed).unwrap_or(usize::MAX)
}

impl NoteRepository for LibSqlNoteRepository<'_> {
    async fn query(&self, text: Option<&str>) -> Result<Vec<NoteRecord>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS}
             FROM notes
             WHERE is_deleted = 0
             ORDER BY updated_at DESC, id DESC"
        );
        let rows = self.conn.query(&sql, ()).await?;
        let notes = Self::collect_notes(rows).await?;

        // SQLite's LIKE and lower() only fold ASCII, so matching happens here
        let Some(needle) = text.map(str::trim).filter(|text| !text.is_empty()) else {
            return Ok(notes);
        };
        let needle = needle.to_lowercase();
        Ok(notes
            .into_iter()
            .filter(|note| {
                contains_folded(&note.title, &needle) || contains_folded(&note.body, &needle)
            })
            .collect())
    }

    async fn get(&self, id: NoteId) -> Result<Option<NoteRecord>> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1");
        let mut rows = self.conn.query(&sql, params![id.get()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_note(&row)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, note: &NoteRecord) -> Result<()> {
        note.validate()?;
        self.conn.execute(UPSERT_SQL, note_params(note)).await?;
        Ok(())
    }

    async fn delete(&self, id: NoteId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id.get()])
            .await?;
        Ok(rows > 0)
    }

    async fn list_unsynced(&self) -> Result<Vec<NoteRecord>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS}
             FROM notes
             WHERE sync_state = 'unsynced'
             ORDER BY updated_at ASC, id ASC"
        );
        let rows = self.conn.query(&sql, ()).await?;
        Self::collect_notes(rows).await
    }

    async fn apply_batch(&self, ops: &[StoreOp]) -> Result<()> {
        let steps = ops
            .iter()
            .map(|op| match op {
                StoreOp::Upsert(note) => Step::Upsert(note),
                StoreOp::Delete(id) => Step::Delete(*id),
            })
            .collect::<Vec<_>>();
        self.apply_steps(&steps).await?;
        Ok(())
    }

    async fn replace_with_remote_page(&self, notes: &[NoteRecord]) -> Result<usize> {
        let mut steps = Vec::with_capacity(notes.len() + 1);
        steps.push(Step::ClearSynced);
        steps.extend(notes.iter().map(Step::MergeRemote));

        Ok(count(self.apply_steps(&steps).await?))
    }

    async fn merge_remote_page(&self, notes: &[NoteRecord]) -> Result<usize> {
        let steps = notes.iter().map(Step::MergeRemote).collect::<Vec<_>>();
        Ok(count(self.apply_steps(&steps).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::SyncState;
    use pretty_assertions::assert_eq;

    fn synced(id: i64, title: &str, body: &str, updated_at: i64) -> NoteRecord {
        NoteRecord {
            id: NoteId::remote(id).unwrap(),
            title: title.to_string(),
            body: body.to_string(),
            created_at: updated_at,
            updated_at,
            creator_name: "Ada Lovelace".to_string(),
            creator_username: "ada".to_string(),
            sync_state: SyncState::Synced,
            is_deleted: false,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_and_get() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        let note = synced(1, "Groceries", "milk, eggs", 100);
        repo.upsert(&note).await.unwrap();
        assert_eq!(repo.get(note.id).await.unwrap(), Some(note.clone()));

        let edited = note.edited("Groceries", "milk, eggs, bread");
        repo.upsert(&edited).await.unwrap();
        let fetched = repo.get(note.id).await.unwrap().unwrap();
        assert_eq!(fetched.body, "milk, eggs, bread");
        assert_eq!(fetched.sync_state, SyncState::Unsynced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_orders_by_recency_and_hides_tombstones() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.upsert(&synced(1, "old", "", 100)).await.unwrap();
        repo.upsert(&synced(2, "new", "", 300)).await.unwrap();
        let gone = synced(3, "gone", "", 200).tombstoned();
        repo.upsert(&gone).await.unwrap();

        let titles = repo
            .query(None)
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["new", "old"]);

        // Tombstones stay reachable by id until the deletion is confirmed
        assert!(repo.get(gone.id).await.unwrap().unwrap().is_deleted);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_substring_is_case_insensitive() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.upsert(&synced(1, "Shopping ABC list", "", 100))
            .await
            .unwrap();
        repo.upsert(&synced(2, "Ideas", "the abc of rust", 200))
            .await
            .unwrap();
        repo.upsert(&synced(3, "Unrelated", "nothing here", 300))
            .await
            .unwrap();

        let ids = repo
            .query(Some("aBc"))
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.id.get())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![2, 1]);

        assert_eq!(repo.query(Some("   ")).await.unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_folds_non_ascii_case() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.upsert(&synced(1, "Über Straße", "Ärger im Büro", 100))
            .await
            .unwrap();
        repo.upsert(&synced(2, "ΣΟΦΙΑ", "", 200)).await.unwrap();
        repo.upsert(&synced(3, "plain ascii", "", 300)).await.unwrap();

        for query in ["über", "ÜBER", "ärger", "BÜRO", "straße"] {
            let ids = repo
                .query(Some(query))
                .await
                .unwrap()
                .into_iter()
                .map(|note| note.id.get())
                .collect::<Vec<_>>();
            assert_eq!(ids, vec![1], "query {query:?}");
        }

        let greek = repo.query(Some("σοφ")).await.unwrap();
        assert_eq!(greek.len(), 1);
        assert_eq!(greek[0].id.get(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_treats_wildcards_literally() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.upsert(&synced(1, "100% done", "", 100)).await.unwrap();
        repo.upsert(&synced(2, "1000 done", "", 200)).await.unwrap();

        let matches = repo.query(Some("0%")).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id.get(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_rejects_synced_local_id() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        let mut note = NoteRecord::local("T", "D");
        note.sync_state = SyncState::Synced;
        assert!(repo.upsert(&note).await.is_err());
        assert!(repo.query(None).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_is_all_or_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        let mut invalid = NoteRecord::local("bad", "");
        invalid.sync_state = SyncState::Synced;

        let result = repo
            .apply_batch(&[
                StoreOp::Upsert(synced(1, "good", "", 100)),
                StoreOp::Upsert(invalid),
            ])
            .await;
        assert!(result.is_err());
        assert!(repo.query(None).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_swaps_local_row_for_server_row() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        let local = NoteRecord::local("draft", "offline");
        repo.upsert(&local).await.unwrap();

        let confirmed = synced(42, "draft", "offline", 100);
        repo.apply_batch(&[
            StoreOp::Delete(local.id),
            StoreOp::Upsert(confirmed.clone()),
        ])
        .await
        .unwrap();

        assert_eq!(repo.get(local.id).await.unwrap(), None);
        assert_eq!(repo.query(None).await.unwrap(), vec![confirmed]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_merge_remote_page_preserves_pending_edits() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        let pending = synced(1, "server title", "", 100).edited("local title", "");
        repo.upsert(&pending).await.unwrap();

        let merged = repo
            .merge_remote_page(&[
                synced(1, "server title", "", 500),
                synced(2, "fresh", "", 400),
            ])
            .await
            .unwrap();
        assert_eq!(merged, 1);

        let kept = repo.get(pending.id).await.unwrap().unwrap();
        assert_eq!(kept.title, "local title");
        assert_eq!(kept.sync_state, SyncState::Unsynced);
        assert!(repo.get(NoteId::remote(2).unwrap()).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_replace_with_remote_page_keeps_unsynced_rows() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.upsert(&synced(1, "stale", "", 100)).await.unwrap();
        let local = NoteRecord::local("offline", "");
        repo.upsert(&local).await.unwrap();

        let written = repo
            .replace_with_remote_page(&[synced(2, "fresh", "", 200)])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let ids = repo
            .query(None)
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.id)
            .collect::<Vec<_>>();
        assert!(ids.contains(&local.id));
        assert!(ids.contains(&NoteId::remote(2).unwrap()));
        assert!(!ids.contains(&NoteId::remote(1).unwrap()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_unsynced_includes_tombstones() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.upsert(&synced(1, "clean", "", 100)).await.unwrap();
        repo.upsert(&synced(2, "doomed", "", 100).tombstoned())
            .await
            .unwrap();
        repo.upsert(&NoteRecord::local("draft", "")).await.unwrap();

        let pending = repo.list_unsynced().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|note| !note.is_synced()));
        assert!(pending.iter().any(|note| note.is_deleted));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_reports_presence() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNoteRepository::new(db.connection());

        let note = synced(5, "x", "", 1);
        repo.upsert(&note).await.unwrap();
        assert!(repo.delete(note.id).await.unwrap());
        assert!(!repo.delete(note.id).await.unwrap());
    }
}
