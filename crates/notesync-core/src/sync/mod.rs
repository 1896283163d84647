//! Offline-first synchronization engine.
//!
//! The engine applies user edits to the [`LocalStore`] optimistically, tries
//! the matching remote call, and leaves the record `Unsynced` when that call
//! fails. [`SyncEngine::refresh`] later pushes every unsynced record and pulls
//! the first page of server state; [`SyncEngine::load_more`] pulls further
//! pages on demand. Conflicts are resolved last-writer-wins from the client's
//! point of view: a push always sends the local fields.

mod cursor;

use crate::db::StoreOp;
use crate::error::{Error, Result};
use crate::gateway::{NotePage, RemoteGateway};
use crate::models::NoteRecord;
use crate::services::LocalStore;
use crate::util::normalize_text_option;

pub use cursor::PageCursor;

/// Outcome of one push phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Creates and updates confirmed by the server
    pub pushed: usize,
    /// Tombstones removed from the store
    pub removed: usize,
    /// Records left unsynced because the remote call failed
    pub skipped: usize,
}

impl PushReport {
    pub const fn attempted(&self) -> usize {
        self.pushed + self.removed + self.skipped
    }
}

/// Reconciles the local store with the remote note service.
///
/// One engine owns one set of cursors; callers must serialize `refresh` with
/// CRUD calls touching the same records.
pub struct SyncEngine<G> {
    store: LocalStore,
    gateway: G,
    cursor: PageCursor,
    active_query: Option<String>,
}

impl<G: RemoteGateway> SyncEngine<G> {
    pub fn new(store: LocalStore, gateway: G) -> Self {
        Self {
            store,
            gateway,
            cursor: PageCursor::default(),
            active_query: None,
        }
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn active_query(&self) -> Option<&str> {
        self.active_query.as_deref()
    }

    /// The notes the presentation layer should render.
    pub async fn view(&self) -> Result<Vec<NoteRecord>> {
        self.store.query(self.active_query()).await
    }

    /// Full reconciliation: push local changes, pull page one, reload the view.
    ///
    /// Without a search, page one replaces every synced row. While a search is
    /// active the server only returns title matches, so the page is merged and
    /// synced rows outside it stay until the next unfiltered refresh.
    pub async fn refresh(&mut self) -> Result<Vec<NoteRecord>> {
        self.cursor.reset();

        let report = self.push_unsynced().await?;
        if report.attempted() > 0 {
            tracing::info!(
                "Pushed local changes: {} confirmed, {} removed, {} left unsynced",
                report.pushed,
                report.removed,
                report.skipped
            );
        }

        let page = self.fetch_page(self.cursor.current_page()).await?;
        let written = if self.active_query.is_some() {
            self.store.merge_remote_page(&page.records).await?
        } else {
            self.store.replace_with_remote_page(&page.records).await?
        };
        self.cursor.advance(page.next_page);
        tracing::info!(
            "Pulled {} of {} remote notes (more pages: {})",
            written,
            page.total,
            self.cursor.has_more_pages()
        );

        self.view().await
    }

    /// Send every unsynced record to the server.
    ///
    /// Remote failures leave the record untouched for the next refresh;
    /// storage failures abort the phase.
    pub async fn push_unsynced(&self) -> Result<PushReport> {
        let mut report = PushReport::default();

        for note in self.store.find_unsynced().await? {
            match (note.is_deleted, note.id.is_remote()) {
                (true, true) => match self.gateway.delete(note.id).await {
                    Ok(()) => {
                        self.store.delete(note.id).await?;
                        report.removed += 1;
                    }
                    Err(error) => {
                        tracing::warn!("Remote delete of note {} failed: {}", note.id, error);
                        report.skipped += 1;
                    }
                },
                (true, false) => {
                    self.store.delete(note.id).await?;
                    report.removed += 1;
                }
                (false, true) => {
                    match self.gateway.update(note.id, &note.title, &note.body).await {
                        Ok(confirmed) => {
                            self.store.upsert(&confirmed).await?;
                            report.pushed += 1;
                        }
                        Err(error) => {
                            tracing::warn!("Remote update of note {} failed: {}", note.id, error);
                            report.skipped += 1;
                        }
                    }
                }
                (false, false) => match self.gateway.create(&note.title, &note.body).await {
                    Ok(confirmed) => {
                        tracing::debug!("Local note {} confirmed as {}", note.id, confirmed.id);
                        self.store
                            .apply_batch(&[StoreOp::Delete(note.id), StoreOp::Upsert(confirmed)])
                            .await?;
                        report.pushed += 1;
                    }
                    Err(error) => {
                        tracing::warn!("Remote create of local note {} failed: {}", note.id, error);
                        report.skipped += 1;
                    }
                },
            }
        }

        Ok(report)
    }

    /// Create a note, falling back to a local-only record when the server
    /// cannot be reached or rejects the request.
    pub async fn create_note(&self, title: &str, body: &str) -> Result<NoteRecord> {
        let note = match self.gateway.create(title, body).await {
            Ok(confirmed) => confirmed,
            Err(error) => {
                tracing::warn!("Remote create failed, keeping note locally: {}", error);
                let id = self.store.mint_unused_local_id().await?;
                NoteRecord::local_with_id(id, title, body)
            }
        };

        self.store.upsert(&note).await?;
        Ok(note)
    }

    /// Edit a note; the edit is kept locally as unsynced when it cannot be
    /// confirmed remotely.
    pub async fn update_note(
        &self,
        note: &NoteRecord,
        title: &str,
        body: &str,
    ) -> Result<NoteRecord> {
        if note.id.is_remote() {
            match self.gateway.update(note.id, title, body).await {
                Ok(confirmed) => {
                    self.store.upsert(&confirmed).await?;
                    return Ok(confirmed);
                }
                Err(error) => {
                    tracing::warn!("Remote update of note {} failed: {}", note.id, error);
                }
            }
        }

        let edited = note.edited(title, body);
        self.store.upsert(&edited).await?;
        Ok(edited)
    }

    /// Delete a note, leaving a tombstone when the server cannot confirm it.
    pub async fn delete_note(&self, note: &NoteRecord) -> Result<()> {
        if !note.id.is_remote() {
            self.store.delete(note.id).await?;
            return Ok(());
        }

        match self.gateway.delete(note.id).await {
            Ok(()) => {
                self.store.delete(note.id).await?;
            }
            Err(error) => {
                tracing::warn!("Remote delete of note {} failed, keeping tombstone: {}", note.id, error);
                self.store.upsert(&note.tombstoned()).await?;
            }
        }
        Ok(())
    }

    /// Fetch the next page when the caller has scrolled to the last visible
    /// record. Returns whether a page was fetched.
    pub async fn load_more(&mut self, visible_last: &NoteRecord) -> Result<bool> {
        if !self.cursor.has_more_pages() {
            return Ok(false);
        }

        let view = self.view().await?;
        if view.last().map(|last| last.id) != Some(visible_last.id) {
            return Ok(false);
        }

        let page = self.fetch_page(self.cursor.current_page()).await?;
        self.store.merge_remote_page(&page.records).await?;
        self.cursor.advance(page.next_page);
        tracing::debug!(
            "Loaded {} more notes; next page {:?}",
            page.records.len(),
            self.cursor.has_more_pages().then_some(self.cursor.current_page())
        );
        Ok(true)
    }

    /// Scope the view to a local substring query. No remote call is made.
    pub async fn search(&mut self, query: Option<&str>) -> Result<Vec<NoteRecord>> {
        self.active_query = normalize_text_option(query.map(str::to_string));
        self.cursor.reset();
        self.view().await
    }

    async fn fetch_page(&self, page: u32) -> Result<NotePage> {
        self.gateway
            .list(page, self.active_query())
            .await
            .map_err(Error::from)
    }
}
