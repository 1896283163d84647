//! Note model

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::util::now_millis;

/// Identifier of a note.
///
/// Positive ids are assigned by the remote service. Negative ids are minted
/// locally for notes created while the service was unreachable. Zero is never
/// a valid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct NoteId(i64);

impl NoteId {
    /// Wrap a server-assigned id, rejecting anything that is not positive.
    pub fn remote(raw: i64) -> Result<Self> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(Error::Validation(format!(
                "server-assigned note id must be positive, got {raw}"
            )))
        }
    }

    /// Mint a random local id (always negative).
    #[must_use]
    pub fn mint_local() -> Self {
        Self(-rand::rng().random_range(1..=i64::MAX))
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Minted locally and never confirmed by the remote service.
    #[must_use]
    pub const fn is_local(self) -> bool {
        self.0 < 0
    }

    /// Assigned by the remote service.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<i64> for NoteId {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        if raw == 0 {
            Err(Error::Validation("note id must not be zero".to_string()))
        } else {
            Ok(Self(raw))
        }
    }
}

impl From<NoteId> for i64 {
    fn from(id: NoteId) -> Self {
        id.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::Validation(format!("invalid note id: {s}")))?;
        Self::try_from(raw)
    }
}

/// Whether a local record is known to match the server's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Synced,
    Unsynced,
}

impl SyncState {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Unsynced => "unsynced",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "synced" => Ok(Self::Synced),
            "unsynced" => Ok(Self::Unsynced),
            other => Err(Error::Validation(format!("unknown sync state: {other}"))),
        }
    }
}

/// A note as held by the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Server id (positive) or local id (negative)
    pub id: NoteId,
    pub title: String,
    pub body: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Attribution supplied by the server; empty for local-only notes
    pub creator_name: String,
    pub creator_username: String,
    pub sync_state: SyncState,
    /// Tombstone awaiting remote confirmation
    pub is_deleted: bool,
}

impl NoteRecord {
    /// Create an unsynced note under a freshly minted local id.
    #[must_use]
    pub fn local(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::local_with_id(NoteId::mint_local(), title, body)
    }

    /// Create an unsynced note under the given local id.
    #[must_use]
    pub fn local_with_id(id: NoteId, title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id,
            title: title.into(),
            body: body.into(),
            created_at: now,
            updated_at: now,
            creator_name: String::new(),
            creator_username: String::new(),
            sync_state: SyncState::Unsynced,
            is_deleted: false,
        }
    }

    /// Copy of this note carrying a local edit that still has to be pushed.
    #[must_use]
    pub fn edited(&self, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            updated_at: now_millis().max(self.updated_at),
            sync_state: SyncState::Unsynced,
            ..self.clone()
        }
    }

    /// Copy of this note marked as deleted pending remote confirmation.
    #[must_use]
    pub fn tombstoned(&self) -> Self {
        Self {
            updated_at: now_millis().max(self.updated_at),
            sync_state: SyncState::Unsynced,
            is_deleted: true,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.sync_state == SyncState::Synced
    }

    /// Check the id-polarity and tombstone invariants.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_local() && self.is_synced() {
            return Err(Error::Validation(format!(
                "note {} has a local id but is marked synced",
                self.id
            )));
        }
        if self.is_deleted && self.is_synced() {
            return Err(Error::Validation(format!(
                "note {} is tombstoned but marked synced",
                self.id
            )));
        }
        Ok(())
    }

    /// Get first line of the title (or body when untitled), truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        let source = if self.title.trim().is_empty() {
            &self.body
        } else {
            &self.title
        };
        source
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .chars()
            .take(max_len)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_negative() {
        for _ in 0..64 {
            let id = NoteId::mint_local();
            assert!(id.is_local());
            assert!(!id.is_remote());
        }
    }

    #[test]
    fn remote_ids_must_be_positive() {
        assert!(NoteId::remote(7).is_ok());
        assert!(NoteId::remote(0).is_err());
        assert!(NoteId::remote(-3).is_err());
    }

    #[test]
    fn zero_id_is_rejected() {
        assert!(NoteId::try_from(0).is_err());
        assert!("0".parse::<NoteId>().is_err());
        assert_eq!("-12".parse::<NoteId>().unwrap().get(), -12);
    }

    #[test]
    fn note_id_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<NoteId>("0").is_err());
        assert_eq!(serde_json::from_str::<NoteId>("5").unwrap().get(), 5);
    }

    #[test]
    fn sync_state_round_trips_through_storage_form() {
        for state in [SyncState::Synced, SyncState::Unsynced] {
            assert_eq!(state.as_str().parse::<SyncState>().unwrap(), state);
        }
        assert!("pending".parse::<SyncState>().is_err());
    }

    #[test]
    fn local_note_is_unsynced_without_attribution() {
        let note = NoteRecord::local("T", "D");
        assert!(note.id.is_local());
        assert_eq!(note.sync_state, SyncState::Unsynced);
        assert!(note.creator_name.is_empty());
        assert!(note.validate().is_ok());
    }

    #[test]
    fn edit_marks_unsynced_and_never_moves_time_backwards() {
        let mut note = NoteRecord::local("T", "D");
        note.id = NoteId::remote(3).unwrap();
        note.sync_state = SyncState::Synced;
        note.updated_at = i64::MAX - 1;

        let edited = note.edited("T2", "D2");
        assert_eq!(edited.sync_state, SyncState::Unsynced);
        assert_eq!(edited.updated_at, i64::MAX - 1);
        assert_eq!(edited.title, "T2");
    }

    #[test]
    fn validate_rejects_synced_local_note() {
        let mut note = NoteRecord::local("T", "D");
        note.sync_state = SyncState::Synced;
        assert!(note.validate().is_err());
    }

    #[test]
    fn validate_rejects_synced_tombstone() {
        let mut note = NoteRecord::local("T", "D");
        note.id = NoteId::remote(9).unwrap();
        note.is_deleted = true;
        note.sync_state = SyncState::Synced;
        assert!(note.validate().is_err());
    }

    #[test]
    fn title_preview_falls_back_to_body() {
        let note = NoteRecord::local("", "First line\nSecond line");
        assert_eq!(note.title_preview(50), "First line");
        assert_eq!(note.title_preview(5), "First");
    }
}
