//! Data models for notesync

mod note;
mod user;

pub use note::{NoteId, NoteRecord, SyncState};
pub use user::User;
