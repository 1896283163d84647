//! Database layer for notesync

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{LibSqlNoteRepository, NoteRepository, StoreOp};
