//! notesync-core - Core library for notesync
//!
//! This crate contains the note model, the libSQL-backed local store, the
//! HTTP gateway to the remote note service, and the offline-first sync engine
//! that reconciles the two.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{NoteId, NoteRecord, SyncState};
