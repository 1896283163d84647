//! Shared services used across clients.

mod local_store;

pub use local_store::LocalStore;
