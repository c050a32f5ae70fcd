//! Core persistence and live-list logic for NoteKeep.
//! This crate is the single source of truth for note invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repository;
pub mod store;

pub use config::CoreConfig;
pub use logging::{
    default_log_level, flush_logging, init_logging, init_logging_from_config, logging_status,
    LoggingError,
};
pub use model::note::{
    format_entry_date, format_entry_date_in, sample_notes, Note, NoteId, NoteValidationError,
};
pub use repository::note_repository::NoteRepository;
pub use store::handle::NoteStoreHandle;
pub use store::live::{NotesSnapshot, NotesSubscription};
pub use store::note_store::{NoteStore, SqliteNoteStore, StoreError, StoreResult};
pub use store::worker::WorkHandle;

/// Minimal health-check API for wiring checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
