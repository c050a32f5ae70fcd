//! Note repository.
//!
//! # Responsibility
//! - Forward add/update/delete/clear intents to the store worker.
//! - Expose the live, conflated note list to presentation code.
//!
//! # Invariants
//! - Stateless: every piece of state lives in the store.
//! - No validation, caching, retries or error translation happens here.
//! - Writes never run on the caller's thread.

use crate::model::note::{Note, NoteId};
use crate::store::handle::NoteStoreHandle;
use crate::store::live::NotesSubscription;
use crate::store::worker::WorkHandle;

/// Use-case facade over a shared [`NoteStoreHandle`].
#[derive(Clone)]
pub struct NoteRepository {
    store: NoteStoreHandle,
}

impl NoteRepository {
    /// Creates a repository over an already opened store.
    pub fn new(store: NoteStoreHandle) -> Self {
        Self { store }
    }

    /// Persists a new note (upsert by id).
    pub fn add_note(&self, note: Note) -> WorkHandle<()> {
        self.store.insert(note)
    }

    /// Replaces a stored note; resolves to `0` when the id is unknown.
    pub fn update_note(&self, note: Note) -> WorkHandle<usize> {
        self.store.update(note)
    }

    /// Removes a stored note; resolves to `0` when the id is unknown.
    pub fn delete_note(&self, note: Note) -> WorkHandle<usize> {
        self.store.delete(note)
    }

    pub fn delete_all_notes(&self) -> WorkHandle<usize> {
        self.store.delete_all()
    }

    pub fn get_note(&self, id: NoteId) -> WorkHandle<Option<Note>> {
        self.store.get(id)
    }

    /// Live note list; only the latest snapshot is delivered to slow readers.
    pub fn get_all_notes(&self) -> NotesSubscription {
        self.store.query_all()
    }
}
