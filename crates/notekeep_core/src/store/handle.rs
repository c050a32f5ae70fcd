//! Async entry point to the persistence store.
//!
//! # Responsibility
//! - Open the database and start the store worker.
//! - Expose note table operations as background jobs.
//! - Expose the live note list (`query_all`).
//!
//! # Invariants
//! - Cloning a handle shares one worker and one connection.
//! - The worker stops once the last handle is dropped.

use crate::db::{open_db, open_db_in_memory};
use crate::model::note::{Note, NoteId};
use crate::store::live::NotesSubscription;
use crate::store::note_store::{NoteStore, StoreResult};
use crate::store::worker::{JobKind, StoreWorker, WorkHandle};
use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

/// Shared handle to the background note store.
#[derive(Clone)]
pub struct NoteStoreHandle {
    worker: Arc<StoreWorker>,
}

impl NoteStoreHandle {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(path)?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory()?;
        Self::from_connection(conn)
    }

    /// Starts the worker on an already migrated connection.
    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        let worker = StoreWorker::spawn(conn)?;
        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    /// Upserts `note`.
    pub fn insert(&self, note: Note) -> WorkHandle<()> {
        self.worker
            .submit(JobKind::Write, "insert", move |store| store.insert(&note))
    }

    /// Replaces the stored note with the same id; resolves to rows changed.
    pub fn update(&self, note: Note) -> WorkHandle<usize> {
        self.worker
            .submit(JobKind::Write, "update", move |store| store.update(&note))
    }

    /// Removes the stored note with the same id; resolves to rows removed.
    pub fn delete(&self, note: Note) -> WorkHandle<usize> {
        self.worker
            .submit(JobKind::Write, "delete", move |store| store.delete(&note))
    }

    /// Clears the table; resolves to rows removed.
    pub fn delete_all(&self) -> WorkHandle<usize> {
        self.worker
            .submit(JobKind::Write, "delete_all", |store| store.delete_all())
    }

    pub fn get(&self, id: NoteId) -> WorkHandle<Option<Note>> {
        self.worker
            .submit(JobKind::Read, "get", move |store| store.get(id))
    }

    /// One-shot read of the full list in insertion order.
    pub fn list_all(&self) -> WorkHandle<Vec<Note>> {
        self.worker
            .submit(JobKind::Read, "list_all", |store| store.list_all())
    }

    /// Subscribes to the live, conflated note list.
    pub fn query_all(&self) -> NotesSubscription {
        NotesSubscription::new(self.worker.snapshots())
    }

    /// Releases this handle; joins the worker if it was the last one.
    pub fn shutdown(self) {
        match Arc::try_unwrap(self.worker) {
            Ok(worker) => {
                worker.shutdown();
                info!("event=store_shutdown module=store status=ok");
            }
            Err(_shared) => {
                info!("event=store_shutdown module=store status=ok detail=handle_released");
            }
        }
    }
}
