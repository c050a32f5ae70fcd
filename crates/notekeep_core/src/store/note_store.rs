//! Note table contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the durable create/read/delete operations over `notes`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `insert` is an upsert keyed by `id`; a replaced row keeps its position.
//! - `update`/`delete` on a missing id succeed without touching the table.
//! - Listing order is insertion order (`seq ASC`).
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::note::{Note, NoteId, NoteValidationError};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    entry_date
FROM notes";

pub type StoreResult<T> = Result<T, StoreError>;

/// Error surfaced by every note store operation.
#[derive(Debug)]
pub enum StoreError {
    /// Note failed entity validation before reaching SQL.
    Validation(NoteValidationError),
    /// SQLite rejected the write with a constraint violation.
    Constraint(String),
    /// I/O, disk or engine failure.
    Storage(DbError),
    /// A persisted row could not be turned back into a valid note.
    InvalidData(String),
    /// The background worker has shut down.
    WorkerUnavailable,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Constraint(message) => write!(f, "constraint violation: {message}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::WorkerUnavailable => write!(f, "note store worker is not running"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Constraint(_) | Self::InvalidData(_) | Self::WorkerUnavailable => None,
        }
    }
}

impl From<NoteValidationError> for StoreError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if value.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            return Self::Constraint(value.to_string());
        }
        Self::Storage(DbError::Sqlite(value))
    }
}

/// Synchronous table operations for notes.
pub trait NoteStore {
    /// Inserts `note`, replacing any stored note with the same id.
    fn insert(&self, note: &Note) -> StoreResult<()>;
    /// Replaces the stored note with the same id. Returns rows changed.
    fn update(&self, note: &Note) -> StoreResult<usize>;
    /// Removes the stored note with the same id. Returns rows removed.
    fn delete(&self, note: &Note) -> StoreResult<usize>;
    /// Clears the whole table. Returns rows removed.
    fn delete_all(&self) -> StoreResult<usize>;
    /// Reads one note back by id.
    fn get(&self, id: NoteId) -> StoreResult<Option<Note>>;
    /// Returns every note in insertion order.
    fn list_all(&self) -> StoreResult<Vec<Note>>;
}

/// SQLite-backed note store.
pub struct SqliteNoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Wraps a connection returned by [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`].
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn insert(&self, note: &Note) -> StoreResult<()> {
        note.validate()?;

        self.conn.execute(
            "INSERT INTO notes (id, title, description, entry_date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                entry_date = excluded.entry_date;",
            params![
                note.id().to_string(),
                note.title(),
                note.description(),
                note.entry_date(),
            ],
        )?;

        Ok(())
    }

    fn update(&self, note: &Note) -> StoreResult<usize> {
        note.validate()?;

        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?1,
                description = ?2,
                entry_date = ?3
             WHERE id = ?4;",
            params![
                note.title(),
                note.description(),
                note.entry_date(),
                note.id().to_string(),
            ],
        )?;

        Ok(changed)
    }

    fn delete(&self, note: &Note) -> StoreResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [note.id().to_string()])?;
        Ok(removed)
    }

    fn delete_all(&self) -> StoreResult<usize> {
        let removed = self.conn.execute("DELETE FROM notes;", [])?;
        Ok(removed)
    }

    fn get(&self, id: NoteId) -> StoreResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }

        Ok(None)
    }

    fn list_all(&self) -> StoreResult<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} ORDER BY seq ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();

        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }

        Ok(notes)
    }
}

fn parse_note_row(row: &Row<'_>) -> StoreResult<Note> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{id_text}` in notes.id"))
    })?;

    Note::with_id(
        id,
        row.get::<_, String>("title")?,
        row.get::<_, String>("description")?,
        row.get::<_, i64>("entry_date")?,
    )
    .map_err(|err| StoreError::InvalidData(format!("note {id_text}: {err}")))
}
