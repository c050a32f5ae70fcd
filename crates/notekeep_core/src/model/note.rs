//! Note domain model.
//!
//! # Responsibility
//! - Define the immutable note record persisted by the store.
//! - Validate title/description/identity invariants at construction.
//!
//! # Invariants
//! - `id` is never nil and is stable for the note lifetime.
//! - `title` and `description` are non-empty after trimming.
//! - `entry_date` is set once, in Unix epoch milliseconds, and never changes.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a note. Unrelated to storage order.
pub type NoteId = Uuid;

const ENTRY_DATE_FORMAT: &str = "%a, %-d %b %I:%M %p";

/// Validation error for note invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    NilId,
    EmptyTitle,
    EmptyDescription,
    NegativeEntryDate(i64),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "note id must not be nil"),
            Self::EmptyTitle => write!(f, "note title must not be empty"),
            Self::EmptyDescription => write!(f, "note description must not be empty"),
            Self::NegativeEntryDate(value) => {
                write!(f, "note entry_date must be >= 0, got {value}")
            }
        }
    }
}

impl Error for NoteValidationError {}

/// A single user-authored note.
///
/// There are no setters. A changed note is a new value built with
/// [`Note::with_id`] that keeps the original `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NoteWire")]
pub struct Note {
    id: NoteId,
    title: String,
    description: String,
    entry_date: i64,
}

/// Unvalidated wire shape; only reachable through `Note::try_from`.
#[derive(Deserialize)]
struct NoteWire {
    id: NoteId,
    title: String,
    description: String,
    entry_date: i64,
}

impl TryFrom<NoteWire> for Note {
    type Error = NoteValidationError;

    fn try_from(value: NoteWire) -> Result<Self, Self::Error> {
        Note::with_id(value.id, value.title, value.description, value.entry_date)
    }
}

impl Note {
    /// Creates a note with a generated id and `entry_date = now`.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, NoteValidationError> {
        Self::with_id(Uuid::new_v4(), title, description, now_epoch_ms())
    }

    /// Creates a note with caller-provided identity and timestamp.
    ///
    /// Used for replacements of an existing note and for storage read-back.
    pub fn with_id(
        id: NoteId,
        title: impl Into<String>,
        description: impl Into<String>,
        entry_date: i64,
    ) -> Result<Self, NoteValidationError> {
        let note = Self {
            id,
            title: title.into(),
            description: description.into(),
            entry_date,
        };
        note.validate()?;
        Ok(note)
    }

    /// Re-checks every invariant of this note.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.id.is_nil() {
            return Err(NoteValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(NoteValidationError::EmptyTitle);
        }
        if self.description.trim().is_empty() {
            return Err(NoteValidationError::EmptyDescription);
        }
        if self.entry_date < 0 {
            return Err(NoteValidationError::NegativeEntryDate(self.entry_date));
        }
        Ok(())
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Creation time in Unix epoch milliseconds.
    pub fn entry_date(&self) -> i64 {
        self.entry_date
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Renders an entry date for list rows in the local time zone.
///
/// Returns `None` when the timestamp is outside the representable range.
pub fn format_entry_date(entry_date: i64) -> Option<String> {
    format_entry_date_in(entry_date, &Local)
}

/// Renders an entry date for list rows in an explicit time zone.
pub fn format_entry_date_in<Tz>(entry_date: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let utc = DateTime::<Utc>::from_timestamp_millis(entry_date)?;
    Some(
        utc.with_timezone(tz)
            .format(ENTRY_DATE_FORMAT)
            .to_string(),
    )
}

/// Demo notes used to seed an empty store.
pub fn sample_notes() -> Vec<Note> {
    const SAMPLES: &[(&str, &str)] = &[
        ("A good day", "We went on a vacation by the lake"),
        ("Android Compose", "Working on Android Compose course today"),
        ("Keep at it", "Sometimes things just happen"),
        ("A movie day", "Watching a movie with family today"),
        ("Groceries", "Milk eggs and bread"),
        ("Call mom", "Birthday wishes"),
    ];

    let base = now_epoch_ms();
    SAMPLES
        .iter()
        .enumerate()
        .filter_map(|(index, (title, description))| {
            Note::with_id(Uuid::new_v4(), *title, *description, base + index as i64).ok()
        })
        .collect()
}
