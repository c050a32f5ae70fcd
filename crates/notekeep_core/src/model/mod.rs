//! Domain model for locally persisted notes.
//!
//! # Responsibility
//! - Define the canonical note record shared by store, repository and UI.
//!
//! # Invariants
//! - Every note is identified by a stable, non-nil `NoteId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod note;
