//! Repository seam between the note store and presentation code.
//!
//! # Responsibility
//! - Forward note use-cases to the store without adding behavior.
//! - Keep presentation code independent from SQL and threading details.

pub mod note_repository;
