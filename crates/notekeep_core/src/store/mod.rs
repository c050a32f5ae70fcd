//! Persistence store for notes.
//!
//! # Responsibility
//! - `note_store`: synchronous SQL contract over the `notes` table.
//! - `worker`: background thread that serializes every store call.
//! - `live`: conflated snapshots of the table for subscribers.
//! - `handle`: the async-facing entry point tying the three together.
//!
//! # Invariants
//! - Only the worker thread touches the connection.
//! - Snapshots reflect committed table state only.

pub mod handle;
pub mod live;
pub mod note_store;
pub mod worker;
