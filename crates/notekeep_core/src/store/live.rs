//! Live, conflated snapshots of the note table.
//!
//! # Responsibility
//! - Publish the full ordered note list whenever the table changes.
//! - Hand each subscriber only the latest snapshot (single-slot mailbox).
//!
//! # Invariants
//! - `revision` increases by one per published change.
//! - Identical consecutive lists are never re-published.
//! - A subscriber that falls behind skips straight to the newest snapshot.

use crate::model::note::Note;
use futures::Stream;
use std::sync::Arc;
use tokio::sync::watch;

/// Full note list at one table revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesSnapshot {
    revision: u64,
    notes: Arc<Vec<Note>>,
}

impl NotesSnapshot {
    fn initial(notes: Vec<Note>) -> Self {
        Self {
            revision: 0,
            notes: Arc::new(notes),
        }
    }

    /// Monotonic table revision; `0` is the state loaded at startup.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Notes in insertion order.
    pub fn notes(&self) -> &[Note] {
        self.notes.as_slice()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Write side of the snapshot channel, owned by the store worker.
pub(crate) struct SnapshotPublisher {
    sender: watch::Sender<NotesSnapshot>,
}

impl SnapshotPublisher {
    pub(crate) fn new(initial: Vec<Note>) -> (Self, watch::Receiver<NotesSnapshot>) {
        let (sender, receiver) = watch::channel(NotesSnapshot::initial(initial));
        (Self { sender }, receiver)
    }

    /// Publishes `notes` if they differ from the current snapshot.
    ///
    /// Returns the new revision when a snapshot was published.
    pub(crate) fn publish(&self, notes: Vec<Note>) -> Option<u64> {
        let mut published = None;
        self.sender.send_if_modified(|current| {
            if current.notes.as_slice() == notes.as_slice() {
                return false;
            }
            let revision = current.revision + 1;
            *current = NotesSnapshot {
                revision,
                notes: Arc::new(notes),
            };
            published = Some(revision);
            true
        });
        published
    }
}

/// Subscription to the live note list.
///
/// The first [`next`](Self::next) yields the current snapshot immediately;
/// later calls wait for the next change. Dropping the subscription
/// unsubscribes.
pub struct NotesSubscription {
    receiver: watch::Receiver<NotesSnapshot>,
    /// Revision of the last snapshot handed out; `None` before the first.
    delivered: Option<u64>,
}

impl NotesSubscription {
    pub(crate) fn new(receiver: watch::Receiver<NotesSnapshot>) -> Self {
        Self {
            receiver,
            delivered: None,
        }
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the store has shut down and no unseen snapshot
    /// remains.
    pub async fn next(&mut self) -> Option<NotesSnapshot> {
        if self.delivered.is_none() {
            return Some(self.deliver());
        }

        // `changed` still yields an unseen value after the publisher drops.
        self.receiver.changed().await.ok()?;
        Some(self.deliver())
    }

    /// Returns a pending snapshot without waiting.
    ///
    /// A snapshot published just before shutdown is still returned once.
    pub fn try_next(&mut self) -> Option<NotesSnapshot> {
        if self.delivered.is_none() {
            return Some(self.deliver());
        }

        match self.receiver.has_changed() {
            Ok(true) => Some(self.deliver()),
            Ok(false) => None,
            Err(_) if self.has_unseen_after_close() => Some(self.deliver()),
            Err(_) => None,
        }
    }

    /// Blocking variant of [`next`](Self::next) for synchronous consumers.
    ///
    /// Must not be called from inside an async runtime worker.
    pub fn blocking_next(&mut self) -> Option<NotesSnapshot> {
        futures::executor::block_on(self.next())
    }

    /// Adapts this subscription into a conflated `Stream`.
    pub fn into_stream(self) -> impl Stream<Item = NotesSnapshot> {
        futures::stream::unfold(self, |mut subscription| async move {
            let snapshot = subscription.next().await?;
            Some((snapshot, subscription))
        })
    }

    fn deliver(&mut self) -> NotesSnapshot {
        let snapshot = self.receiver.borrow_and_update().clone();
        self.delivered = Some(snapshot.revision());
        snapshot
    }

    // `has_changed` errors once the publisher is gone, even when the final
    // snapshot was never read.
    fn has_unseen_after_close(&self) -> bool {
        self.delivered != Some(self.receiver.borrow().revision())
    }
}
