//! Background worker that owns the SQLite connection.
//!
//! # Responsibility
//! - Run every store call off the caller's thread, one job at a time.
//! - Refresh the live snapshot after each successful write.
//! - Resolve a [`WorkHandle`] per job with the operation result.
//!
//! # Invariants
//! - Only the worker thread touches the connection, so writes are serialized.
//! - A write's snapshot is published before its handle resolves.
//! - Queued jobs run to completion even if their handles are dropped.
//! - A failed snapshot refresh does not fail the write that triggered it; the
//!   snapshot is marked stale and refreshed again after the next job.

use crate::model::note::Note;
use crate::store::live::{NotesSnapshot, SnapshotPublisher};
use crate::store::note_store::{NoteStore, SqliteNoteStore, StoreError, StoreResult};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};

const WORKER_THREAD_NAME: &str = "notekeep-store";

type Job = Box<dyn FnOnce(&mut WorkerState) + Send + 'static>;

/// Whether a job may change the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Read,
    Write,
}

/// Pending result of one store job.
///
/// Await it from async code or call [`wait`](Self::wait) from sync code.
/// Dropping it does not cancel the job.
#[must_use = "dropping a WorkHandle discards the operation result"]
pub struct WorkHandle<T> {
    receiver: oneshot::Receiver<StoreResult<T>>,
}

impl<T> WorkHandle<T> {
    /// Blocks the current thread until the job finishes.
    ///
    /// Must not be called from inside an async runtime worker.
    pub fn wait(self) -> StoreResult<T> {
        futures::executor::block_on(self)
    }
}

impl<T> Future for WorkHandle<T> {
    type Output = StoreResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(StoreError::WorkerUnavailable)))
    }
}

struct WorkerState {
    conn: Connection,
    publisher: SnapshotPublisher,
    snapshot_stale: bool,
}

impl WorkerState {
    fn refresh_snapshot(&mut self) {
        match SqliteNoteStore::new(&self.conn).list_all() {
            Ok(notes) => {
                self.snapshot_stale = false;
                let count = notes.len();
                if let Some(revision) = self.publisher.publish(notes) {
                    debug!(
                        "event=snapshot_publish module=store status=ok revision={} note_count={}",
                        revision, count
                    );
                }
            }
            Err(err) => {
                self.snapshot_stale = true;
                error!(
                    "event=snapshot_publish module=store status=error error_code=snapshot_query_failed error={}",
                    err
                );
            }
        }
    }
}

/// Dedicated thread serving store jobs from an unbounded queue.
pub struct StoreWorker {
    jobs: Option<mpsc::UnboundedSender<Job>>,
    thread: Option<JoinHandle<()>>,
    snapshots: watch::Receiver<NotesSnapshot>,
}

impl StoreWorker {
    /// Moves `conn` onto a new worker thread.
    ///
    /// The initial snapshot is loaded before the thread starts, so
    /// subscribers always see the table state at open time.
    pub fn spawn(conn: Connection) -> StoreResult<Self> {
        let initial: Vec<Note> = SqliteNoteStore::new(&conn).list_all()?;
        let initial_count = initial.len();
        let (publisher, snapshots) = SnapshotPublisher::new(initial);
        let (jobs_tx, mut jobs_rx) = mpsc::unbounded_channel::<Job>();

        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut state = WorkerState {
                    conn,
                    publisher,
                    snapshot_stale: false,
                };
                info!(
                    "event=store_worker module=store status=start note_count={}",
                    initial_count
                );
                while let Some(job) = jobs_rx.blocking_recv() {
                    job(&mut state);
                }
                info!("event=store_worker module=store status=stopped");
            })
            .map_err(|err| {
                error!(
                    "event=store_worker module=store status=error error_code=thread_spawn_failed error={}",
                    err
                );
                StoreError::WorkerUnavailable
            })?;

        Ok(Self {
            jobs: Some(jobs_tx),
            thread: Some(thread),
            snapshots,
        })
    }

    /// Queues `op` on the worker thread and returns its pending result.
    pub fn submit<T, F>(&self, kind: JobKind, op_name: &'static str, op: F) -> WorkHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteNoteStore<'_>) -> StoreResult<T> + Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        let job: Job = Box::new(move |state: &mut WorkerState| {
            let started_at = Instant::now();
            let result = op(&SqliteNoteStore::new(&state.conn));
            match &result {
                Ok(_) => debug!(
                    "event=store_op module=store status=ok op={} duration_ms={}",
                    op_name,
                    started_at.elapsed().as_millis()
                ),
                Err(err) => warn!(
                    "event=store_op module=store status=error op={} duration_ms={} error={}",
                    op_name,
                    started_at.elapsed().as_millis(),
                    err
                ),
            }

            if (kind == JobKind::Write && result.is_ok()) || state.snapshot_stale {
                state.refresh_snapshot();
            }
            // The caller may have dropped the handle; the job still ran.
            let _ = reply.send(result);
        });

        let queued = self
            .jobs
            .as_ref()
            .is_some_and(|jobs| jobs.send(job).is_ok());
        if !queued {
            warn!(
                "event=store_op module=store status=error op={} error_code=worker_unavailable",
                op_name
            );
        }

        WorkHandle { receiver }
    }

    pub(crate) fn snapshots(&self) -> watch::Receiver<NotesSnapshot> {
        self.snapshots.clone()
    }

    /// Closes the queue, drains pending jobs and joins the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Dropping the sender lets `blocking_recv` drain and return `None`.
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("event=store_worker module=store status=error error_code=worker_panicked");
            }
        }
    }
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
