use futures::StreamExt;
use notekeep_core::db::open_db_in_memory;
use notekeep_core::{Note, NoteRepository, NoteStoreHandle, StoreError};
use std::collections::HashSet;
use std::thread;
use uuid::Uuid;

const T0: i64 = 1_700_000_000_000;
const T1: i64 = 1_700_000_060_000;

fn repository() -> NoteRepository {
    NoteRepository::new(NoteStoreHandle::open_in_memory().unwrap())
}

fn note_at(title: &str, description: &str, entry_date: i64) -> Note {
    Note::with_id(Uuid::new_v4(), title, description, entry_date).unwrap()
}

/// Repository over an in-memory database prepared with extra `sql`.
fn repository_with(sql: &str) -> NoteRepository {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(sql).unwrap();
    NoteRepository::new(NoteStoreHandle::from_connection(conn).unwrap())
}

#[test]
fn groceries_then_call_mom_scenario() {
    let repo = repository();
    let mut live = repo.get_all_notes();
    assert!(live.blocking_next().unwrap().is_empty());

    let groceries = note_at("Groceries", "Milk, eggs", T0);
    let call_mom = note_at("Call mom", "Birthday", T1);
    repo.add_note(groceries.clone()).wait().unwrap();
    repo.add_note(call_mom.clone()).wait().unwrap();

    let both = live.blocking_next().unwrap();
    assert_eq!(both.notes(), &[groceries.clone(), call_mom.clone()]);

    assert_eq!(repo.delete_note(groceries).wait().unwrap(), 1);
    let remaining = live.blocking_next().unwrap();
    assert_eq!(remaining.notes(), &[call_mom]);
}

#[test]
fn inserted_note_appears_exactly_once() {
    let repo = repository();
    let note = note_at("Groceries", "Milk, eggs", T0);

    repo.add_note(note.clone()).wait().unwrap();
    repo.add_note(note.clone()).wait().unwrap();

    let snapshot = repo.get_all_notes().blocking_next().unwrap();
    let matching: Vec<&Note> = snapshot
        .notes()
        .iter()
        .filter(|stored| stored.id() == note.id())
        .collect();
    assert_eq!(matching, vec![&note]);
}

#[test]
fn deleted_note_is_never_emitted_again() {
    let repo = repository();
    let doomed = note_at("Doomed", "Remove me", T0);
    let kept = note_at("Kept", "Stay", T1);
    repo.add_note(doomed.clone()).wait().unwrap();
    repo.add_note(kept.clone()).wait().unwrap();
    repo.delete_note(doomed.clone()).wait().unwrap();

    let mut live = repo.get_all_notes();
    repo.add_note(note_at("Later", "Another", T1)).wait().unwrap();
    repo.update_note(kept).wait().unwrap();

    while let Some(snapshot) = live.try_next() {
        assert!(snapshot.notes().iter().all(|note| note.id() != doomed.id()));
    }
}

#[test]
fn delete_all_emits_empty_collection() {
    let repo = repository();
    repo.add_note(note_at("a", "b", T0)).wait().unwrap();
    repo.add_note(note_at("c", "d", T1)).wait().unwrap();

    let mut live = repo.get_all_notes();
    assert_eq!(live.blocking_next().unwrap().len(), 2);

    assert_eq!(repo.delete_all_notes().wait().unwrap(), 2);
    assert!(live.blocking_next().unwrap().is_empty());
}

#[test]
fn get_note_roundtrips_all_fields() {
    let repo = repository();
    let note = note_at("Groceries", "Milk, eggs", T0);
    repo.add_note(note.clone()).wait().unwrap();

    assert_eq!(repo.get_note(note.id()).wait().unwrap(), Some(note));
    assert_eq!(repo.get_note(Uuid::new_v4()).wait().unwrap(), None);
}

#[test]
fn duplicate_id_replaces_previous_record() {
    let repo = repository();
    let original = note_at("Groceries", "Milk", T0);
    repo.add_note(original.clone()).wait().unwrap();

    let replacement = Note::with_id(original.id(), "Groceries", "Milk and bread", T0).unwrap();
    repo.add_note(replacement.clone()).wait().unwrap();

    let snapshot = repo.get_all_notes().blocking_next().unwrap();
    assert_eq!(snapshot.notes(), &[replacement]);
}

#[test]
fn noop_writes_do_not_emit() {
    let repo = repository();
    let stored = note_at("Stored", "Here", T0);
    repo.add_note(stored.clone()).wait().unwrap();

    let mut live = repo.get_all_notes();
    let current = live.try_next().unwrap();

    let ghost = note_at("Ghost", "Missing", T1);
    assert_eq!(repo.update_note(ghost.clone()).wait().unwrap(), 0);
    assert_eq!(repo.delete_note(ghost).wait().unwrap(), 0);
    repo.add_note(stored).wait().unwrap();

    assert!(live.try_next().is_none());
    assert_eq!(repo.get_all_notes().try_next().unwrap(), current);
}

#[test]
fn rapid_writes_conflate_into_latest_snapshot() {
    let repo = repository();
    let mut live = repo.get_all_notes();
    let initial = live.try_next().unwrap();

    let notes: Vec<Note> = (0..5)
        .map(|index| note_at(&format!("note {index}"), "body", T0 + index))
        .collect();
    for note in &notes {
        repo.add_note(note.clone()).wait().unwrap();
    }

    let latest = live.try_next().expect("one pending snapshot");
    assert_eq!(latest.revision(), initial.revision() + 5);
    assert_eq!(latest.notes(), notes.as_slice());
    assert!(live.try_next().is_none());
}

#[test]
fn dropped_handle_does_not_cancel_write() {
    let repo = repository();
    let note = note_at("Fire and forget", "Still saved", T0);

    let _ = repo.add_note(note.clone());

    // The queue is FIFO, so this read runs after the insert.
    assert_eq!(repo.get_note(note.id()).wait().unwrap(), Some(note));
}

#[test]
fn concurrent_writers_are_serialized() {
    let repo = repository();
    let writers: Vec<_> = (0..4)
        .map(|writer| {
            let repo = repo.clone();
            thread::spawn(move || {
                (0..10)
                    .map(|index| {
                        let note = note_at(&format!("w{writer} n{index}"), "body", T0);
                        repo.add_note(note.clone()).wait().unwrap();
                        note.id()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut expected = HashSet::new();
    for writer in writers {
        expected.extend(writer.join().unwrap());
    }

    let snapshot = repo.get_all_notes().blocking_next().unwrap();
    let stored: HashSet<_> = snapshot.notes().iter().map(Note::id).collect();
    assert_eq!(stored, expected);
    assert_eq!(snapshot.len(), 40);
}

#[test]
fn subscription_ends_after_shutdown() {
    let store = NoteStoreHandle::open_in_memory().unwrap();
    let mut live = store.query_all();
    store.insert(note_at("a", "b", T0)).wait().unwrap();

    store.shutdown();

    assert_eq!(live.blocking_next().unwrap().len(), 1);
    assert!(live.blocking_next().is_none());
}

#[test]
fn store_reopens_with_persisted_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.sqlite3");
    let note = note_at("Groceries", "Milk, eggs", T0);

    let store = NoteStoreHandle::open(&path).unwrap();
    store.insert(note.clone()).wait().unwrap();
    store.shutdown();

    let reopened = NoteStoreHandle::open(&path).unwrap();
    let snapshot = reopened.query_all().blocking_next().unwrap();
    assert_eq!(snapshot.revision(), 0);
    assert_eq!(snapshot.notes(), &[note]);
}

#[test]
fn try_next_delivers_pending_snapshot_after_shutdown() {
    let store = NoteStoreHandle::open_in_memory().unwrap();
    let mut live = store.query_all();
    assert!(live.try_next().unwrap().is_empty());

    store.insert(note_at("a", "b", T0)).wait().unwrap();
    store.shutdown();

    assert_eq!(live.try_next().unwrap().len(), 1);
    assert!(live.try_next().is_none());
}

#[test]
fn store_failure_reaches_caller_untranslated() {
    let repo = repository_with(
        "CREATE TRIGGER reject_notes BEFORE INSERT ON notes
         BEGIN SELECT RAISE(ABORT, 'notes are read-only'); END;",
    );
    let mut live = repo.get_all_notes();
    assert!(live.try_next().unwrap().is_empty());

    let err = repo
        .add_note(note_at("Groceries", "Milk, eggs", T0))
        .wait()
        .unwrap_err();
    assert!(matches!(err, StoreError::Constraint(message) if message.contains("read-only")));

    assert!(live.try_next().is_none());
    assert!(repo.get_all_notes().try_next().unwrap().is_empty());
}

#[test]
fn failed_snapshot_refresh_recovers_on_next_write() {
    // Inserting a note titled "Poison" also stores a row that cannot be read back.
    let repo = repository_with(
        "CREATE TRIGGER poison_notes AFTER INSERT ON notes WHEN NEW.title = 'Poison'
         BEGIN
             INSERT INTO notes (id, title, description, entry_date)
             VALUES ('not-a-uuid', 'title', 'description', 0);
         END;",
    );
    let mut live = repo.get_all_notes();
    assert!(live.try_next().unwrap().is_empty());

    repo.add_note(note_at("Groceries", "Milk, eggs", T0)).wait().unwrap();
    assert_eq!(live.try_next().unwrap().revision(), 1);

    // The write itself succeeds; only the snapshot refresh fails.
    repo.add_note(note_at("Poison", "Bad row", T1)).wait().unwrap();
    assert!(live.try_next().is_none());
    assert_eq!(repo.get_note(Uuid::new_v4()).wait().unwrap(), None);

    assert_eq!(repo.delete_all_notes().wait().unwrap(), 3);
    let recovered = live.try_next().expect("snapshot refreshed after recovery");
    assert_eq!(recovered.revision(), 2);
    assert!(recovered.is_empty());
}

#[tokio::test]
async fn live_stream_follows_async_writes() {
    let repo = repository();
    let mut stream = Box::pin(repo.get_all_notes().into_stream());

    assert!(stream.next().await.unwrap().is_empty());

    let note = note_at("Groceries", "Milk, eggs", T0);
    repo.add_note(note.clone()).await.unwrap();
    assert_eq!(stream.next().await.unwrap().notes(), &[note.clone()]);

    repo.delete_note(note).await.unwrap();
    assert!(stream.next().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stream_waits_for_background_write() {
    let repo = repository();
    let mut live = repo.get_all_notes();
    assert!(live.next().await.unwrap().is_empty());

    let writer = repo.clone();
    let note = note_at("Call mom", "Birthday", T1);
    let expected = note.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        writer.add_note(note).await.unwrap();
    });

    let snapshot = tokio::time::timeout(std::time::Duration::from_secs(5), live.next())
        .await
        .expect("snapshot within timeout")
        .unwrap();
    assert_eq!(snapshot.notes(), &[expected]);
}
