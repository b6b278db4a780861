//! History persisted to SQLite answers repair requests after a restart.

use waku_sds::{
    HistoryEntry, LocalHistory, PersistentHistory, PersistentHistoryOptions, RepairConfig,
    RepairManager, SqliteHistoryStorage,
};
use waku_sds_testkit::Participant;

#[test]
fn test_repair_served_from_restored_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sds.db");
    let options = PersistentHistoryOptions::new("chat");

    let mut alice = Participant::new("alice", "chat", RepairConfig::default()).unwrap();
    let m1 = alice.send(b"first", 0).unwrap();
    let m2 = alice.send(b"second", 0).unwrap();

    {
        let storage = SqliteHistoryStorage::open(&path).unwrap();
        let mut history = PersistentHistory::open(storage, &options);
        assert_eq!(history.extend([m1.clone(), m2.clone()]).unwrap(), 2);
    }

    let storage = SqliteHistoryStorage::open(&path).unwrap();
    let history = PersistentHistory::open(storage, &options);
    assert_eq!(history.len(), 2);
    assert!(history.contains(m1.message_id()));
    assert_eq!(
        history.get(m2.message_id()).and_then(|m| m.payload().cloned()),
        m2.payload().cloned()
    );

    let mut repair = RepairManager::new("alice", RepairConfig::default()).unwrap();
    let request = HistoryEntry::new(m1.message_id().clone()).with_sender("alice");
    repair.process_incoming_repair_requests_at(&[request], &history, 1_000);

    // Own message: answered at once.
    assert_eq!(repair.next_response_time(), Some(1_000));
    let responses = repair.sweep_incoming_buffer_at(&history, 1_000);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].message_id(), m1.message_id());
}

#[test]
fn test_channels_do_not_share_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sds.db");

    let mut alice = Participant::new("alice", "chat", RepairConfig::default()).unwrap();
    let m1 = alice.send(b"first", 0).unwrap();

    {
        let storage = SqliteHistoryStorage::open(&path).unwrap();
        let mut history = PersistentHistory::open(storage, &PersistentHistoryOptions::new("chat"));
        assert!(history.push(m1).unwrap());
    }

    let storage = SqliteHistoryStorage::open(&path).unwrap();
    let other = PersistentHistory::open(storage, &PersistentHistoryOptions::new("other"));
    assert!(other.is_empty());
}
