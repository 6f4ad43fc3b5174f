//! Tests for KvService
//!
//! These tests verify:
//! - put/get/delete semantics and input validation
//! - Replay equivalence across restarts, for both log formats
//! - Sequence numbering in call order
//! - Corrupt logs abort construction
//! - A rejected store mutation is never logged
//! - A mutation the log refused is not applied
//! - Concurrent access

use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use tlogkv::config::{Config, LoggerKind, SyncStrategy};
use tlogkv::error::ErrorKind;
use tlogkv::protocol::Command;
use tlogkv::service::{KvService, ServiceState};
use tlogkv::tlog::{Event, EventKind, EventReader, LogSink, LoggerOptions, TransactionLogger};

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(path: &Path, kind: LoggerKind) -> Config {
    Config::builder()
        .logger_kind(kind)
        .log_path(path)
        .sync_strategy(SyncStrategy::EveryWrite) // Sync every write for test reliability
        .queue_capacity(8)
        .build()
}

fn setup_temp_service(kind: LoggerKind) -> (TempDir, PathBuf, KvService) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("transaction.log");
    let service = KvService::open(&config_for(&path, kind)).unwrap();
    (temp_dir, path, service)
}

fn reopen(path: &Path, kind: LoggerKind) -> KvService {
    KvService::open(&config_for(path, kind)).unwrap()
}

fn logged_events(path: &Path, kind: LoggerKind) -> Vec<Event> {
    let file = fs::File::open(path).unwrap();
    EventReader::new(file, kind, 0)
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

const KINDS: [LoggerKind; 2] = [LoggerKind::File, LoggerKind::Binary];

/// Sink whose every write fails
struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "device full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogSink for FailingSink {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_creates_log_file_and_goes_live() {
    let (_temp, path, service) = setup_temp_service(LoggerKind::File);

    assert!(path.exists());
    assert_eq!(service.state(), ServiceState::Live);
    assert_eq!(service.last_sequence(), 0);
}

#[test]
fn test_put_get() {
    let (_temp, _path, service) = setup_temp_service(LoggerKind::File);

    service.put("hello", "world").unwrap();

    assert_eq!(service.get("hello").unwrap(), "world");
}

#[test]
fn test_get_missing_key() {
    let (_temp, _path, service) = setup_temp_service(LoggerKind::File);

    let err = service.get("nonexistent").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_last_writer_wins() {
    let (_temp, _path, service) = setup_temp_service(LoggerKind::File);

    service.put("key", "value1").unwrap();
    service.put("key", "value2").unwrap();

    assert_eq!(service.get("key").unwrap(), "value2");
}

#[test]
fn test_delete_then_get_is_not_found() {
    let (_temp, _path, service) = setup_temp_service(LoggerKind::File);

    service.put("key", "value").unwrap();
    service.delete("key").unwrap();

    assert!(service.get("key").unwrap_err().is_not_found());
}

#[test]
fn test_delete_absent_key_succeeds() {
    let (_temp, _path, service) = setup_temp_service(LoggerKind::File);
    service.put("other", "x").unwrap();

    service.delete("nonexistent").unwrap();

    assert_eq!(service.store().len(), 1);
    assert_eq!(service.get("other").unwrap(), "x");
}

#[test]
fn test_empty_value_rejected_before_store_and_log() {
    let (_temp, path, service) = setup_temp_service(LoggerKind::File);

    let err = service.put("x", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(service.get("x").unwrap_err().is_not_found());

    service.close().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn test_empty_key_rejected() {
    let (_temp, _path, service) = setup_temp_service(LoggerKind::File);

    assert_eq!(service.put("", "v").unwrap_err().kind(), ErrorKind::InvalidInput);
    assert_eq!(service.get("").unwrap_err().kind(), ErrorKind::InvalidInput);
    assert_eq!(service.delete("").unwrap_err().kind(), ErrorKind::InvalidInput);
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_commands() {
    let (_temp, _path, service) = setup_temp_service(LoggerKind::File);

    let put = service
        .execute(Command::Put {
            key: "key".into(),
            value: "value".into(),
        })
        .unwrap();
    assert_eq!(put, None);

    let got = service.execute(Command::Get { key: "key".into() }).unwrap();
    assert_eq!(got, Some("value".to_string()));

    let deleted = service.execute(Command::Delete { key: "key".into() }).unwrap();
    assert_eq!(deleted, None);

    let err = service
        .execute(Command::Get { key: "key".into() })
        .unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(service.execute(Command::Ping).unwrap(), Some("PONG".to_string()));
}

// =============================================================================
// Durability / Replay Tests
// =============================================================================

#[test]
fn test_restart_scenario() {
    for kind in KINDS {
        let (_temp, path, service) = setup_temp_service(kind);

        service.put("a", "1").unwrap();
        service.put("b", "2").unwrap();
        service.delete("a").unwrap();
        service.close().unwrap();

        let service = reopen(&path, kind);
        assert!(service.get("a").unwrap_err().is_not_found(), "{:?}", kind);
        assert_eq!(service.get("b").unwrap(), "2");
    }
}

#[test]
fn test_sequence_numbers_follow_call_order() {
    let (_temp, path, service) = setup_temp_service(LoggerKind::File);

    service.put("a", "1").unwrap();
    service.put("b", "2").unwrap();
    service.delete("a").unwrap();
    service.put("c", "3").unwrap();
    service.close().unwrap();

    let events = logged_events(&path, LoggerKind::File);
    let summary: Vec<(u64, EventKind, &str)> = events
        .iter()
        .map(|e| (e.sequence, e.kind, e.key.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (1, EventKind::Put, "a"),
            (2, EventKind::Put, "b"),
            (3, EventKind::Delete, "a"),
            (4, EventKind::Put, "c"),
        ]
    );
}

#[test]
fn test_sequence_continues_after_restart() {
    let (_temp, path, service) = setup_temp_service(LoggerKind::Binary);
    service.put("a", "1").unwrap();
    service.put("b", "2").unwrap();
    service.close().unwrap();

    let service = reopen(&path, LoggerKind::Binary);
    assert_eq!(service.last_sequence(), 2);
    service.put("c", "3").unwrap();
    service.close().unwrap();

    let sequences: Vec<u64> = logged_events(&path, LoggerKind::Binary)
        .iter()
        .map(|e| e.sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}

#[test]
fn test_replay_equivalence() {
    for kind in KINDS {
        let (_temp, path, service) = setup_temp_service(kind);

        for i in 0..50 {
            service.put(&format!("key{}", i % 17), &format!("value{}", i)).unwrap();
            if i % 5 == 0 {
                service.delete(&format!("key{}", (i + 3) % 17)).unwrap();
            }
        }
        let before = service.store().snapshot();
        service.close().unwrap();

        let service = reopen(&path, kind);
        assert_eq!(service.store().snapshot(), before, "{:?}", kind);
    }
}

#[test]
fn test_special_characters_survive_restart() {
    for kind in KINDS {
        let (_temp, path, service) = setup_temp_service(kind);

        service.put("tab\tkey", "multi word value").unwrap();
        service.put("newline", "line1\nline2\r\n").unwrap();
        service.put("slash\\", "\\t is not a tab").unwrap();
        service.close().unwrap();

        let service = reopen(&path, kind);
        assert_eq!(service.get("tab\tkey").unwrap(), "multi word value");
        assert_eq!(service.get("newline").unwrap(), "line1\nline2\r\n");
        assert_eq!(service.get("slash\\").unwrap(), "\\t is not a tab");
    }
}

#[test]
fn test_drop_drains_like_close() {
    let (_temp, path, service) = setup_temp_service(LoggerKind::File);
    for i in 0..25 {
        service.put(&format!("k{}", i), "v").unwrap();
    }
    drop(service);

    let service = reopen(&path, LoggerKind::File);
    assert_eq!(service.store().len(), 25);
}

#[test]
fn test_out_of_sequence_log_aborts_open() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("transaction.log");
    fs::write(&path, "5\t1\ta\t1\n4\t1\tb\t2\n").unwrap();

    let err = KvService::open(&config_for(&path, LoggerKind::File))
        .err()
        .expect("corrupt log must not produce a service");
    assert_eq!(err.kind(), ErrorKind::Sequence);
    assert!(err.is_fatal());
}

#[test]
fn test_unparseable_log_aborts_open() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("transaction.log");
    fs::write(&path, "1\t1\ta\t1\ngarbage\n").unwrap();

    let err = KvService::open(&config_for(&path, LoggerKind::File))
        .err()
        .expect("corrupt log must not produce a service");
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_text_log_is_human_readable() {
    let (_temp, path, service) = setup_temp_service(LoggerKind::File);
    service.put("a", "1").unwrap();
    service.delete("a").unwrap();
    service.close().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "1\t1\ta\t1\n2\t2\ta\t\n");
}

// =============================================================================
// Capacity Tests
// =============================================================================

#[test]
fn test_rejected_store_write_is_not_logged() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("transaction.log");
    let config = Config::builder()
        .log_path(&path)
        .sync_strategy(SyncStrategy::EveryWrite)
        .max_keys(1)
        .build();

    let service = KvService::open(&config).unwrap();
    service.put("a", "1").unwrap();
    let err = service.put("b", "2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    service.close().unwrap();

    let events = logged_events(&path, LoggerKind::File);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, "a");
}

#[test]
fn test_put_refused_by_dead_writer_is_not_applied() {
    let logger = TransactionLogger::with_medium(
        LoggerKind::File,
        Box::new(Cursor::new(Vec::new())),
        Box::new(FailingSink),
        LoggerOptions::default(),
    );
    let service = KvService::new(logger).unwrap();

    // queued before the writer hits the failing sink
    service.put("a", "1").unwrap();
    let err = service.err().recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(err.kind(), ErrorKind::WriteFailure);

    let err = service.put("b", "2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteFailure);
    assert!(service.get("b").unwrap_err().is_not_found());

    let err = service.put("a", "2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteFailure);
    assert_eq!(service.get("a").unwrap(), "1");

    // deletes still apply; only the record is lost
    service.delete("a").unwrap();
    assert!(service.get("a").unwrap_err().is_not_found());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_then_replay() {
    let (_temp, path, service) = setup_temp_service(LoggerKind::Binary);
    let service = Arc::new(service);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for i in 0..50 {
                    service.put(&format!("t{}-k{}", t, i), &format!("v{}", i)).unwrap();
                    assert_eq!(service.get(&format!("t{}-k{}", t, i)).unwrap(), format!("v{}", i));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let service = Arc::try_unwrap(service).ok().expect("no other owners");
    let before = service.store().snapshot();
    assert_eq!(before.len(), 400);
    service.close().unwrap();

    let events = logged_events(&path, LoggerKind::Binary);
    assert_eq!(events.len(), 400);

    let service = reopen(&path, LoggerKind::Binary);
    assert_eq!(service.store().snapshot(), before);
}

#[test]
fn test_concurrent_writers_same_key_replay_matches() {
    for kind in KINDS {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("transaction.log");
        let config = Config::builder()
            .logger_kind(kind)
            .log_path(&path)
            .sync_strategy(SyncStrategy::EveryNEntries { count: 64 })
            .queue_capacity(1)
            .build();

        for round in 0..20 {
            let service = Arc::new(KvService::open(&config).unwrap());

            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let service = Arc::clone(&service);
                    thread::spawn(move || {
                        for i in 0..20 {
                            service.put("hot", &format!("t{}-{}", t, i)).unwrap();
                            if i % 7 == 0 {
                                service.delete("hot").unwrap();
                            }
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }

            let service = Arc::try_unwrap(service).ok().expect("no other owners");
            let live = service.store().snapshot();
            service.close().unwrap();

            let service = KvService::open(&config).unwrap();
            assert_eq!(service.store().snapshot(), live, "{:?} round {}", kind, round);
            service.close().unwrap();
        }
    }
}
