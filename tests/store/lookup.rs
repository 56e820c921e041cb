//! Point lookup semantics

use crate::common::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    ttl_secs: u64,
}

#[test]
fn test_get_absent_is_none_not_error() {
    let t = TestStore::new();
    assert_eq!(t.get("nope").unwrap(), None);
    assert_eq!(t.get_record("nope").unwrap(), None);
    assert_eq!(t.get_decoded::<Session>("nope").unwrap(), None);
    assert_eq!(t.sink.count(), 0);
}

#[test]
fn test_get_record_includes_tag() {
    let t = TestStore::new();
    t.upsert("s:1", "payload", "active").unwrap();
    let record = t.get_record("s:1").unwrap().unwrap();
    assert_eq!(record.key, "s:1");
    assert_eq!(record.value, "payload");
    assert_eq!(record.tag, "active");
}

#[test]
fn test_get_decoded_round_trip() {
    let t = TestStore::new();
    let session = Session {
        user: "ada".into(),
        ttl_secs: 3600,
    };
    t.upsert_encoded("s:1", "active", &session).unwrap();
    assert_eq!(t.get_decoded::<Session>("s:1").unwrap(), Some(session));
}

#[test]
fn test_get_decoded_corrupt_record_fails_call() {
    let t = TestStore::new();
    t.upsert("s:1", "{not json", "").unwrap();

    let err = t.get_decoded::<Session>("s:1").unwrap_err();
    match &err {
        Error::RowDecode { key, .. } => assert_eq!(key, "s:1"),
        other => panic!("expected RowDecode, got {other:?}"),
    }
    assert!(!err.is_init());

    let reports = t.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].operation, Operation::GetDecoded);
    assert_eq!(reports[0].severity, Severity::Recoverable);

    // Raw access still works
    assert_eq!(t.get("s:1").unwrap().as_deref(), Some("{not json"));
}

#[test]
fn test_keys_are_case_and_byte_exact() {
    let t = TestStore::new();
    t.upsert_untagged("Key", "upper").unwrap();
    t.upsert_untagged("key", "lower").unwrap();
    t.upsert_untagged("key ", "trailing space").unwrap();
    assert_eq!(t.get("Key").unwrap().as_deref(), Some("upper"));
    assert_eq!(t.get("key").unwrap().as_deref(), Some("lower"));
    assert_eq!(t.get("key ").unwrap().as_deref(), Some("trailing space"));
    assert_eq!(t.count_all().unwrap().count, 3);
}
