//! Open, reopen, close and failure reporting

use crate::common::*;
use std::sync::Arc;

#[test]
fn test_reopen_existing_namespace_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);

    let store = TagStore::open("users", &config).unwrap();
    store.upsert("u1", "ada", "admin").unwrap();
    store.close().unwrap();

    let store = TagStore::open("users", &config).unwrap();
    assert_eq!(store.get("u1").unwrap().as_deref(), Some("ada"));
    assert_eq!(store.count_all().unwrap().count, 1);
    store.close().unwrap();
}

#[test]
fn test_namespaces_are_isolated() {
    let t = TestStore::named("alpha");
    let beta = StoreBuilder::new("beta")
        .shared_pool(t.pool())
        .open()
        .unwrap();

    t.upsert("k", "from alpha", "x").unwrap();
    beta.upsert("k", "from beta", "x").unwrap();

    assert_eq!(t.get("k").unwrap().as_deref(), Some("from alpha"));
    assert_eq!(beta.get("k").unwrap().as_deref(), Some("from beta"));

    beta.delete_by_tag("x").unwrap();
    assert_eq!(t.get("k").unwrap().as_deref(), Some("from alpha"));
    assert_eq!(beta.get("k").unwrap(), None);
}

#[test]
fn test_closing_one_handle_keeps_shared_pool_open() {
    let t = TestStore::named("keeper");
    let other = StoreBuilder::new("leaver")
        .shared_pool(t.pool())
        .open()
        .unwrap();
    other.upsert_untagged("k", "v").unwrap();
    other.close().unwrap();

    t.upsert_untagged("still", "works").unwrap();
    assert_eq!(t.get("still").unwrap().as_deref(), Some("works"));
}

#[test]
fn test_invalid_namespace_is_fatal() {
    let sink = Arc::new(RecordingSink::default());
    let err = StoreBuilder::new("users; DROP TABLE x")
        .sink(sink.clone())
        .open()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidNamespace { .. }));

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity, Severity::Fatal);
    assert_eq!(reports[0].operation, Operation::Open);
}

#[test]
fn test_unreachable_engine_is_fatal_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let config = StoreConfig::with_path(dir.path().join("no").join("such").join("dir.db"));
    let err = StoreBuilder::new("users")
        .config(config)
        .sink(sink.clone())
        .open()
        .unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
    assert!(err.is_init());
    assert_eq!(sink.reports()[0].severity, Severity::Fatal);
}

#[test]
fn test_schema_conflict_is_fatal_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);
    occupy_clash_table(&config).close().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let err = StoreBuilder::new("clash")
        .config(config)
        .sink(sink.clone())
        .open()
        .unwrap_err();
    assert!(matches!(err, Error::Schema(_)), "got {err:?}");
    assert_eq!(sink.reports()[0].severity, Severity::Fatal);
}

/// Creates `kv_clash` with a shape the store cannot index.
fn occupy_clash_table(config: &StoreConfig) -> tagstore::ConnectionPool {
    let pool = tagstore::ConnectionPool::open(config).unwrap();
    pool.with_connection(|conn| {
        conn.execute_batch("CREATE TABLE kv_clash (id INTEGER);")
            .map_err(|e| Error::Query(e.to_string()))
    })
    .unwrap();
    pool
}

#[test]
fn test_engine_failure_after_open_is_recoverable_query_error() {
    let t = TestStore::named("vanishing");
    t.seed(&["a"]);
    exec_raw(&t, "DROP TABLE kv_vanishing;");

    let err = t.count_all().unwrap_err();
    assert!(matches!(err, Error::Query(_)));
    assert!(!err.is_init());

    let err = t.iterate_ascending("", 10, keys).unwrap_err();
    assert!(matches!(err, Error::Query(_)));

    let reports = t.sink.reports();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.severity == Severity::Recoverable));
    assert_eq!(reports[0].operation, Operation::CountAll);
    assert_eq!(reports[1].operation, Operation::IterateAscending);
    assert_eq!(reports[1].key, None);
    assert_eq!(reports[1].boundary.as_deref(), Some(""));
    assert!(reports.iter().all(|r| r.namespace == "vanishing"));
}

#[test]
fn test_engine_error_mid_scan_is_reported_after_closure() {
    let t = TestStore::named("seed");
    // Same table shape minus NOT NULL, so a row can carry a NULL tag.
    exec_raw(
        &t,
        "CREATE TABLE kv_loose (k TEXT PRIMARY KEY, v TEXT, t TEXT);
         INSERT INTO kv_loose VALUES ('a', '1', ''), ('b', '2', NULL), ('c', '3', '');",
    );
    let loose = StoreBuilder::new("loose")
        .shared_pool(t.pool())
        .sink(t.sink.clone())
        .open()
        .unwrap();

    let mut seen = Vec::new();
    let mut closure_finished = false;
    let err = loose
        .iterate_ascending("", 10, |records| {
            seen.extend(records.map(|r| r.key));
            closure_finished = true;
        })
        .unwrap_err();

    assert!(matches!(err, Error::Query(_)), "got {err:?}");
    assert!(closure_finished);
    assert_eq!(seen, ["a"]);

    let reports = t.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity, Severity::Recoverable);
    assert_eq!(reports[0].operation, Operation::IterateAscending);
    assert_eq!(reports[0].namespace, "loose");
    assert_eq!(reports[0].key, None);
    assert_eq!(reports[0].boundary.as_deref(), Some(""));

    assert_eq!(loose.get("c").unwrap().as_deref(), Some("3"));
}

#[test]
fn test_statement_cache_smaller_than_one_namespace_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = file_config(&dir);
    config.statement_cache_capacity = 1;
    let sink = Arc::new(RecordingSink::default());
    let err = StoreBuilder::new("tiny")
        .config(config)
        .sink(sink.clone())
        .open()
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(sink.reports()[0].severity, Severity::Fatal);
}

#[test]
fn test_open_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(tagstore::CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        format!(
            "path = {:?}\npool_size = 2\nsynchronous = \"normal\"\n",
            dir.path().join("cfg.db").display().to_string()
        ),
    )
    .unwrap();

    let config = StoreConfig::from_file(&path).unwrap();
    let store = TagStore::open("configured", &config).unwrap();
    assert_eq!(store.pool().size(), 2);
    store.upsert_untagged("k", "v").unwrap();
    store.close().unwrap();
}

#[test]
fn test_in_memory_store() {
    let store = TagStore::open("mem", &StoreConfig::in_memory()).unwrap();
    store.upsert_untagged("k", "v").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    assert_eq!(store.pool().size(), 1);
    store.close().unwrap();
}
