//! TagStore: tagged key-value store over one namespace
//!
//! ## Design
//!
//! A `TagStore` owns a validated [`Namespace`], the fixed statement set
//! compiled for it, and a reference to a [`ConnectionPool`]. It keeps no
//! in-process state about records: every call is one round trip to the
//! backing engine, with no batching, caching or retries.
//!
//! ## Ordering
//!
//! Keys are ordered by byte comparison. Bounded scans are exclusive of their
//! boundary, so a caller pages by passing the last key it saw.
//!
//! ## Failures
//!
//! Every error is reported to the handle's [`DiagnosticSink`] before it is
//! returned. Per-call failures are reported as [`Severity::Recoverable`].
//!
//! ## Thread Safety
//!
//! `TagStore` is `Send + Sync` and can be shared behind an `Arc`. A scan keeps
//! one pooled connection checked out until its closure returns. Another call
//! made from inside that closure runs on a spare connection; when there is
//! none it fails with [`Error::Query`] after the busy timeout.

use rusqlite::{params, OptionalExtension, Params};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tagstore_core::{
    Aggregate, Codec, Diagnostic, DiagnosticSink, Error, JsonCodec, Namespace, Operation, Record,
    Result, Severity, UNTAGGED,
};
use tracing::{debug, info};

use crate::builder::StoreBuilder;
use crate::config::StoreConfig;
use crate::iter::{limit_param, read_record, DecodedRecords, Records};
use crate::pool::ConnectionPool;
use crate::statements::Statements;

fn query_err(e: rusqlite::Error) -> Error {
    Error::Query(e.to_string())
}

/// Tagged key-value store scoped to one namespace
///
/// # Example
///
/// ```ignore
/// let store = TagStore::open("sessions", &StoreConfig::in_memory())?;
///
/// store.upsert("s:001", "alice", "active")?;
/// store.upsert("s:002", "bob", "active")?;
///
/// let keys = store.iterate_ascending("s:000", 10, |records| {
///     records.map(|r| r.key).collect::<Vec<_>>()
/// })?;
///
/// store.delete_by_tag("active")?;
/// store.close()?;
/// ```
pub struct TagStore<C = JsonCodec> {
    namespace: Namespace,
    statements: Statements,
    pool: Arc<ConnectionPool>,
    codec: C,
    sink: Arc<dyn DiagnosticSink>,
}

impl TagStore<JsonCodec> {
    /// Open a namespace with the JSON codec and the tracing sink.
    ///
    /// # Errors
    ///
    /// Returns an initialization error if the namespace name is invalid, the
    /// engine cannot be reached, or the schema cannot be created or compiled.
    pub fn open(name: &str, config: &StoreConfig) -> Result<Self> {
        StoreBuilder::new(name).config(config.clone()).open()
    }

    /// Start configuring a handle for `name`
    pub fn builder(name: &str) -> StoreBuilder<JsonCodec> {
        StoreBuilder::new(name)
    }
}

impl<C: Codec> TagStore<C> {
    pub(crate) fn from_parts(
        namespace: Namespace,
        statements: Statements,
        pool: Arc<ConnectionPool>,
        codec: C,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            namespace,
            statements,
            pool,
            codec,
            sink,
        }
    }

    /// Namespace served by this handle
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The pool behind this handle, for opening further namespaces on it
    pub fn pool(&self) -> Arc<ConnectionPool> {
        Arc::clone(&self.pool)
    }

    /// Codec used by the encoded/decoded operations
    pub fn codec(&self) -> &C {
        &self.codec
    }

    fn check<T>(
        &self,
        op: Operation,
        key: Option<&str>,
        tag: Option<&str>,
        result: Result<T>,
    ) -> Result<T> {
        if let Err(e) = &result {
            let mut d = Diagnostic::new(op, self.namespace.as_str(), e);
            d.key = key;
            d.tag = tag;
            self.sink.report(Severity::Recoverable, &d);
        }
        result
    }

    fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(sql).map_err(query_err)?;
            stmt.execute(params).map_err(query_err)
        })
    }

    // ========== Mutations ==========

    /// Insert `key` or replace its value and tag.
    ///
    /// Uses the engine's native upsert, so there is no read-then-write race.
    pub fn upsert(&self, key: &str, value: &str, tag: &str) -> Result<()> {
        let result = self
            .execute(&self.statements.upsert, params![key, value, tag])
            .map(|_| ());
        self.check(Operation::Upsert, Some(key), Some(tag), result)
    }

    /// Insert or replace `key` with no tag
    pub fn upsert_untagged(&self, key: &str, value: &str) -> Result<()> {
        self.upsert(key, value, UNTAGGED)
    }

    /// Encode `object` with the codec, then upsert it.
    ///
    /// An encode failure is reported and returned before anything is written.
    pub fn upsert_encoded<T: Serialize + ?Sized>(
        &self,
        key: &str,
        tag: &str,
        object: &T,
    ) -> Result<()> {
        let result = self.codec.encode(object).and_then(|encoded| {
            self.execute(&self.statements.upsert, params![key, encoded, tag])
                .map(|_| ())
        });
        self.check(Operation::UpsertEncoded, Some(key), Some(tag), result)
    }

    /// Remove `key`. Returns the number of records removed (0 or 1).
    pub fn delete_by_key(&self, key: &str) -> Result<usize> {
        let result = self.execute(&self.statements.delete_by_key, params![key]);
        self.check(Operation::DeleteByKey, Some(key), None, result)
    }

    /// Remove every record whose tag equals `tag` exactly.
    ///
    /// Returns the number of records removed.
    pub fn delete_by_tag(&self, tag: &str) -> Result<usize> {
        let result = self.execute(&self.statements.delete_by_tag, params![tag]);
        self.check(Operation::DeleteByTag, None, Some(tag), result)
    }

    /// Remove every record in the namespace. Returns the number removed.
    pub fn delete_all(&self) -> Result<usize> {
        let result = self.execute(&self.statements.delete_all, []);
        self.check(Operation::DeleteAll, None, None, result)
    }

    // ========== Lookup ==========

    fn fetch(&self, key: &str) -> Result<Option<Record>> {
        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(&self.statements.get).map_err(query_err)?;
            stmt.query_row(params![key], read_record)
                .optional()
                .map_err(query_err)
        })
    }

    /// Value stored under `key`, or `None` if the key is absent
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.fetch(key).map(|r| r.map(|r| r.value));
        self.check(Operation::Get, Some(key), None, result)
    }

    /// Full record (value and tag) stored under `key`
    pub fn get_record(&self, key: &str) -> Result<Option<Record>> {
        let result = self.fetch(key);
        self.check(Operation::Get, Some(key), None, result)
    }

    /// Value under `key` decoded into `T`.
    ///
    /// A stored value that does not decode fails the call with
    /// [`Error::RowDecode`].
    pub fn get_decoded<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let result = self.fetch(key).and_then(|record| {
            record
                .map(|r| self.codec.decode::<T>(&r.key, &r.value))
                .transpose()
        });
        self.check(Operation::GetDecoded, Some(key), None, result)
    }

    // ========== Range iteration ==========

    fn scan<R, F>(&self, op: Operation, sql: &str, boundary: &str, limit: usize, f: F) -> Result<R>
    where
        F: FnOnce(&mut Records<'_>) -> R,
    {
        let result = self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(sql).map_err(query_err)?;
            let rows = stmt
                .query(params![boundary, limit_param(limit)])
                .map_err(query_err)?;
            let mut records = Records::new(rows);
            let out = f(&mut records);
            debug!(
                target: "tagstore::store",
                namespace = self.namespace.as_str(),
                operation = %op,
                boundary,
                limit,
                delivered = records.delivered(),
                "Scan finished"
            );
            match records.into_error() {
                Some(e) => Err(query_err(e)),
                None => Ok(out),
            }
        });
        if let Err(e) = &result {
            self.sink.report(
                Severity::Recoverable,
                &Diagnostic::new(op, self.namespace.as_str(), e).with_boundary(boundary),
            );
        }
        result
    }

    /// Scan up to `limit` records with `key > boundary`, ascending.
    ///
    /// `f` receives the records lazily; whatever it does not pull is never
    /// fetched. Its return value is passed through.
    pub fn iterate_ascending<R, F>(&self, boundary: &str, limit: usize, f: F) -> Result<R>
    where
        F: FnOnce(&mut Records<'_>) -> R,
    {
        self.scan(
            Operation::IterateAscending,
            &self.statements.iterate_ascending,
            boundary,
            limit,
            f,
        )
    }

    /// Scan up to `limit` records with `key < boundary`, descending.
    pub fn iterate_descending<R, F>(&self, boundary: &str, limit: usize, f: F) -> Result<R>
    where
        F: FnOnce(&mut Records<'_>) -> R,
    {
        self.scan(
            Operation::IterateDescending,
            &self.statements.iterate_descending,
            boundary,
            limit,
            f,
        )
    }

    /// Scan up to `limit` records with `key <= boundary`, descending.
    ///
    /// Unlike the exclusive scans, a record stored exactly at `boundary` is
    /// delivered first.
    pub fn iterate_floor<R, F>(&self, boundary: &str, limit: usize, f: F) -> Result<R>
    where
        F: FnOnce(&mut Records<'_>) -> R,
    {
        self.scan(
            Operation::IterateFloor,
            &self.statements.iterate_floor,
            boundary,
            limit,
            f,
        )
    }

    /// Scan every record ascending, decoding each value into a fresh `T`.
    ///
    /// Rows that fail to decode are reported and skipped.
    pub fn iterate_all<T, R, F>(&self, f: F) -> Result<R>
    where
        T: DeserializeOwned,
        F: FnOnce(&mut DecodedRecords<'_, T, C>) -> R,
    {
        let result = self.pool.with_connection(|conn| {
            let mut stmt = conn
                .prepare_cached(&self.statements.iterate_all)
                .map_err(query_err)?;
            let rows = stmt.query([]).map_err(query_err)?;
            let mut records =
                DecodedRecords::new(rows, &self.codec, self.namespace.as_str(), &*self.sink);
            let out = f(&mut records);
            debug!(
                target: "tagstore::store",
                namespace = self.namespace.as_str(),
                delivered = records.delivered(),
                skipped = records.skipped(),
                "Full scan finished"
            );
            match records.into_error() {
                Some(e) => Err(query_err(e)),
                None => Ok(out),
            }
        });
        self.check(Operation::IterateAll, None, None, result)
    }

    // ========== Aggregate ==========

    /// Count of records with the smallest and largest key.
    ///
    /// An empty namespace yields `count == 0` and no bounds.
    pub fn count_all(&self) -> Result<Aggregate> {
        let result = self.pool.with_connection(|conn| {
            let mut stmt = conn
                .prepare_cached(&self.statements.count_all)
                .map_err(query_err)?;
            stmt.query_row([], |row| {
                let count: i64 = row.get(0)?;
                Ok(Aggregate {
                    count: u64::try_from(count).unwrap_or(0),
                    min_key: row.get(1)?,
                    max_key: row.get(2)?,
                })
            })
            .map_err(query_err)
        });
        self.check(Operation::CountAll, None, None, result)
    }

    // ========== Lifecycle ==========

    /// Release compiled statements, then the connections.
    ///
    /// Connections are closed only when this handle is the last owner of the
    /// pool; otherwise only the statement caches are released and the other
    /// handles recompile on next use.
    pub fn close(self) -> Result<()> {
        let namespace = self.namespace.clone();
        let result = match Arc::try_unwrap(self.pool) {
            Ok(pool) => pool.close(),
            Err(shared) => {
                shared.release_statements();
                Ok(())
            }
        };
        if let Err(e) = &result {
            self.sink.report(
                Severity::Recoverable,
                &Diagnostic::new(Operation::Close, namespace.as_str(), e),
            );
        }
        info!(target: "tagstore::store", namespace = namespace.as_str(), "Store closed");
        result
    }
}

impl<C> std::fmt::Debug for TagStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagStore")
            .field("namespace", &self.namespace)
            .field("pool", &self.pool)
            .finish()
    }
}
