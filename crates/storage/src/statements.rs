//! Schema and compiled statement text for one namespace
//!
//! Every statement a handle runs is fixed at open time. Keys compare with
//! SQLite's default BINARY collation, which is byte order over UTF-8.

use rusqlite::Connection;
use tagstore_core::{Error, Namespace, Operation, Result};

/// Statements compiled per namespace on every pooled connection.
pub(crate) const STATEMENTS_PER_NAMESPACE: usize = 10;

/// Columns: `k` key, `v` value, `t` tag.
pub(crate) struct Statements {
    schema: String,
    pub(crate) upsert: String,
    pub(crate) get: String,
    pub(crate) iterate_ascending: String,
    pub(crate) iterate_descending: String,
    pub(crate) iterate_floor: String,
    pub(crate) iterate_all: String,
    pub(crate) delete_by_key: String,
    pub(crate) delete_by_tag: String,
    pub(crate) delete_all: String,
    pub(crate) count_all: String,
}

impl Statements {
    pub(crate) fn for_namespace(ns: &Namespace) -> Self {
        let table = ns.table_name();
        Self {
            schema: format!(
                "CREATE TABLE IF NOT EXISTS {table} (k TEXT PRIMARY KEY NOT NULL, v TEXT NOT NULL, t TEXT NOT NULL);\n\
                 CREATE INDEX IF NOT EXISTS {kidx} ON {table} (k, t);\n\
                 CREATE INDEX IF NOT EXISTS {tidx} ON {table} (t, k);",
                kidx = ns.key_index_name(),
                tidx = ns.tag_index_name(),
            ),
            upsert: format!(
                "INSERT INTO {table} (k, v, t) VALUES (?1, ?2, ?3) \
                 ON CONFLICT (k) DO UPDATE SET v = excluded.v, t = excluded.t"
            ),
            get: format!("SELECT k, v, t FROM {table} WHERE k = ?1"),
            iterate_ascending: format!(
                "SELECT k, v, t FROM {table} WHERE k > ?1 ORDER BY k ASC LIMIT ?2"
            ),
            iterate_descending: format!(
                "SELECT k, v, t FROM {table} WHERE k < ?1 ORDER BY k DESC LIMIT ?2"
            ),
            iterate_floor: format!(
                "SELECT k, v, t FROM {table} WHERE k <= ?1 ORDER BY k DESC LIMIT ?2"
            ),
            iterate_all: format!("SELECT k, v FROM {table} ORDER BY k ASC"),
            delete_by_key: format!("DELETE FROM {table} WHERE k = ?1"),
            delete_by_tag: format!("DELETE FROM {table} WHERE t = ?1"),
            delete_all: format!("DELETE FROM {table}"),
            count_all: format!("SELECT COUNT(k), MIN(k), MAX(k) FROM {table}"),
        }
    }

    fn compiled(&self) -> [(Operation, &str); STATEMENTS_PER_NAMESPACE] {
        [
            (Operation::Upsert, self.upsert.as_str()),
            (Operation::Get, self.get.as_str()),
            (Operation::IterateAscending, self.iterate_ascending.as_str()),
            (Operation::IterateDescending, self.iterate_descending.as_str()),
            (Operation::IterateFloor, self.iterate_floor.as_str()),
            (Operation::IterateAll, self.iterate_all.as_str()),
            (Operation::DeleteByKey, self.delete_by_key.as_str()),
            (Operation::DeleteByTag, self.delete_by_tag.as_str()),
            (Operation::DeleteAll, self.delete_all.as_str()),
            (Operation::CountAll, self.count_all.as_str()),
        ]
    }

    /// Number of statements compiled per connection
    pub(crate) fn compiled_count(&self) -> usize {
        self.compiled().len()
    }

    /// Create the table and indexes if missing. Idempotent.
    pub(crate) fn ensure_schema(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&self.schema)
            .map_err(|e| Error::Schema(format!("failed to create storage object: {}", e)))
    }

    /// Compile every statement into the connection's statement cache.
    pub(crate) fn compile(&self, conn: &Connection) -> Result<()> {
        for (op, sql) in self.compiled() {
            conn.prepare_cached(sql)
                .map_err(|e| Error::Schema(format!("failed to compile {}: {}", op, e)))?;
        }
        Ok(())
    }
}
