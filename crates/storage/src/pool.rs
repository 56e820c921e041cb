//! Connection pool over the backing engine
//!
//! A `rusqlite::Connection` is a single channel and is not `Sync`, so each
//! pooled connection sits behind its own mutex. There is no pool-wide lock:
//! a caller checks out whichever connection is idle, starting from a
//! round-robin cursor, and only waits when every connection is busy. That
//! wait is bounded by the busy timeout; a checkout that times out fails with
//! [`Error::Query`] instead of blocking. A call made from inside a scan
//! closure on a pool whose connections are all held therefore fails rather
//! than deadlocking.
//!
//! A pool is reference counted and may back several namespaces at once.
//! Compiled statements live in each connection's statement cache, which
//! grows as namespaces reserve room for their statement sets.

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tagstore_core::{Error, Result};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;

/// Pool of engine connections
pub struct ConnectionPool {
    slots: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
    path: PathBuf,
    checkout_timeout: Duration,
    statement_capacity: AtomicUsize,
    statements_reserved: AtomicUsize,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("path", &self.path)
            .field("size", &self.slots.len())
            .field("checkout_timeout", &self.checkout_timeout)
            .field("statement_capacity", &self.statement_capacity())
            .finish()
    }
}

impl ConnectionPool {
    /// Open every connection described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid config and
    /// [`Error::Connection`] when a connection or pragma fails.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        if config.is_memory() && config.pool_size > 1 {
            warn!(
                target: "tagstore::pool",
                requested = config.pool_size,
                "In-memory store uses a single connection; pool_size ignored"
            );
        }
        let size = config.effective_pool_size();
        let mut slots = Vec::with_capacity(size);
        for _ in 0..size {
            slots.push(Mutex::new(open_connection(config)?));
        }
        info!(
            target: "tagstore::pool",
            path = %config.path.display(),
            size,
            "Connection pool opened"
        );
        Ok(Self {
            slots,
            cursor: AtomicUsize::new(0),
            path: config.path.clone(),
            checkout_timeout: Duration::from_millis(config.busy_timeout_ms),
            statement_capacity: AtomicUsize::new(config.statement_cache_capacity),
            statements_reserved: AtomicUsize::new(0),
        })
    }

    /// Wrap an already-open connection as a pool of one, using default
    /// timeouts and statement cache capacity.
    pub fn from_connection(connection: Connection) -> Self {
        let defaults = StoreConfig::default();
        let path = connection
            .path()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(crate::config::MEMORY_PATH));
        connection.set_prepared_statement_cache_capacity(defaults.statement_cache_capacity);
        Self {
            slots: vec![Mutex::new(connection)],
            cursor: AtomicUsize::new(0),
            path,
            checkout_timeout: Duration::from_millis(defaults.busy_timeout_ms),
            statement_capacity: AtomicUsize::new(defaults.statement_cache_capacity),
            statements_reserved: AtomicUsize::new(0),
        }
    }

    /// Number of pooled connections
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Database location this pool was opened against
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Compiled statements each connection currently keeps
    pub fn statement_capacity(&self) -> usize {
        self.statement_capacity.load(Ordering::Acquire)
    }

    /// Make room in every statement cache for `count` more statements.
    ///
    /// Called once per namespace opened on the pool, so statements compiled
    /// at open stay cached while other namespaces run theirs.
    pub(crate) fn reserve_statements(&self, count: usize) {
        let reserved = self.statements_reserved.fetch_add(count, Ordering::AcqRel) + count;
        let previous = self.statement_capacity.fetch_max(reserved, Ordering::AcqRel);
        if reserved > previous {
            for slot in &self.slots {
                slot.lock().set_prepared_statement_cache_capacity(reserved);
            }
            debug!(
                target: "tagstore::pool",
                path = %self.path.display(),
                capacity = reserved,
                "Statement caches grown"
            );
        }
    }

    /// Run `f` on one checked-out connection.
    ///
    /// The connection stays checked out until `f` returns, so a scan driven
    /// from inside `f` keeps its cursor for its whole duration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if no connection frees up within the busy
    /// timeout, otherwise whatever `f` returns.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let n = self.slots.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % n;
        for i in 0..n {
            if let Some(guard) = self.slots[(start + i) % n].try_lock() {
                return f(&*guard);
            }
        }
        match self.slots[start].try_lock_for(self.checkout_timeout) {
            Some(guard) => f(&*guard),
            None => {
                warn!(
                    target: "tagstore::pool",
                    path = %self.path.display(),
                    size = n,
                    timeout_ms = self.checkout_timeout.as_millis() as u64,
                    "No idle connection"
                );
                Err(Error::Query(format!(
                    "no idle connection after {} ms",
                    self.checkout_timeout.as_millis()
                )))
            }
        }
    }

    /// Run `f` on every connection in turn, stopping at the first error.
    pub fn for_each_connection(&self, mut f: impl FnMut(&Connection) -> Result<()>) -> Result<()> {
        for slot in &self.slots {
            f(&*slot.lock())?;
        }
        Ok(())
    }

    /// Drop every compiled statement held by the pool's connections.
    pub fn release_statements(&self) {
        for slot in &self.slots {
            slot.lock().flush_prepared_statement_cache();
        }
        debug!(target: "tagstore::pool", path = %self.path.display(), "Statement caches flushed");
    }

    /// Release compiled statements, then close every connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] with the first close failure; the
    /// remaining connections are still closed.
    pub fn close(self) -> Result<()> {
        self.release_statements();
        let mut first_err = None;
        for slot in self.slots {
            if let Err((_conn, e)) = slot.into_inner().close() {
                first_err.get_or_insert(Error::Connection(e.to_string()));
            }
        }
        info!(target: "tagstore::pool", path = %self.path.display(), "Connection pool closed");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Opens one connection and applies the configured pragmas.
fn open_connection(config: &StoreConfig) -> Result<Connection> {
    let connection = if config.is_memory() {
        Connection::open_in_memory()
    } else {
        Connection::open_with_flags(&config.path, OpenFlags::default())
    }
    .map_err(|e| {
        Error::Connection(format!(
            "failed to open '{}': {}",
            config.path.display(),
            e
        ))
    })?;
    apply_pragmas(&connection, config)?;
    connection.set_prepared_statement_cache_capacity(config.statement_cache_capacity);
    Ok(connection)
}

fn apply_pragmas(connection: &Connection, config: &StoreConfig) -> Result<()> {
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| Error::Connection(e.to_string()))?;
    if !config.is_memory() {
        connection
            .execute_batch(&format!(
                "PRAGMA journal_mode = {};",
                config.journal_mode.pragma_value()
            ))
            .map_err(|e| Error::Connection(e.to_string()))?;
    }
    connection
        .execute_batch(&format!(
            "PRAGMA synchronous = {};",
            config.synchronous.pragma_value()
        ))
        .map_err(|e| Error::Connection(e.to_string()))?;
    Ok(())
}
