//! Store builder for fluent configuration
//!
//! Collects the namespace name, engine config, optional shared pool, codec
//! and diagnostic sink, then runs initialization.
//!
//! ```ignore
//! use tagstore_storage::{StoreBuilder, StoreConfig};
//!
//! // 1. Simple open with defaults (JSON codec, tracing sink)
//! let users = TagStore::open("users", &StoreConfig::with_path("/data/app.db"))?;
//!
//! // 2. Second namespace on the same connections
//! let sessions = StoreBuilder::new("sessions")
//!     .shared_pool(users.pool())
//!     .open()?;
//! ```

use std::sync::Arc;
use std::time::Instant;
use tagstore_core::{
    Codec, Diagnostic, DiagnosticSink, JsonCodec, Namespace, Operation, Result, Severity,
    TracingSink,
};
use tracing::info;

use crate::config::StoreConfig;
use crate::pool::ConnectionPool;
use crate::statements::Statements;
use crate::store::TagStore;

/// Builder for [`TagStore`] handles
pub struct StoreBuilder<C = JsonCodec> {
    name: String,
    config: StoreConfig,
    pool: Option<Arc<ConnectionPool>>,
    sink: Arc<dyn DiagnosticSink>,
    codec: C,
}

impl StoreBuilder<JsonCodec> {
    /// Create a builder with defaults: in-memory engine, JSON codec,
    /// tracing sink.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: StoreConfig::default(),
            pool: None,
            sink: Arc::new(TracingSink),
            codec: JsonCodec,
        }
    }
}

impl<C: Codec> StoreBuilder<C> {
    /// Engine configuration used when no shared pool is given
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Reuse an existing pool instead of opening new connections.
    ///
    /// The config is then ignored.
    pub fn shared_pool(mut self, pool: Arc<ConnectionPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Route failure reports to `sink`
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use a different value codec
    pub fn codec<D: Codec>(self, codec: D) -> StoreBuilder<D> {
        StoreBuilder {
            name: self.name,
            config: self.config,
            pool: self.pool,
            sink: self.sink,
            codec,
        }
    }

    /// Initialize the namespace and return a ready handle.
    ///
    /// Safe to run against an already-initialized namespace. Any failure is
    /// reported to the sink as [`Severity::Fatal`] and no handle is created.
    ///
    /// # Errors
    ///
    /// - `InvalidNamespace` if the name cannot form an object name
    /// - `Config` / `Connection` if the pool cannot be opened
    /// - `Schema` if the table, indexes or statements cannot be created
    pub fn open(self) -> Result<TagStore<C>> {
        let started = Instant::now();
        match initialize(&self.name, &self.config, self.pool) {
            Ok((namespace, statements, pool)) => {
                info!(
                    target: "tagstore::store",
                    namespace = namespace.as_str(),
                    connections = pool.size(),
                    statements = statements.compiled_count(),
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "Store opened"
                );
                Ok(TagStore::from_parts(
                    namespace, statements, pool, self.codec, self.sink,
                ))
            }
            Err(e) => {
                self.sink.report(
                    Severity::Fatal,
                    &Diagnostic::new(Operation::Open, &self.name, &e),
                );
                Err(e)
            }
        }
    }
}

fn initialize(
    name: &str,
    config: &StoreConfig,
    pool: Option<Arc<ConnectionPool>>,
) -> Result<(Namespace, Statements, Arc<ConnectionPool>)> {
    let namespace = Namespace::new(name)?;
    let pool = match pool {
        Some(pool) => pool,
        None => Arc::new(ConnectionPool::open(config)?),
    };
    let statements = Statements::for_namespace(&namespace);
    pool.reserve_statements(statements.compiled_count());
    pool.for_each_connection(|conn| {
        statements.ensure_schema(conn)?;
        statements.compile(conn)
    })?;
    Ok((namespace, statements, pool))
}
