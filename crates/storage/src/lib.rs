//! Storage layer for tagstore
//!
//! This crate implements the tagged key-value store on SQLite:
//! - ConnectionPool: pooled engine connections, one mutex per connection
//! - StoreConfig: engine settings loadable from `tagstore.toml`
//! - TagStore: per-namespace handle with compiled statements
//! - Records / DecodedRecords: lazy scan iterators with early stop
//! - StoreBuilder: fluent open with shared pool, codec and sink injection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod config;
pub mod iter;
pub mod pool;
mod statements;
pub mod store;

pub use builder::StoreBuilder;
pub use config::{JournalMode, StoreConfig, SyncMode, CONFIG_FILE_NAME, MEMORY_PATH};
pub use iter::{DecodedRecords, Records};
pub use pool::ConnectionPool;
pub use store::TagStore;
