//! tagstore - Tagged key-value store over an ordered persistent engine
//!
//! Each namespace is one SQLite table of `(key, value, tag)` records with
//! indexes on `(key, tag)` and `(tag, key)`.
//!
//! # Quick Start
//!
//! ```ignore
//! use tagstore::{StoreConfig, TagStore};
//!
//! let store = TagStore::open("users", &StoreConfig::in_memory())?;
//!
//! store.upsert("user:001", r#"{"name":"ada"}"#, "admins")?;
//! let value = store.get("user:001")?;
//!
//! // Page forward ten keys at a time
//! let page = store.iterate_ascending("user:000", 10, |records| {
//!     records.map(|r| r.key).collect::<Vec<_>>()
//! })?;
//!
//! store.delete_by_tag("admins")?;
//! ```
//!
//! # Architecture
//!
//! - `tagstore-core`: types, error taxonomy, codec and diagnostic sink
//! - `tagstore-storage`: connection pool, config, store handle, iterators

pub use tagstore_core::*;
pub use tagstore_storage::*;
