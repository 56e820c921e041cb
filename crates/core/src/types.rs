//! Core types for tagstore
//!
//! This module defines the foundational types:
//! - Namespace: validated logical partition of the key space
//! - Record: key, value and tag as stored
//! - Aggregate: count and key bounds of a namespace
//! - Operation: the fixed set of operations a store handle compiles

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Maximum namespace length in bytes.
///
/// Keeps derived object names (`kv_k_<name>`) well inside identifier limits.
pub const MAX_NAMESPACE_LEN: usize = 48;

/// Tag value meaning "untagged".
pub const UNTAGGED: &str = "";

/// Logical partition of the key space, mapped to one storage object.
///
/// The name is spliced into table and index names, so only ASCII
/// alphanumerics and `_` are accepted. Deserialization runs the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a namespace name.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNamespace`] for empty, oversized or
    /// non-identifier names.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidNamespace {
                name,
                reason: "name must not be empty",
            });
        }
        if name.len() > MAX_NAMESPACE_LEN {
            return Err(Error::InvalidNamespace {
                name,
                reason: "name exceeds 48 bytes",
            });
        }
        if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(Error::InvalidNamespace {
                name,
                reason: "only ASCII alphanumerics and '_' are allowed",
            });
        }
        Ok(Self(name))
    }

    /// The raw namespace name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the storage object holding this namespace's records
    pub fn table_name(&self) -> String {
        format!("kv_{}", self.0)
    }

    /// Name of the `(key, tag)` index backing key range scans
    pub fn key_index_name(&self) -> String {
        format!("kv_k_{}", self.0)
    }

    /// Name of the `(tag, key)` index backing tag-scoped deletes
    pub fn tag_index_name(&self) -> String {
        format!("kv_t_{}", self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        Namespace::new(name)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> String {
        ns.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    /// Primary key, ordered by byte comparison
    pub key: String,
    /// Opaque payload
    pub value: String,
    /// Grouping label; empty means untagged
    pub tag: String,
}

impl Record {
    /// Build a record from its parts
    pub fn new(key: impl Into<String>, value: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            tag: tag.into(),
        }
    }

    /// Whether the record carries no tag
    pub fn is_untagged(&self) -> bool {
        self.tag.is_empty()
    }
}

/// Result of a count/bounds query.
///
/// An empty namespace has `count == 0` and no bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    /// Number of live records
    pub count: u64,
    /// Smallest key present
    pub min_key: Option<String>,
    /// Largest key present
    pub max_key: Option<String>,
}

impl Aggregate {
    /// Whether the namespace held no records
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Every operation a store handle performs.
///
/// Used to select compiled statements and to label diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Handle initialization
    Open,
    /// Insert or replace one record
    Upsert,
    /// Encode then upsert
    UpsertEncoded,
    /// Point read
    Get,
    /// Point read then decode
    GetDecoded,
    /// Remove one key
    DeleteByKey,
    /// Remove every record with a tag
    DeleteByTag,
    /// Remove every record
    DeleteAll,
    /// Records after a boundary, ascending
    IterateAscending,
    /// Records before a boundary, descending
    IterateDescending,
    /// Records at or before a boundary, descending
    IterateFloor,
    /// Every record, ascending, decoded
    IterateAll,
    /// Count and key bounds
    CountAll,
    /// Handle teardown
    Close,
}

impl Operation {
    /// Stable name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::Upsert => "upsert",
            Operation::UpsertEncoded => "upsert_encoded",
            Operation::Get => "get",
            Operation::GetDecoded => "get_decoded",
            Operation::DeleteByKey => "delete_by_key",
            Operation::DeleteByTag => "delete_by_tag",
            Operation::DeleteAll => "delete_all",
            Operation::IterateAscending => "iterate_ascending",
            Operation::IterateDescending => "iterate_descending",
            Operation::IterateFloor => "iterate_floor",
            Operation::IterateAll => "iterate_all",
            Operation::CountAll => "count_all",
            Operation::Close => "close",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
