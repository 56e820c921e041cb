//! Core types and traits for tagstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Namespace: validated logical partition of the key space
//! - Record / Aggregate: what the store returns
//! - Operation: the fixed operation set of a store handle
//! - Error: error taxonomy shared by all layers
//! - Codec: value encoding collaborator (JSON by default)
//! - DiagnosticSink: failure reporting collaborator with two severities

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod diagnostics;
pub mod error;
pub mod types;

pub use codec::{Codec, JsonCodec};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity, TracingSink};
pub use error::{Error, Result};
pub use types::{Aggregate, Namespace, Operation, Record, MAX_NAMESPACE_LEN, UNTAGGED};
