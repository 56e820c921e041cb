//! Diagnostic sink
//!
//! Every failure is reported here before it is returned to the caller.
//! A sink is injected per store handle so reports can be routed per instance.
//!
//! Two severities are kept apart on purpose:
//! - [`Severity::Fatal`]: initialization failed, the handle does not exist
//! - [`Severity::Recoverable`]: a single call failed (or a row was skipped),
//!   the handle remains usable

use std::fmt;

use tracing::{error, warn};

use crate::error::Error;
use crate::types::Operation;

/// Severity of a reported failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Startup cannot proceed
    Fatal,
    /// The call failed or a row was skipped; the handle is still usable
    Recoverable,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => f.write_str("fatal"),
            Severity::Recoverable => f.write_str("recoverable"),
        }
    }
}

/// Context attached to a failure report
#[derive(Debug, Clone, Copy)]
pub struct Diagnostic<'a> {
    /// Operation that failed
    pub operation: Operation,
    /// Namespace of the handle
    pub namespace: &'a str,
    /// Key involved, if any
    pub key: Option<&'a str>,
    /// Tag involved, if any
    pub tag: Option<&'a str>,
    /// Anchor of a bounded scan, if any
    pub boundary: Option<&'a str>,
    /// Underlying cause
    pub error: &'a Error,
}

impl<'a> Diagnostic<'a> {
    /// Report for an operation with no key or tag context
    pub fn new(operation: Operation, namespace: &'a str, error: &'a Error) -> Self {
        Self {
            operation,
            namespace,
            key: None,
            tag: None,
            boundary: None,
            error,
        }
    }

    /// Attach the key involved
    pub fn with_key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    /// Attach the tag involved
    pub fn with_tag(mut self, tag: &'a str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Attach the boundary a scan started from
    pub fn with_boundary(mut self, boundary: &'a str) -> Self {
        self.boundary = Some(boundary);
        self
    }
}

/// Receiver of failure reports.
///
/// Implementations must be cheap and must not call back into the store.
pub trait DiagnosticSink: Send + Sync {
    /// Receive one report
    fn report(&self, severity: Severity, diagnostic: &Diagnostic<'_>);
}

/// Sink that forwards reports to `tracing`.
///
/// Fatal reports are logged at `error`, recoverable ones at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, severity: Severity, d: &Diagnostic<'_>) {
        match severity {
            Severity::Fatal => error!(
                target: "tagstore::diagnostics",
                operation = %d.operation,
                namespace = d.namespace,
                key = ?d.key,
                tag = ?d.tag,
                error = %d.error,
                "Store initialization failed"
            ),
            Severity::Recoverable => warn!(
                target: "tagstore::diagnostics",
                operation = %d.operation,
                namespace = d.namespace,
                key = ?d.key,
                tag = ?d.tag,
                boundary = ?d.boundary,
                error = %d.error,
                "Store operation failed"
            ),
        }
    }
}
