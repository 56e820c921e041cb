//! Lazy record iterators over an open cursor
//!
//! Each iterator wraps the engine cursor of one scan. Rows are fetched only
//! as the consumer pulls them; when the consumer stops pulling, the remaining
//! rows are never read and the cursor is reset as soon as the scan scope
//! ends.
//!
//! An engine error ends iteration. The error is kept and surfaced by the
//! owning scan call once the consumer returns, so consumers only ever see
//! well-formed items.

use rusqlite::{Row, Rows};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tagstore_core::{Codec, Diagnostic, DiagnosticSink, Error, Operation, Record, Severity};
use tracing::warn;

/// Reads a `(k, v, t)` row.
pub(crate) fn read_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        key: row.get(0)?,
        value: row.get(1)?,
        tag: row.get(2)?,
    })
}

/// Converts a caller limit into the engine's `LIMIT` parameter.
pub(crate) fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Records of a bounded scan, in delivery order.
///
/// Obtained inside the closure passed to
/// [`TagStore::iterate_ascending`](crate::TagStore::iterate_ascending) and its
/// siblings. Breaking out of a loop over it stops the scan.
pub struct Records<'a> {
    rows: Rows<'a>,
    error: Option<rusqlite::Error>,
    done: bool,
    delivered: usize,
}

impl<'a> Records<'a> {
    pub(crate) fn new(rows: Rows<'a>) -> Self {
        Self {
            rows,
            error: None,
            done: false,
            delivered: 0,
        }
    }

    /// Number of records handed to the consumer so far
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub(crate) fn into_error(self) -> Option<rusqlite::Error> {
        self.error
    }
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.done {
            return None;
        }
        let step = match self.rows.next() {
            Ok(Some(row)) => read_record(row).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        match step {
            Ok(Some(record)) => {
                self.delivered += 1;
                Some(record)
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                self.error = Some(e);
                None
            }
        }
    }
}

/// Decoded `(key, value)` pairs of a full scan, ascending by key.
///
/// Every row is decoded into a fresh `T`. A row whose value does not decode
/// is reported to the diagnostic sink and skipped; the scan continues.
pub struct DecodedRecords<'a, T, C> {
    rows: Rows<'a>,
    codec: &'a C,
    namespace: &'a str,
    sink: &'a dyn DiagnosticSink,
    error: Option<rusqlite::Error>,
    done: bool,
    delivered: usize,
    skipped: usize,
    _shape: PhantomData<fn() -> T>,
}

impl<'a, T, C> DecodedRecords<'a, T, C> {
    pub(crate) fn new(
        rows: Rows<'a>,
        codec: &'a C,
        namespace: &'a str,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            rows,
            codec,
            namespace,
            sink,
            error: None,
            done: false,
            delivered: 0,
            skipped: 0,
            _shape: PhantomData,
        }
    }

    /// Number of decoded pairs handed to the consumer so far
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Number of rows skipped because they did not decode
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub(crate) fn into_error(self) -> Option<rusqlite::Error> {
        self.error
    }

    fn skip(&mut self, key: &str, err: &Error) {
        self.skipped += 1;
        warn!(
            target: "tagstore::store",
            namespace = self.namespace,
            key,
            error = %err,
            "Skipping undecodable row in full scan"
        );
        self.sink.report(
            Severity::Recoverable,
            &Diagnostic::new(Operation::IterateAll, self.namespace, err).with_key(key),
        );
    }
}

impl<T, C> Iterator for DecodedRecords<'_, T, C>
where
    T: DeserializeOwned,
    C: Codec,
{
    type Item = (String, T);

    fn next(&mut self) -> Option<(String, T)> {
        while !self.done {
            let step = match self.rows.next() {
                Ok(Some(row)) => Ok(Some((row.get::<_, String>(0), row.get::<_, String>(1)))),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            };
            match step {
                Ok(Some((Ok(key), Ok(raw)))) => match self.codec.decode::<T>(&key, &raw) {
                    Ok(value) => {
                        self.delivered += 1;
                        return Some((key, value));
                    }
                    Err(e) => self.skip(&key, &e),
                },
                Ok(Some((key, raw))) => {
                    let reason = raw
                        .as_ref()
                        .err()
                        .or(key.as_ref().err())
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    let key = key.unwrap_or_default();
                    let err = Error::RowDecode {
                        key: key.clone(),
                        reason,
                    };
                    self.skip(&key, &err);
                }
                Ok(None) => self.done = true,
                Err(e) => {
                    self.done = true;
                    self.error = Some(e);
                }
            }
        }
        None
    }
}
