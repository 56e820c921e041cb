//! Value codec
//!
//! Maps caller-supplied structured values to and from the store's value
//! representation (text). The default [`JsonCodec`] uses `serde_json`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Bidirectional mapping between structured values and stored text.
///
/// Encode failures surface as [`Error::Serialization`] and must abort a write
/// before anything reaches the backing engine. Decode failures surface as
/// [`Error::RowDecode`] carrying the key of the offending record.
pub trait Codec: Send + Sync {
    /// Encode a value to its stored form
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String>;

    /// Decode the stored value of `key` into `T`
    fn decode<T: DeserializeOwned>(&self, key: &str, raw: &str) -> Result<T>;
}

/// Compact JSON codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, raw: &str) -> Result<T> {
        serde_json::from_str(raw).map_err(|e| Error::RowDecode {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}
