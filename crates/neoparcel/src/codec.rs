//! Value codec shared by frames, action arguments and action results.

use bincode::Options;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::error::Result;

/// Little-endian, fixed-width integers, and trailing bytes are a protocol
/// violation rather than padding.
fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Serializes a value into an owned buffer.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    options().serialize(value).map_err(|e| Error::Encode(e.to_string()))
}

/// Number of bytes [`encode`] would produce for a value.
pub fn encoded_len<T: Serialize + ?Sized>(value: &T) -> Result<usize> {
    let len = options().serialized_size(value).map_err(|e| Error::Encode(e.to_string()))?;
    usize::try_from(len).map_err(|_| Error::Encode(format!("{} bytes do not fit in memory", len)))
}

/// Reads a value back from a buffer produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    options().deserialize(bytes).map_err(|e| Error::Decode(e.to_string()))
}
