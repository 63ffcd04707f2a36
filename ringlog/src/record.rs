//! Immutable byte records held by the ring.

use std::fmt;
use std::ops::Deref;

/// One complete, immutable byte record.
///
/// A record owns its bytes outright. Once built it is never mutated; the
/// ring holds it until it is evicted or drained, at which point ownership
/// moves back to the caller.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Record {
    bytes: Box<[u8]>,
}

impl Record {
    /// Creates a record by taking ownership of `bytes`.
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Returns the record's length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the record holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the record's bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the record and returns its buffer.
    pub fn into_bytes(self) -> Box<[u8]> {
        self.bytes
    }
}

impl Deref for Record {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Record {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Record {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl From<&str> for Record {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

// Records are usually text lines, so print them that way.
impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("len", &self.len())
            .field("bytes", &String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}
