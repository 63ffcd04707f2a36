//! Assembly of terminator-delimited records from arbitrary write chunks.
//!
//! Writers rarely hand over one record per call. An [`Assembler`] collects
//! chunks into a growing buffer and cuts a [`Record`] each time the
//! terminator byte shows up. The record includes its terminator. Bytes that
//! follow the terminator in the same chunk start the next record.
//!
//! Only bytes not yet scanned are searched on each call, so feeding a long
//! record one byte at a time stays linear.

use crate::error::{AssembleError, Result};
use crate::record::Record;

/// Terminator used by [`Assembler::default`].
pub const DEFAULT_TERMINATOR: u8 = b'\n';

/// Accumulates write chunks into complete records.
///
/// One assembler belongs to one write session. It holds no buffer until the
/// first non-empty chunk arrives and drops back to that state whenever a
/// record completes with nothing left over.
///
/// # Examples
///
/// ```rust
/// use ringlog::Assembler;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut assembler = Assembler::default();
///
/// assert!(assembler.feed(b"hel")?.is_none());
/// let record = assembler.feed(b"lo\nworld")?.unwrap();
/// assert_eq!(record.as_bytes(), b"hello\n");
///
/// // "world" waits for its terminator.
/// assert_eq!(assembler.partial(), Some(&b"world"[..]));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembler {
    /// Byte that ends a record.
    terminator: u8,
    /// Bytes of the record in progress.
    partial: Option<Vec<u8>>,
    /// Length of the `partial` prefix already known to hold no terminator.
    scanned: usize,
}

impl Assembler {
    /// Creates an empty assembler that cuts records at `terminator`.
    pub fn new(terminator: u8) -> Self {
        Self {
            terminator,
            partial: None,
            scanned: 0,
        }
    }

    /// Returns the terminator byte.
    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    /// Appends `chunk` to the record in progress and returns the first record
    /// it completes, if any.
    ///
    /// A chunk may complete more than one record; call
    /// [`pop_record`](Self::pop_record) until it returns `None` to collect the
    /// rest. An empty chunk changes nothing.
    ///
    /// Every buffer the call needs is reserved before anything is moved, so a
    /// failed feed leaves the assembler exactly as it was and the same chunk
    /// can be fed again.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::OutOfMemory`] if the partial record cannot
    /// grow or the bytes after the terminator cannot be carried over.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<Record>> {
        if chunk.is_empty() {
            return Ok(None);
        }

        let Some(end) = self.terminator_end(chunk) else {
            self.append(chunk)?;
            self.scanned = self.partial_len();
            return Ok(None);
        };

        let held = self.partial_len();
        let from_chunk = end.saturating_sub(held);
        let mut rest = reserve_exact(held + chunk.len() - end)?;
        let mut complete = match self.partial.take() {
            Some(mut buf) => {
                if let Err(source) = buf.try_reserve_exact(from_chunk) {
                    self.partial = Some(buf);
                    return Err(AssembleError::OutOfMemory {
                        requested: from_chunk,
                        source,
                    }
                    .into());
                }
                buf
            }
            None => reserve_exact(from_chunk)?,
        };

        if end <= held {
            // A record cut earlier is still buffered; the chunk only extends the rest.
            rest.extend_from_slice(&complete[end..]);
            complete.truncate(end);
            rest.extend_from_slice(chunk);
        } else {
            complete.extend_from_slice(&chunk[..from_chunk]);
            rest.extend_from_slice(&chunk[from_chunk..]);
        }

        self.partial = (!rest.is_empty()).then_some(rest);
        self.scanned = 0;
        Ok(Some(Record::from(complete)))
    }

    /// Appends `chunk` to the record in progress without cutting records.
    fn append(&mut self, chunk: &[u8]) -> Result<()> {
        let buf = self.partial.get_or_insert_with(Vec::new);
        if let Err(source) = buf.try_reserve(chunk.len()) {
            if buf.is_empty() {
                self.partial = None;
            }
            return Err(AssembleError::OutOfMemory {
                requested: chunk.len(),
                source,
            }
            .into());
        }
        buf.extend_from_slice(chunk);
        Ok(())
    }

    /// Returns the length of the record that feeding `chunk` would complete:
    /// the buffered bytes plus `chunk`, up to and including the first terminator.
    fn terminator_end(&self, chunk: &[u8]) -> Option<usize> {
        let buffered = self.partial.as_deref().unwrap_or_default();
        let is_terminator = |&byte: &u8| byte == self.terminator;

        if let Some(found) = buffered[self.scanned..].iter().position(is_terminator) {
            return Some(self.scanned + found + 1);
        }
        chunk
            .iter()
            .position(is_terminator)
            .map(|found| buffered.len() + found + 1)
    }

    /// Cuts the next complete record out of bytes already fed.
    ///
    /// Returns `None` once the buffered bytes hold no further terminator.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::OutOfMemory`] if the bytes following the
    /// terminator cannot be moved into a fresh buffer. Nothing is consumed in
    /// that case.
    pub fn pop_record(&mut self) -> Result<Option<Record>> {
        let Some(buf) = self.partial.as_mut() else {
            return Ok(None);
        };

        let Some(found) = buf[self.scanned..]
            .iter()
            .position(|&byte| byte == self.terminator)
        else {
            self.scanned = buf.len();
            return Ok(None);
        };

        let end = self.scanned + found + 1;
        let mut rest = reserve_exact(buf.len() - end)?;
        rest.extend_from_slice(&buf[end..]);

        let mut complete = std::mem::take(buf);
        complete.truncate(end);
        self.partial = (!rest.is_empty()).then_some(rest);
        self.scanned = 0;

        Ok(Some(Record::from(complete)))
    }

    /// Returns `true` if feeding `chunk` would complete at least one record.
    ///
    /// Lets a writer take the store lock only for chunks that will insert.
    pub fn completes_with(&self, chunk: &[u8]) -> bool {
        !chunk.is_empty() && self.terminator_end(chunk).is_some()
    }

    /// Returns `true` if a finished record is buffered and waiting for
    /// [`pop_record`](Self::pop_record).
    pub fn has_complete(&self) -> bool {
        self.terminator_end(&[]).is_some()
    }

    /// Returns `true` if a record is in progress.
    pub fn has_partial(&self) -> bool {
        self.partial.is_some()
    }

    /// Returns the number of bytes held for the record in progress.
    pub fn partial_len(&self) -> usize {
        self.partial.as_ref().map_or(0, Vec::len)
    }

    /// Returns the bytes held for the record in progress.
    pub fn partial(&self) -> Option<&[u8]> {
        self.partial.as_deref()
    }

    /// Abandons the record in progress.
    ///
    /// Returns the partial buffer, if there was one, so the owner can release
    /// it. The assembler is empty afterwards.
    pub fn reset(&mut self) -> Option<Vec<u8>> {
        self.scanned = 0;
        self.partial.take()
    }
}

/// Allocates an empty buffer with room for exactly `len` bytes.
fn reserve_exact(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|source| AssembleError::OutOfMemory {
            requested: len,
            source,
        })?;
    Ok(buf)
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINATOR)
    }
}
