//! File-like access to a shared record store.
//!
//! A [`RecordDevice`] owns one [`RecordStore`] behind an
//! [`InterruptibleMutex`]. Callers open any number of [`Session`]s on it; each
//! session has its own [`Assembler`] and stream position, and implements
//! [`std::io::Read`], [`std::io::Write`] and [`std::io::Seek`]:
//!
//! - writes are assembled into records per session and inserted into the
//!   shared store, evicting the oldest record once the ring is full
//! - reads stream the concatenation of all retained records from the
//!   session's position, at most one record per call
//! - seeks move the position inside `0..=total_size`, and
//!   [`Session::seek_to`] moves it to a `(record, offset)` pair
//!
//! The store lock is held for a single store call at a time. Chunks that
//! cannot complete a record are assembled without taking it at all.
//!
//! # Example
//!
//! ```rust
//! use std::io::{Read, Write};
//!
//! use ringlog::{DeviceConfig, RecordDevice, SeekTo};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = RecordDevice::<3>::new(DeviceConfig::default())?;
//!
//! let mut writer = device.open();
//! writer.write_all(b"first\nsec")?;
//! writer.write_all(b"ond\n")?;
//!
//! let mut reader = device.open();
//! reader.seek_to(SeekTo { record: 1, offset: 2 })?;
//! let mut text = String::new();
//! reader.read_to_string(&mut text)?;
//! assert_eq!(text, "cond\n");
//! # Ok(())
//! # }
//! ```

use std::io::{self, SeekFrom};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assemble::Assembler;
use crate::config::DeviceConfig;
use crate::error::{Result, SeekError};
use crate::lock::{CancelToken, InterruptibleMutex, LockGuard};
use crate::record::Record;
use crate::ring::{DEFAULT_CAPACITY, RecordStore};

/// A `(record ordinal, intra-record offset)` seek target.
///
/// Ordinal 0 is the oldest record still retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekTo {
    /// Ordinal of the target record.
    pub record: u32,
    /// Byte offset inside the target record.
    pub offset: u32,
}

/// Point-in-time summary of a device's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    /// Number of records retained.
    pub retained: usize,
    /// Maximum number of records retained.
    pub capacity: usize,
    /// Bytes across all retained records.
    pub total_size: u64,
    /// Whether the next completed record evicts the oldest.
    pub full: bool,
}

/// A record store shared by any number of sessions.
#[derive(Debug)]
pub struct RecordDevice<const N: usize = DEFAULT_CAPACITY> {
    store: InterruptibleMutex<RecordStore<N>>,
    config: DeviceConfig,
}

impl<const N: usize> RecordDevice<N> {
    /// Creates a device with an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](crate::error::ConfigError) if `config` is invalid.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        config.validate()?;
        debug!(capacity = N, terminator = config.terminator, "record device created");

        Ok(Self {
            store: InterruptibleMutex::with_poll_interval(RecordStore::new(), config.lock_poll_interval),
            config,
        })
    }

    /// Returns the device configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Opens a session with its own cancel token.
    pub fn open(&self) -> Session<'_, N> {
        self.open_with_cancel(CancelToken::new())
    }

    /// Opens a session whose lock waits are abandoned when `cancel` fires.
    pub fn open_with_cancel(&self, cancel: CancelToken) -> Session<'_, N> {
        Session {
            device: self,
            assembler: Assembler::new(self.config.terminator),
            position: 0,
            cancel,
        }
    }

    /// Returns a summary of the store.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`](crate::error::LockError) if the store lock is not acquired.
    pub fn stats(&self, cancel: &CancelToken) -> Result<DeviceStats> {
        let store = self.lock(cancel)?;
        Ok(DeviceStats {
            retained: store.len(),
            capacity: store.capacity(),
            total_size: store.total_size(),
            full: store.is_full(),
        })
    }

    /// Returns copies of all retained records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`](crate::error::LockError) if the store lock is not acquired.
    pub fn records(&self, cancel: &CancelToken) -> Result<Vec<Record>> {
        let store = self.lock(cancel)?;
        Ok(store.iter().cloned().collect())
    }

    /// Returns the concatenation of all retained records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`](crate::error::LockError) if the store lock is not acquired.
    pub fn contents(&self, cancel: &CancelToken) -> Result<Vec<u8>> {
        let store = self.lock(cancel)?;
        let mut contents = Vec::new();
        for record in store.iter() {
            contents.extend_from_slice(record);
        }
        Ok(contents)
    }

    /// Releases every retained record and empties the store.
    ///
    /// Sessions still open keep working against the empty store. Returns how
    /// many records were released.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`](crate::error::LockError) if the store lock is not
    /// acquired; the store is left as it was.
    pub fn shutdown(&self, cancel: &CancelToken) -> Result<usize> {
        let mut store = self.lock(cancel)?;
        let released = store.teardown();
        debug!(released, "record device torn down");
        Ok(released)
    }

    fn lock(&self, cancel: &CancelToken) -> Result<LockGuard<'_, RecordStore<N>>> {
        self.store.lock(cancel).map_err(|err| {
            warn!(%err, "record store lock not acquired");
            err.into()
        })
    }
}

/// One reader/writer attached to a [`RecordDevice`].
///
/// Dropping a session abandons any record it was still assembling.
#[derive(Debug)]
pub struct Session<'a, const N: usize = DEFAULT_CAPACITY> {
    device: &'a RecordDevice<N>,
    assembler: Assembler,
    position: u64,
    cancel: CancelToken,
}

impl<const N: usize> Session<'_, N> {
    /// Returns the session's stream position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the token that abandons this session's lock waits.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns `true` if the session holds bytes of an unfinished record.
    pub fn has_partial(&self) -> bool {
        self.assembler.has_partial()
    }

    /// Discards the unfinished record, returning its bytes.
    pub fn abandon_partial(&mut self) -> Option<Vec<u8>> {
        self.assembler.reset()
    }

    /// Writes `chunk`, committing every record it completes.
    ///
    /// Returns the number of bytes accepted, which is always `chunk.len()` on
    /// success; the position advances by the same amount. If a later record
    /// in the chunk cannot be cut for lack of memory, the chunk is still
    /// accepted and that record waits in the session until the next write,
    /// [`flush_completed`](Self::flush_completed) or drop.
    ///
    /// # Errors
    ///
    /// - [`LockError`](crate::error::LockError) if the chunk completes a record
    ///   and the store lock is not acquired; nothing is written
    /// - [`AssembleError`](crate::error::AssembleError) if the chunk cannot be
    ///   buffered; nothing is written
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<usize> {
        if chunk.is_empty() {
            return Ok(0);
        }

        let device = self.device;
        let mut store = if self.assembler.completes_with(chunk) {
            Some(device.lock(&self.cancel)?)
        } else {
            None
        };

        let first = self.assembler.feed(chunk)?;
        self.position += chunk.len() as u64;

        if let Some(store) = store.as_mut() {
            if let Some(record) = first {
                commit(store, record);
            }
            if let Err(err) = self.commit_completed(store) {
                warn!(%err, "completed record left buffered");
            }
        }

        debug!(
            len = chunk.len(),
            partial = self.assembler.partial_len(),
            position = self.position,
            "write"
        );
        Ok(chunk.len())
    }

    /// Commits every finished record still buffered in the session.
    ///
    /// # Errors
    ///
    /// - [`LockError`](crate::error::LockError) if the store lock is not acquired
    /// - [`AssembleError`](crate::error::AssembleError) if a record cannot be
    ///   cut; it stays buffered
    pub fn flush_completed(&mut self) -> Result<()> {
        if !self.assembler.has_complete() {
            return Ok(());
        }
        let device = self.device;
        let mut store = device.lock(&self.cancel)?;
        self.commit_completed(&mut store)
    }

    fn commit_completed(&mut self, store: &mut RecordStore<N>) -> Result<()> {
        while let Some(record) = self.assembler.pop_record()? {
            commit(store, record);
        }
        Ok(())
    }

    /// Reads from the session's position into `buf`.
    ///
    /// Copies at most the rest of the record under the position. Returns 0
    /// once the position is at or past the end of the retained data.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`](crate::error::LockError) if the store lock is not acquired.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Ok(offset) = usize::try_from(self.position) else {
            return Ok(0);
        };

        let device = self.device;
        let copied = {
            let store = device.lock(&self.cancel)?;
            let Some(found) = store.find_by_logical_offset(offset) else {
                debug!(position = self.position, "read at end of data");
                return Ok(0);
            };
            let available = found.remaining();
            let copied = available.len().min(buf.len());
            buf[..copied].copy_from_slice(&available[..copied]);
            copied
        };

        self.position += copied as u64;
        debug!(copied, position = self.position, "read");
        Ok(copied)
    }

    /// Moves the position, bounded by the store's current total size.
    ///
    /// # Errors
    ///
    /// - [`SeekError::OutOfBounds`] if the target is negative or past the end
    /// - [`LockError`](crate::error::LockError) if the store lock is not acquired
    pub fn seek_within(&mut self, from: SeekFrom) -> Result<u64> {
        let size = self.device.lock(&self.cancel)?.total_size();

        let target = match from {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(size) + i128::from(delta),
        };

        let position = u64::try_from(target)
            .ok()
            .filter(|&position| position <= size)
            .ok_or(SeekError::OutOfBounds { target, size })?;

        debug!(from = ?from, position, size, "seek");
        self.position = position;
        Ok(position)
    }

    /// Moves the position to byte `offset` of retained record `record`.
    ///
    /// # Errors
    ///
    /// - [`LookupError`](crate::error::LookupError) if the record or offset is out of range
    /// - [`LockError`](crate::error::LockError) if the store lock is not acquired
    pub fn seek_to(&mut self, target: SeekTo) -> Result<u64> {
        let position = self
            .device
            .lock(&self.cancel)?
            .find_by_ordinal(target.record, target.offset)?;

        debug!(record = target.record, offset = target.offset, position, "seek to record");
        self.position = position;
        Ok(position)
    }
}

/// Inserts `record`, releasing whatever it evicts.
fn commit<const N: usize>(store: &mut RecordStore<N>, record: Record) {
    let len = record.len();
    if let Some(evicted) = store.insert(record) {
        debug!(len = evicted.len(), "evicted oldest record");
        drop(evicted);
    }
    debug!(len, retained = store.len(), "record committed");
}

impl<const N: usize> io::Read for Session<'_, N> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_chunk(buf)?)
    }
}

impl<const N: usize> io::Write for Session<'_, N> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_chunk(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.flush_completed()?)
    }
}

impl<const N: usize> io::Seek for Session<'_, N> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_within(pos)?)
    }
}

impl<const N: usize> Drop for Session<'_, N> {
    fn drop(&mut self) {
        if let Err(err) = self.flush_completed() {
            warn!(%err, "session closed with completed records not committed");
        }
        if let Some(partial) = self.assembler.reset() {
            debug!(len = partial.len(), "session closed with unfinished record");
        }
    }
}
