//! Fixed-capacity ring of variable-length records.
//!
//! [`RecordStore`] keeps up to `N` immutable [`Record`]s. Inserting into a
//! full store evicts the oldest record and hands it back to the caller. The
//! retained records can be addressed two ways:
//!
//! - as one logically concatenated byte stream, oldest record first
//!   ([`RecordStore::find_by_logical_offset`]), and
//! - as `(record ordinal, byte offset)` pairs, ordinal 0 being the oldest
//!   retained record ([`RecordStore::find_by_ordinal`]).
//!
//! # Design
//!
//! - `write_cursor` is the slot that receives the next insert
//! - `read_cursor` is the slot holding the oldest retained record
//! - `full` tells "empty" from "full" when the two cursors coincide
//!
//! # Thread Safety
//!
//! The store has no internal locking. Every call, reads included, must be
//! serialized against mutation by the owner; see [`crate::lock`].

use crate::error::{LookupError, Result};
use crate::record::Record;

/// Number of records retained by a store when no capacity is named.
pub const DEFAULT_CAPACITY: usize = 10;

/// Advances a ring cursor by one slot, wrapping at `capacity`.
///
/// `capacity` must be non-zero.
///
/// # Examples
///
/// ```rust
/// use ringlog::ring::advance;
///
/// assert_eq!(advance(0, 3), 1);
/// assert_eq!(advance(2, 3), 0);
/// ```
#[inline]
pub const fn advance(index: usize, capacity: usize) -> usize {
    (index + 1) % capacity
}

/// A ring of `N` record slots with oldest-first eviction.
///
/// # Examples
///
/// ```rust
/// use ringlog::{Record, RecordStore};
///
/// let mut store = RecordStore::<3>::new();
/// assert!(store.insert(Record::from("aa")).is_none());
/// assert!(store.insert(Record::from("bbb")).is_none());
/// assert!(store.insert(Record::from("c")).is_none());
/// assert_eq!(store.total_size(), 6);
///
/// // A fourth record pushes out the oldest.
/// let evicted = store.insert(Record::from("dddd"));
/// assert_eq!(evicted.as_deref(), Some(&b"aa"[..]));
/// assert_eq!(store.total_size(), 8);
/// ```
#[derive(Debug)]
pub struct RecordStore<const N: usize = DEFAULT_CAPACITY> {
    /// Record slots; occupied exactly for the `len()` slots from `read_cursor`.
    slots: [Option<Record>; N],
    /// Slot that receives the next insert.
    write_cursor: usize,
    /// Slot holding the oldest retained record.
    read_cursor: usize,
    /// Whether all `N` slots are occupied.
    full: bool,
}

impl<const N: usize> RecordStore<N> {
    /// Creates an empty store.
    pub fn new() -> Self {
        const { assert!(N > 0, "record store capacity must be non-zero") };

        Self {
            slots: std::array::from_fn(|_| None),
            write_cursor: 0,
            read_cursor: 0,
            full: false,
        }
    }

    /// Resets the store to empty.
    ///
    /// Both cursors return to slot zero and any record still held is dropped.
    /// Callers that need the records back should [`drain`](Self::drain) first.
    pub fn init(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.write_cursor = 0;
        self.read_cursor = 0;
        self.full = false;
    }

    /// Inserts `record` as the newest entry.
    ///
    /// If the store is already full, the oldest record is removed first and
    /// returned so the caller can release it. Returns `None` when nothing was
    /// displaced.
    #[must_use = "an evicted record must be released by the caller"]
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        let evicted = if self.full {
            let oldest = self.slots[self.read_cursor].take();
            self.read_cursor = advance(self.read_cursor, N);
            oldest
        } else {
            None
        };

        self.slots[self.write_cursor] = Some(record);
        self.write_cursor = advance(self.write_cursor, N);

        // Only an insert can make the cursors meet; when they do, every slot is taken.
        if self.write_cursor == self.read_cursor {
            self.full = true;
        }

        evicted
    }

    /// Locates the byte at `offset` in the concatenation of all retained
    /// records, oldest first.
    ///
    /// Returns the record containing that byte and the byte's position inside
    /// it, or `None` when `offset` is at or past [`total_size`](Self::total_size).
    /// `None` is the normal end-of-data answer, not a failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ringlog::{Record, RecordStore};
    ///
    /// let mut store = RecordStore::<3>::new();
    /// for text in ["aa", "bbb", "c"] {
    ///     let _ = store.insert(Record::from(text));
    /// }
    ///
    /// let pos = store.find_by_logical_offset(3).unwrap();
    /// assert_eq!(pos.record().as_bytes(), b"bbb");
    /// assert_eq!(pos.offset(), 1);
    /// assert_eq!(pos.remaining(), b"bb");
    ///
    /// assert!(store.find_by_logical_offset(6).is_none());
    /// ```
    pub fn find_by_logical_offset(&self, offset: usize) -> Option<Position<'_>> {
        let mut remaining = offset;
        for record in self.iter() {
            if remaining < record.len() {
                return Some(Position {
                    record,
                    offset: remaining,
                });
            }
            remaining -= record.len();
        }
        None
    }

    /// Translates a `(record ordinal, intra-record offset)` pair into an
    /// absolute logical offset.
    ///
    /// Ordinal 0 is the oldest retained record. The result can be handed to
    /// [`find_by_logical_offset`](Self::find_by_logical_offset) to land on the
    /// same byte.
    ///
    /// # Errors
    ///
    /// - [`LookupError::RecordOutOfRange`] if `record_index` is not below [`len`](Self::len)
    /// - [`LookupError::OffsetOutOfRange`] if `intra_offset` is not below the record's length
    pub fn find_by_ordinal(&self, record_index: u32, intra_offset: u32) -> Result<u64> {
        let retained = self.len();
        let ordinal = record_index as usize;

        let Some(target) = self.get(ordinal) else {
            return Err(LookupError::RecordOutOfRange {
                index: record_index,
                retained,
            }
            .into());
        };

        if intra_offset as usize >= target.len() {
            return Err(LookupError::OffsetOutOfRange {
                index: record_index,
                offset: intra_offset,
                len: target.len(),
            }
            .into());
        }

        let start: u64 = self.iter().take(ordinal).map(|r| r.len() as u64).sum();
        Ok(start + u64::from(intra_offset))
    }

    /// Returns the number of bytes across all retained records.
    pub fn total_size(&self) -> u64 {
        self.iter().map(|r| r.len() as u64).sum()
    }

    /// Releases every retained record and resets the store to empty.
    ///
    /// Returns how many records were released.
    pub fn teardown(&mut self) -> usize {
        self.drain().count()
    }

    /// Removes all retained records, oldest first.
    ///
    /// The store is empty once the iterator is dropped, even if it was not
    /// consumed to the end.
    pub fn drain(&mut self) -> Drain<'_, N> {
        Drain { store: self }
    }

    /// Returns an iterator over retained records, oldest first.
    pub fn iter(&self) -> Iter<'_, N> {
        Iter {
            store: self,
            ordinal: 0,
            len: self.len(),
        }
    }

    /// Returns the retained record at `ordinal`, 0 being the oldest.
    pub fn get(&self, ordinal: usize) -> Option<&Record> {
        if ordinal >= self.len() {
            return None;
        }
        self.slots[self.slot_index(ordinal)].as_ref()
    }

    /// Returns the number of retained records.
    pub fn len(&self) -> usize {
        if self.full {
            N
        } else {
            (self.write_cursor + N - self.read_cursor) % N
        }
    }

    /// Returns `true` if no records are retained.
    pub fn is_empty(&self) -> bool {
        !self.full && self.write_cursor == self.read_cursor
    }

    /// Returns `true` if the next insert will evict.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Returns the maximum number of retained records.
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    fn slot_index(&self, ordinal: usize) -> usize {
        (self.read_cursor + ordinal) % N
    }

    fn take_oldest(&mut self) -> Option<Record> {
        if self.is_empty() {
            return None;
        }
        let oldest = self.slots[self.read_cursor].take();
        self.read_cursor = advance(self.read_cursor, N);
        self.full = false;
        oldest
    }
}

impl<const N: usize> Default for RecordStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> IntoIterator for &'a RecordStore<N> {
    type Item = &'a Record;
    type IntoIter = Iter<'a, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A byte located by [`RecordStore::find_by_logical_offset`].
///
/// Only the store builds positions, so `offset` is always inside `record`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position<'a> {
    record: &'a Record,
    offset: usize,
}

impl<'a> Position<'a> {
    /// Returns the record holding the byte.
    pub fn record(&self) -> &'a Record {
        self.record
    }

    /// Returns the offset of the byte inside [`record`](Self::record).
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the bytes of the record from this position to its end.
    pub fn remaining(&self) -> &'a [u8] {
        &self.record.as_bytes()[self.offset..]
    }
}

/// Iterator over retained records, oldest first.
#[derive(Debug)]
pub struct Iter<'a, const N: usize> {
    store: &'a RecordStore<N>,
    ordinal: usize,
    len: usize,
}

impl<'a, const N: usize> Iterator for Iter<'a, N> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        while self.ordinal < self.len {
            let slot = self.store.slot_index(self.ordinal);
            self.ordinal += 1;
            if let Some(record) = self.store.slots[slot].as_ref() {
                return Some(record);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len - self.ordinal;
        (left, Some(left))
    }
}

impl<const N: usize> ExactSizeIterator for Iter<'_, N> {}

/// Draining iterator returned by [`RecordStore::drain`].
#[derive(Debug)]
pub struct Drain<'a, const N: usize> {
    store: &'a mut RecordStore<N>,
}

impl<const N: usize> Iterator for Drain<'_, N> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.store.take_oldest()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.store.len();
        (left, Some(left))
    }
}

impl<const N: usize> Drop for Drain<'_, N> {
    fn drop(&mut self) {
        self.store.init();
    }
}
