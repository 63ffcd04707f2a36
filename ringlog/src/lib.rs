//! # ringlog
//!
//! Fixed-capacity ring of variable-length records with terminator-delimited
//! write assembly.
//!
//! ringlog keeps the most recent `N` records written to it. Writers hand over
//! bytes in chunks of any size; each chunk is assembled into complete records,
//! cut at a terminator byte (newline by default). Once the ring is full, every
//! new record evicts the oldest one. Readers see the retained records as one
//! concatenated byte stream, or address them as `(record, offset)` pairs.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Bounded, predictable memory: at most `N` records, `N` fixed at compile time
//! - Evicted records are handed back to the caller, never silently dropped
//! - No internal locking in the ring itself; sharing goes through one
//!   cancellable lock held for a single store call at a time
//! - No background threads, no persistence
//!
//! ## Quick Start
//!
//! ```rust
//! use ringlog::{Assembler, RecordStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = RecordStore::<3>::new();
//! let mut assembler = Assembler::default();
//!
//! for chunk in [&b"hel"[..], b"lo\nwor", b"ld\n"] {
//!     let mut completed = assembler.feed(chunk)?;
//!     while let Some(record) = completed {
//!         // Anything evicted is ours to release.
//!         drop(store.insert(record));
//!         completed = assembler.pop_record()?;
//!     }
//! }
//!
//! assert_eq!(store.total_size(), 12);
//! let pos = store.find_by_logical_offset(6).unwrap();
//! assert_eq!(pos.remaining(), b"world\n");
//! assert_eq!(store.find_by_ordinal(1, 0)?, 6);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`RecordStore`] — The ring: insert with eviction, offset and ordinal lookup
//! - [`Assembler`] — Cuts records out of arbitrary write chunks
//! - [`RecordDevice`] — A store shared between threads behind a cancellable lock
//! - [`Session`] — Per-caller reader/writer implementing `Read`, `Write`, `Seek`
//!
//! ## Modules
//!
//! - [`ring`] — Record store and cursor arithmetic
//! - [`assemble`] — Record assembly from write chunks
//! - [`record`] — Immutable record type
//! - [`lock`] — Cancellable mutex and cancel tokens
//! - [`device`] — Shared device and sessions
//! - [`config`] — Run-time configuration
//! - [`error`] — Error types

pub mod assemble;
pub mod config;
pub mod device;
pub mod error;
pub mod lock;
pub mod record;
pub mod ring;

// Re-export primary API types at crate root for convenience.
pub use assemble::Assembler;
pub use config::DeviceConfig;
pub use device::{DeviceStats, RecordDevice, SeekTo, Session};
pub use error::{ErrorKind, Result, RinglogError};
pub use lock::{CancelToken, InterruptibleMutex};
pub use record::Record;
pub use ring::{DEFAULT_CAPACITY, Position, RecordStore};
