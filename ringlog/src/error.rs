//! Error types for the ringlog record store.

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// The main error type for all ringlog operations.
///
/// Each variant wraps the error enum of one concern: lookups on the record
/// store, write assembly, lock acquisition, session seeks, and configuration.
/// Use [`RinglogError::kind`] to classify an error without matching on every
/// variant.
#[derive(Error, Debug)]
pub enum RinglogError {
    /// Error addressing a record by ordinal.
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Error growing a partial record during assembly.
    #[error("assemble error: {0}")]
    Assemble(#[from] AssembleError),

    /// The store lock could not be acquired.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// Error repositioning a session.
    #[error("seek error: {0}")]
    Seek(#[from] SeekError),

    /// Error loading or validating configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification of a [`RinglogError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An ordinal, intra-record offset or seek target was out of range.
    InvalidArgument,
    /// A buffer could not be grown.
    OutOfMemory,
    /// The store lock was not acquired; the call may be retried.
    LockUnavailable,
    /// Configuration was missing or invalid.
    Config,
}

impl RinglogError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Lookup(_) | Self::Seek(_) => ErrorKind::InvalidArgument,
            Self::Assemble(AssembleError::OutOfMemory { .. }) => ErrorKind::OutOfMemory,
            Self::Lock(_) => ErrorKind::LockUnavailable,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<RinglogError> for io::Error {
    fn from(err: RinglogError) -> Self {
        let kind = match err.kind() {
            ErrorKind::InvalidArgument => io::ErrorKind::InvalidInput,
            ErrorKind::OutOfMemory => io::ErrorKind::OutOfMemory,
            // `Interrupted` would make `write_all` retry a cancelled wait forever.
            ErrorKind::LockUnavailable => io::ErrorKind::ResourceBusy,
            ErrorKind::Config => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Errors from addressing a retained record by ordinal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The record ordinal is not below the number of retained records.
    #[error("record {index} is out of range: {retained} records retained")]
    RecordOutOfRange {
        /// The requested ordinal.
        index: u32,
        /// How many records the store currently holds.
        retained: usize,
    },

    /// The intra-record offset is not below the record's length.
    #[error("offset {offset} is out of range for record {index} of length {len}")]
    OffsetOutOfRange {
        /// The record ordinal.
        index: u32,
        /// The requested byte offset inside the record.
        offset: u32,
        /// The record's length in bytes.
        len: usize,
    },
}

/// Errors from accumulating chunks into a record.
#[derive(Error, Debug)]
pub enum AssembleError {
    /// The partial record buffer could not be grown.
    ///
    /// The partial buffer is left exactly as it was before the failed call.
    #[error("failed to grow partial record by {requested} bytes: {source}")]
    OutOfMemory {
        /// Number of additional bytes that were requested.
        requested: usize,
        /// The allocator's refusal.
        #[source]
        source: TryReserveError,
    },
}

/// Errors from acquiring the store lock.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The acquisition was abandoned because its cancel token fired.
    #[error("lock acquisition cancelled")]
    Cancelled,

    /// The lock is held and the caller asked not to wait.
    #[error("lock is held by another caller")]
    WouldBlock,
}

/// Errors from repositioning a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeekError {
    /// The computed position lies outside `0..=size`.
    #[error("seek target {target} is outside 0..={size}")]
    OutOfBounds {
        /// The computed target position.
        target: i128,
        /// Total logical size of the store at the time of the seek.
        size: u64,
    },
}

/// Errors from loading or validating a [`DeviceConfig`](crate::config::DeviceConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Description of what is invalid.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        /// The config file path.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid JSON for a config.
    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        /// The config file path.
        path: std::path::PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for `Result<T, RinglogError>`.
pub type Result<T> = std::result::Result<T, RinglogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let lookup: RinglogError = LookupError::RecordOutOfRange {
            index: 3,
            retained: 3,
        }
        .into();
        assert_eq!(lookup.kind(), ErrorKind::InvalidArgument);

        let seek: RinglogError = SeekError::OutOfBounds { target: -1, size: 8 }.into();
        assert_eq!(seek.kind(), ErrorKind::InvalidArgument);

        let lock: RinglogError = LockError::Cancelled.into();
        assert_eq!(lock.kind(), ErrorKind::LockUnavailable);
    }

    #[test]
    fn test_io_error_mapping() {
        let err: io::Error = RinglogError::from(LockError::Cancelled).into();
        assert_eq!(err.kind(), io::ErrorKind::ResourceBusy);

        let err: io::Error = RinglogError::from(LookupError::OffsetOutOfRange {
            index: 0,
            offset: 9,
            len: 3,
        })
        .into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(err.to_string().contains("offset 9"));
    }

    #[test]
    fn test_out_of_memory_kind() {
        let source = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
        let err: RinglogError = AssembleError::OutOfMemory {
            requested: usize::MAX,
            source,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    }
}
