//! Cancellable mutual exclusion for a shared record store.
//!
//! The record store itself never locks. Owners that share one store between
//! threads wrap it in an [`InterruptibleMutex`], whose [`lock`] waits for the
//! current holder but gives up as soon as the caller's [`CancelToken`] fires.
//! An abandoned acquisition is reported as [`LockError::Cancelled`] and leaves
//! the protected value untouched, so the caller may retry or abort.
//!
//! [`lock`]: InterruptibleMutex::lock

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::error::LockError;

/// How often a blocked [`InterruptibleMutex::lock`] re-checks its cancel token.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive access to the value in an [`InterruptibleMutex`].
pub type LockGuard<'a, T> = MutexGuard<'a, T>;

/// Shared flag that abandons pending lock acquisitions.
///
/// Clones share the same flag. Once cancelled, a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every acquisition waiting on this token or its clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A mutex whose blocking acquisition can be abandoned.
///
/// A panicking holder releases the lock without poisoning it.
#[derive(Debug)]
pub struct InterruptibleMutex<T> {
    inner: Mutex<T>,
    poll_interval: Duration,
}

impl<T> InterruptibleMutex<T> {
    /// Wraps `value`, re-checking cancel tokens every [`DEFAULT_POLL_INTERVAL`].
    pub fn new(value: T) -> Self {
        Self::with_poll_interval(value, DEFAULT_POLL_INTERVAL)
    }

    /// Wraps `value`, re-checking cancel tokens every `poll_interval`.
    pub fn with_poll_interval(value: T, poll_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(value),
            poll_interval,
        }
    }

    /// Acquires the lock, waiting for the current holder if needed.
    ///
    /// An uncontended lock is taken even if `cancel` has already fired; the
    /// token only abandons a wait.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Cancelled`] if `cancel` fires while waiting.
    pub fn lock(&self, cancel: &CancelToken) -> Result<LockGuard<'_, T>, LockError> {
        loop {
            if let Some(guard) = self.inner.try_lock_for(self.poll_interval) {
                return Ok(guard);
            }
            if cancel.is_cancelled() {
                return Err(LockError::Cancelled);
            }
        }
    }

    /// Acquires the lock only if it is free right now.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::WouldBlock`] if another caller holds the lock.
    pub fn try_lock(&self) -> Result<LockGuard<'_, T>, LockError> {
        self.inner.try_lock().ok_or(LockError::WouldBlock)
    }

    /// Consumes the mutex and returns the value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_uncontended_lock() {
        let mutex = InterruptibleMutex::new(5u32);
        let cancel = CancelToken::new();

        {
            let mut guard = mutex.lock(&cancel).unwrap();
            *guard += 1;
        }
        assert_eq!(*mutex.lock(&cancel).unwrap(), 6);
        assert_eq!(mutex.into_inner(), 6);
    }

    #[test]
    fn test_cancelled_token_still_takes_free_lock() {
        let mutex = InterruptibleMutex::new(());
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(mutex.lock(&cancel).is_ok());
    }

    #[test]
    fn test_try_lock_would_block() {
        let mutex = InterruptibleMutex::new(0u8);
        let _held = mutex.try_lock().unwrap();

        assert_eq!(mutex.try_lock().unwrap_err(), LockError::WouldBlock);
    }

    #[test]
    fn test_cancel_abandons_wait() {
        let mutex = InterruptibleMutex::with_poll_interval(0u8, Duration::from_millis(1));
        let cancel = CancelToken::new();
        let waiter_cancel = cancel.clone();
        let _held = mutex.try_lock().unwrap();

        thread::scope(|s| {
            let waiter = s.spawn(|| mutex.lock(&waiter_cancel).map(|_| ()));

            thread::sleep(Duration::from_millis(20));
            cancel.cancel();

            assert_eq!(waiter.join().unwrap(), Err(LockError::Cancelled));
        });
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_waiter_acquires_after_release() {
        let mutex = InterruptibleMutex::new(Vec::<u32>::new());
        let cancel = CancelToken::new();
        let (held_tx, held_rx) = mpsc::channel();

        thread::scope(|s| {
            s.spawn(|| {
                let mut guard = mutex.lock(&CancelToken::new()).unwrap();
                held_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(30));
                guard.push(1);
            });

            held_rx.recv().unwrap();
            let start = Instant::now();
            let mut guard = mutex.lock(&cancel).unwrap();
            guard.push(2);
            assert!(start.elapsed() >= Duration::from_millis(10));
        });

        assert_eq!(mutex.into_inner(), [1, 2]);
    }

    #[test]
    fn test_panicked_holder_releases_lock() {
        let mutex = InterruptibleMutex::new(0u8);

        let result = thread::scope(|s| {
            s.spawn(|| {
                let mut guard = mutex.lock(&CancelToken::new()).unwrap();
                *guard = 7;
                panic!("holder panics");
            })
            .join()
        });
        assert!(result.is_err());

        assert_eq!(*mutex.lock(&CancelToken::new()).unwrap(), 7);
        assert!(mutex.try_lock().is_ok());
    }
}
