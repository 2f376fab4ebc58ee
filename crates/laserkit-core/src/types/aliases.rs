//! Type aliases for shared state crossing thread boundaries.
//!
//! Stream sessions share their transport and bookkeeping between the
//! caller's thread and a background worker; these aliases give those
//! wrappers one spelling across crates.
//!
//! ```rust,ignore
//! use laserkit_core::types::*;
//!
//! // Instead of: Arc<Mutex<Box<dyn SerialPort>>>
//! let port: ThreadSafe<Box<dyn SerialPort>> = thread_safe(Box::new(port));
//! ```

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe reader-writer lock wrapper for read-heavy state.
///
/// Multiple readers can access concurrently, writes require exclusive access.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create a new `ThreadSafeRw<T>` from a value.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}
