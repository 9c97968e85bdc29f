use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read guard, recovering the data if a writer panicked.
pub(crate) fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!(cache = what, "read lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Acquire a write guard, recovering the data if a writer panicked.
pub(crate) fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!(cache = what, "write lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
