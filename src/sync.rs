use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// RAII structure used to release exclusive access to a [`Lock`] when dropped.
pub(crate) struct LockGuard<'a, T: ?Sized>(MutexGuard<'a, T>);

impl<T: ?Sized> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl<T: ?Sized> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.deref_mut()
    }
}

/// A mutex that ignores poisoning
///
/// Critical sections guarded by a `Lock` never call into user code.
#[derive(Debug, Default)]
pub(crate) struct Lock<T>(Mutex<T>);

impl<T> Lock<T> {
    pub fn new(value: T) -> Self {
        Self(Mutex::new(value))
    }

    /// Acquire exclusive access, blocking the current thread until it is available.
    pub fn lock(&self) -> LockGuard<'_, T> {
        LockGuard(self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
