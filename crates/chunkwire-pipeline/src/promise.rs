//! Single-assignment promise.
//!
//! Created before a request is dispatched and resolved at most once.
//! Continuations registered before resolution run on the resolving thread;
//! those registered afterwards run immediately on the registering thread.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::PrepError;

type Continuation<T> = Box<dyn FnOnce(&Arc<T>) + Send>;

struct Shared<T> {
    value: Option<Arc<T>>,
    continuations: Vec<Continuation<T>>,
}

/// A shareable handle to a value that arrives later.
pub struct Promise<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                value: None,
                continuations: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        // A panicking continuation runs outside the lock, so poisoning leaves
        // the state consistent.
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores the value and runs pending continuations.
    pub fn resolve(&self, value: T) -> Result<(), PrepError> {
        let (value, continuations) = {
            let mut shared = self.lock();
            if shared.value.is_some() {
                return Err(PrepError::AlreadyResolved);
            }
            let value = Arc::new(value);
            shared.value = Some(Arc::clone(&value));
            (value, std::mem::take(&mut shared.continuations))
        };
        for continuation in continuations {
            continuation(&value);
        }
        Ok(())
    }

    /// Runs `f` with the value once it is available.
    pub fn on_resolve(&self, f: impl FnOnce(&Arc<T>) + Send + 'static) {
        let value = {
            let mut shared = self.lock();
            let Some(value) = shared.value.clone() else {
                shared.continuations.push(Box::new(f));
                return;
            };
            value
        };
        f(&value);
    }

    pub fn is_resolved(&self) -> bool {
        self.lock().value.is_some()
    }

    pub fn value(&self) -> Option<Arc<T>> {
        self.lock().value.clone()
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
