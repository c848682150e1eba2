//! Single-writer handle around the catalog.
//!
//! The storage backend is not internally synchronised. Network callbacks
//! (save, delete, activate) and the control loop run in different tasks, so
//! every catalog operation goes through one lock and mutations are
//! serialised.

use std::sync::{Mutex, PoisonError};

use crate::app::ports::{EntropyPort, StoragePort};

use super::ProfileCatalog;

pub struct SharedCatalog<S: StoragePort, R: EntropyPort> {
    inner: Mutex<ProfileCatalog<S, R>>,
}

impl<S: StoragePort, R: EntropyPort> SharedCatalog<S, R> {
    pub fn new(catalog: ProfileCatalog<S, R>) -> Self {
        Self {
            inner: Mutex::new(catalog),
        }
    }

    /// Run `f` with exclusive access to the catalog.
    ///
    /// A panic in an earlier holder does not lock the catalog out: the
    /// stored data is the source of truth and `ensure_default` repairs the
    /// index on the next boot.
    pub fn with<T>(&self, f: impl FnOnce(&mut ProfileCatalog<S, R>) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn into_inner(self) -> ProfileCatalog<S, R> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
