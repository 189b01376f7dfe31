//! In-flight session registry for client-initiated cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use frametag_models::SessionId;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Session '{0}' is already running")]
    AlreadyRunning(SessionId),

    #[error("Too many analyses in flight (limit {0})")]
    AtCapacity(usize),
}

#[derive(Debug)]
struct Entry {
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<SessionId, Entry>,
    next_generation: u64,
}

/// Bounded map from session id to cancellation token.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Inner>>,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            capacity,
        }
    }

    // A poisoned lock only means another request panicked mid-update; the
    // map itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `id` and return a guard that unregisters it on drop.
    pub fn register(&self, id: SessionId) -> Result<SessionGuard, RegistryError> {
        let mut inner = self.lock();

        if inner.entries.contains_key(&id) {
            return Err(RegistryError::AlreadyRunning(id));
        }
        if inner.entries.len() >= self.capacity {
            return Err(RegistryError::AtCapacity(self.capacity));
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let token = CancellationToken::new();
        inner.entries.insert(
            id.clone(),
            Entry {
                generation,
                token: token.clone(),
            },
        );
        debug!(session_id = %id, generation, "Registered session");

        Ok(SessionGuard {
            registry: self.clone(),
            id,
            generation,
            token,
        })
    }

    /// Signal and remove a session. Returns whether one was found.
    pub fn abort(&self, id: &SessionId) -> bool {
        let removed = self.lock().entries.remove(id);
        match removed {
            Some(entry) => {
                entry.token.cancel();
                info!(session_id = %id, "Session aborted");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.lock().entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: &SessionId, generation: u64) {
        let mut inner = self.lock();
        if inner
            .entries
            .get(id)
            .is_some_and(|entry| entry.generation == generation)
        {
            inner.entries.remove(id);
            debug!(session_id = %id, generation, "Released session");
        }
    }
}

/// Registration handle held for the lifetime of one analysis.
///
/// Dropping it removes the entry, unless the entry has since been replaced
/// by a newer registration under the same id.
#[derive(Debug)]
pub struct SessionGuard {
    registry: SessionRegistry,
    id: SessionId,
    generation: u64,
    token: CancellationToken,
}

impl SessionGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.release(&self.id, self.generation);
    }
}
