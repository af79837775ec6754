//! Request-time dependency overrides.
//!
//! Handlers never open database sessions from a fixed pool. They ask the
//! application, which consults this table first and falls back to the
//! production provider. Tests install a provider bound to their own
//! database and clear the table when done.
//!
//! `clear()` drops every entry, not just the one a caller installed. Two
//! clients sharing one `App` concurrently would therefore clobber each
//! other; each test builds its own `App`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use linea_db::SessionProvider;

/// Dependencies that can be replaced at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKey {
    /// The provider handing out a `DbSession` per request.
    Session,
}

/// Replacement providers, keyed by the dependency they stand in for.
#[derive(Default)]
pub struct DependencyOverrides {
    entries: RwLock<HashMap<DependencyKey, Arc<dyn SessionProvider>>>,
}

impl fmt::Debug for DependencyOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_map()
            .entries(entries.iter().map(|(key, provider)| (key, provider.name())))
            .finish()
    }
}

impl DependencyOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `provider` for `key`, returning whatever it replaced.
    pub fn set(
        &self,
        key: DependencyKey,
        provider: Arc<dyn SessionProvider>,
    ) -> Option<Arc<dyn SessionProvider>> {
        tracing::debug!(?key, provider = provider.name(), "Installing dependency override");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, provider)
    }

    pub fn get(&self, key: DependencyKey) -> Option<Arc<dyn SessionProvider>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    pub fn remove(&self, key: DependencyKey) -> Option<Arc<dyn SessionProvider>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
    }

    /// Remove every override.
    ///
    /// Recovers from a poisoned lock so cleanup still runs while a
    /// panicking test unwinds.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !entries.is_empty() {
            tracing::debug!(count = entries.len(), "Clearing dependency overrides");
        }
        entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
