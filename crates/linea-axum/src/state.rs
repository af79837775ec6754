//! Shared application state type.
//!
//! Defines the `AppState` type used across all handlers and routers.

use std::sync::Arc;

use linea_core::CurrencySettings;
use linea_db::{DbSession, SessionProvider};

use crate::currency::CurrencyService;
use crate::error::HttpError;
use crate::overrides::{DependencyKey, DependencyOverrides};

/// Services every handler can reach.
pub struct AppContext {
    /// Rate lookups and conversions.
    pub currency: CurrencyService,
    /// Production session provider, used when no override is installed.
    sessions: Arc<dyn SessionProvider>,
    overrides: DependencyOverrides,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("currency", &self.currency)
            .field("sessions", &self.sessions.name())
            .field("overrides", &self.overrides)
            .finish()
    }
}

impl AppContext {
    pub fn new(sessions: Arc<dyn SessionProvider>, currency: CurrencyService) -> Self {
        Self {
            currency,
            sessions,
            overrides: DependencyOverrides::new(),
        }
    }

    pub fn settings(&self) -> &CurrencySettings {
        self.currency.settings()
    }

    pub fn overrides(&self) -> &DependencyOverrides {
        &self.overrides
    }

    /// The provider requests should use right now: the override if one is
    /// installed, the production provider otherwise.
    pub fn session_provider(&self) -> Arc<dyn SessionProvider> {
        self.overrides
            .get(DependencyKey::Session)
            .unwrap_or_else(|| Arc::clone(&self.sessions))
    }

    /// Open a session for one unit of work.
    pub async fn open_session(&self) -> Result<DbSession, HttpError> {
        let provider = self.session_provider();
        tracing::trace!(provider = provider.name(), "Opening session");
        Ok(provider.open().await?)
    }
}

/// Application state shared across all handlers.
pub type AppState = Arc<AppContext>;
