//! The application object.
//!
//! `App` owns the shared state, the dependency overrides and the background
//! rate refresh. Startup and shutdown are explicit so tests can drive them
//! the same way the server does.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use tokio::task::JoinHandle;

use linea_db::SessionProvider;

use crate::bootstrap::CorsConfig;
use crate::currency::CurrencyService;
use crate::error::HttpError;
use crate::overrides::DependencyOverrides;
use crate::routes::create_router;
use crate::state::{AppContext, AppState};

/// Shared handle to the running application. Clones share state.
#[derive(Debug, Clone)]
pub struct App {
    state: AppState,
    cors: CorsConfig,
    refresh_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl App {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        currency: CurrencyService,
        cors: CorsConfig,
    ) -> Self {
        Self {
            state: Arc::new(AppContext::new(sessions, currency)),
            cors,
            refresh_task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn overrides(&self) -> &DependencyOverrides {
        self.state.overrides()
    }

    /// Router over this application's state.
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state), &self.cors)
    }

    /// Start background work. Calling it again while running is a no-op.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn startup(&self) {
        let mut task = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let interval = self.state.settings().refresh_interval();
        tracing::info!(
            interval_secs = interval.as_secs(),
            "Starting exchange rate refresh task"
        );
        *task = Some(tokio::spawn(refresh_loop(Arc::clone(&self.state), interval)));
    }

    /// Stop background work.
    pub fn shutdown(&self) {
        let task = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            tracing::info!("Stopped exchange rate refresh task");
        }
    }

    /// Whether the background refresh task is running.
    pub fn is_running(&self) -> bool {
        self.refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

/// Refresh stale rates every `interval`, starting one interval after launch.
async fn refresh_loop(state: AppState, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        match refresh_rates(&state).await {
            Ok(0) => tracing::debug!("Background refresh skipped, rates still fresh"),
            Ok(count) => tracing::info!(count, "Background refresh stored rates"),
            Err(err) => tracing::error!(error = %err, "Background rate refresh failed"),
        }
    }
}

async fn refresh_rates(state: &AppContext) -> Result<usize, HttpError> {
    let mut session = state.open_session().await?;
    Ok(state.currency.refresh(&mut session, false).await?)
}
