//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::middleware::{CredentialStore, SlidingWindowLimiter};
use crate::store::CatalogStore;

/// Everything the handlers and middleware share, cloned per request.
///
/// Built fresh from a [`Config`]; tests construct their own instance so
/// nothing leaks between them.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CatalogStore>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub credentials: Arc<CredentialStore>,
    pub config: Arc<Config>,
    started_at: Instant,
}

impl AppState {
    /// Wire up state from configuration.
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(CatalogStore::new()),
            limiter: Arc::new(SlidingWindowLimiter::new(config.rate_limiting_active())),
            credentials: Arc::new(CredentialStore::from_config(&config)),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Seconds since this instance started serving.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
