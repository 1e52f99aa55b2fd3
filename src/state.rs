/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 *   - store, token service, cache and the external collaborators
 * - Cloned per request; every field is an Arc or Copy
 * - Handles are created once in app::run and never created/closed by handlers
 */
use std::sync::Arc;
use std::time::Duration;

use crate::repos::store::DocumentStore;
use crate::services::auth::TokenService;
use crate::services::cache::CacheClient;
use crate::services::content::ResourceGenerator;
use crate::services::notify::Notifier;

#[derive(Debug, Clone, Copy)]
pub struct OtpSettings {
    pub ttl: Duration,
    pub resend_interval: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tokens: Arc<TokenService>,
    pub cache: Arc<dyn CacheClient>,
    pub generator: Arc<dyn ResourceGenerator>,
    pub notifier: Arc<dyn Notifier>,
    pub otp: OtpSettings,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store.backend_name())
            .field("tokens", &self.tokens)
            .field("cache", &self.cache.backend_name())
            .field("generator", &self.generator.backend_name())
            .field("notifier", &self.notifier.backend_name())
            .field("otp", &self.otp)
            .finish()
    }
}
