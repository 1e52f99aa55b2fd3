/*
 * Responsibility
 * - GET /health (liveness; public, outside the access middleware)
 */
use axum::extract::State;
use serde::Serialize;

use crate::api::v1::response::Envelope;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    store: &'static str,
    cache: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Envelope<Health> {
    Envelope::ok(Health {
        status: "ok",
        store: state.store.backend_name(),
        cache: state.cache.backend_name(),
    })
}
