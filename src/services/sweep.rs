//! Periodic removal of expired one-time codes.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::repos::error::RepoResult;
use crate::repos::otp_repo;
use crate::repos::store::DocumentStore;

/// One sweep. Returns the number of codes deleted.
pub async fn sweep_expired_otps(store: &dyn DocumentStore) -> RepoResult<u64> {
    let deleted = otp_repo::delete_expired(store, Utc::now()).await?;
    if deleted > 0 {
        tracing::info!(deleted, "expired otps removed");
    }
    Ok(deleted)
}

/// Run `sweep_expired_otps` every `every` until the runtime shuts down.
/// Failures are logged; the next tick tries again.
pub fn spawn(store: Arc<dyn DocumentStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = sweep_expired_otps(store.as_ref()).await {
                tracing::error!(error = %err, "otp sweep failed");
            }
        }
    })
}
