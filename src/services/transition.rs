//! State transition executor.
//!
//! Every mutating route goes through here: one conditional `update_one` against one
//! record, turned into a `TransitionResult` or an `AppError`.
//!
//! - `matched=false` (and nothing created): `NotFound`
//! - `matched=true, modified=false`: success, the record was already in the target state
//! - store failures: `Internal` (no retries)
use serde_json::Value;

use crate::error::AppError;
use crate::repos::document::{Filter, TransitionResult, Update};
use crate::repos::store::DocumentStore;

/// Allowed source states for a lifecycle move.
#[derive(Debug, Clone)]
pub struct SourceStates {
    pub field: &'static str,
    pub allowed: Vec<Value>,
    /// Target state, for the 409 message.
    pub target: String,
}

pub async fn execute(
    store: &dyn DocumentStore,
    resource: &'static str,
    filter: &Filter,
    update: &Update,
) -> Result<TransitionResult, AppError> {
    let result = store.update_one(filter, update).await?;

    tracing::debug!(
        collection = filter.collection,
        matched = result.matched,
        modified = result.modified,
        upserted = result.upserted,
        "transition applied"
    );

    if !result.matched && !result.upserted {
        return Err(AppError::not_found(resource));
    }
    Ok(result)
}

/// `execute` with the source-state guard folded into the filter.
///
/// When nothing matches, a read-only lookup with the unguarded filter tells a
/// missing (or not owned) record from one whose current state forbids the move.
pub async fn execute_guarded(
    store: &dyn DocumentStore,
    resource: &'static str,
    filter: &Filter,
    guard: &SourceStates,
    update: &Update,
) -> Result<TransitionResult, AppError> {
    let guarded = filter
        .clone()
        .one_of(guard.field, guard.allowed.iter().cloned());

    match execute(store, resource, &guarded, update).await {
        Err(AppError::NotFound { .. }) => {
            let current = store.find_one(filter).await?;
            match current {
                None => Err(AppError::not_found(resource)),
                Some(doc) => {
                    let from = match doc.get(guard.field) {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => "unknown".to_string(),
                    };
                    tracing::info!(
                        collection = filter.collection,
                        from = %from,
                        to = %guard.target,
                        "lifecycle transition refused"
                    );
                    Err(AppError::InvalidTransition {
                        resource,
                        from,
                        to: guard.target.clone(),
                    })
                }
            }
        }
        other => other,
    }
}
